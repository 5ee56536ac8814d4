use std::sync::Arc;

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use stable_crm_api::{
    build_router,
    config::Config,
    db,
    services::{expiry, metrics, vk::VkClient},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis = redis::Client::open(config.redis_url.as_str())?;

    metrics::start(pool.clone());
    expiry::start(pool.clone());

    let state = AppState {
        db: pool,
        redis,
        vk: VkClient::new(&config.vk_api_url, &config.vk_api_version),
        config: config.clone(),
    };

    let app = build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Stable CRM API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
