//! Demo data seed script
//!
//! Seeds a fresh database with a small, realistic stable:
//! - 4 horses, 3 instructors, 4 clients
//! - 1 subscription and 1 gift certificate
//! - a week of planned lessons plus one completed lesson
//! - landing page sections
//!
//! Usage:
//!   DATABASE_URL=... ./seed-demo [--reset]

use anyhow::{bail, Context, Result};
use chrono::{Duration, Utc};
use clap::Parser;
use rust_decimal::Decimal;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use stable_crm_api::{
    models::{
        certificate::CreateCertificateRequest,
        client::CreateClientRequest,
        horse::{CreateHorseRequest, HorseStatus},
        instructor::CreateInstructorRequest,
        lesson::{CreateLessonRequest, LessonStatus, LessonType, PaymentType},
        subscription::CreateSubscriptionRequest,
    },
    services::{
        certificates::CertificateService, clients::ClientService, horses::HorseService,
        instructors::InstructorService, lessons::LessonService, subscriptions::SubscriptionService,
    },
};

#[derive(Parser)]
#[command(name = "seed-demo", about = "Seed demo data for the stable CRM")]
struct Args {
    /// Truncate all business tables first
    #[arg(long)]
    reset: bool,
}

const LANDING_SECTIONS: &[(&str, &str, &str)] = &[
    ("hero", "Конюшня «Солнечная Поляна»", "Верховая езда и иппотерапия для детей и взрослых."),
    ("services", "Занятия", "Иппотерапия, обучение верховой езде, прогулки и конная стрельба из лука."),
    ("contacts", "Контакты", "Запись по телефону +7 900 000-00-00."),
];

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL required")?;

    println!("=== Seed Demo Stable ===");

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await
        .context("Failed to connect to database")?;

    stable_crm_api::db::run_migrations(&pool).await?;

    if args.reset {
        println!("Truncating business tables...");
        sqlx::query(
            "TRUNCATE lesson_horses, lesson_instructors, lessons, subscriptions, certificates,
                      clients, instructors, horses, landing_content
             RESTART IDENTITY CASCADE",
        )
        .execute(&pool)
        .await
        .context("Failed to truncate tables")?;
    } else {
        let horses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM horses").fetch_one(&pool).await?;
        if horses > 0 {
            bail!("Database already has data; rerun with --reset to replace it");
        }
    }

    println!("Creating horses...");
    let mut horse_ids = Vec::new();
    for (nickname, breed, age, status) in [
        ("Буран", "Тракененская", 11, HorseStatus::Active),
        ("Звёздочка", "Орловский рысак", 8, HorseStatus::Active),
        ("Граф", "Русская верховая", 14, HorseStatus::Active),
        ("Ласка", "Пони шетлендский", 19, HorseStatus::Rest),
    ] {
        let horse = HorseService::create(
            &pool,
            &CreateHorseRequest {
                nickname: nickname.into(),
                breed: breed.into(),
                age,
                status: Some(status),
                notes: None,
            },
        )
        .await?;
        horse_ids.push(horse.id);
    }

    println!("Creating instructors...");
    let mut instructor_ids = Vec::new();
    for (name, specializations) in [
        ("Мария Соколова", vec!["hippotherapy"]),
        ("Алексей Орлов", vec!["beginner_riding", "advanced_riding"]),
        ("Дарья Ким", vec!["walk", "mounted_archery"]),
    ] {
        let instructor = InstructorService::create(
            &pool,
            &CreateInstructorRequest {
                name: name.into(),
                phone: None,
                email: None,
                specializations: specializations.into_iter().map(String::from).collect(),
                is_active: Some(true),
            },
        )
        .await?;
        instructor_ids.push(instructor.id);
    }

    println!("Creating clients...");
    let mut client_ids = Vec::new();
    for (name, phone) in [
        ("Иванова Анна", "+7 901 111-11-11"),
        ("Петров Илья", "+7 902 222-22-22"),
        ("Смирнова Ольга", "+7 903 333-33-33"),
        ("Кузнецов Тимур", "+7 904 444-44-44"),
    ] {
        let client = ClientService::create(
            &pool,
            &CreateClientRequest {
                name: name.into(),
                phone: Some(phone.into()),
                email: None,
                notes: None,
            },
        )
        .await?;
        client_ids.push(client.id);
    }

    println!("Creating passes...");
    let subscription = SubscriptionService::create(
        &pool,
        &CreateSubscriptionRequest {
            client_id: client_ids[0],
            total_lessons: 8,
            lessons_remaining: None,
            duration_months: None,
            status: None,
            expires_at: None,
        },
    )
    .await?;
    let certificate = CertificateService::create(
        &pool,
        &CreateCertificateRequest {
            number: None,
            client_id: Some(client_ids[1]),
            value: Decimal::new(3000, 0),
            status: None,
            expires_at: Some(Utc::now() + Duration::days(180)),
        },
    )
    .await?;
    println!("  Certificate number: {}", certificate.number);

    println!("Scheduling lessons...");
    let lesson = |client: Uuid, days: i64, kind: LessonType, payment: PaymentType, i: usize| CreateLessonRequest {
        client_id: client,
        date: Utc::now() + Duration::days(days),
        duration: None,
        lesson_type: kind,
        payment_type: payment,
        cost: Decimal::new(2000, 0),
        status: None,
        is_paid: None,
        notes: None,
        certificate_id: None,
        subscription_id: None,
        instructor_ids: vec![instructor_ids[i % instructor_ids.len()]],
        horse_ids: vec![horse_ids[i % 3]],
    };

    let planned = [
        lesson(client_ids[0], 1, LessonType::Hippotherapy, PaymentType::Subscription, 0),
        lesson(client_ids[1], 2, LessonType::BeginnerRiding, PaymentType::Certificate, 1),
        lesson(client_ids[2], 3, LessonType::Walk, PaymentType::Cash, 2),
        lesson(client_ids[3], 5, LessonType::MountedArchery, PaymentType::Cash, 2),
    ];
    for mut req in planned {
        if req.payment_type == PaymentType::Subscription {
            req.subscription_id = Some(subscription.id);
        }
        if req.payment_type == PaymentType::Certificate {
            req.certificate_id = Some(certificate.id);
        }
        LessonService::create(&pool, &req).await?;
    }

    // One finished lesson so statistics and the subscription balance aren't empty.
    let mut done = lesson(client_ids[0], -2, LessonType::Hippotherapy, PaymentType::Subscription, 0);
    done.status = Some(LessonStatus::Completed);
    done.is_paid = Some(true);
    LessonService::create(&pool, &done).await?;

    println!("Writing landing content...");
    for (section, title, content) in LANDING_SECTIONS {
        sqlx::query(
            "INSERT INTO landing_content (section, title, content)
             VALUES ($1, $2, $3)
             ON CONFLICT (section) DO UPDATE SET title = EXCLUDED.title, content = EXCLUDED.content",
        )
        .bind(section)
        .bind(title)
        .bind(content)
        .execute(&pool)
        .await?;
    }

    println!("=== Done ===");
    Ok(())
}
