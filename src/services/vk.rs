use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::models::auth::VkProfile;

#[derive(Debug, thiserror::Error)]
pub enum VkError {
    #[error("VK rejected the token: {0}")]
    Rejected(String),
    #[error("VK request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct VkErrorBody {
    error_code: i64,
    error_msg: String,
}

#[derive(Debug, Deserialize)]
struct UsersGetResponse {
    response: Option<Vec<VkProfile>>,
    error: Option<VkErrorBody>,
}

/// Client for the VK `users.get` method used to verify login tokens.
#[derive(Clone)]
pub struct VkClient {
    client: Client,
    api_url: String,
    api_version: String,
}

impl VkClient {
    pub fn new(api_url: &str, api_version: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();
        Self {
            client,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        }
    }

    /// Returns the profile the access token belongs to.
    pub async fn profile(&self, access_token: &str) -> Result<VkProfile, VkError> {
        let body = self
            .client
            .get(format!("{}/method/users.get", self.api_url))
            .query(&[
                ("access_token", access_token),
                ("v", self.api_version.as_str()),
            ])
            .send()
            .await?
            .text()
            .await?;
        parse_users_get(&body)
    }
}

fn parse_users_get(body: &str) -> Result<VkProfile, VkError> {
    let parsed: UsersGetResponse = serde_json::from_str(body)
        .map_err(|e| VkError::Rejected(format!("unexpected response: {e}")))?;

    if let Some(err) = parsed.error {
        return Err(VkError::Rejected(format!("{} (code {})", err.error_msg, err.error_code)));
    }
    parsed
        .response
        .and_then(|users| users.into_iter().next())
        .ok_or_else(|| VkError::Rejected("empty users.get response".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_profile() {
        let body = r#"{"response":[{"id":210700286,"first_name":"Lindsey","last_name":"Stirling","can_access_closed":true}]}"#;
        let profile = parse_users_get(body).unwrap();
        assert_eq!(profile.id, 210700286);
        assert_eq!(profile.full_name(), "Lindsey Stirling");
        assert!(profile.email.is_none());
    }

    #[test]
    fn surfaces_vk_errors() {
        let body = r#"{"error":{"error_code":5,"error_msg":"User authorization failed: invalid access_token (4).","request_params":[]}}"#;
        let err = parse_users_get(body).unwrap_err();
        assert!(matches!(err, VkError::Rejected(msg) if msg.contains("code 5")));
    }

    #[test]
    fn empty_or_garbage_responses_are_rejected() {
        assert!(parse_users_get(r#"{"response":[]}"#).is_err());
        assert!(parse_users_get("<html>").is_err());
    }
}
