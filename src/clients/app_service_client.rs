use async_trait::async_trait;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::models::{BackendError, UserProfile};
use crate::services::user_service::UserDirectory;

/// User directory served by the app service that owns user accounts.
#[derive(Debug)]
pub struct AppServiceClient {
    client: Client,
    base_url: Url,
    jwt_secret: String,
    service_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    sub: String,
    #[serde(rename = "type")]
    type_: String,
    exp: usize,
}

impl AppServiceClient {
    pub fn new(base_url: String, jwt_secret: String, service_name: String) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;

        let base_url = Url::parse(base_url.trim_end_matches('/'))
            .map_err(|e| BackendError::Unavailable(format!("Invalid app service URL '{}': {}", base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(BackendError::Unavailable(format!("App service URL '{}' cannot carry a path", base_url)));
        }

        Ok(Self {
            client,
            base_url,
            jwt_secret,
            service_name,
        })
    }

    fn generate_token(&self) -> Result<String, BackendError> {
        // 1 minute expiration
        let expiration = (Utc::now() + Duration::seconds(60)).timestamp();

        let claims = Claims {
            sub: self.service_name.clone(),
            type_: "service".to_string(),
            exp: expiration as usize,
        };

        encode(&Header::default(), &claims, &EncodingKey::from_secret(self.jwt_secret.as_bytes()))
            .map_err(|e| BackendError::Unavailable(format!("Failed to sign service token: {}", e)))
    }

    /// `{base}/users/{user_id}`, with the id percent-encoded as one segment.
    fn user_url(&self, user_id: &str) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("users").push(user_id);
        }
        url
    }
}

#[async_trait]
impl UserDirectory for AppServiceClient {
    async fn find_user(&self, user_id: &str) -> Result<Option<UserProfile>, BackendError> {
        let token = self.generate_token()?;
        let response = self.client.get(self.user_url(user_id))
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to retrieve user {} from app service: {}", user_id, e);
                e
            })?;

        if response.status() == StatusCode::NOT_FOUND {
            info!("App service has no user {}", user_id);
            return Ok(None);
        }

        let profile = response.error_for_status()?.json::<UserProfile>().await?;
        Ok(Some(profile))
    }
}
