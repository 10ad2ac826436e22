use async_trait::async_trait;
use axum::http;
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::VerifiedIdentity;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("empty token")]
    Empty,
    #[error("token rejected: {0}")]
    Rejected(#[from] jsonwebtoken::errors::Error),
    #[error("token carries no user id")]
    MissingSubject,
}

/// Resolves an opaque token into a verified identity.
///
/// There is no partial success: a malformed, expired or badly signed token
/// is an error, whatever claims it may carry.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError>;
}

#[derive(Debug, Deserialize)]
struct SessionClaims {
    #[serde(rename = "userId")]
    user_id: Option<String>,
    sub: Option<String>,
    #[serde(default)]
    email: String,
}

/// Identity gate backed by HS256 session tokens.
pub struct JwtIdentityGate {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtIdentityGate {
    pub fn new(secret: &str) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    fn decode(&self, token: &str) -> Result<TokenData<SessionClaims>, AuthError> {
        Ok(decode::<SessionClaims>(token, &self.decoding_key, &self.validation)?)
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityGate {
    async fn verify(&self, token: &str) -> Result<VerifiedIdentity, AuthError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(AuthError::Empty);
        }

        let claims = self.decode(token)?.claims;
        let user_id = claims
            .user_id
            .or(claims.sub)
            .filter(|uid| !uid.is_empty())
            .ok_or(AuthError::MissingSubject)?;

        debug!("Token verified for user {}", user_id);
        Ok(VerifiedIdentity {
            user_id,
            email: claims.email,
        })
    }
}

// Get the auth token from a request
pub fn get_auth_token<B>(req: &http::Request<B>) -> Result<String, String> {
    // 1. Try to get token from Authorization header
    if let Some(auth_header) = req.headers().get(http::header::AUTHORIZATION) {
        let auth_str = auth_header.to_str().map_err(|_| "Invalid Authorization header".to_string())?;
        Ok(auth_str
            .strip_prefix("Bearer ")
            .unwrap_or(auth_str)
            .to_string())
    }
    // 2. Try to get token from cookies
    else {
        let cookie_header = req.headers().get(http::header::COOKIE)
            .ok_or_else(|| "Missing Authorization header or Cookie".to_string())?
            .to_str()
            .map_err(|_| "Invalid Cookie header".to_string())?;

        cookie::Cookie::split_parse(cookie_header)
            .flatten()
            .find(|c| c.name() == "auth_token")
            .map(|c| c.value().to_string())
            .ok_or_else(|| "auth_token cookie not found".to_string())
    }
}
