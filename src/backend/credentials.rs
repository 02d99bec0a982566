//! Google service-account credentials and OAuth access tokens
//!
//! The studio authenticates outbound calls only. A service-account key file
//! is exchanged for a short-lived access token using the JWT bearer grant,
//! and the token is reused until shortly before it expires.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::error::{AppError, Result};

const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Assertion lifetime accepted by Google's token endpoint (max one hour)
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Tokens are refreshed this long before their reported expiry
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of bearer tokens for outbound requests
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String>;
}

/// A fixed, pre-minted token
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String> {
        Ok(self.token.clone())
    }
}

/// Contents of a Google service-account JSON key
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type", default)]
    pub key_type: Option<String>,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

impl ServiceAccountKey {
    /// Read and parse a key file, failing if it is missing or not a service account
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(AppError::Credentials(format!(
                "credential file not found at {}",
                path.display()
            )));
        }

        let raw = std::fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let key: ServiceAccountKey = serde_json::from_str(raw)
            .map_err(|e| AppError::Credentials(format!("invalid service account key: {}", e)))?;

        match key.key_type.as_deref() {
            None | Some("service_account") => Ok(key),
            Some(other) => Err(AppError::Credentials(format!(
                "unsupported credential type '{}', expected service_account",
                other
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

/// Mints access tokens from a service-account key
pub struct ServiceAccountTokenProvider {
    key: ServiceAccountKey,
    signing_key: EncodingKey,
    client: Client,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenProvider {
    pub fn new(key: ServiceAccountKey) -> Result<Self> {
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())
            .map_err(|e| AppError::Credentials(format!("invalid private key: {}", e)))?;

        Ok(Self {
            key,
            signing_key,
            client: Client::new(),
            cached: Mutex::new(None),
        })
    }

    pub fn client_email(&self) -> &str {
        &self.key.client_email
    }

    fn assertion(&self, now: DateTime<Utc>) -> Result<String> {
        let claims = AssertionClaims {
            iss: &self.key.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.key.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        encode(&header, &claims, &self.signing_key)
            .map_err(|e| AppError::Credentials(format!("failed to sign assertion: {}", e)))
    }

    async fn exchange(&self) -> Result<CachedToken> {
        let now = Utc::now();
        let assertion = self.assertion(now)?;

        let response = self
            .client
            .post(&self.key.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Credentials(format!(
                "token endpoint returned {}: {}",
                status,
                body.trim()
            )));
        }

        let token: TokenResponse = response.json().await?;
        info!(account = %self.key.client_email, expires_in = token.expires_in, "Obtained access token");

        Ok(CachedToken {
            token: token.access_token,
            expires_at: now + Duration::seconds(token.expires_in),
        })
    }
}

#[async_trait]
impl TokenProvider for ServiceAccountTokenProvider {
    async fn access_token(&self) -> Result<String> {
        // Held across the exchange so concurrent callers share one refresh
        let mut cached = self.cached.lock().await;

        if let Some(token) = cached.as_ref() {
            if token.expires_at - Duration::seconds(EXPIRY_MARGIN_SECS) > Utc::now() {
                return Ok(token.token.clone());
            }
            debug!("Access token expired, refreshing");
        }

        let fresh = self.exchange().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
