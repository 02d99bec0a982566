//! Application settings and configuration management

use crate::error::{AppError, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub vertex: VertexConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Directory of front-end assets served for unmatched paths
    #[serde(default)]
    pub static_dir: Option<String>,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: None,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Root holding the artifact directory and the metadata ledger
    #[serde(default = "default_storage_root")]
    pub root: String,
    /// URL path under which artifacts are served
    #[serde(default = "default_public_path")]
    pub public_path: String,
}

fn default_storage_root() -> String {
    "data".to_string()
}

fn default_public_path() -> String {
    "/outputs".to_string()
}

impl StorageConfig {
    /// Directory holding generated images and videos
    pub fn output_dir(&self) -> PathBuf {
        Path::new(&self.root).join("outputs")
    }

    /// Path of the JSON metadata ledger
    pub fn metadata_path(&self) -> PathBuf {
        Path::new(&self.root).join("metadata.json")
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_storage_root(),
            public_path: default_public_path(),
        }
    }
}

/// Vertex AI configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VertexConfig {
    /// Falls back to the project of the service account key when unset
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default = "default_location")]
    pub location: String,
    /// Overrides `https://{location}-aiplatform.googleapis.com/v1`
    #[serde(default)]
    pub api_base: Option<String>,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_edit_model")]
    pub edit_model: String,
    #[serde(default = "default_video_model")]
    pub video_model: String,
    /// Transport timeout for single requests, unset means no timeout
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,
}

fn default_location() -> String {
    "us-central1".to_string()
}

fn default_image_model() -> String {
    "imagen-3.0-generate-002".to_string()
}

fn default_edit_model() -> String {
    "imagen-3.0-capability-001".to_string()
}

fn default_video_model() -> String {
    "veo-2.0-generate-001".to_string()
}

impl VertexConfig {
    /// Base URL of the regional prediction API
    pub fn base_url(&self) -> String {
        match &self.api_base {
            Some(base) => base.trim_end_matches('/').to_string(),
            None => format!("https://{}-aiplatform.googleapis.com/v1", self.location),
        }
    }
}

impl Default for VertexConfig {
    fn default() -> Self {
        Self {
            project_id: None,
            location: default_location(),
            api_base: None,
            image_model: default_image_model(),
            edit_model: default_edit_model(),
            video_model: default_video_model(),
            request_timeout_ms: None,
        }
    }
}

/// Credential file configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials_path")]
    pub path: String,
}

fn default_credentials_path() -> String {
    "credentials/service-account.json".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_credentials_path(),
        }
    }
}

/// Long-running operation polling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_poll_interval")]
    pub interval_ms: u64,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    #[serde(default = "default_poll_interval")]
    pub max_interval_ms: u64,
    #[serde(default)]
    pub jitter: bool,
}

fn default_poll_interval() -> u64 {
    5000
}

fn default_max_attempts() -> u32 {
    120
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_poll_interval(),
            max_attempts: default_max_attempts(),
            backoff_multiplier: default_backoff_multiplier(),
            max_interval_ms: default_poll_interval(),
            jitter: false,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Settings {
    /// Load settings from configuration files and environment variables
    pub fn load() -> Result<Self> {
        Self::load_from_path("config/default.toml")
    }

    /// Load settings from a specific configuration file path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            // Load from configuration file
            .add_source(
                File::with_name(path.as_ref().to_str().unwrap_or("config/default"))
                    .required(false),
            )
            // Override with environment variables (prefixed with STUDIO__)
            .add_source(
                Environment::with_prefix("STUDIO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            // Conventional variables win over everything else
            .set_override_option("server.port", env::var("PORT").ok())?
            .set_override_option("vertex.project_id", env::var("GOOGLE_CLOUD_PROJECT").ok())?
            .set_override_option("vertex.location", env::var("GOOGLE_CLOUD_LOCATION").ok())?
            .set_override_option("vertex.image_model", env::var("IMAGEN_MODEL").ok())?
            .set_override_option("vertex.edit_model", env::var("IMAGEN_EDIT_MODEL").ok())?
            .set_override_option("vertex.video_model", env::var("VEO_MODEL").ok())?
            .set_override_option(
                "credentials.path",
                env::var("GOOGLE_APPLICATION_CREDENTIALS").ok(),
            )?
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(invalid("Server port cannot be 0"));
        }

        if self.vertex.location.trim().is_empty() {
            return Err(invalid("Vertex location cannot be empty"));
        }

        let public_path = &self.storage.public_path;
        if !public_path.starts_with('/') || public_path.trim_end_matches('/').is_empty() {
            return Err(invalid(format!(
                "Storage public path '{}' must be an absolute, non-root URL path",
                public_path
            )));
        }

        if self.polling.max_attempts == 0 {
            return Err(invalid("Polling max_attempts must be at least 1"));
        }

        if self.polling.backoff_multiplier < 1.0 {
            return Err(invalid("Polling backoff_multiplier cannot be below 1.0"));
        }

        Ok(())
    }
}

fn invalid(message: impl Into<String>) -> AppError {
    AppError::Config(config::ConfigError::Message(message.into()))
}
