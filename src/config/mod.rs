use std::time::Duration;

use garde::Validate;
use serde::Deserialize;

use crate::discovery::policy::SizePolicy;
use crate::services::tryon::TryOnConfig;

#[derive(Debug, Deserialize, Validate)]
pub struct AppConfig {
    /// Access key for the try-on service, sent verbatim in the authorization header.
    #[garde(length(min = 1))]
    pub fal_key: String,

    /// Job-submission endpoint. Status and result endpoints hang off `{url}/requests/{id}`.
    #[serde(default = "default_tryon_api_url")]
    #[garde(length(min = 1))]
    pub tryon_api_url: String,

    /// Authorization scheme placed before the key (e.g. "Key", "Bearer").
    #[serde(default = "default_auth_scheme")]
    #[garde(length(min = 1))]
    pub tryon_auth_scheme: String,

    /// Reference "model" image every garment is tried on.
    #[serde(default = "default_model_image_url")]
    #[garde(length(min = 1))]
    pub model_image_url: String,

    /// Garment category tag sent with each submission.
    #[serde(default = "default_garment_category")]
    #[garde(length(min = 1))]
    pub garment_category: String,

    #[serde(default = "default_poll_interval_ms")]
    #[garde(range(min = 1))]
    pub poll_interval_ms: u64,

    #[serde(default = "default_poll_timeout_ms")]
    #[garde(range(min = 1))]
    pub poll_timeout_ms: u64,

    /// Per-request HTTP timeout towards the try-on service.
    #[serde(default = "default_request_timeout_secs")]
    #[garde(range(min = 1))]
    pub request_timeout_secs: u64,

    #[serde(default = "default_min_image_side")]
    #[garde(skip)]
    pub min_image_width: u32,

    #[serde(default = "default_min_image_side")]
    #[garde(skip)]
    pub min_image_height: u32,

    /// Text of the overlay control attached to each image.
    #[serde(default = "default_overlay_label")]
    #[garde(length(min = 1, max = 32))]
    pub overlay_label: String,

    /// Relay server bind address (e.g., "127.0.0.1:3000").
    #[serde(default = "default_bind_addr")]
    #[garde(length(min = 1))]
    pub bind_addr: String,
}

pub const DEFAULT_TRYON_API_URL: &str = "https://queue.fal.run/fashn/tryon";
pub const DEFAULT_MODEL_IMAGE_URL: &str =
    "https://utfs.io/f/wXFHUNfTHmLj4prvqbRMQ6JXFyUr3IT0avK2HSOmZWiAsxg9";

fn default_tryon_api_url() -> String {
    DEFAULT_TRYON_API_URL.to_string()
}

fn default_auth_scheme() -> String {
    "Key".to_string()
}

fn default_model_image_url() -> String {
    DEFAULT_MODEL_IMAGE_URL.to_string()
}

fn default_garment_category() -> String {
    "tops".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_poll_timeout_ms() -> u64 {
    60_000
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_min_image_side() -> u32 {
    100
}

fn default_overlay_label() -> String {
    "Try on".to_string()
}

fn default_bind_addr() -> String {
    "127.0.0.1:3000".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        let config: Self = envy::from_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Explicit pipeline configuration; the credential only travels through here.
    pub fn tryon_config(&self) -> TryOnConfig {
        TryOnConfig {
            api_url: self.tryon_api_url.trim_end_matches('/').to_string(),
            api_key: self.fal_key.clone(),
            auth_scheme: self.tryon_auth_scheme.clone(),
            model_image_url: self.model_image_url.clone(),
            category: self.garment_category.clone(),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            poll_timeout: Duration::from_millis(self.poll_timeout_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        }
    }

    pub fn size_policy(&self) -> SizePolicy {
        SizePolicy::new(self.min_image_width, self.min_image_height)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration from environment: {0}")]
    Env(#[from] envy::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(#[from] garde::Report),
}
