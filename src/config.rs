//! Engine configuration.

use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default upload size ceiling: 5 MiB.
pub const DEFAULT_MAX_FILE_SIZE: u64 = 5 * 1024 * 1024;

/// Default hold on the admin form's success state before it resets.
pub const DEFAULT_ADMIN_RESET_DELAY: Duration = Duration::from_secs(2);

/// Upload engine configuration.
#[derive(Debug, Clone)]
pub struct UploadConfig {
    /// Endpoint that receives submissions.
    pub endpoint_url: String,
    /// Maximum accepted file size in bytes.
    pub max_file_size: u64,
    /// Accepted image media types. Carried for policy visibility only:
    /// the validator gates on the `image/` category prefix, not this
    /// list (see `validate::check_image`).
    pub allowed_types: Vec<String>,
    /// How long the admin form holds its success state before resetting.
    pub admin_reset_delay: Duration,
    /// Mixpanel project token. Analytics are disabled when absent.
    pub analytics_token: Option<SecretString>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            endpoint_url: String::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_types: vec![
                "image/jpeg".to_string(),
                "image/jpg".to_string(),
                "image/png".to_string(),
                "image/gif".to_string(),
                "image/webp".to_string(),
            ],
            admin_reset_delay: DEFAULT_ADMIN_RESET_DELAY,
            analytics_token: None,
        }
    }
}

impl UploadConfig {
    /// Build a config pointed at the given endpoint, defaults elsewhere.
    pub fn for_endpoint(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            ..Self::default()
        }
    }

    /// Read configuration from `SNAPFORM_*` environment variables.
    ///
    /// `SNAPFORM_ENDPOINT_URL` is required; everything else falls back
    /// to the defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Env-shaped construction with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let endpoint_url =
            lookup("SNAPFORM_ENDPOINT_URL").ok_or_else(|| ConfigError::MissingRequired {
                key: "SNAPFORM_ENDPOINT_URL".to_string(),
                hint: "Set it to the submission endpoint URL".to_string(),
            })?;

        let mut config = Self {
            endpoint_url,
            ..Self::default()
        };

        if let Some(raw) = lookup("SNAPFORM_MAX_FILE_SIZE") {
            config.max_file_size = parse_u64("SNAPFORM_MAX_FILE_SIZE", &raw)?;
        }

        if let Some(raw) = lookup("SNAPFORM_ADMIN_RESET_MS") {
            config.admin_reset_delay = Duration::from_millis(parse_u64("SNAPFORM_ADMIN_RESET_MS", &raw)?);
        }

        if let Some(raw) = lookup("SNAPFORM_ALLOWED_TYPES") {
            config.allowed_types = raw
                .split(',')
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect();
        }

        if let Some(token) = lookup("SNAPFORM_MIXPANEL_TOKEN") {
            if !token.trim().is_empty() {
                config.analytics_token = Some(SecretString::from(token));
            }
        }

        Ok(config)
    }
}

fn parse_u64(key: &str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
        key: key.to_string(),
        message: format!("expected an integer, got {raw:?}"),
    })
}
