//! Media service configuration.

use std::time::Duration;

use crate::error::{MediaError, MediaResult};

/// Credentials and endpoints for one media service account.
///
/// An organizational scope may have no profile configured at all; in that
/// case [`MediaConfig::from_env`] fails with a configuration error and the
/// caller treats it as "cannot proceed" rather than crashing mid-flow.
#[derive(Debug, Clone)]
pub struct MediaConfig {
    /// REST API endpoint of the media service account, with trailing slash
    /// (e.g. `https://account.restv2.example.net/api/`)
    pub rest_api_endpoint: String,
    /// Client ID of the directory application
    pub client_id: String,
    /// Client secret of the directory application
    pub client_secret: String,
    /// Directory tenant the application resides in
    pub tenant: String,
    /// Blob storage account name
    pub storage_account_name: String,
    /// Blob storage account key
    pub storage_key: String,
    /// Per-request timeout; a stalled call must not silently extend the
    /// poll interval
    pub request_timeout: Duration,
}

impl MediaConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> MediaResult<Self> {
        let config = Self {
            rest_api_endpoint: require_env("MEDIA_REST_API_ENDPOINT")?,
            client_id: require_env("MEDIA_CLIENT_ID")?,
            client_secret: require_env("MEDIA_CLIENT_SECRET")?,
            tenant: require_env("MEDIA_TENANT")?,
            storage_account_name: require_env("MEDIA_STORAGE_ACCOUNT_NAME")?,
            storage_key: require_env("MEDIA_STORAGE_KEY")?,
            request_timeout: Duration::from_secs(
                std::env::var("MEDIA_REQUEST_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(5),
            ),
        };
        Ok(config)
    }
}

fn require_env(name: &str) -> MediaResult<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(MediaError::config(format!(
            "required environment variable {} is not set",
            name
        ))),
    }
}
