//! Worker configuration.

use std::time::Duration;

use vidpipe_models::LocatorType;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Steady-state interval between job polls
    pub poll_interval: Duration,
    /// Retries per poll call before the monitor gives up on the job
    pub poll_max_retries: u32,
    /// Base delay for the poll retry backoff (doubles each attempt)
    pub poll_retry_base_delay: Duration,
    /// Distribution modes published for completed output assets
    pub publish_modes: Vec<LocatorType>,
    /// Encode-preset engine the job task references
    pub processor_name: String,
    /// Base URL of the video-record store
    pub record_store_url: String,
    /// Graceful shutdown timeout for in-flight monitors
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            poll_max_retries: 3,
            poll_retry_base_delay: Duration::from_millis(500),
            publish_modes: vec![LocatorType::OnDemandOrigin, LocatorType::Sas],
            processor_name: vidpipe_media_client::DEFAULT_MEDIA_PROCESSOR.to_string(),
            record_store_url: "http://localhost:8000".to_string(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        Self {
            poll_interval: Duration::from_secs(
                std::env::var("VIDPIPE_POLL_INTERVAL_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
            poll_max_retries: std::env::var("VIDPIPE_POLL_MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            poll_retry_base_delay: Duration::from_millis(
                std::env::var("VIDPIPE_POLL_RETRY_BASE_MS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(500),
            ),
            publish_modes: std::env::var("VIDPIPE_PUBLISH_MODES")
                .ok()
                .map(|s| parse_publish_modes(&s))
                .unwrap_or_else(|| vec![LocatorType::OnDemandOrigin, LocatorType::Sas]),
            processor_name: std::env::var("VIDPIPE_MEDIA_PROCESSOR")
                .unwrap_or_else(|_| vidpipe_media_client::DEFAULT_MEDIA_PROCESSOR.to_string()),
            record_store_url: std::env::var("VIDPIPE_RECORD_STORE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            shutdown_timeout: Duration::from_secs(
                std::env::var("VIDPIPE_SHUTDOWN_TIMEOUT_SECS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}

/// Parse a comma-separated mode list, e.g. `streaming,download`.
/// Unknown entries are skipped.
fn parse_publish_modes(value: &str) -> Vec<LocatorType> {
    value
        .split(',')
        .filter_map(|mode| match mode.trim() {
            "streaming" => Some(LocatorType::OnDemandOrigin),
            "download" => Some(LocatorType::Sas),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_publishes_both_modes() {
        let config = WorkerConfig::default();
        assert_eq!(
            config.publish_modes,
            vec![LocatorType::OnDemandOrigin, LocatorType::Sas]
        );
        assert_eq!(config.poll_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_parse_publish_modes() {
        assert_eq!(
            parse_publish_modes("streaming,download"),
            vec![LocatorType::OnDemandOrigin, LocatorType::Sas]
        );
        assert_eq!(parse_publish_modes("streaming"), vec![LocatorType::OnDemandOrigin]);
        assert_eq!(
            parse_publish_modes("download, bogus"),
            vec![LocatorType::Sas]
        );
    }
}
