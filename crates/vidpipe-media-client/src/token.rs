//! Bearer token acquisition and caching.
//!
//! Token acquisition is behind a trait so request building stays decoupled
//! from the credential mechanics. The cache adds:
//! - Refresh margin to avoid token expiry during requests
//! - Single-flight pattern to prevent thundering herd on refresh
//! - Graceful fallback to an existing valid token on refresh failure

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};

/// Refresh margin: refresh the token 60 seconds before expiry.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Conservative TTL when the issuer reports no expiry (50 minutes).
const TOKEN_DEFAULT_TTL: Duration = Duration::from_secs(50 * 60);

/// Resource identifier the media service expects tokens to be issued for.
pub const MEDIA_RESOURCE: &str = "https://rest.media.azure.net";

/// Default authority issuing client-credential tokens.
const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com";

/// A bearer token with its lifetime.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token_type: String,
    pub access_token: String,
    /// Remaining lifetime as reported by the issuer, if any
    pub expires_in: Option<Duration>,
}

impl AccessToken {
    /// Authorization header value, e.g. `Bearer eyJ…`.
    pub fn header_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Supplier of fresh bearer tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn fetch_token(&self) -> MediaResult<AccessToken>;
}

/// Wire shape of the client-credentials token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    token_type: String,
    access_token: String,
    #[serde(default)]
    expires_in: Option<String>,
}

/// OAuth2 client-credentials grant against the tenant's token endpoint.
pub struct ClientCredentialsProvider {
    http: reqwest::Client,
    token_url: String,
    client_id: String,
    client_secret: String,
}

impl ClientCredentialsProvider {
    pub fn new(config: &MediaConfig) -> MediaResult<Self> {
        Self::with_authority(config, DEFAULT_AUTHORITY)
    }

    /// Use a non-default authority endpoint (tests point this at a mock).
    pub fn with_authority(config: &MediaConfig, authority: &str) -> MediaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(MediaError::Network)?;

        Ok(Self {
            http,
            token_url: format!("{}/{}/oauth2/token", authority, config.tenant),
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
        })
    }
}

#[async_trait]
impl TokenProvider for ClientCredentialsProvider {
    async fn fetch_token(&self) -> MediaResult<AccessToken> {
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("resource", MEDIA_RESOURCE),
        ];

        let response = self.http.post(&self.token_url).form(&params).send().await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(MediaError::Auth(format!(
                "token endpoint returned {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response.json().await?;
        Ok(AccessToken {
            token_type: token.token_type,
            access_token: token.access_token,
            expires_in: token
                .expires_in
                .and_then(|s| s.parse().ok())
                .map(Duration::from_secs),
        })
    }
}

/// Fixed token provider for environments where a token is supplied
/// out of band (and for tests).
pub struct StaticTokenProvider {
    token: AccessToken,
}

impl StaticTokenProvider {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            token: AccessToken {
                token_type: "Bearer".to_string(),
                access_token: access_token.into(),
                expires_in: None,
            },
        }
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn fetch_token(&self) -> MediaResult<AccessToken> {
        Ok(self.token.clone())
    }
}

/// Cached token with expiration tracking.
struct CachedToken {
    header_value: String,
    expires_at: Instant,
}

impl CachedToken {
    /// Check if the token is still valid with refresh margin.
    fn is_valid(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN < self.expires_at
    }

    /// Check if the token is technically still usable (even if refresh is due).
    fn is_usable(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

/// Thread-safe token cache with single-flight refresh.
pub struct TokenCache {
    provider: Arc<dyn TokenProvider>,
    cache: RwLock<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(provider: Arc<dyn TokenProvider>) -> Self {
        Self {
            provider,
            cache: RwLock::new(None),
        }
    }

    /// Invalidate the cached token.
    pub async fn invalidate(&self) {
        let mut cache = self.cache.write().await;
        *cache = None;
    }

    /// Get a valid authorization header value, refreshing if necessary.
    pub async fn authorization(&self) -> MediaResult<String> {
        // Fast path: check read lock first
        {
            let cache = self.cache.read().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_valid() {
                    return Ok(cached.header_value.clone());
                }
            }
        }

        // Slow path: acquire write lock and refresh
        let mut cache = self.cache.write().await;

        // Double-check: another task may have refreshed while we waited
        if let Some(cached) = cache.as_ref() {
            if cached.is_valid() {
                return Ok(cached.header_value.clone());
            }
        }

        match self.provider.fetch_token().await {
            Ok(token) => {
                let ttl = token.expires_in.unwrap_or(TOKEN_DEFAULT_TTL);
                let header_value = token.header_value();
                *cache = Some(CachedToken {
                    header_value: header_value.clone(),
                    expires_at: Instant::now() + ttl,
                });
                debug!("Refreshed media service token, valid for {:?}", ttl);
                Ok(header_value)
            }
            Err(e) => {
                // On refresh failure, fall back to an existing usable token
                if let Some(cached) = cache.as_ref() {
                    if cached.is_usable() {
                        warn!("Token refresh failed, using existing token: {}", e);
                        return Ok(cached.header_value.clone());
                    }
                }
                Err(e)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    struct CountingProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TokenProvider for CountingProvider {
        async fn fetch_token(&self) -> MediaResult<AccessToken> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(AccessToken {
                token_type: "Bearer".to_string(),
                access_token: "tok".to_string(),
                expires_in: Some(Duration::from_secs(3600)),
            })
        }
    }

    #[tokio::test]
    async fn test_token_cached_across_calls() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
        });
        let cache = TokenCache::new(provider.clone());

        assert_eq!(cache.authorization().await.unwrap(), "Bearer tok");
        assert_eq!(cache.authorization().await.unwrap(), "Bearer tok");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    /// Returns one short-lived token, then fails every refresh.
    struct FailingAfterFirstProvider {
        calls: AtomicU32,
    }

    #[async_trait]
    impl TokenProvider for FailingAfterFirstProvider {
        async fn fetch_token(&self) -> MediaResult<AccessToken> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(AccessToken {
                    token_type: "Bearer".to_string(),
                    access_token: "stale".to_string(),
                    // Inside the refresh margin, so the next call refreshes
                    expires_in: Some(TOKEN_REFRESH_MARGIN),
                })
            } else {
                Err(MediaError::Auth("issuer down".to_string()))
            }
        }
    }

    #[tokio::test]
    async fn test_refresh_failure_falls_back_to_usable_token() {
        let provider = Arc::new(FailingAfterFirstProvider {
            calls: AtomicU32::new(0),
        });
        let cache = TokenCache::new(provider.clone());

        assert_eq!(cache.authorization().await.unwrap(), "Bearer stale");
        // The cached token is due for refresh but still usable; a failed
        // refresh must hand it out rather than error
        assert_eq!(cache.authorization().await.unwrap(), "Bearer stale");
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_refresh_failure_without_usable_token_errors() {
        let provider = Arc::new(FailingAfterFirstProvider {
            calls: AtomicU32::new(1),
        });
        let cache = TokenCache::new(provider);

        let err = cache.authorization().await.unwrap_err();
        assert!(matches!(err, MediaError::Auth(_)));
    }

    #[tokio::test]
    async fn test_invalidate_forces_refresh() {
        let provider = Arc::new(CountingProvider {
            calls: AtomicU32::new(0),
        });
        let cache = TokenCache::new(provider.clone());

        cache.authorization().await.unwrap();
        cache.invalidate().await;
        cache.authorization().await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_header_value() {
        let token = AccessToken {
            token_type: "Bearer".to_string(),
            access_token: "abc".to_string(),
            expires_in: None,
        };
        assert_eq!(token.header_value(), "Bearer abc");
    }
}
