//! Output asset publishing.
//!
//! A completed job's output asset is exposed by creating one long-lived
//! READ access policy and one locator per configured distribution mode,
//! all bound to that single policy. Locator failures are captured per mode
//! so one mode failing does not cancel the other.

use std::sync::Arc;

use tracing::{error, info};

use vidpipe_media_client::{MediaError, MediaResult};
use vidpipe_models::{AccessPolicyPermissions, Locator, LocatorType, VideoId};

use crate::api::MediaApi;

/// Ten years, the practical "permanent" read grant for playback.
const READ_POLICY_DURATION_MINUTES: u64 = 60 * 24 * 365 * 10;

/// Result of one locator creation attempt.
#[derive(Debug)]
pub struct LocatorOutcome {
    pub mode: LocatorType,
    pub result: MediaResult<Locator>,
}

/// Aggregated publish result: one policy, one outcome per mode.
#[derive(Debug)]
pub struct PublishReport {
    pub access_policy_id: String,
    pub outcomes: Vec<LocatorOutcome>,
}

impl PublishReport {
    /// True when every configured mode got its locator.
    pub fn is_complete(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    /// Modes whose locator creation failed.
    pub fn failed_modes(&self) -> Vec<LocatorType> {
        self.outcomes
            .iter()
            .filter(|o| o.result.is_err())
            .map(|o| o.mode)
            .collect()
    }

    /// Successfully created locators.
    pub fn published(&self) -> impl Iterator<Item = &Locator> {
        self.outcomes.iter().filter_map(|o| o.result.as_ref().ok())
    }
}

/// Publishes completed output assets.
pub struct AssetPublisher {
    api: Arc<dyn MediaApi>,
    modes: Vec<LocatorType>,
}

impl AssetPublisher {
    pub fn new(api: Arc<dyn MediaApi>, modes: Vec<LocatorType>) -> Self {
        Self { api, modes }
    }

    /// Publish an output asset for every configured distribution mode.
    ///
    /// Fails outright only when the shared access policy cannot be created;
    /// individual locator failures are collected in the report.
    pub async fn publish(&self, asset_id: &str, video_id: &VideoId) -> MediaResult<PublishReport> {
        let policy_name = format!("AccessPolicy_{}", video_id);
        let policy = self
            .api
            .create_access_policy(
                &policy_name,
                READ_POLICY_DURATION_MINUTES,
                AccessPolicyPermissions::Read,
            )
            .await?;

        let mut outcomes = Vec::with_capacity(self.modes.len());
        for mode in &self.modes {
            let result = self.api.create_locator(&policy.id, asset_id, *mode).await;
            match &result {
                Ok(locator) => {
                    info!(
                        video_id = %video_id,
                        asset_id = %asset_id,
                        mode = mode.as_str(),
                        path = locator.path.as_deref().unwrap_or(""),
                        "Published locator"
                    );
                }
                Err(e) => {
                    error!(
                        video_id = %video_id,
                        asset_id = %asset_id,
                        mode = mode.as_str(),
                        "Locator creation failed: {}",
                        e
                    );
                }
            }
            outcomes.push(LocatorOutcome {
                mode: *mode,
                result,
            });
        }

        Ok(PublishReport {
            access_policy_id: policy.id,
            outcomes,
        })
    }
}
