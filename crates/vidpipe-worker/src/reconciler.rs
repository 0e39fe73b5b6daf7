//! Video record status reconciliation.
//!
//! The video record lives in a separate subsystem; this module only calls
//! its status-update operation. Updates are best-effort: a failed update is
//! logged and surfaced as an error to callers that care, but never retried
//! indefinitely.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, info};

use vidpipe_models::{JobOutcome, VideoId, VideoStatus};

use crate::error::{WorkerError, WorkerResult};

/// External video-record store contract.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait VideoRecordStore: Send + Sync {
    /// Set the record's status field. A single atomic field write.
    async fn update_status(&self, video_id: &VideoId, status: VideoStatus) -> WorkerResult<()>;
}

/// HTTP implementation of the record store contract.
pub struct HttpVideoRecordStore {
    http: reqwest::Client,
    base_url: String,
}

impl HttpVideoRecordStore {
    pub fn new(base_url: impl Into<String>) -> WorkerResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| WorkerError::config(format!("record store client: {}", e)))?;

        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl VideoRecordStore for HttpVideoRecordStore {
    async fn update_status(&self, video_id: &VideoId, status: VideoStatus) -> WorkerResult<()> {
        let url = format!("{}/videos/{}/status", self.base_url, video_id);
        let response = self
            .http
            .post(&url)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .map_err(|e| WorkerError::reconciliation(format!("{}: {}", video_id, e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(WorkerError::reconciliation(format!(
                "record store returned {} for {}",
                response.status(),
                video_id
            )))
        }
    }
}

/// Maps controller-observed events onto the record's status vocabulary and
/// pushes them to the store.
#[derive(Clone)]
pub struct StatusReconciler {
    store: Arc<dyn VideoRecordStore>,
}

impl StatusReconciler {
    pub fn new(store: Arc<dyn VideoRecordStore>) -> Self {
        Self { store }
    }

    /// Status a terminal job outcome maps to.
    pub fn status_for_outcome(outcome: JobOutcome) -> VideoStatus {
        match outcome {
            JobOutcome::Ready => VideoStatus::FileComplete,
            JobOutcome::Failed => VideoStatus::TranscodeFailed,
            JobOutcome::Cancelled => VideoStatus::TranscodeCancelled,
        }
    }

    /// Record a terminal outcome for a video. Best-effort.
    pub async fn record_outcome(&self, video_id: &VideoId, outcome: JobOutcome) {
        self.record_status(video_id, Self::status_for_outcome(outcome))
            .await;
    }

    /// Push a status update, logging instead of propagating failures.
    pub async fn record_status(&self, video_id: &VideoId, status: VideoStatus) {
        match self.store.update_status(video_id, status).await {
            Ok(()) => {
                info!(video_id = %video_id, status = %status, "Updated video record");
            }
            Err(e) => {
                error!(video_id = %video_id, status = %status, "Video record update failed: {}", e);
            }
        }
    }
}
