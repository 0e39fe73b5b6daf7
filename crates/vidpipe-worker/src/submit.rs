//! Encode job submission.
//!
//! Submission failures are user-visible only through the record's status,
//! never as an exception to an interactive caller: whatever happens, a
//! status update is attempted before this module returns.

use std::sync::Arc;

use tracing::{error, info};

use vidpipe_models::{AssetRole, Job, VideoId, VideoStatus};

use crate::api::MediaApi;
use crate::error::WorkerResult;
use crate::reconciler::StatusReconciler;

pub struct EncodeSubmitter {
    api: Arc<dyn MediaApi>,
    reconciler: StatusReconciler,
    processor_name: String,
}

impl EncodeSubmitter {
    pub fn new(
        api: Arc<dyn MediaApi>,
        reconciler: StatusReconciler,
        processor_name: impl Into<String>,
    ) -> Self {
        Self {
            api,
            reconciler,
            processor_name: processor_name.into(),
        }
    }

    /// Submit an encode job for an already-uploaded video.
    ///
    /// On success the record moves to `transcode_active`; on any failure it
    /// moves to `transcode_failed`. Exactly one status update per call.
    pub async fn submit(&self, video_id: &VideoId) -> WorkerResult<Job> {
        let result = self.try_submit(video_id).await;

        match &result {
            Ok(job) => {
                info!(video_id = %video_id, job_id = %job.id, "Encode job submitted");
                self.reconciler
                    .record_status(video_id, VideoStatus::TranscodeActive)
                    .await;
            }
            Err(e) => {
                error!(video_id = %video_id, "Encode job submission failed: {}", e);
                self.reconciler
                    .record_status(video_id, VideoStatus::TranscodeFailed)
                    .await;
            }
        }

        result
    }

    async fn try_submit(&self, video_id: &VideoId) -> WorkerResult<Job> {
        let input = self
            .api
            .get_asset_by_video_id(AssetRole::Uploaded, video_id)
            .await?;
        let processor = self.api.get_media_processor(&self.processor_name).await?;
        let output_name = AssetRole::Encoded.composed_name(video_id);
        let job = self
            .api
            .create_job(&input.id, &processor.id, &output_name)
            .await?;
        Ok(job)
    }
}
