//! Job polling state machine.
//!
//! One monitor runs per submitted job. Each tick fetches the job through a
//! bounded-backoff retry wrapper, classifies its state, and either keeps
//! polling, publishes the output (once), or reports a terminal outcome to
//! the reconciler. A cancellation signal is observed at the top of every
//! iteration.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use vidpipe_models::{JobOutcome, JobStateClass, VideoId};

use crate::api::MediaApi;
use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::publisher::AssetPublisher;
use crate::reconciler::StatusReconciler;
use crate::retry::{with_retry, RetryConfig};

pub struct JobMonitor {
    api: Arc<dyn MediaApi>,
    publisher: AssetPublisher,
    reconciler: StatusReconciler,
    poll_interval: Duration,
    poll_retry: RetryConfig,
}

impl JobMonitor {
    pub fn new(
        api: Arc<dyn MediaApi>,
        publisher: AssetPublisher,
        reconciler: StatusReconciler,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            api,
            publisher,
            reconciler,
            poll_interval: config.poll_interval,
            poll_retry: RetryConfig::new("get_job")
                .with_max_retries(config.poll_max_retries)
                .with_base_delay(config.poll_retry_base_delay),
        }
    }

    /// Poll the job until a terminal state is observed or cancellation is
    /// requested.
    ///
    /// Returns the terminal outcome, [`WorkerError::Cancelled`] on external
    /// abort, or the media error that exhausted the poll retry budget.
    pub async fn run(
        &self,
        job_id: &str,
        video_id: &VideoId,
        mut cancel: watch::Receiver<bool>,
    ) -> WorkerResult<JobOutcome> {
        info!(job_id = %job_id, video_id = %video_id, "Monitoring encode job");

        let mut error_reported = false;

        loop {
            if *cancel.borrow() {
                info!(job_id = %job_id, "Monitor cancelled");
                return Err(WorkerError::Cancelled);
            }

            let job = match with_retry(&self.poll_retry, || self.api.get_job(job_id)).await {
                Ok(job) => job,
                Err(e) => {
                    error!(job_id = %job_id, "Poll retries exhausted: {}", e);
                    // The record must not stay transcode_active after the
                    // monitor dies.
                    self.reconciler
                        .record_outcome(video_id, JobOutcome::Failed)
                        .await;
                    return Err(e.into());
                }
            };

            debug!(job_id = %job_id, state = job.state, "Observed job state");

            match job.state_class() {
                JobStateClass::Active => {}
                JobStateClass::Succeeded => {
                    return Ok(self.handle_finished(job_id, video_id).await);
                }
                JobStateClass::Failed => {
                    if error_reported {
                        // Second consecutive error observation: the job is
                        // not transitioning into cancellation, stop here.
                        warn!(job_id = %job_id, "Encode job stuck in error state");
                        return Ok(JobOutcome::Failed);
                    }
                    warn!(job_id = %job_id, "Encode job reported an error");
                    error_reported = true;
                    self.reconciler
                        .record_outcome(video_id, JobOutcome::Failed)
                        .await;
                    // Keep polling one more tick to distinguish a
                    // cancellation in progress from a plain failure.
                }
                JobStateClass::Cancelled => {
                    match self.api.get_output_asset(job_id).await {
                        Ok(asset) => {
                            info!(job_id = %job_id, asset_id = %asset.id, "Encode job cancelled")
                        }
                        Err(e) => debug!(job_id = %job_id, "No output asset for cancelled job: {}", e),
                    }
                    self.reconciler
                        .record_outcome(video_id, JobOutcome::Cancelled)
                        .await;
                    return Ok(JobOutcome::Cancelled);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.poll_interval) => {}
                changed = cancel.changed() => {
                    if changed.is_err() || *cancel.borrow() {
                        info!(job_id = %job_id, "Monitor cancelled");
                        return Err(WorkerError::Cancelled);
                    }
                }
            }
        }
    }

    /// Handle the one observed FINISHED state: fetch the output asset once,
    /// publish, reconcile. Never re-entered for the same job.
    async fn handle_finished(&self, job_id: &str, video_id: &VideoId) -> JobOutcome {
        let outcome = match self.publish_output(job_id, video_id).await {
            Ok(report) if report.is_complete() => JobOutcome::Ready,
            Ok(report) => {
                warn!(
                    job_id = %job_id,
                    failed_modes = ?report.failed_modes(),
                    "Output published partially"
                );
                JobOutcome::Failed
            }
            Err(e) => {
                error!(job_id = %job_id, "Publishing output failed: {}", e);
                JobOutcome::Failed
            }
        };

        self.reconciler.record_outcome(video_id, outcome).await;
        outcome
    }

    async fn publish_output(
        &self,
        job_id: &str,
        video_id: &VideoId,
    ) -> WorkerResult<crate::publisher::PublishReport> {
        let output = self.api.get_output_asset(job_id).await?;
        info!(job_id = %job_id, asset_id = %output.id, "Encode job finished, publishing output");
        Ok(self.publisher.publish(&output.id, video_id).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    use vidpipe_media_client::MediaError;
    use vidpipe_models::{
        AccessPolicy, AccessPolicyPermissions, Asset, Job, LocatorType, VideoStatus,
    };

    use crate::api::MockMediaApi;
    use crate::reconciler::MockVideoRecordStore;

    fn job(state: i32) -> Job {
        Job {
            id: "job-1".to_string(),
            name: "JobAssets-asset-1".to_string(),
            state,
        }
    }

    fn output_asset() -> Asset {
        Asset {
            id: "asset-out".to_string(),
            name: "ENCODED::v1".to_string(),
            files: Vec::new(),
        }
    }

    fn policy() -> AccessPolicy {
        AccessPolicy {
            id: "policy-1".to_string(),
            name: "AccessPolicy_v1".to_string(),
            duration_in_minutes: 1.0,
            permissions: AccessPolicyPermissions::Read.code(),
        }
    }

    fn locator(mode: LocatorType) -> vidpipe_models::Locator {
        vidpipe_models::Locator {
            id: "locator-1".to_string(),
            access_policy_id: "policy-1".to_string(),
            asset_id: "asset-out".to_string(),
            start_time: None,
            locator_type: mode.code(),
            path: None,
        }
    }

    fn test_config() -> WorkerConfig {
        WorkerConfig {
            poll_interval: Duration::from_millis(1),
            poll_max_retries: 2,
            poll_retry_base_delay: Duration::from_millis(1),
            ..WorkerConfig::default()
        }
    }

    fn monitor_with(
        api: MockMediaApi,
        store: MockVideoRecordStore,
        modes: Vec<LocatorType>,
    ) -> JobMonitor {
        let api = Arc::new(api);
        let store = Arc::new(store);
        JobMonitor::new(
            api.clone(),
            AssetPublisher::new(api, modes),
            StatusReconciler::new(store),
            &test_config(),
        )
    }

    fn cancel_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test]
    async fn test_active_states_poll_without_publishing() {
        // Queued, scheduled, processing: one poll each, no publisher or
        // reconciler activity until the cancel terminal arrives.
        for active_code in [0, 1, 2] {
            let mut api = MockMediaApi::new();
            let mut seq = mockall::Sequence::new();
            api.expect_get_job()
                .with(eq("job-1"))
                .times(1)
                .in_sequence(&mut seq)
                .returning(move |_| Ok(job(active_code)));
            api.expect_get_job()
                .with(eq("job-1"))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_| Ok(job(5)));
            api.expect_get_output_asset()
                .returning(|_| Err(MediaError::not_found("output")));
            api.expect_create_access_policy().times(0);
            api.expect_create_locator().times(0);

            let mut store = MockVideoRecordStore::new();
            store
                .expect_update_status()
                .with(eq(VideoId::from("v1")), eq(VideoStatus::TranscodeCancelled))
                .times(1)
                .returning(|_, _| Ok(()));

            let monitor = monitor_with(api, store, vec![LocatorType::OnDemandOrigin]);
            let (_tx, rx) = cancel_channel();
            let outcome = monitor
                .run("job-1", &VideoId::from("v1"), rx)
                .await
                .unwrap();
            assert_eq!(outcome, JobOutcome::Cancelled);
        }
    }

    #[tokio::test]
    async fn test_finished_publishes_once_and_stops() {
        let mut api = MockMediaApi::new();
        api.expect_get_job()
            .with(eq("job-1"))
            .times(1)
            .returning(|_| Ok(job(3)));
        api.expect_get_output_asset()
            .with(eq("job-1"))
            .times(1)
            .returning(|_| Ok(output_asset()));
        api.expect_create_access_policy()
            .times(1)
            .returning(|_, _, _| Ok(policy()));
        api.expect_create_locator()
            .with(eq("policy-1"), eq("asset-out"), eq(LocatorType::OnDemandOrigin))
            .times(1)
            .returning(|_, _, _| Ok(locator(LocatorType::OnDemandOrigin)));
        api.expect_create_locator()
            .with(eq("policy-1"), eq("asset-out"), eq(LocatorType::Sas))
            .times(1)
            .returning(|_, _, _| Ok(locator(LocatorType::Sas)));

        let mut store = MockVideoRecordStore::new();
        store
            .expect_update_status()
            .with(eq(VideoId::from("v1")), eq(VideoStatus::FileComplete))
            .times(1)
            .returning(|_, _| Ok(()));

        let monitor = monitor_with(
            api,
            store,
            vec![LocatorType::OnDemandOrigin, LocatorType::Sas],
        );
        let (_tx, rx) = cancel_channel();
        let outcome = monitor
            .run("job-1", &VideoId::from("v1"), rx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Ready);
    }

    #[tokio::test]
    async fn test_error_reconciles_failed_and_polls_once_more() {
        let mut api = MockMediaApi::new();
        api.expect_get_job()
            .with(eq("job-1"))
            .times(2)
            .returning(|_| Ok(job(4)));
        api.expect_create_access_policy().times(0);
        api.expect_get_output_asset().times(0);

        let mut store = MockVideoRecordStore::new();
        store
            .expect_update_status()
            .with(eq(VideoId::from("v1")), eq(VideoStatus::TranscodeFailed))
            .times(1)
            .returning(|_, _| Ok(()));

        let monitor = monitor_with(api, store, vec![LocatorType::OnDemandOrigin]);
        let (_tx, rx) = cancel_channel();
        let outcome = monitor
            .run("job-1", &VideoId::from("v1"), rx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Failed);
    }

    #[tokio::test]
    async fn test_error_followed_by_cancellation() {
        let mut api = MockMediaApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_get_job()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(job(4)));
        api.expect_get_job()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(job(6)));
        api.expect_get_output_asset()
            .returning(|_| Err(MediaError::not_found("output")));

        let mut store = MockVideoRecordStore::new();
        let mut store_seq = mockall::Sequence::new();
        store
            .expect_update_status()
            .with(eq(VideoId::from("v1")), eq(VideoStatus::TranscodeFailed))
            .times(1)
            .in_sequence(&mut store_seq)
            .returning(|_, _| Ok(()));
        store
            .expect_update_status()
            .with(eq(VideoId::from("v1")), eq(VideoStatus::TranscodeCancelled))
            .times(1)
            .in_sequence(&mut store_seq)
            .returning(|_, _| Ok(()));

        let monitor = monitor_with(api, store, vec![LocatorType::OnDemandOrigin]);
        let (_tx, rx) = cancel_channel();
        let outcome = monitor
            .run("job-1", &VideoId::from("v1"), rx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_unknown_code_above_finished_cancels_without_publishing() {
        let mut api = MockMediaApi::new();
        api.expect_get_job().times(1).returning(|_| Ok(job(7)));
        api.expect_get_output_asset()
            .returning(|_| Err(MediaError::not_found("output")));
        api.expect_create_access_policy().times(0);
        api.expect_create_locator().times(0);

        let mut store = MockVideoRecordStore::new();
        store
            .expect_update_status()
            .with(eq(VideoId::from("v1")), eq(VideoStatus::TranscodeCancelled))
            .times(1)
            .returning(|_, _| Ok(()));

        let monitor = monitor_with(api, store, vec![LocatorType::OnDemandOrigin]);
        let (_tx, rx) = cancel_channel();
        let outcome = monitor
            .run("job-1", &VideoId::from("v1"), rx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_partial_publish_reconciles_failed() {
        let mut api = MockMediaApi::new();
        api.expect_get_job().times(1).returning(|_| Ok(job(3)));
        api.expect_get_output_asset()
            .times(1)
            .returning(|_| Ok(output_asset()));
        api.expect_create_access_policy()
            .times(1)
            .returning(|_, _, _| Ok(policy()));
        api.expect_create_locator()
            .with(eq("policy-1"), eq("asset-out"), eq(LocatorType::OnDemandOrigin))
            .times(1)
            .returning(|_, _, _| Ok(locator(LocatorType::OnDemandOrigin)));
        api.expect_create_locator()
            .with(eq("policy-1"), eq("asset-out"), eq(LocatorType::Sas))
            .times(1)
            .returning(|_, _, _| Err(MediaError::remote(500, "boom")));

        let mut store = MockVideoRecordStore::new();
        store
            .expect_update_status()
            .with(eq(VideoId::from("v1")), eq(VideoStatus::TranscodeFailed))
            .times(1)
            .returning(|_, _| Ok(()));

        let monitor = monitor_with(
            api,
            store,
            vec![LocatorType::OnDemandOrigin, LocatorType::Sas],
        );
        let (_tx, rx) = cancel_channel();
        let outcome = monitor
            .run("job-1", &VideoId::from("v1"), rx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Failed);
    }

    #[tokio::test]
    async fn test_transient_poll_failures_are_retried() {
        let mut api = MockMediaApi::new();
        let mut seq = mockall::Sequence::new();
        api.expect_get_job()
            .times(2)
            .in_sequence(&mut seq)
            .returning(|_| Err(MediaError::remote(503, "unavailable")));
        api.expect_get_job()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(job(5)));
        api.expect_get_output_asset()
            .returning(|_| Err(MediaError::not_found("output")));

        let mut store = MockVideoRecordStore::new();
        store
            .expect_update_status()
            .with(eq(VideoId::from("v1")), eq(VideoStatus::TranscodeCancelled))
            .times(1)
            .returning(|_, _| Ok(()));

        let monitor = monitor_with(api, store, vec![LocatorType::OnDemandOrigin]);
        let (_tx, rx) = cancel_channel();
        let outcome = monitor
            .run("job-1", &VideoId::from("v1"), rx)
            .await
            .unwrap();
        assert_eq!(outcome, JobOutcome::Cancelled);
    }

    #[tokio::test]
    async fn test_poll_retry_exhaustion_reconciles_failed() {
        let mut api = MockMediaApi::new();
        // Initial attempt plus two retries, then the monitor gives up
        api.expect_get_job()
            .times(3)
            .returning(|_| Err(MediaError::remote(500, "down")));

        let mut store = MockVideoRecordStore::new();
        store
            .expect_update_status()
            .with(eq(VideoId::from("v1")), eq(VideoStatus::TranscodeFailed))
            .times(1)
            .returning(|_, _| Ok(()));

        let monitor = monitor_with(api, store, vec![LocatorType::OnDemandOrigin]);
        let (_tx, rx) = cancel_channel();
        let err = monitor
            .run("job-1", &VideoId::from("v1"), rx)
            .await
            .unwrap_err();
        assert!(matches!(err, WorkerError::Media(_)));
    }

    #[tokio::test]
    async fn test_cancellation_signal_stops_monitor() {
        let mut api = MockMediaApi::new();
        api.expect_get_job().returning(|_| Ok(job(2)));

        let store = MockVideoRecordStore::new();

        let monitor = Arc::new(monitor_with(api, store, vec![LocatorType::OnDemandOrigin]));
        let (tx, rx) = cancel_channel();

        let task = {
            let monitor = monitor.clone();
            tokio::spawn(async move { monitor.run("job-1", &VideoId::from("v1"), rx).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        tx.send(true).unwrap();

        let result = task.await.unwrap();
        assert!(matches!(result, Err(WorkerError::Cancelled)));
    }
}
