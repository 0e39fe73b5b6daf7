//! Monitor registry.
//!
//! One supervised task per submitted job, keyed by job ID. Monitors share
//! no mutable state with each other; the registry only tracks handles so
//! operators can abort a monitor and shutdown can drain them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use vidpipe_models::{JobOutcome, VideoId};

use crate::error::WorkerResult;
use crate::monitor::JobMonitor;

struct MonitorHandle {
    cancel: watch::Sender<bool>,
    task: JoinHandle<WorkerResult<JobOutcome>>,
}

/// Registry of running job monitors.
pub struct MonitorRegistry {
    monitors: Mutex<HashMap<String, MonitorHandle>>,
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self {
            monitors: Mutex::new(HashMap::new()),
        }
    }

    /// Spawn a monitoring task for a job.
    ///
    /// At-most-one active job per submission is the caller's
    /// responsibility; a second spawn for the same job ID replaces the
    /// handle but does not stop the first task.
    pub async fn spawn(&self, monitor: Arc<JobMonitor>, job_id: &str, video_id: &VideoId) {
        let (cancel_tx, cancel_rx) = watch::channel(false);

        let task = {
            let job_id = job_id.to_string();
            let video_id = video_id.clone();
            tokio::spawn(async move { monitor.run(&job_id, &video_id, cancel_rx).await })
        };

        let mut monitors = self.monitors.lock().await;
        if monitors
            .insert(
                job_id.to_string(),
                MonitorHandle {
                    cancel: cancel_tx,
                    task,
                },
            )
            .is_some()
        {
            warn!(job_id = %job_id, "Replaced existing monitor handle");
        }
    }

    /// Request cancellation of a job's monitor. Returns false when no
    /// monitor is registered for the job.
    pub async fn abort(&self, job_id: &str) -> bool {
        let monitors = self.monitors.lock().await;
        match monitors.get(job_id) {
            Some(handle) => handle.cancel.send(true).is_ok(),
            None => false,
        }
    }

    /// Wait for a job's monitor to finish and remove it from the registry.
    pub async fn join(&self, job_id: &str) -> Option<WorkerResult<JobOutcome>> {
        let handle = {
            let mut monitors = self.monitors.lock().await;
            monitors.remove(job_id)?
        };
        match handle.task.await {
            Ok(result) => Some(result),
            Err(e) => {
                warn!(job_id = %job_id, "Monitor task panicked: {}", e);
                None
            }
        }
    }

    /// Job IDs with a registered monitor.
    pub async fn active_jobs(&self) -> Vec<String> {
        self.monitors.lock().await.keys().cloned().collect()
    }

    /// Cancel all monitors and wait up to `timeout` for them to stop.
    pub async fn shutdown(&self, timeout: Duration) {
        let handles: Vec<(String, MonitorHandle)> = {
            let mut monitors = self.monitors.lock().await;
            monitors.drain().collect()
        };

        for (_, handle) in &handles {
            let _ = handle.cancel.send(true);
        }

        let drain = async {
            for (job_id, handle) in handles {
                match handle.task.await {
                    Ok(_) => info!(job_id = %job_id, "Monitor stopped"),
                    Err(e) => warn!(job_id = %job_id, "Monitor task panicked: {}", e),
                }
            }
        };

        if tokio::time::timeout(timeout, drain).await.is_err() {
            warn!("Timed out waiting for monitors to stop");
        }
    }
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
