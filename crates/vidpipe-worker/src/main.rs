//! Encode-job controller binary.
//!
//! Drives one video through the encode lifecycle: submit (or resume) the
//! job, monitor it to a terminal state, publish the output, and keep the
//! video record's status current throughout.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vidpipe_media_client::{MediaConfig, MediaServiceClient};
use vidpipe_models::{VideoId, VideoStatus};
use vidpipe_worker::{
    AssetPublisher, EncodeSubmitter, HttpVideoRecordStore, JobMonitor, MediaApi, MonitorRegistry,
    StatusReconciler, WorkerConfig,
};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing with colored output for dev, JSON for production
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = EnvFilter::from_default_env()
        .add_directive("vidpipe=info".parse().unwrap())
        .add_directive("hyper=warn".parse().unwrap());

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }

    info!("Starting vidpipe-worker");

    let config = WorkerConfig::from_env();
    info!("Worker config: {:?}", config);

    let video_id = match std::env::var("VIDPIPE_VIDEO_ID") {
        Ok(v) if !v.is_empty() => VideoId::from(v),
        _ => {
            error!("VIDPIPE_VIDEO_ID must be set");
            std::process::exit(1);
        }
    };

    let store = match HttpVideoRecordStore::new(config.record_store_url.clone()) {
        Ok(s) => s,
        Err(e) => {
            error!("Failed to create record store client: {}", e);
            std::process::exit(1);
        }
    };
    let reconciler = StatusReconciler::new(Arc::new(store));

    // A video whose media-service connection cannot even be configured
    // never made it past upload.
    let client = match MediaConfig::from_env().and_then(MediaServiceClient::from_config) {
        Ok(c) => c,
        Err(e) => {
            error!("Media service configuration failed: {}", e);
            reconciler
                .record_status(&video_id, VideoStatus::UploadFailed)
                .await;
            std::process::exit(1);
        }
    };
    let api: Arc<dyn MediaApi> = Arc::new(client);

    // Resume an existing job when its ID is provided, otherwise submit.
    let job_id = match std::env::var("VIDPIPE_JOB_ID") {
        Ok(id) if !id.is_empty() => {
            info!(job_id = %id, "Resuming existing encode job");
            id
        }
        _ => {
            let submitter = EncodeSubmitter::new(
                api.clone(),
                reconciler.clone(),
                config.processor_name.clone(),
            );
            match submitter.submit(&video_id).await {
                Ok(job) => job.id,
                Err(e) => {
                    error!("Encode job submission failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
    };

    let monitor = Arc::new(JobMonitor::new(
        api.clone(),
        AssetPublisher::new(api, config.publish_modes.clone()),
        reconciler,
        &config,
    ));

    let registry = MonitorRegistry::new();
    registry.spawn(monitor, &job_id, &video_id).await;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Received shutdown signal");
            registry.shutdown(config.shutdown_timeout).await;
            std::process::exit(130);
        }
        result = registry.join(&job_id) => {
            match result {
                Some(Ok(outcome)) => {
                    info!(job_id = %job_id, outcome = ?outcome, "Encode job finished");
                }
                Some(Err(e)) => {
                    error!(job_id = %job_id, "Monitor failed: {}", e);
                    std::process::exit(1);
                }
                None => {
                    error!(job_id = %job_id, "Monitor task was lost");
                    std::process::exit(1);
                }
            }
        }
    }

    info!("Worker shutdown complete");
}
