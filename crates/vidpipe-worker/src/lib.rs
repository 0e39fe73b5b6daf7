//! Encode-job lifecycle controller.
//!
//! Submits transcode jobs against the remote media service, monitors each
//! job with its own supervised task until a terminal state, publishes
//! completed output assets (access policy + locators, at most once per
//! job), and keeps the external video record's status in step with remote
//! job state.

pub mod api;
pub mod config;
pub mod error;
pub mod monitor;
pub mod publisher;
pub mod reconciler;
pub mod registry;
pub mod retry;
pub mod submit;
pub mod upload;

pub use api::MediaApi;
pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use monitor::JobMonitor;
pub use publisher::{AssetPublisher, LocatorOutcome, PublishReport};
pub use reconciler::{HttpVideoRecordStore, StatusReconciler, VideoRecordStore};
pub use registry::MonitorRegistry;
pub use submit::EncodeSubmitter;
pub use upload::{BlobStorage, PreparedUpload, UploadPreparer};
