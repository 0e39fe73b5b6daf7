//! Video identifiers and external record status vocabulary.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a video in the external record store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(pub String);

impl VideoId {
    /// Generate a new random video ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for VideoId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for VideoId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for VideoId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status vocabulary of the external video record.
///
/// The controller only ever writes these values; the record itself is owned
/// by a separate subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoStatus {
    /// Source upload finished, encode job not yet submitted
    UploadCompleted,
    /// Config/credentials unusable before any remote call was made
    UploadFailed,
    /// Encode job submitted, monitor running
    TranscodeActive,
    /// Job submission or transcoding failed
    TranscodeFailed,
    /// Job reached a cancelled-class terminal state
    TranscodeCancelled,
    /// Transcoding finished and output was published
    FileComplete,
}

impl VideoStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VideoStatus::UploadCompleted => "upload_completed",
            VideoStatus::UploadFailed => "upload_failed",
            VideoStatus::TranscodeActive => "transcode_active",
            VideoStatus::TranscodeFailed => "transcode_failed",
            VideoStatus::TranscodeCancelled => "transcode_cancelled",
            VideoStatus::FileComplete => "file_complete",
        }
    }

    /// Terminal statuses get no further updates from the controller.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            VideoStatus::UploadFailed
                | VideoStatus::TranscodeFailed
                | VideoStatus::TranscodeCancelled
                | VideoStatus::FileComplete
        )
    }
}

impl fmt::Display for VideoStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
