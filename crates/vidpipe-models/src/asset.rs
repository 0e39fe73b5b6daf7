//! Asset and media-processor wire types.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::video::VideoId;

/// Role an asset plays for a video.
///
/// The composed name `"<ROLE>::<video-id>"` is the sole correlation key
/// between a local video and its remote asset; lookups filter on the exact
/// composed name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRole {
    /// Source asset holding the uploaded file
    Uploaded,
    /// Output asset produced by the encode job
    Encoded,
}

impl AssetRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetRole::Uploaded => "UPLOADED",
            AssetRole::Encoded => "ENCODED",
        }
    }

    /// Compose the remote asset name for a video, e.g. `UPLOADED::v1`.
    pub fn composed_name(&self, video_id: &VideoId) -> String {
        format!("{}::{}", self.as_str(), video_id)
    }
}

impl fmt::Display for AssetRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Remote container for one logical video (input or output of a job).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    /// Populated via a separate Files lookup, empty until then.
    #[serde(rename = "Files", default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<AssetFile>,
}

/// One physical file within an asset.
///
/// Size and mime type are patched (MERGE-style partial update) once the
/// physical upload completes; the service reports file size as a string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFile {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "MimeType", default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(
        rename = "ContentFileSize",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub content_file_size: Option<String>,
    #[serde(rename = "ParentAssetId")]
    pub parent_asset_id: String,
}

impl AssetFile {
    /// Parsed content size, `None` until the upload has been reported.
    pub fn content_size(&self) -> Option<u64> {
        self.content_file_size.as_deref().and_then(|s| s.parse().ok())
    }
}

/// Named encode-preset engine of the remote service, referenced by a job's task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaProcessor {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Version", default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}
