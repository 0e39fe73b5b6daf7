//! Upload preparation.
//!
//! Sets up the remote side of a source upload: the UPLOADED asset, its
//! file entry, a transient write grant, and a time-boxed direct-upload URL
//! from blob storage. The byte transfer itself happens elsewhere; once it
//! is done, [`UploadPreparer::complete`] patches the file metadata and
//! tears the transient locator down.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{info, warn};
use url::Url;

use vidpipe_media_client::MediaError;
use vidpipe_models::{
    AccessPolicyPermissions, Asset, AssetFile, AssetRole, Locator, LocatorType, VideoId,
};

use crate::api::MediaApi;
use crate::error::WorkerResult;

/// Lifetime of the transient write grant backing an upload.
const WRITE_POLICY_DURATION_MINUTES: u64 = 120;

/// Blob storage collaborator: the single capability this controller needs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait BlobStorage: Send + Sync {
    /// Produce a time-boxed direct-upload URL for a blob within an asset's
    /// storage container.
    async fn generate_upload_url(
        &self,
        asset_id: &str,
        blob_name: &str,
        expires_in: Duration,
    ) -> WorkerResult<Url>;
}

/// Everything a caller needs to perform and then finalize an upload.
#[derive(Debug)]
pub struct PreparedUpload {
    pub asset: Asset,
    pub file: AssetFile,
    pub sas_locator: Locator,
    pub upload_url: Url,
}

pub struct UploadPreparer {
    api: Arc<dyn MediaApi>,
    blobs: Arc<dyn BlobStorage>,
}

impl UploadPreparer {
    pub fn new(api: Arc<dyn MediaApi>, blobs: Arc<dyn BlobStorage>) -> Self {
        Self { api, blobs }
    }

    /// Prepare the remote side of a source upload.
    ///
    /// Reuses an existing UPLOADED asset when one is already correlated
    /// with the video (creates are not idempotent, so the lookup comes
    /// first).
    pub async fn prepare(
        &self,
        video_id: &VideoId,
        file_name: &str,
        expires_in: Duration,
    ) -> WorkerResult<PreparedUpload> {
        let asset = match self
            .api
            .get_asset_by_video_id(AssetRole::Uploaded, video_id)
            .await
        {
            Ok(asset) => asset,
            Err(MediaError::NotFound(_)) => {
                self.api.create_asset(AssetRole::Uploaded, video_id).await?
            }
            Err(e) => return Err(e.into()),
        };

        let mime_type = mime_guess::from_path(file_name).first_or_octet_stream();
        let file = self
            .api
            .create_asset_file(&asset.id, file_name, mime_type.essence_str())
            .await?;

        let policy_name = format!("AccessPolicy_{}", file_stem(file_name));
        let policy = self
            .api
            .create_access_policy(
                &policy_name,
                WRITE_POLICY_DURATION_MINUTES,
                AccessPolicyPermissions::Write,
            )
            .await?;
        let sas_locator = self
            .api
            .create_locator(&policy.id, &asset.id, LocatorType::Sas)
            .await?;

        let upload_url = self
            .blobs
            .generate_upload_url(&asset.id, file_name, expires_in)
            .await?;

        info!(video_id = %video_id, asset_id = %asset.id, file = file_name, "Upload prepared");

        Ok(PreparedUpload {
            asset,
            file,
            sas_locator,
            upload_url,
        })
    }

    /// Finalize a completed upload: patch the file's size and mime type,
    /// drop the transient write locator.
    pub async fn complete(
        &self,
        prepared: &PreparedUpload,
        content_file_size: u64,
    ) -> WorkerResult<()> {
        let mime_type = prepared
            .file
            .mime_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        self.api
            .update_asset_file(&prepared.file.id, mime_type, content_file_size)
            .await?;

        // The write grant has served its purpose; leaving it around only
        // widens the window for unwanted writes.
        if let Err(e) = self.api.delete_locator(&prepared.sas_locator.id).await {
            warn!(locator_id = %prepared.sas_locator.id, "Failed to delete upload locator: {}", e);
        }

        Ok(())
    }
}

fn file_stem(file_name: &str) -> &str {
    file_name.split('.').next().unwrap_or(file_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    use crate::api::MockMediaApi;

    fn asset() -> Asset {
        Asset {
            id: "asset-in".to_string(),
            name: "UPLOADED::v1".to_string(),
            files: Vec::new(),
        }
    }

    fn asset_file() -> AssetFile {
        AssetFile {
            id: "file-1".to_string(),
            name: "lecture.mp4".to_string(),
            mime_type: Some("video/mp4".to_string()),
            content_file_size: None,
            parent_asset_id: "asset-in".to_string(),
        }
    }

    fn policy() -> vidpipe_models::AccessPolicy {
        vidpipe_models::AccessPolicy {
            id: "policy-w".to_string(),
            name: "AccessPolicy_lecture".to_string(),
            duration_in_minutes: WRITE_POLICY_DURATION_MINUTES as f64,
            permissions: AccessPolicyPermissions::Write.code(),
        }
    }

    fn sas_locator() -> Locator {
        Locator {
            id: "locator-w".to_string(),
            access_policy_id: "policy-w".to_string(),
            asset_id: "asset-in".to_string(),
            start_time: None,
            locator_type: LocatorType::Sas.code(),
            path: Some("http://storage.example.net/asset-in?sig=abc".to_string()),
        }
    }

    fn blob_storage() -> MockBlobStorage {
        let mut blobs = MockBlobStorage::new();
        blobs.expect_generate_upload_url().returning(|_, _, _| {
            Ok(Url::parse("http://storage.example.net/asset-in/lecture.mp4?sig=abc").unwrap())
        });
        blobs
    }

    #[tokio::test]
    async fn test_prepare_reuses_existing_asset() {
        let mut api = MockMediaApi::new();
        api.expect_get_asset_by_video_id()
            .with(eq(AssetRole::Uploaded), eq(VideoId::from("v1")))
            .times(1)
            .returning(|_, _| Ok(asset()));
        api.expect_create_asset().times(0);
        api.expect_create_asset_file()
            .with(eq("asset-in"), eq("lecture.mp4"), eq("video/mp4"))
            .times(1)
            .returning(|_, _, _| Ok(asset_file()));
        api.expect_create_access_policy()
            .with(
                eq("AccessPolicy_lecture"),
                eq(WRITE_POLICY_DURATION_MINUTES),
                eq(AccessPolicyPermissions::Write),
            )
            .times(1)
            .returning(|_, _, _| Ok(policy()));
        api.expect_create_locator()
            .with(eq("policy-w"), eq("asset-in"), eq(LocatorType::Sas))
            .times(1)
            .returning(|_, _, _| Ok(sas_locator()));

        let preparer = UploadPreparer::new(Arc::new(api), Arc::new(blob_storage()));
        let prepared = preparer
            .prepare(&VideoId::from("v1"), "lecture.mp4", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(prepared.asset.id, "asset-in");
        assert_eq!(prepared.sas_locator.id, "locator-w");
    }

    #[tokio::test]
    async fn test_prepare_creates_asset_when_absent() {
        let mut api = MockMediaApi::new();
        api.expect_get_asset_by_video_id()
            .times(1)
            .returning(|_, _| Err(MediaError::not_found("asset UPLOADED::v1")));
        api.expect_create_asset()
            .with(eq(AssetRole::Uploaded), eq(VideoId::from("v1")))
            .times(1)
            .returning(|_, _| Ok(asset()));
        api.expect_create_asset_file()
            .times(1)
            .returning(|_, _, _| Ok(asset_file()));
        api.expect_create_access_policy()
            .times(1)
            .returning(|_, _, _| Ok(policy()));
        api.expect_create_locator()
            .times(1)
            .returning(|_, _, _| Ok(sas_locator()));

        let preparer = UploadPreparer::new(Arc::new(api), Arc::new(blob_storage()));
        let prepared = preparer
            .prepare(&VideoId::from("v1"), "lecture.mp4", Duration::from_secs(3600))
            .await
            .unwrap();
        assert_eq!(prepared.upload_url.host_str(), Some("storage.example.net"));
    }

    #[tokio::test]
    async fn test_complete_patches_file_and_deletes_locator() {
        let mut api = MockMediaApi::new();
        api.expect_update_asset_file()
            .with(eq("file-1"), eq("video/mp4"), eq(1_048_576u64))
            .times(1)
            .returning(|_, _, _| Ok(()));
        api.expect_delete_locator()
            .with(eq("locator-w"))
            .times(1)
            .returning(|_| Ok(()));

        let preparer = UploadPreparer::new(Arc::new(api), Arc::new(MockBlobStorage::new()));
        let prepared = PreparedUpload {
            asset: asset(),
            file: asset_file(),
            sas_locator: sas_locator(),
            upload_url: Url::parse("http://storage.example.net/asset-in/lecture.mp4").unwrap(),
        };
        preparer.complete(&prepared, 1_048_576).await.unwrap();
    }

    #[test]
    fn test_file_stem() {
        assert_eq!(file_stem("lecture.mp4"), "lecture");
        assert_eq!(file_stem("noext"), "noext");
    }
}
