//! Media service operations the controller depends on.
//!
//! Trait seam over [`MediaServiceClient`] so the monitor, publisher, and
//! submitter can be driven by a mock in tests.

use async_trait::async_trait;

use vidpipe_media_client::{MediaResult, MediaServiceClient};
use vidpipe_models::{
    AccessPolicy, AccessPolicyPermissions, Asset, AssetFile, AssetRole, Job, Locator, LocatorType,
    MediaProcessor, VideoId,
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MediaApi: Send + Sync {
    async fn create_asset(&self, role: AssetRole, video_id: &VideoId) -> MediaResult<Asset>;

    async fn get_asset_by_video_id(
        &self,
        role: AssetRole,
        video_id: &VideoId,
    ) -> MediaResult<Asset>;

    async fn create_asset_file(
        &self,
        asset_id: &str,
        file_name: &str,
        mime_type: &str,
    ) -> MediaResult<AssetFile>;

    async fn update_asset_file(
        &self,
        file_id: &str,
        mime_type: &str,
        content_file_size: u64,
    ) -> MediaResult<()>;

    async fn create_access_policy(
        &self,
        name: &str,
        duration_in_minutes: u64,
        permissions: AccessPolicyPermissions,
    ) -> MediaResult<AccessPolicy>;

    async fn create_locator(
        &self,
        access_policy_id: &str,
        asset_id: &str,
        locator_type: LocatorType,
    ) -> MediaResult<Locator>;

    async fn delete_locator(&self, locator_id: &str) -> MediaResult<()>;

    async fn get_media_processor(&self, name: &str) -> MediaResult<MediaProcessor>;

    async fn create_job(
        &self,
        input_asset_id: &str,
        media_processor_id: &str,
        output_asset_name: &str,
    ) -> MediaResult<Job>;

    async fn get_job(&self, job_id: &str) -> MediaResult<Job>;

    async fn get_output_asset(&self, job_id: &str) -> MediaResult<Asset>;
}

#[async_trait]
impl MediaApi for MediaServiceClient {
    async fn create_asset(&self, role: AssetRole, video_id: &VideoId) -> MediaResult<Asset> {
        MediaServiceClient::create_asset(self, role, video_id).await
    }

    async fn get_asset_by_video_id(
        &self,
        role: AssetRole,
        video_id: &VideoId,
    ) -> MediaResult<Asset> {
        MediaServiceClient::get_asset_by_video_id(self, role, video_id).await
    }

    async fn create_asset_file(
        &self,
        asset_id: &str,
        file_name: &str,
        mime_type: &str,
    ) -> MediaResult<AssetFile> {
        MediaServiceClient::create_asset_file(self, asset_id, file_name, mime_type).await
    }

    async fn update_asset_file(
        &self,
        file_id: &str,
        mime_type: &str,
        content_file_size: u64,
    ) -> MediaResult<()> {
        MediaServiceClient::update_asset_file(self, file_id, mime_type, content_file_size).await
    }

    async fn create_access_policy(
        &self,
        name: &str,
        duration_in_minutes: u64,
        permissions: AccessPolicyPermissions,
    ) -> MediaResult<AccessPolicy> {
        MediaServiceClient::create_access_policy(self, name, duration_in_minutes, permissions).await
    }

    async fn create_locator(
        &self,
        access_policy_id: &str,
        asset_id: &str,
        locator_type: LocatorType,
    ) -> MediaResult<Locator> {
        MediaServiceClient::create_locator(self, access_policy_id, asset_id, locator_type).await
    }

    async fn delete_locator(&self, locator_id: &str) -> MediaResult<()> {
        MediaServiceClient::delete_locator(self, locator_id).await
    }

    async fn get_media_processor(&self, name: &str) -> MediaResult<MediaProcessor> {
        MediaServiceClient::get_media_processor(self, name).await
    }

    async fn create_job(
        &self,
        input_asset_id: &str,
        media_processor_id: &str,
        output_asset_name: &str,
    ) -> MediaResult<Job> {
        MediaServiceClient::create_job(self, input_asset_id, media_processor_id, output_asset_name)
            .await
    }

    async fn get_job(&self, job_id: &str) -> MediaResult<Job> {
        MediaServiceClient::get_job(self, job_id).await
    }

    async fn get_output_asset(&self, job_id: &str) -> MediaResult<Asset> {
        MediaServiceClient::get_output_asset(self, job_id).await
    }
}
