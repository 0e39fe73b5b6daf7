//! Media service HTTP client.

use std::sync::Arc;

use chrono::Duration as ChronoDuration;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use vidpipe_models::{
    AccessPolicy, AccessPolicyPermissions, Asset, AssetFile, AssetRole, Job, Locator, LocatorType,
    MediaProcessor, VideoId,
};

use crate::clock::{Clock, SystemClock};
use crate::config::MediaConfig;
use crate::error::{MediaError, MediaResult};
use crate::token::{ClientCredentialsProvider, TokenCache, TokenProvider};

/// Protocol version the service expects on every request.
const SERVICE_API_VERSION: &str = "2.15";

/// Default encode-preset engine name.
pub const DEFAULT_MEDIA_PROCESSOR: &str = "Media Encoder Standard";

/// Default task configuration preset.
pub const DEFAULT_ENCODE_PRESET: &str = "Adaptive Streaming";

/// Minutes a locator start time is backdated to tolerate clock skew.
const LOCATOR_BACKDATE_MINUTES: i64 = 10;

/// List envelope of the service's collection responses.
#[derive(Debug, Deserialize)]
struct ODataList<T> {
    #[serde(default = "Vec::new")]
    value: Vec<T>,
}

/// Envelope of verbose-format responses (job creation).
#[derive(Debug, Deserialize)]
struct VerboseEnvelope<T> {
    d: T,
}

/// Client for the remote media service's resource API.
///
/// Each operation issues one network call. Writes succeed only on the
/// service's "created" status, reads only on "ok"; anything else maps to
/// [`MediaError::Remote`]. Filtered lookups distinguish a legitimately
/// empty result set with [`MediaError::NotFound`].
pub struct MediaServiceClient {
    http: reqwest::Client,
    endpoint: String,
    tokens: TokenCache,
    clock: Arc<dyn Clock>,
}

impl MediaServiceClient {
    /// Create a client with an explicit token provider.
    pub fn new(config: &MediaConfig, provider: Arc<dyn TokenProvider>) -> MediaResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(MediaError::Network)?;

        Ok(Self {
            http,
            endpoint: config.rest_api_endpoint.clone(),
            tokens: TokenCache::new(provider),
            clock: Arc::new(SystemClock),
        })
    }

    /// Create a client with the client-credentials token provider.
    pub fn from_config(config: MediaConfig) -> MediaResult<Self> {
        let provider = Arc::new(ClientCredentialsProvider::new(&config)?);
        Self::new(&config, provider)
    }

    /// Create a client from environment configuration with the
    /// client-credentials token provider.
    pub fn from_env() -> MediaResult<Self> {
        Self::from_config(MediaConfig::from_env()?)
    }

    /// Replace the clock (tests pin this to a fixed instant).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoint, path)
    }

    /// Attach the service headers and bearer token, then send.
    async fn send(&self, builder: reqwest::RequestBuilder) -> MediaResult<reqwest::Response> {
        self.send_with_accept(builder, "application/json").await
    }

    async fn send_with_accept(
        &self,
        builder: reqwest::RequestBuilder,
        accept: &str,
    ) -> MediaResult<reqwest::Response> {
        let authorization = self.tokens.authorization().await?;
        let response = builder
            .header("Authorization", authorization)
            .header("Content-Type", "application/json")
            .header("DataServiceVersion", "1.0")
            .header("MaxDataServiceVersion", "3.0")
            .header("Accept", accept)
            .header("Accept-Charset", "UTF-8")
            .header("x-ms-version", SERVICE_API_VERSION)
            .send()
            .await?;
        Ok(response)
    }

    async fn remote_failure(response: reqwest::Response) -> MediaError {
        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();
        MediaError::remote(status, body)
    }

    /// Parse a read response, succeeding only on 200.
    async fn expect_ok<T: DeserializeOwned>(response: reqwest::Response) -> MediaResult<T> {
        if response.status() == reqwest::StatusCode::OK {
            Ok(response.json().await?)
        } else {
            Err(Self::remote_failure(response).await)
        }
    }

    /// Parse a write response, succeeding only on 201.
    async fn expect_created<T: DeserializeOwned>(response: reqwest::Response) -> MediaResult<T> {
        if response.status() == reqwest::StatusCode::CREATED {
            Ok(response.json().await?)
        } else {
            Err(Self::remote_failure(response).await)
        }
    }

    async fn expect_no_content(response: reqwest::Response) -> MediaResult<()> {
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            Ok(())
        } else {
            Err(Self::remote_failure(response).await)
        }
    }

    /// Create an asset named with the role's composed name, e.g. `UPLOADED::v1`.
    pub async fn create_asset(&self, role: AssetRole, video_id: &VideoId) -> MediaResult<Asset> {
        let name = role.composed_name(video_id);
        debug!(asset_name = %name, "Creating asset");
        let response = self
            .send(self.http.post(self.url("Assets")).json(&json!({ "Name": name })))
            .await?;
        Self::expect_created(response).await
    }

    /// Look up the asset correlated with a video by exact composed name.
    pub async fn get_asset_by_video_id(
        &self,
        role: AssetRole,
        video_id: &VideoId,
    ) -> MediaResult<Asset> {
        let name = role.composed_name(video_id);
        let response = self
            .send(
                self.http
                    .get(self.url("Assets"))
                    .query(&[("$filter", format!("Name eq '{}'", name))]),
            )
            .await?;
        let list: ODataList<Asset> = Self::expect_ok(response).await?;
        list.value
            .into_iter()
            .next()
            .ok_or_else(|| MediaError::not_found(format!("asset {}", name)))
    }

    /// List the files of an asset.
    pub async fn get_asset_files(&self, asset_id: &str) -> MediaResult<Vec<AssetFile>> {
        let response = self
            .send(self.http.get(self.url(&format!("Assets('{}')/Files", asset_id))))
            .await?;
        let list: ODataList<AssetFile> = Self::expect_ok(response).await?;
        Ok(list.value)
    }

    /// List an asset's locators of one type.
    pub async fn get_asset_locators(
        &self,
        asset_id: &str,
        locator_type: LocatorType,
    ) -> MediaResult<Vec<Locator>> {
        let response = self
            .send(
                self.http
                    .get(self.url(&format!("Assets('{}')/Locators", asset_id)))
                    .query(&[("$filter", format!("Type eq {}", locator_type.code()))]),
            )
            .await?;
        let list: ODataList<Locator> = Self::expect_ok(response).await?;
        Ok(list.value)
    }

    /// Create a file entry within an asset.
    pub async fn create_asset_file(
        &self,
        asset_id: &str,
        file_name: &str,
        mime_type: &str,
    ) -> MediaResult<AssetFile> {
        let response = self
            .send(self.http.post(self.url("Files")).json(&json!({
                "IsEncrypted": "false",
                "IsPrimary": "false",
                "MimeType": mime_type,
                "Name": file_name,
                "ParentAssetId": asset_id,
            })))
            .await?;
        Self::expect_created(response).await
    }

    /// Patch a file's size and mime type once the physical upload is done.
    ///
    /// Partial update via the service's MERGE method tunneled over POST;
    /// only the given fields change.
    pub async fn update_asset_file(
        &self,
        file_id: &str,
        mime_type: &str,
        content_file_size: u64,
    ) -> MediaResult<()> {
        let response = self
            .send(
                self.http
                    .post(self.url(&format!("Files('{}')", file_id)))
                    .header("X-HTTP-Method", "MERGE")
                    .json(&json!({
                        "MimeType": mime_type,
                        "ContentFileSize": content_file_size.to_string(),
                    })),
            )
            .await?;
        Self::expect_no_content(response).await
    }

    /// Create a time-boxed permission grant.
    pub async fn create_access_policy(
        &self,
        name: &str,
        duration_in_minutes: u64,
        permissions: AccessPolicyPermissions,
    ) -> MediaResult<AccessPolicy> {
        let response = self
            .send(self.http.post(self.url("AccessPolicies")).json(&json!({
                "Name": name,
                "DurationInMinutes": duration_in_minutes,
                "Permissions": permissions.code(),
            })))
            .await?;
        Self::expect_created(response).await
    }

    /// Bind an access policy to an asset, producing an addressable path.
    ///
    /// The start time is backdated ten minutes and truncated to whole
    /// seconds so slightly skewed clocks do not reject the locator.
    pub async fn create_locator(
        &self,
        access_policy_id: &str,
        asset_id: &str,
        locator_type: LocatorType,
    ) -> MediaResult<Locator> {
        let start_time = (self.clock.now_utc() - ChronoDuration::minutes(LOCATOR_BACKDATE_MINUTES))
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        let response = self
            .send(self.http.post(self.url("Locators")).json(&json!({
                "AccessPolicyId": access_policy_id,
                "AssetId": asset_id,
                "StartTime": start_time,
                "Type": locator_type.code(),
            })))
            .await?;
        Self::expect_created(response).await
    }

    /// Delete a locator (used to tear down transient upload locators).
    pub async fn delete_locator(&self, locator_id: &str) -> MediaResult<()> {
        let response = self
            .send(self.http.delete(self.url(&format!("Locators('{}')", locator_id))))
            .await?;
        Self::expect_no_content(response).await
    }

    /// Find the encode-preset engine by name.
    pub async fn get_media_processor(&self, name: &str) -> MediaResult<MediaProcessor> {
        let response = self
            .send(
                self.http
                    .get(self.url("MediaProcessors()"))
                    .query(&[("$filter", format!("Name eq '{}'", name))]),
            )
            .await?;
        let list: ODataList<MediaProcessor> = Self::expect_ok(response).await?;
        list.value
            .into_iter()
            .next()
            .ok_or_else(|| MediaError::not_found(format!("media processor {}", name)))
    }

    /// Submit a transcode job for an input asset.
    ///
    /// The task body names the output asset so completed jobs correlate
    /// back to their video by composed name. Not idempotent: a retried
    /// create produces a second remote job.
    pub async fn create_job(
        &self,
        input_asset_id: &str,
        media_processor_id: &str,
        output_asset_name: &str,
    ) -> MediaResult<Job> {
        let input_asset_url = self.url(&format!("Assets('{}')", input_asset_id));
        let task_body = format!(
            "<?xml version=\"1.0\" encoding=\"utf-8\"?><taskBody><inputAsset>JobInputAsset(0)\
             </inputAsset><outputAsset assetName=\"{}\">JobOutputAsset(0)</outputAsset></taskBody>",
            output_asset_name
        );
        let response = self
            .send_with_accept(
                self.http
                    .post(self.url("Jobs"))
                    .json(&json!({
                        "Name": format!("JobAssets-{}", input_asset_id),
                        "InputMediaAssets": [
                            { "__metadata": { "uri": input_asset_url } }
                        ],
                        "Tasks": [
                            {
                                "Configuration": DEFAULT_ENCODE_PRESET,
                                "MediaProcessorId": media_processor_id,
                                "TaskBody": task_body,
                            }
                        ],
                    })),
                "application/json;odata=verbose",
            )
            .await?;
        if response.status() != reqwest::StatusCode::CREATED {
            return Err(Self::remote_failure(response).await);
        }
        // The verbose envelope is specific to this one endpoint; a response
        // without the expected wrapper is a contract break, not a transport
        // failure.
        let body = response.text().await?;
        let envelope: VerboseEnvelope<Job> = serde_json::from_str(&body)
            .map_err(|e| MediaError::InvalidResponse(format!("job-create envelope: {}", e)))?;
        Ok(envelope.d)
    }

    /// Fetch a job's current state.
    pub async fn get_job(&self, job_id: &str) -> MediaResult<Job> {
        let response = self
            .send(self.http.get(self.url(&format!("Jobs('{}')", job_id))))
            .await?;
        Self::expect_ok(response).await
    }

    /// Fetch the output asset of a job (populated once the job finished).
    pub async fn get_output_asset(&self, job_id: &str) -> MediaResult<Asset> {
        let response = self
            .send(self.http.get(self.url(&format!("Jobs('{}')/OutputMediaAssets", job_id))))
            .await?;
        let list: ODataList<Asset> = Self::expect_ok(response).await?;
        list.value
            .into_iter()
            .next()
            .ok_or_else(|| MediaError::not_found(format!("output asset of job {}", job_id)))
    }
}
