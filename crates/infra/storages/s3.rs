use std::error::Error as StdError;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, timeout::TimeoutConfig};
use aws_credential_types::Credentials;
use aws_sdk_s3::{
    Client,
    config::{Region, StalledStreamProtectionConfig},
    error::SdkError,
    primitives::ByteStream,
};
use http::Uri;
use tracing::{error, info};

use crate::domain::repositories::backup_storage::BackupStorage;

#[derive(Debug, Clone)]
pub struct S3Config {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub force_path_style: bool,
    pub connect_timeout_secs: u64,
    pub read_timeout_secs: u64,
}

impl S3Config {
    pub fn new(
        endpoint: String,
        region: String,
        bucket: String,
        access_key: String,
        secret_key: String,
    ) -> Self {
        Self {
            endpoint,
            region,
            bucket,
            access_key,
            secret_key,
            force_path_style: true,
            connect_timeout_secs: 10,
            read_timeout_secs: 300,
        }
    }
}

/// Upload failure tagged with whether another attempt could succeed.
#[derive(Debug)]
pub struct StorageUploadError {
    retryable: bool,
    message: String,
    source: Option<anyhow::Error>,
}

impl StorageUploadError {
    pub fn retryable_with_source(message: impl Into<String>, source: anyhow::Error) -> anyhow::Error {
        anyhow::Error::new(Self {
            retryable: true,
            message: message.into(),
            source: Some(source),
        })
    }

    pub fn non_retryable_with_source(
        message: impl Into<String>,
        source: anyhow::Error,
    ) -> anyhow::Error {
        anyhow::Error::new(Self {
            retryable: false,
            message: message.into(),
            source: Some(source),
        })
    }

    pub fn is_retryable(&self) -> bool {
        self.retryable
    }

    /// Looks through an error chain for an upload failure worth retrying.
    pub fn is_retryable_error(err: &anyhow::Error) -> bool {
        err.chain()
            .find_map(|cause| cause.downcast_ref::<StorageUploadError>())
            .is_some_and(StorageUploadError::is_retryable)
    }
}

impl std::fmt::Display for StorageUploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for StorageUploadError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|err| err.as_ref())
    }
}

pub fn is_retryable_s3_error<E>(err: &SdkError<E>) -> bool {
    match err {
        SdkError::TimeoutError(_) => true,
        SdkError::DispatchFailure(_) => true,
        SdkError::ResponseError(_) => true,
        SdkError::ServiceError(service_err) => {
            let status = service_err.raw().status().as_u16();
            matches!(status, 408 | 429) || (500..=599).contains(&status)
        }
        _ => false,
    }
}

pub async fn build_s3_client(config: &S3Config) -> Result<Client> {
    let endpoint = format!("{}/", config.endpoint.trim_end_matches('/'));
    Uri::from_str(&endpoint).context("invalid s3 endpoint URL")?;

    let credentials = Credentials::new(
        config.access_key.clone(),
        config.secret_key.clone(),
        None,
        None,
        "s3-compatible",
    );

    let region = Region::new(config.region.clone());
    let shared_config = aws_config::defaults(BehaviorVersion::latest())
        .region(region.clone())
        .credentials_provider(credentials)
        .timeout_config(
            TimeoutConfig::builder()
                .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
                .read_timeout(Duration::from_secs(config.read_timeout_secs))
                .build(),
        )
        .load()
        .await;

    let s3_config = aws_sdk_s3::config::Builder::from(&shared_config)
        .endpoint_url(endpoint)
        .force_path_style(config.force_path_style)
        .region(region)
        .stalled_stream_protection(StalledStreamProtectionConfig::disabled())
        .build();

    Ok(Client::from_conf(s3_config))
}

pub struct S3BackupStorage {
    client: Client,
    bucket: String,
}

impl S3BackupStorage {
    pub async fn new(config: S3Config) -> Result<Self> {
        let client = build_s3_client(&config).await?;
        Ok(Self {
            client,
            bucket: config.bucket,
        })
    }
}

#[async_trait]
impl BackupStorage for S3BackupStorage {
    async fn upload_backup(&self, local_path: PathBuf, object_key: String) -> Result<String> {
        let body = ByteStream::from_path(&local_path).await.map_err(|err| {
            StorageUploadError::non_retryable_with_source(
                format!("failed to read backup file {}", local_path.display()),
                anyhow::Error::new(err),
            )
        })?;

        match self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(&object_key)
            .body(body)
            .content_type("application/sql")
            .send()
            .await
        {
            Ok(_) => {
                info!(bucket = %self.bucket, object_key = %object_key, "backup: uploaded");
                Ok(object_key)
            }
            Err(err) => {
                let retryable = is_retryable_s3_error(&err);
                error!(
                    bucket = %self.bucket,
                    object_key = %object_key,
                    retryable,
                    s3_error = ?err,
                    "backup: upload failed"
                );
                let message = format!("failed to upload backup to {}/{}", self.bucket, object_key);
                let source = anyhow::Error::new(err);
                Err(if retryable {
                    StorageUploadError::retryable_with_source(message, source)
                } else {
                    StorageUploadError::non_retryable_with_source(message, source)
                })
            }
        }
    }
}
