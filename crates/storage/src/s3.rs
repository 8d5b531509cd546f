//! S3-compatible [`BlobStore`] using pre-signed URLs.

use std::time::Duration;

use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_credential_types::Credentials;
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

use crate::{new_upload_key, BlobStore, StorageError, StoredBlob, UploadTarget};

/// Default lifetime of an upload URL in seconds.
const DEFAULT_UPLOAD_URL_TTL_SECS: u64 = 900;
/// Default lifetime of a download URL in seconds.
const DEFAULT_DOWNLOAD_URL_TTL_SECS: u64 = 3600;

/// S3 connection settings.
#[derive(Debug, Clone)]
pub struct S3Config {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible services (MinIO, R2). Enables
    /// path-style addressing.
    pub endpoint: Option<String>,
    /// Static credentials. When absent the default AWS provider chain is used.
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub upload_url_ttl_secs: u64,
    pub download_url_ttl_secs: u64,
}

impl S3Config {
    /// Load S3 settings from environment variables.
    ///
    /// | Env Var                    | Required | Default     |
    /// |----------------------------|----------|-------------|
    /// | `S3_BUCKET`                | **yes**  | --          |
    /// | `S3_REGION`                | no       | `us-east-1` |
    /// | `S3_ENDPOINT`              | no       | --          |
    /// | `S3_ACCESS_KEY_ID`         | no       | --          |
    /// | `S3_SECRET_ACCESS_KEY`     | no       | --          |
    /// | `S3_UPLOAD_URL_TTL_SECS`   | no       | `900`       |
    /// | `S3_DOWNLOAD_URL_TTL_SECS` | no       | `3600`      |
    ///
    /// # Panics
    ///
    /// Panics if `S3_BUCKET` is missing or a TTL is not a valid u64.
    pub fn from_env() -> Self {
        let bucket = std::env::var("S3_BUCKET").expect("S3_BUCKET must be set in the environment");
        assert!(!bucket.is_empty(), "S3_BUCKET must not be empty");

        let upload_url_ttl_secs: u64 = std::env::var("S3_UPLOAD_URL_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_UPLOAD_URL_TTL_SECS.to_string())
            .parse()
            .expect("S3_UPLOAD_URL_TTL_SECS must be a valid u64");

        let download_url_ttl_secs: u64 = std::env::var("S3_DOWNLOAD_URL_TTL_SECS")
            .unwrap_or_else(|_| DEFAULT_DOWNLOAD_URL_TTL_SECS.to_string())
            .parse()
            .expect("S3_DOWNLOAD_URL_TTL_SECS must be a valid u64");

        Self {
            bucket,
            region: std::env::var("S3_REGION").unwrap_or_else(|_| "us-east-1".into()),
            endpoint: std::env::var("S3_ENDPOINT").ok().filter(|s| !s.is_empty()),
            access_key_id: std::env::var("S3_ACCESS_KEY_ID").ok(),
            secret_access_key: std::env::var("S3_SECRET_ACCESS_KEY").ok(),
            upload_url_ttl_secs,
            download_url_ttl_secs,
        }
    }
}

/// [`BlobStore`] backed by an S3 bucket.
pub struct S3BlobStore {
    client: Client,
    config: S3Config,
}

impl S3BlobStore {
    /// Build an S3 client from `config`.
    pub async fn connect(config: S3Config) -> Self {
        let shared = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.region.clone()))
            .load()
            .await;

        let mut builder = aws_sdk_s3::config::Builder::from(&shared);
        if let Some(endpoint) = &config.endpoint {
            builder = builder.endpoint_url(endpoint).force_path_style(true);
        }
        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            builder = builder.credentials_provider(Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "moodboard-env",
            ));
        }

        tracing::info!(
            bucket = %config.bucket,
            region = %config.region,
            endpoint = config.endpoint.as_deref().unwrap_or("aws"),
            "S3 blob store configured",
        );

        Self {
            client: Client::from_conf(builder.build()),
            config,
        }
    }

    fn presigning(ttl_secs: u64) -> Result<PresigningConfig, StorageError> {
        PresigningConfig::expires_in(Duration::from_secs(ttl_secs))
            .map_err(|e| StorageError::Presign(e.to_string()))
    }
}

fn backend_error<E: std::error::Error>(err: E) -> StorageError {
    StorageError::Backend(DisplayErrorContext(&err).to_string())
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn create_upload_target(&self) -> Result<UploadTarget, StorageError> {
        let blob_key = new_upload_key();
        let ttl = self.config.upload_url_ttl_secs;

        let request = self
            .client
            .put_object()
            .bucket(&self.config.bucket)
            .key(&blob_key)
            .presigned(Self::presigning(ttl)?)
            .await
            .map_err(|e| StorageError::Presign(DisplayErrorContext(&e).to_string()))?;

        Ok(UploadTarget {
            blob_key,
            upload_url: request.uri().to_string(),
            method: "PUT",
            expires_at: chrono::Utc::now() + chrono::Duration::seconds(ttl as i64),
        })
    }

    async fn exists(&self, key: &str) -> Result<bool, StorageError> {
        match self
            .client
            .head_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
            Err(err) => Err(backend_error(err)),
        }
    }

    async fn download_url(&self, key: &str) -> Result<String, StorageError> {
        let request = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .presigned(Self::presigning(self.config.download_url_ttl_secs)?)
            .await
            .map_err(|e| StorageError::Presign(DisplayErrorContext(&e).to_string()))?;
        Ok(request.uri().to_string())
    }

    async fn get(&self, key: &str) -> Result<StoredBlob, StorageError> {
        let output = self
            .client
            .get_object()
            .bucket(&self.config.bucket)
            .key(key)
            .send()
            .await
            .map_err(|err| {
                if err.as_service_error().is_some_and(|e| e.is_no_such_key()) {
                    StorageError::NotFound(key.to_string())
                } else {
                    backend_error(err)
                }
            })?;

        let content_type = output.content_type().map(str::to_string);
        let bytes = output
            .body
            .collect()
            .await
            .map_err(backend_error)?
            .into_bytes()
            .to_vec();

        Ok(StoredBlob {
            bytes,
            content_type,
        })
    }

    async fn put(
        &self,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), StorageError> {
        self.client
            .put_object()
            .bucket(&self.config.bucket)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(bytes))
            .send()
            .await
            .map_err(backend_error)?;
        Ok(())
    }
}
