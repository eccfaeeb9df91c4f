//! S3 remote store
//!
//! Namespace-per-bucket layout on Amazon S3 or an S3-compatible service
//! (MinIO, LocalStack). Buckets are created lazily and objects are never
//! overwritten or deleted.

use std::path::Path;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::{
    config::Builder as S3ConfigBuilder,
    primitives::ByteStream,
    types::{BucketLocationConstraint, CreateBucketConfiguration},
    Client,
};
use trainer_core::{Credentials, Error, Result};
use tracing::{debug, instrument};

use crate::store::{persist_to, RemoteStore};

/// Bucket name backing a model namespace
pub fn bucket_for(namespace: &str) -> String {
    format!("model-{}", namespace)
}

/// Configuration for S3Store
#[derive(Debug, Clone)]
pub struct S3Config {
    /// AWS region (default: "us-west-2")
    pub region: String,
    /// Optional custom endpoint URL (for MinIO, LocalStack, etc.)
    pub endpoint_url: Option<String>,
    /// Force path-style addressing (required for MinIO)
    pub force_path_style: bool,
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            region: "us-west-2".to_string(),
            endpoint_url: None,
            force_path_style: false,
        }
    }
}

/// S3-backed remote store
#[derive(Debug, Clone)]
pub struct S3Store {
    client: Client,
    region: String,
}

impl S3Store {
    /// Connect with explicit credentials from the local config file
    pub async fn connect(credentials: &Credentials, config: S3Config) -> Self {
        let provider = aws_sdk_s3::config::Credentials::new(
            credentials.access_key_id.clone(),
            credentials.secret_access_key.clone(),
            None,
            None,
            "config-json",
        );

        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(provider)
            .region(aws_sdk_s3::config::Region::new(config.region.clone()))
            .load()
            .await;

        let mut s3_config_builder = S3ConfigBuilder::from(&aws_config);

        if let Some(endpoint) = &config.endpoint_url {
            s3_config_builder = s3_config_builder.endpoint_url(endpoint);
        }

        if config.force_path_style {
            s3_config_builder = s3_config_builder.force_path_style(true);
        }

        Self {
            client: Client::from_conf(s3_config_builder.build()),
            region: config.region,
        }
    }
}

#[async_trait]
impl RemoteStore for S3Store {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn ensure_namespace(&self, namespace: &str) -> Result<()> {
        let bucket = bucket_for(namespace);
        debug!(%bucket, "Ensuring bucket exists");

        let mut request = self.client.create_bucket().bucket(&bucket);

        // us-east-1 is the one region that rejects an explicit constraint
        if self.region != "us-east-1" {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        match request.send().await {
            Ok(_) => {
                debug!(%bucket, "Bucket created");
                Ok(())
            }
            Err(e) => {
                let service = e.into_service_error();
                if service.is_bucket_already_owned_by_you() || service.is_bucket_already_exists()
                {
                    debug!(%bucket, "Bucket already exists");
                    Ok(())
                } else {
                    Err(Error::Storage {
                        message: format!("S3 create_bucket {} failed: {}", bucket, service),
                    })
                }
            }
        }
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn list(&self, namespace: &str) -> Result<Vec<String>> {
        let bucket = bucket_for(namespace);
        debug!(%bucket, "Listing bucket");

        let mut results = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self.client.list_objects_v2().bucket(&bucket);

            if let Some(token) = continuation_token.take() {
                request = request.continuation_token(token);
            }

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    let service = e.into_service_error();
                    // A namespace that was never trained has no bucket yet;
                    // that reads as an empty listing, not a failure.
                    if service.is_no_such_bucket() {
                        debug!(%bucket, "Bucket absent, empty listing");
                        return Ok(Vec::new());
                    }
                    return Err(Error::Storage {
                        message: format!("S3 list_objects {} failed: {}", bucket, service),
                    });
                }
            };

            for object in response.contents() {
                if let Some(key) = object.key() {
                    results.push(key.to_string());
                }
            }

            if response.is_truncated() == Some(true) {
                continuation_token = response.next_continuation_token().map(String::from);
            } else {
                break;
            }
        }

        debug!(count = results.len(), "Found remote objects");
        Ok(results)
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn upload(&self, namespace: &str, key: &str, local_path: &Path) -> Result<()> {
        let bucket = bucket_for(namespace);
        debug!(%bucket, %key, ?local_path, "Uploading to S3");

        let body = ByteStream::from_path(local_path)
            .await
            .map_err(|e| Error::Storage {
                message: format!("failed to open {:?} for upload: {}", local_path, e),
            })?;

        self.client
            .put_object()
            .bucket(&bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::Storage {
                message: format!("S3 put_object {}/{} failed: {}", bucket, key, e),
            })?;

        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn download(&self, namespace: &str, key: &str, local_path: &Path) -> Result<()> {
        let bucket = bucket_for(namespace);
        debug!(%bucket, %key, ?local_path, "Downloading from S3");

        let response = match self
            .client
            .get_object()
            .bucket(&bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                let service = e.into_service_error();
                if service.is_no_such_key() {
                    return Err(Error::KeyNotFound {
                        key: key.to_string(),
                    });
                }
                return Err(Error::Storage {
                    message: format!("S3 get_object {}/{} failed: {}", bucket, key, service),
                });
            }
        };

        let bytes = response.body.collect().await.map_err(|e| Error::Storage {
            message: format!("failed to read S3 response body: {}", e),
        })?;

        persist_to(local_path, &bytes.to_vec()).await
    }
}
