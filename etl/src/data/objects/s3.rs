//! S3-backed object store
//!
//! Reads from AWS S3 (or S3-compatible services like MinIO). Keys are object
//! keys within one bucket; listing follows S3 prefix semantics, the same way
//! the warehouse's own COPY resolves a source prefix.

use async_trait::async_trait;
use aws_sdk_s3::Client;
use aws_sdk_s3::config::{Credentials, Region};

use super::storage::ObjectStore;
use crate::core::config::AwsConfig;
use crate::data::error::DataError;

/// Provider name attached to credentials taken from the config file
const CONFIG_CREDENTIALS_PROVIDER: &str = "dwh-config";

/// S3-backed object store
#[derive(Debug, Clone)]
pub struct S3Store {
    /// S3 client
    client: Client,
    /// S3 bucket name
    bucket: String,
}

impl S3Store {
    /// Create a store for `bucket`
    ///
    /// Uses the configured access key and secret when present, otherwise the
    /// default AWS credential provider chain.
    pub async fn new(bucket: String, aws: &AwsConfig) -> Result<Self, DataError> {
        let mut config_loader = aws_config::defaults(aws_config::BehaviorVersion::latest());

        if let Some(region) = &aws.region {
            config_loader = config_loader.region(Region::new(region.clone()));
        }

        if let (Some(key), Some(secret)) = (&aws.access_key_id, &aws.secret_access_key) {
            config_loader = config_loader.credentials_provider(Credentials::new(
                key.clone(),
                secret.clone(),
                None,
                None,
                CONFIG_CREDENTIALS_PROVIDER,
            ));
        }

        let config = config_loader.load().await;

        let mut s3_config = aws_sdk_s3::config::Builder::from(&config);

        if let Some(endpoint_url) = &aws.endpoint {
            s3_config = s3_config
                .endpoint_url(endpoint_url.clone())
                .force_path_style(true); // Required for most S3-compatible services
        }

        let client = Client::from_conf(s3_config.build());

        tracing::debug!(bucket = %bucket, "S3 object store initialized");

        Ok(Self { client, bucket })
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    fn name(&self) -> &'static str {
        "s3"
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>, DataError> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;

        loop {
            let mut request = self
                .client
                .list_objects_v2()
                .bucket(&self.bucket)
                .prefix(prefix);

            if let Some(token) = continuation_token {
                request = request.continuation_token(token);
            }

            let response = request.send().await.map_err(|e| {
                DataError::Object(format!(
                    "S3 list_objects_v2 error for s3://{}/{}: {}",
                    self.bucket,
                    prefix,
                    e.into_service_error()
                ))
            })?;

            keys.extend(
                response
                    .contents()
                    .iter()
                    .filter_map(|obj| obj.key())
                    // Zero-byte "folder" markers
                    .filter(|key| !key.ends_with('/'))
                    .map(|key| key.to_string()),
            );

            match response.next_continuation_token() {
                Some(token) if response.is_truncated().unwrap_or(false) => {
                    continuation_token = Some(token.to_string());
                }
                _ => break,
            }
        }

        keys.sort();
        tracing::trace!(
            bucket = %self.bucket,
            prefix,
            objects = keys.len(),
            "Listed S3 objects"
        );
        Ok(keys)
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, DataError> {
        let response = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                let service_err = e.into_service_error();
                if service_err.is_no_such_key() {
                    DataError::NotFound(format!("s3://{}/{}", self.bucket, key))
                } else {
                    DataError::Object(format!("S3 get_object error: {}", service_err))
                }
            })?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| DataError::Object(format!("S3 body read error: {}", e)))?
            .into_bytes()
            .to_vec();

        Ok(data)
    }
}
