//! Source object storage
//!
//! Read-only access to the files the staging loader ingests.
//!
//! - `storage` - Trait definition for object store backends
//! - `filesystem` - Local directory trees
//! - `s3` - AWS S3 and S3-compatible services
//!
//! A source location is written as `s3://bucket/prefix`, `file:///path` or a
//! bare local path, and resolves to every object under it.

pub mod filesystem;
pub mod s3;
pub mod storage;

use std::fmt;
use std::path::PathBuf;

pub use filesystem::FilesystemStore;
pub use s3::S3Store;
pub use storage::ObjectStore;

use super::error::DataError;
use crate::core::config::AwsConfig;

/// Parsed source location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    S3 { bucket: String, prefix: String },
    Local(PathBuf),
}

impl Location {
    /// Parse a configured location string
    pub fn parse(location: &str) -> Result<Self, DataError> {
        let location = location.trim();
        if location.is_empty() {
            return Err(DataError::Config("Source location must not be empty".into()));
        }

        if let Some(rest) = location.strip_prefix("s3://") {
            let (bucket, prefix) = rest.split_once('/').unwrap_or((rest, ""));
            if bucket.is_empty() {
                return Err(DataError::Config(format!(
                    "S3 location '{}' has no bucket",
                    location
                )));
            }
            return Ok(Self::S3 {
                bucket: bucket.to_string(),
                prefix: prefix.to_string(),
            });
        }

        let path = location.strip_prefix("file://").unwrap_or(location);
        Ok(Self::Local(crate::utils::file::expand_path(path)))
    }

    /// Key (or path) to list under within the store
    pub fn prefix(&self) -> String {
        match self {
            Self::S3 { prefix, .. } => prefix.clone(),
            Self::Local(path) => path.to_string_lossy().into_owned(),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::S3 { bucket, prefix } => write!(f, "s3://{}/{}", bucket, prefix),
            Self::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Open the object store that serves `location`
pub async fn open_store(
    location: &Location,
    aws: &AwsConfig,
) -> Result<Box<dyn ObjectStore>, DataError> {
    let store: Box<dyn ObjectStore> = match location {
        Location::S3 { bucket, .. } => Box::new(S3Store::new(bucket.clone(), aws).await?),
        Location::Local(_) => Box::new(FilesystemStore::new()),
    };
    tracing::debug!(store = store.name(), location = %location, "Opened object store");
    Ok(store)
}
