//! Object store trait definition
//!
//! Defines the read-only interface the staging loader uses to enumerate and
//! fetch source objects (filesystem, S3).

use async_trait::async_trait;

use crate::data::error::DataError;

/// Trait for object storage backends
///
/// All implementations must be thread-safe (Send + Sync) for use in async contexts.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    /// List object keys under a prefix, in lexicographic order
    ///
    /// # Notes
    /// An empty result is not an error here; callers decide whether a
    /// location with no objects is acceptable.
    async fn list(&self, prefix: &str) -> Result<Vec<String>, DataError>;

    /// Fetch the full content of one object
    async fn get(&self, key: &str) -> Result<Vec<u8>, DataError>;
}
