//! Object storage seam for product images.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error)]
pub enum ObjectStorageError {
    #[error("object storage io failure: {0}")]
    Io(#[from] std::io::Error),
    #[error("object `{public_id}` has an invalid identifier")]
    InvalidIdentifier { public_id: String },
    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: &'static str,
        attempts: u32,
        last: Box<ObjectStorageError>,
    },
}

/// A stored image as exposed to clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<StoredObject, ObjectStorageError>;

    /// Deleting an object that no longer exists succeeds.
    async fn delete(&self, public_id: &str) -> Result<(), ObjectStorageError>;
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub upload_retries: u32,
    pub delete_retries: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            upload_retries: 2,
            delete_retries: 5,
            backoff: Duration::from_secs(1),
        }
    }
}

/// Wraps a backend with bounded retries and a fixed pause between attempts.
#[derive(Clone)]
pub struct RetryingObjectStorage {
    inner: Arc<dyn ObjectStorage>,
    policy: RetryPolicy,
}

impl RetryingObjectStorage {
    pub fn new(inner: Arc<dyn ObjectStorage>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

#[async_trait]
impl ObjectStorage for RetryingObjectStorage {
    async fn upload(
        &self,
        folder: &str,
        filename: &str,
        data: Bytes,
    ) -> Result<StoredObject, ObjectStorageError> {
        let mut attempt = 0;
        loop {
            match self.inner.upload(folder, filename, data.clone()).await {
                Ok(stored) => return Ok(stored),
                Err(err) if attempt >= self.policy.upload_retries => {
                    return Err(ObjectStorageError::Exhausted {
                        operation: "upload",
                        attempts: attempt + 1,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(
                        target: "gemstore::storage",
                        attempt,
                        filename,
                        error = %err,
                        "Image upload failed; retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.backoff).await;
                }
            }
        }
    }

    async fn delete(&self, public_id: &str) -> Result<(), ObjectStorageError> {
        let mut attempt = 0;
        loop {
            match self.inner.delete(public_id).await {
                Ok(()) => return Ok(()),
                Err(err) if attempt >= self.policy.delete_retries => {
                    return Err(ObjectStorageError::Exhausted {
                        operation: "delete",
                        attempts: attempt + 1,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    warn!(
                        target: "gemstore::storage",
                        attempt,
                        public_id,
                        error = %err,
                        "Image deletion failed; retrying"
                    );
                    attempt += 1;
                    tokio::time::sleep(self.policy.backoff).await;
                }
            }
        }
    }
}
