//! Port for binary object storage.

use async_trait::async_trait;

use crate::domain::ObjectKey;

use super::define_port_error;

define_port_error! {
    /// Errors raised by object store adapters.
    pub enum ImageStoreError {
        /// Reading or writing the backing store failed.
        Io { message: String } =>
            "image store io failed: {message}" [retryable],
        /// The key cannot be mapped onto the backing store.
        InvalidKey { message: String } =>
            "image store rejected key: {message}",
    }
}

/// Key-addressed blob storage for input photos and generated images.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Write `bytes` under `key`, replacing any existing object.
    async fn put(&self, key: &ObjectKey, bytes: Vec<u8>) -> Result<(), ImageStoreError>;

    /// Read the object under `key`; `None` when absent.
    async fn get(&self, key: &ObjectKey) -> Result<Option<Vec<u8>>, ImageStoreError>;
}
