use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store connection failed: {0}")]
    Connection(String),
    #[error("Store command failed: {0}")]
    Command(String),
}

/// Backend-agnostic interface to the shared key-value store.
///
/// Implementations must be cheap to clone behind an `Arc` and safe to call
/// from concurrent tasks. All values are JSON documents serialized by the
/// caller; the store itself only sees opaque strings.
///
/// `get` exists solely so a cleanup path can verify it is deleting its own
/// record (compare-and-delete); playback truth always lives in memory.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError>;
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
