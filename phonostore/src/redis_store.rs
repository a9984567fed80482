use async_trait::async_trait;
use redis::{AsyncCommands, Client, aio::ConnectionManager};

use crate::store::{StateStore, StoreError};

/// Production store backend over a Redis connection manager.
///
/// The connection manager transparently reconnects after a broken
/// connection, so a flaky store degrades publishes instead of wedging the
/// playback service.
#[derive(Clone)]
pub struct RedisStore {
    manager: ConnectionManager,
}

impl RedisStore {
    /// Connects to the store at `url` (e.g. `redis://127.0.0.1:6379/`).
    pub async fn connect(url: &str) -> Result<Self, StoreError> {
        let client = Client::open(url).map_err(|e| StoreError::Connection(e.to_string()))?;
        let manager = client
            .get_connection_manager()
            .await
            .map_err(|e| StoreError::Connection(e.to_string()))?;
        Ok(Self { manager })
    }
}

#[async_trait]
impl StateStore for RedisStore {
    async fn set(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .set(key, value)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let mut conn = self.manager.clone();
        conn.get(key)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.manager.clone();
        let _: () = conn
            .del(key)
            .await
            .map_err(|e| StoreError::Command(e.to_string()))?;
        Ok(())
    }
}
