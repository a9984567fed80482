//! Best-effort mirror of controller state into the shared store.
//!
//! The store is a projection for external consumers, never a source of
//! truth: failures are logged and flagged, and the flag makes the next
//! status query re-publish once. Every terminal transition must go
//! through [`StatePublisher::publish_idle`] so no consumer is left
//! believing playback is still active.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use tracing::warn;

use phonostore::{
    CurrentTrackRecord, KEY_CURRENT, KEY_PLAYER_STATUS, PlayerStatusRecord, SongInfo, StateStore,
};

pub struct StatePublisher {
    store: Arc<dyn StateStore>,
    /// Set when a publish failed; consumed by the next refresh.
    dirty: AtomicBool,
}

impl StatePublisher {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self {
            store,
            dirty: AtomicBool::new(false),
        }
    }

    /// Publishes a "playing" status plus, when a token is known, the
    /// current-track metadata record.
    pub async fn publish_playing(&self, token: Option<&str>, song: &SongInfo) {
        let status = match token {
            Some(token) => PlayerStatusRecord::playing(token),
            None => PlayerStatusRecord {
                playing: true,
                play_uuid: None,
            },
        };
        self.set_json(KEY_PLAYER_STATUS, &status).await;

        if let Some(token) = token {
            let record = CurrentTrackRecord::new(token, song.clone());
            self.set_json(KEY_CURRENT, &record).await;
        }
    }

    /// Publishes an idle status and removes the current-track entry
    /// belonging to `owned_token`.
    pub async fn publish_idle(&self, owned_token: Option<&str>) {
        self.set_json(KEY_PLAYER_STATUS, &PlayerStatusRecord::idle())
            .await;
        self.clear_current(owned_token).await;
    }

    /// Removes both entries unconditionally. Called once at startup so a
    /// previous run's state cannot confuse external consumers.
    pub async fn clear_all(&self) {
        for key in [KEY_PLAYER_STATUS, KEY_CURRENT] {
            if let Err(err) = self.store.delete(key).await {
                warn!(key, error = %err, "Failed to clear store entry");
                self.dirty.store(true, Ordering::SeqCst);
            }
        }
    }

    /// Re-publishes the player status once if a previous publish failed.
    pub async fn refresh_if_dirty(&self, playing: bool, token: Option<&str>, song: &SongInfo) {
        if !self.dirty.swap(false, Ordering::SeqCst) {
            return;
        }
        if playing {
            self.publish_playing(token, song).await;
        } else {
            self.set_json(KEY_PLAYER_STATUS, &PlayerStatusRecord::idle())
                .await;
        }
    }

    /// Deletes the current-track entry, but only when it still belongs to
    /// the given token: a concurrent play may already have published a new
    /// record, which must survive this cleanup.
    async fn clear_current(&self, owned_token: Option<&str>) {
        let Some(owned_token) = owned_token else {
            if let Err(err) = self.store.delete(KEY_CURRENT).await {
                warn!(error = %err, "Failed to clear current-track entry");
                self.dirty.store(true, Ordering::SeqCst);
            }
            return;
        };

        let raw = match self.store.get(KEY_CURRENT).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return,
            Err(err) => {
                warn!(error = %err, "Failed to read current-track entry for cleanup");
                self.dirty.store(true, Ordering::SeqCst);
                return;
            }
        };

        let owns_entry = match serde_json::from_str::<CurrentTrackRecord>(&raw) {
            Ok(record) => record.play_uuid == owned_token,
            // Unparseable garbage is nobody's record; clean it up.
            Err(_) => true,
        };

        if owns_entry {
            if let Err(err) = self.store.delete(KEY_CURRENT).await {
                warn!(error = %err, "Failed to clear current-track entry");
                self.dirty.store(true, Ordering::SeqCst);
            }
        }
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) {
        let serialized = match serde_json::to_string(value) {
            Ok(serialized) => serialized,
            Err(err) => {
                warn!(key, error = %err, "Failed to serialize store record");
                self.dirty.store(true, Ordering::SeqCst);
                return;
            }
        };
        if let Err(err) = self.store.set(key, serialized).await {
            warn!(key, error = %err, "Failed to publish store record");
            self.dirty.store(true, Ordering::SeqCst);
        }
    }
}
