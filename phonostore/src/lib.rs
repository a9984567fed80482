//! # Phono shared-store client
//!
//! The playback service mirrors its state into a shared key-value store so
//! that sibling components (chat bot, web UI) can display what is playing
//! without calling the service. The store is a best-effort, eventually
//! consistent mirror: it is written by the playback service only and is
//! never read back to reconstruct playback truth.
//!
//! Two entries are maintained:
//! - [`KEY_CURRENT`]: metadata of the track currently playing
//! - [`KEY_PLAYER_STATUS`]: `{playing, playUuid}` flag record
//!
//! The [`StateStore`] trait is the seam between the service and the concrete
//! store; [`RedisStore`] is the production backend and [`MemoryStore`] backs
//! the test suites.

mod memory;
mod records;
mod redis_store;
mod store;

pub use memory::MemoryStore;
pub use records::{CurrentTrackRecord, PlayerStatusRecord, SongInfo};
pub use redis_store::RedisStore;
pub use store::{StateStore, StoreError};

/// Store entry holding the metadata of the currently playing track.
pub const KEY_CURRENT: &str = "music:current";

/// Store entry holding the `{playing, playUuid}` status record.
pub const KEY_PLAYER_STATUS: &str = "music:player_status";
