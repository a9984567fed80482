//! # Phono playback core
//!
//! Drives a single external audio-player process on behalf of remote
//! callers: start, pause, resume, seek (by restart), stop, and an
//! always-fresh progress snapshot. The player and the duration prober are
//! opaque external binaries the core can only start, signal, and wait on.
//!
//! The public surface is [`PlaybackController`]; everything else supports
//! it:
//! - [`clock`]: pure position computation from timeline bookkeeping
//! - [`download`]: streaming fetch into session-owned local files
//! - [`supervisor`]: process spawn / watch / terminate / probe
//! - [`publisher`]: best-effort state mirror into the shared store
//!
//! Exactly one playback session is active at a time; a new `play` always
//! supersedes the previous session synchronously.

pub mod clock;
pub mod controller;
pub mod download;
pub mod errors;
pub mod model;
pub mod process;
pub mod publisher;
pub mod session;
pub mod supervisor;

pub use controller::{PlaybackController, PlayerConfig};
pub use errors::PlayerError;
pub use model::{PauseResponse, PlayResponse, SeekResponse, StatusResponse, StopResponse};
