//! Structured results returned by the controller operations.
//!
//! Every operation answers with `status` + `message` so callers always
//! get a human-readable outcome; domain failures are reported the same
//! way (`status: false`) rather than as transport errors.

use serde::{Deserialize, Serialize};

use phonostore::SongInfo;

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Acknowledgement of a play request. Playback starts asynchronously:
/// this confirms the request was accepted, not that audio is audible yet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct PlayResponse {
    pub status: bool,
    pub message: String,
    #[serde(rename = "trackToken")]
    pub track_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StopResponse {
    pub status: bool,
    pub message: String,
    pub playing: bool,
}

/// Shared by pause and resume.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct PauseResponse {
    pub status: bool,
    pub message: String,
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SeekResponse {
    pub status: bool,
    pub message: String,
    /// Clamped target position actually applied, in seconds.
    pub position: f64,
}

/// Snapshot of the current playback progress. Computed fresh on every
/// query; never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct StatusResponse {
    pub playing: bool,
    pub paused: bool,
    #[serde(rename = "trackToken")]
    pub track_token: Option<String>,
    pub url: Option<String>,
    /// Position in seconds, rounded to one decimal.
    pub position: f64,
    /// Duration in seconds, `null` when the probe could not determine it.
    pub duration: Option<f64>,
    pub song: Option<SongInfo>,
}

impl StatusResponse {
    pub fn idle() -> Self {
        Self {
            playing: false,
            paused: false,
            track_token: None,
            url: None,
            position: 0.0,
            duration: None,
            song: None,
        }
    }
}
