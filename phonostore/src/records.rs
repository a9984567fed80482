use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[cfg(feature = "openapi")]
use utoipa::ToSchema;

/// Display metadata for a track, as supplied by the caller of `play`.
///
/// All fields are optional; an empty record still publishes a valid
/// current-track entry carrying the token only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(ToSchema))]
pub struct SongInfo {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub artists: Option<String>,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub cover: Option<String>,
}

impl SongInfo {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.artists.is_none() && self.album.is_none() && self.cover.is_none()
    }
}

/// JSON shape of the `music:current` entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentTrackRecord {
    /// Token of the play request this record belongs to.
    pub play_uuid: String,
    #[serde(flatten)]
    pub song: SongInfo,
    pub updated_at: DateTime<Utc>,
}

impl CurrentTrackRecord {
    pub fn new(play_uuid: impl Into<String>, song: SongInfo) -> Self {
        Self {
            play_uuid: play_uuid.into(),
            song,
            updated_at: Utc::now(),
        }
    }
}

/// JSON shape of the `music:player_status` entry.
///
/// Field casing follows the historical wire contract (`playUuid`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStatusRecord {
    pub playing: bool,
    #[serde(rename = "playUuid")]
    pub play_uuid: Option<String>,
}

impl PlayerStatusRecord {
    pub fn idle() -> Self {
        Self {
            playing: false,
            play_uuid: None,
        }
    }

    pub fn playing(play_uuid: impl Into<String>) -> Self {
        Self {
            playing: true,
            play_uuid: Some(play_uuid.into()),
        }
    }
}
