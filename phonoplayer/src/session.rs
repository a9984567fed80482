//! Session state for one playback attempt.
//!
//! A [`PlaybackSession`] owns everything tied to a single play request: the
//! downloaded audio file, the live player process, and the timestamp
//! bookkeeping the progress clock computes positions from. The controller
//! holds at most one session at a time.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use phonostore::SongInfo;

use crate::supervisor::ProcessHandle;

/// Timestamp bookkeeping for computing the playback position without ever
/// polling the player process.
///
/// `paused_at` is only meaningful while `paused` is true.
#[derive(Debug, Clone)]
pub struct Timeline {
    /// When the current player process started rendering.
    pub started_at: Instant,
    /// Offset the current process was started at (0 for the initial play).
    pub seek_offset: f64,
    pub paused: bool,
    pub paused_at: Option<Instant>,
    /// Total time spent suspended since the current process started.
    pub total_paused: Duration,
}

impl Timeline {
    /// Fresh timeline for a process starting now at the given offset.
    pub fn starting_at(seek_offset: f64) -> Self {
        Self {
            started_at: Instant::now(),
            seek_offset,
            paused: false,
            paused_at: None,
            total_paused: Duration::ZERO,
        }
    }

    /// Marks the timeline paused as of `now`. No-op when already paused.
    pub fn pause(&mut self, now: Instant) {
        if !self.paused {
            self.paused = true;
            self.paused_at = Some(now);
        }
    }

    /// Clears the pause state, folding the elapsed pause interval into
    /// `total_paused`. No-op when not paused.
    pub fn resume(&mut self, now: Instant) {
        if self.paused {
            if let Some(paused_at) = self.paused_at {
                self.total_paused += now.duration_since(paused_at);
            }
            self.paused = false;
            self.paused_at = None;
        }
    }
}

/// State and resources for one continuous playback attempt.
#[derive(Debug)]
pub struct PlaybackSession {
    /// Controller-unique identifier, used by detached tasks to recognize
    /// that the session they were started for is still the live one.
    pub id: u64,
    /// Caller-supplied correlation token.
    pub track_token: Option<String>,
    pub source_url: String,
    pub song: SongInfo,
    /// Downloaded audio file; `None` until the download completes.
    /// Exclusively owned by this session, reused across seek restarts.
    pub local_path: Option<PathBuf>,
    /// Probed duration in seconds; `None` when the probe failed.
    pub duration: Option<f64>,
    pub timeline: Timeline,
    /// Generation of the live player process. Bumped on every spawn; a
    /// watcher whose generation no longer matches must not clean up.
    pub generation: u64,
    /// Handle to the live player process; `None` until spawned.
    pub process: Option<ProcessHandle>,
}

impl PlaybackSession {
    pub fn new(id: u64, source_url: String, track_token: Option<String>, song: SongInfo) -> Self {
        Self {
            id,
            track_token,
            source_url,
            song,
            local_path: None,
            duration: None,
            timeline: Timeline::starting_at(0.0),
            generation: 0,
            process: None,
        }
    }

    /// True while the player process has been spawned and has not exited.
    pub fn is_process_alive(&self) -> bool {
        self.process
            .as_ref()
            .map(|handle| !handle.has_exited())
            .unwrap_or(false)
    }
}
