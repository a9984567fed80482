//! Playback position computation.
//!
//! The position is always recomputed from the session timeline and the
//! caller-supplied "now" instant; nothing is cached, so the snapshot is
//! accurate immediately after a resume or a seek.

use std::time::Instant;

use crate::session::Timeline;

/// Computes the playback position in seconds for the given timeline.
///
/// While paused the position is frozen at the instant the pause started;
/// while playing it advances with wall-clock time minus the accumulated
/// pause intervals. The result is clamped into `[seek_offset, duration]`
/// when the duration is known, `[seek_offset, ∞)` otherwise.
pub fn position(timeline: &Timeline, now: Instant, duration: Option<f64>) -> f64 {
    let reference = if timeline.paused {
        timeline.paused_at.unwrap_or(now)
    } else {
        now
    };

    let elapsed = reference.duration_since(timeline.started_at).as_secs_f64()
        - timeline.total_paused.as_secs_f64();

    let mut position = timeline.seek_offset + elapsed.max(0.0);
    if let Some(duration) = duration {
        position = position.min(duration);
    }
    position
}
