//! The playback state machine.
//!
//! `PlaybackController` is the single mutating surface of the service.
//! One mutex serializes all session bookkeeping; blocking work (download,
//! spawn, terminate) always happens outside the critical section, so
//! status queries never wait behind a download or a dying process.
//!
//! Supersession is tracked with a generation counter: every spawned
//! player process gets a fresh generation, and the watcher task that
//! observes its exit only cleans up when its generation still matches the
//! session. A watcher that lost the race (seek restarted the process,
//! stop cleared the session, play replaced it) exits quietly.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tracing::{debug, error, info, warn};

use phonostore::{SongInfo, StateStore};

use crate::clock;
use crate::download::Downloader;
use crate::errors::PlayerError;
use crate::model::{PauseResponse, PlayResponse, SeekResponse, StatusResponse, StopResponse};
use crate::process;
use crate::publisher::StatePublisher;
use crate::session::{PlaybackSession, Timeline};
use crate::supervisor::{ProcessSupervisor, SpawnedProcess};

/// Tunables for the controller and the components it owns.
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    pub player_bin: String,
    pub prober_bin: String,
    pub download_dir: PathBuf,
    pub download_timeout: Duration,
    pub user_agent: String,
    pub referer: String,
    /// Wait after a graceful exit request before forcing a kill.
    pub terminate_grace: Duration,
    /// Wait after a process exit before deleting its audio file.
    pub cleanup_delay: Duration,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            player_bin: "ffplay".to_string(),
            prober_bin: "ffprobe".to_string(),
            download_dir: std::env::temp_dir(),
            download_timeout: Duration::from_secs(30),
            user_agent: String::new(),
            referer: String::new(),
            terminate_grace: Duration::from_secs(5),
            cleanup_delay: Duration::from_millis(500),
        }
    }
}

/// Orchestrates downloads, the external player process, and the shared
/// store mirror for at most one playback session at a time.
///
/// Cloning is cheap (the session state is shared); construct one per
/// service, there is deliberately no global instance.
#[derive(Clone)]
pub struct PlaybackController {
    supervisor: ProcessSupervisor,
    downloader: Downloader,
    publisher: Arc<StatePublisher>,
    session: Arc<Mutex<Option<PlaybackSession>>>,
    session_ids: Arc<AtomicU64>,
    generations: Arc<AtomicU64>,
    cleanup_delay: Duration,
}

impl PlaybackController {
    pub fn new(config: PlayerConfig, store: Arc<dyn StateStore>) -> Result<Self, PlayerError> {
        let downloader = Downloader::new(
            config.download_dir,
            config.download_timeout,
            config.user_agent,
            config.referer,
        )?;
        let supervisor = ProcessSupervisor::new(
            config.player_bin,
            config.prober_bin,
            config.terminate_grace,
        );

        Ok(Self {
            supervisor,
            downloader,
            publisher: Arc::new(StatePublisher::new(store)),
            session: Arc::new(Mutex::new(None)),
            session_ids: Arc::new(AtomicU64::new(0)),
            generations: Arc::new(AtomicU64::new(0)),
            cleanup_delay: config.cleanup_delay,
        })
    }

    /// Clears the store entries a previous run may have left behind.
    /// Call once at startup, before serving requests.
    pub async fn reset_store(&self) {
        self.publisher.clear_all().await;
    }

    /// Starts playback of `source_url`.
    ///
    /// Any active session is fully stopped and cleaned up first, so two
    /// sessions never coexist. Download, probe, and spawn run in a
    /// detached task; the returned acknowledgement only confirms the
    /// request was accepted.
    pub async fn play(
        &self,
        source_url: String,
        track_token: Option<String>,
        song: SongInfo,
    ) -> PlayResponse {
        self.shutdown_session().await;

        let session_id = self.session_ids.fetch_add(1, Ordering::SeqCst) + 1;
        {
            let mut guard = self.session.lock().expect("Session mutex poisoned");
            *guard = Some(PlaybackSession::new(
                session_id,
                source_url.clone(),
                track_token.clone(),
                song.clone(),
            ));
        }

        self.publisher
            .publish_playing(track_token.as_deref(), &song)
            .await;
        info!(
            track = track_token.as_deref().unwrap_or("-"),
            url = elide(&source_url, 80),
            "Playback requested"
        );

        let controller = self.clone();
        let url = source_url;
        tokio::spawn(async move {
            controller.start_session(session_id, url).await;
        });

        PlayResponse {
            status: true,
            message: "Playback started".to_string(),
            track_token,
        }
    }

    /// Stops playback. Idempotent: with no active session this still
    /// succeeds, reports `playing: false`, and re-publishes the idle state.
    pub async fn stop(&self) -> StopResponse {
        let token = self.shutdown_session().await;
        self.publisher.publish_idle(token.as_deref()).await;

        StopResponse {
            status: true,
            message: "Playback stopped".to_string(),
            playing: false,
        }
    }

    /// Suspends the player process at the OS scheduling level.
    pub fn pause(&self) -> Result<PauseResponse, PlayerError> {
        let mut guard = self.session.lock().expect("Session mutex poisoned");
        let session = guard.as_mut().ok_or(PlayerError::NotPlaying)?;
        let handle = session.process.clone().ok_or(PlayerError::NotPlaying)?;
        if handle.has_exited() {
            return Err(PlayerError::NotPlaying);
        }

        if session.timeline.paused {
            return Ok(PauseResponse {
                status: true,
                message: "Already paused".to_string(),
                paused: true,
            });
        }

        // The process may have exited since the check above; the signal
        // then fails and the session is left untouched for a retry.
        process::suspend(handle.pid())?;
        session.timeline.pause(Instant::now());
        info!(pid = handle.pid(), "Playback paused");

        Ok(PauseResponse {
            status: true,
            message: "Paused".to_string(),
            paused: true,
        })
    }

    /// Resumes a suspended player process.
    pub fn resume(&self) -> Result<PauseResponse, PlayerError> {
        let mut guard = self.session.lock().expect("Session mutex poisoned");
        let session = guard.as_mut().ok_or(PlayerError::NotPlaying)?;
        let handle = session.process.clone().ok_or(PlayerError::NotPlaying)?;
        if handle.has_exited() {
            return Err(PlayerError::NotPlaying);
        }

        if !session.timeline.paused {
            return Ok(PauseResponse {
                status: true,
                message: "Already playing".to_string(),
                paused: false,
            });
        }

        process::resume(handle.pid())?;
        session.timeline.resume(Instant::now());
        info!(pid = handle.pid(), "Playback resumed");

        Ok(PauseResponse {
            status: true,
            message: "Resumed".to_string(),
            paused: false,
        })
    }

    /// Seeks by restarting the player against the session's audio file at
    /// the clamped target offset. The caller observes a single blocking
    /// operation; internally the old process is terminated, a fresh one is
    /// spawned, and the pause bookkeeping is reset.
    pub async fn seek(&self, target_seconds: f64) -> Result<SeekResponse, PlayerError> {
        let (session_id, generation, handle, was_paused, path, target) = {
            let mut guard = self.session.lock().expect("Session mutex poisoned");
            let session = guard.as_mut().ok_or(PlayerError::NotPlaying)?;
            let handle = session.process.clone().ok_or(PlayerError::NotPlaying)?;
            let path = session.local_path.clone().ok_or(PlayerError::NotPlaying)?;
            if !path.exists() {
                return Err(PlayerError::NotPlaying);
            }

            let target = clamp_position(target_seconds, session.duration);

            // Claiming the new generation here orphans the old watcher
            // before the old process is terminated, so its exit cannot be
            // mistaken for a natural end of playback.
            let generation = self.next_generation();
            session.generation = generation;

            (
                session.id,
                generation,
                handle,
                session.timeline.paused,
                path,
                target,
            )
        };

        if was_paused {
            // A suspended process cannot act on a graceful exit request.
            let _ = process::resume(handle.pid());
        }
        self.supervisor.terminate(&handle).await;

        let spawned = match self.supervisor.spawn(&path, target) {
            Ok(spawned) => spawned,
            Err(err) => {
                error!(error = %err, "Respawn after seek failed");
                self.abort_session(session_id, Some(path)).await;
                return Err(err);
            }
        };

        let new_handle = spawned.handle.clone();
        let installed = {
            let mut guard = self.session.lock().expect("Session mutex poisoned");
            match guard.as_mut() {
                // The generation check makes concurrent seeks converge on
                // the last writer: a seek that lost its claim must not
                // install a second live process.
                Some(session) if session.id == session_id && session.generation == generation => {
                    session.process = Some(new_handle.clone());
                    session.timeline = Timeline::starting_at(target);
                    true
                }
                _ => false,
            }
        };

        self.spawn_watcher(spawned, generation);

        if !installed {
            self.supervisor.terminate(&new_handle).await;
            return Err(PlayerError::NotPlaying);
        }

        info!(position = target, "Seek complete");
        Ok(SeekResponse {
            status: true,
            message: format!("Seeked to {:.1}s", target),
            position: target,
        })
    }

    /// Read-only progress snapshot, recomputed from the session timeline
    /// on every call. Also re-publishes the store mirror once if an
    /// earlier publish failed.
    pub async fn status(&self) -> StatusResponse {
        let snapshot = {
            let guard = self.session.lock().expect("Session mutex poisoned");
            match guard.as_ref() {
                None => StatusResponse::idle(),
                Some(session) => {
                    let alive = session.is_process_alive();
                    let paused = session.timeline.paused;
                    let position = if alive {
                        clock::position(&session.timeline, Instant::now(), session.duration)
                    } else {
                        0.0
                    };

                    StatusResponse {
                        playing: alive && !paused,
                        paused,
                        track_token: session.track_token.clone(),
                        url: Some(session.source_url.clone()),
                        position: round1(position),
                        duration: session.duration.map(round1),
                        song: if session.song.is_empty() {
                            None
                        } else {
                            Some(session.song.clone())
                        },
                    }
                }
            }
        };

        let song = snapshot.song.clone().unwrap_or_default();
        self.publisher
            .refresh_if_dirty(snapshot.playing, snapshot.track_token.as_deref(), &song)
            .await;

        snapshot
    }

    // -------------------------------------------------------------------
    // Internals
    // -------------------------------------------------------------------

    fn next_generation(&self) -> u64 {
        self.generations.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Terminates and clears the active session, scheduling its audio
    /// file for deletion. Returns the token the session carried. Does not
    /// publish; callers decide whether the store transition is terminal.
    async fn shutdown_session(&self) -> Option<String> {
        let (handle, was_paused, path, token) = {
            let mut guard = self.session.lock().expect("Session mutex poisoned");
            match guard.take() {
                None => return None,
                Some(session) => (
                    session.process.clone(),
                    session.timeline.paused,
                    session.local_path.clone(),
                    session.track_token.clone(),
                ),
            }
        };

        if let Some(handle) = handle {
            if was_paused {
                let _ = process::resume(handle.pid());
            }
            self.supervisor.terminate(&handle).await;
            info!(pid = handle.pid(), "Player process stopped");
        }

        if let Some(path) = path {
            self.schedule_file_cleanup(path);
        }
        token
    }

    /// Download + probe + spawn for a freshly created session; runs as a
    /// detached task so `play` can acknowledge immediately.
    async fn start_session(self, session_id: u64, source_url: String) {
        let path = match self.downloader.fetch(&source_url).await {
            Ok(path) => path,
            Err(err) => {
                error!(error = %err, "Download failed");
                self.abort_session(session_id, None).await;
                return;
            }
        };

        let duration = match self.supervisor.probe(&path).await {
            Ok(duration) => Some(duration),
            Err(err) => {
                warn!(error = %err, "Duration probe failed, continuing with unknown duration");
                None
            }
        };

        let spawned = match self.supervisor.spawn(&path, 0.0) {
            Ok(spawned) => spawned,
            Err(err) => {
                error!(error = %err, "Player spawn failed");
                self.abort_session(session_id, Some(path)).await;
                return;
            }
        };

        let generation = self.next_generation();
        let handle = spawned.handle.clone();
        let installed = {
            let mut guard = self.session.lock().expect("Session mutex poisoned");
            match guard.as_mut() {
                Some(session) if session.id == session_id => {
                    session.local_path = Some(path.clone());
                    session.duration = duration;
                    session.process = Some(handle.clone());
                    session.generation = generation;
                    session.timeline = Timeline::starting_at(0.0);
                    true
                }
                _ => false,
            }
        };

        self.spawn_watcher(spawned, generation);

        if installed {
            info!(
                pid = handle.pid(),
                duration = duration.unwrap_or(0.0),
                path = %path.display(),
                "Playback running"
            );
        } else {
            // Superseded while downloading: the session this task was
            // started for is gone, so its process and file must go too.
            self.supervisor.terminate(&handle).await;
            self.schedule_file_cleanup(path);
        }
    }

    /// Clears the session after a fatal failure, publishing idle so no
    /// consumer is left believing playback is active. A session that was
    /// already superseded is left alone (the store belongs to its
    /// successor), but the orphaned file is still removed.
    async fn abort_session(&self, session_id: u64, path: Option<PathBuf>) {
        let owned = {
            let mut guard = self.session.lock().expect("Session mutex poisoned");
            let is_ours = guard
                .as_ref()
                .map(|session| session.id == session_id)
                .unwrap_or(false);
            if is_ours {
                guard.take().map(|session| session.track_token)
            } else {
                None
            }
        };

        if let Some(token) = owned {
            self.publisher.publish_idle(token.as_deref()).await;
        }
        if let Some(path) = path {
            self.schedule_file_cleanup(path);
        }
    }

    /// Spawns the watcher task owning the player child process. The
    /// watcher blocks on the exit, flips the shared exit flag, then runs
    /// the generation-checked cleanup.
    fn spawn_watcher(&self, spawned: SpawnedProcess, generation: u64) {
        let controller = self.clone();
        tokio::spawn(async move {
            let SpawnedProcess {
                mut child,
                handle,
                exit_tx,
            } = spawned;
            let _ = child.wait().await;
            let _ = exit_tx.send(true);
            controller.handle_process_exit(generation, handle.pid()).await;
        });
    }

    async fn handle_process_exit(&self, generation: u64, pid: u32) {
        let finished = {
            let mut guard = self.session.lock().expect("Session mutex poisoned");
            let is_live = guard
                .as_ref()
                .map(|session| session.generation == generation)
                .unwrap_or(false);
            if is_live {
                guard
                    .take()
                    .map(|session| (session.track_token, session.local_path))
            } else {
                None
            }
        };

        let Some((token, path)) = finished else {
            debug!(pid, generation, "Superseded watcher, no cleanup");
            return;
        };

        info!(
            pid,
            track = token.as_deref().unwrap_or("-"),
            "Playback finished"
        );
        self.publisher.publish_idle(token.as_deref()).await;
        if let Some(path) = path {
            self.schedule_file_cleanup(path);
        }
    }

    /// Deletes `path` after the configured delay. The exiting player may
    /// still have the file mapped; deleting immediately races with that
    /// on some platforms.
    fn schedule_file_cleanup(&self, path: PathBuf) {
        let delay = self.cleanup_delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = tokio::fs::remove_file(&path).await {
                warn!(path = %path.display(), error = %err, "Failed to remove audio file");
            }
        });
    }
}

/// Clamps a seek target into `[0, duration]`, or `[0, ∞)` when the
/// duration is unknown. Non-finite input collapses to 0.
fn clamp_position(target: f64, duration: Option<f64>) -> f64 {
    if !target.is_finite() {
        return 0.0;
    }
    let target = target.max(0.0);
    match duration {
        Some(duration) => target.min(duration),
        None => target,
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// First `max` characters of `url`, for log lines.
fn elide(url: &str, max: usize) -> &str {
    match url.char_indices().nth(max) {
        Some((index, _)) => &url[..index],
        None => url,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_position() {
        assert_eq!(clamp_position(-3.0, Some(200.0)), 0.0);
        assert_eq!(clamp_position(150.5, Some(200.0)), 150.5);
        assert_eq!(clamp_position(500.0, Some(200.0)), 200.0);
        assert_eq!(clamp_position(500.0, None), 500.0);
        assert_eq!(clamp_position(f64::NAN, Some(200.0)), 0.0);
        assert_eq!(clamp_position(f64::INFINITY, None), 0.0);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(10.04), 10.0);
        assert_eq!(round1(10.05), 10.1);
        assert_eq!(round1(0.0), 0.0);
    }

    #[test]
    fn test_elide_respects_char_boundaries() {
        assert_eq!(elide("abcdef", 3), "abc");
        assert_eq!(elide("ab", 3), "ab");
        assert_eq!(elide("héllo wörld", 7), "héllo w");
    }
}
