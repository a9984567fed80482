//! External player process supervision.
//!
//! The supervisor spawns the player and prober binaries and provides the
//! termination primitive used by stop and seek. It never keeps its own
//! registry of processes: each spawned player is owned by exactly one
//! watcher task (driven by the controller), which is the only place the
//! child is awaited; everyone else observes the process through a cheap
//! [`ProcessHandle`].

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tokio::process::{Child, Command};
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, warn};

use crate::errors::PlayerError;
use crate::process;

/// How long to wait for the prober to produce a duration.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Bounded wait for exit confirmation after a forced kill.
const KILL_CONFIRM_TIMEOUT: Duration = Duration::from_secs(2);

/// Shared, cloneable view of a spawned player process.
///
/// The exit flag is flipped by the watcher task that owns the underlying
/// child, so liveness checks and bounded exit waits never need to touch
/// the child itself.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    exit_rx: watch::Receiver<bool>,
}

impl ProcessHandle {
    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        *self.exit_rx.borrow()
    }

    /// Resolves once the watcher has observed the process exit.
    pub async fn wait_exited(&self) {
        let mut rx = self.exit_rx.clone();
        // A dropped sender also means the watcher is gone and the process
        // has been reaped.
        let _ = rx.wait_for(|exited| *exited).await;
    }
}

/// A freshly spawned player process, to be handed to a watcher task.
#[derive(Debug)]
pub struct SpawnedProcess {
    pub child: Child,
    pub handle: ProcessHandle,
    pub exit_tx: watch::Sender<bool>,
}

/// Spawns and terminates the external player, probes durations.
#[derive(Debug, Clone)]
pub struct ProcessSupervisor {
    player_bin: String,
    prober_bin: String,
    terminate_grace: Duration,
}

impl ProcessSupervisor {
    pub fn new(player_bin: String, prober_bin: String, terminate_grace: Duration) -> Self {
        Self {
            player_bin,
            prober_bin,
            terminate_grace,
        }
    }

    /// Starts the player against `path` at `offset` seconds.
    ///
    /// The player is invoked headless and exits by itself at end of
    /// stream; all of its output is discarded. Fractional offsets are
    /// passed through unrounded.
    pub fn spawn(&self, path: &Path, offset: f64) -> Result<SpawnedProcess, PlayerError> {
        let mut command = Command::new(&self.player_bin);
        command.args(["-nodisp", "-autoexit", "-loglevel", "quiet"]);
        if offset > 0.0 {
            command.arg("-ss").arg(offset.to_string());
        }
        command
            .arg(path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let child = command.spawn().map_err(PlayerError::spawn)?;
        let pid = child
            .id()
            .ok_or_else(|| PlayerError::spawn("player exited before it could be tracked"))?;

        let (exit_tx, exit_rx) = watch::channel(false);
        debug!(pid, path = %path.display(), offset, "Spawned player process");

        Ok(SpawnedProcess {
            child,
            handle: ProcessHandle { pid, exit_rx },
            exit_tx,
        })
    }

    /// Requests a graceful exit, escalating to a forced kill when the
    /// process has not exited within the configured grace period.
    pub async fn terminate(&self, handle: &ProcessHandle) {
        if handle.has_exited() {
            return;
        }

        if let Err(err) = process::request_exit(handle.pid()) {
            debug!(pid = handle.pid(), error = %err, "Graceful exit request failed");
        }

        if timeout(self.terminate_grace, handle.wait_exited())
            .await
            .is_ok()
        {
            return;
        }

        warn!(
            pid = handle.pid(),
            grace_secs = self.terminate_grace.as_secs_f64(),
            "Player did not exit within grace period, forcing kill"
        );
        if let Err(err) = process::force_kill(handle.pid()) {
            warn!(pid = handle.pid(), error = %err, "Forced kill failed");
        }
        let _ = timeout(KILL_CONFIRM_TIMEOUT, handle.wait_exited()).await;
    }

    /// Asks the external prober for the duration of `path` in seconds.
    pub async fn probe(&self, path: &Path) -> Result<f64, PlayerError> {
        let output = timeout(
            PROBE_TIMEOUT,
            Command::new(&self.prober_bin)
                .args(["-v", "quiet", "-show_entries", "format=duration", "-of", "csv=p=0"])
                .arg(path)
                .stdin(Stdio::null())
                .output(),
        )
        .await
        .map_err(|_| PlayerError::probe("prober timed out"))?
        .map_err(PlayerError::probe)?;

        if !output.status.success() {
            return Err(PlayerError::probe(format!(
                "prober exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let duration: f64 = stdout
            .trim()
            .parse()
            .map_err(|_| PlayerError::probe(format!("unparseable prober output {:?}", stdout.trim())))?;

        if duration.is_finite() && duration > 0.0 {
            Ok(duration)
        } else {
            Err(PlayerError::probe(format!(
                "implausible duration {duration}"
            )))
        }
    }
}
