//! End-to-end tests for the playback controller, driven by stub player
//! and prober executables so no real media tooling is needed.

#![cfg(unix)]

use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::http::header;
use axum::routing::get;

use phonoplayer::{PlaybackController, PlayerConfig, StatusResponse};
use phonostore::{
    KEY_CURRENT, KEY_PLAYER_STATUS, MemoryStore, PlayerStatusRecord, SongInfo, StateStore,
};

/// Installs an executable stub under `dir`.
fn write_stub(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    let mut perms = std::fs::metadata(&path).unwrap().permissions();
    perms.set_mode(0o755);
    std::fs::set_permissions(&path, perms).unwrap();
    path
}

/// Serves `/track.mp3` from memory and returns the base URL.
async fn serve_track() -> String {
    let router = Router::new().route(
        "/track.mp3",
        get(|| async { ([(header::CONTENT_TYPE, "audio/mpeg")], vec![0u8; 4096]) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

struct Harness {
    controller: PlaybackController,
    store: Arc<MemoryStore>,
    base_url: String,
    download_dir: tempfile::TempDir,
    _bin_dir: tempfile::TempDir,
}

/// Builds a controller whose "player" runs the given script body and
/// whose "prober" reports a 200 second duration.
async fn harness(player_body: &str) -> Harness {
    let bin_dir = tempfile::tempdir().unwrap();
    let download_dir = tempfile::tempdir().unwrap();
    let player = write_stub(bin_dir.path(), "player.sh", player_body);
    let prober = write_stub(bin_dir.path(), "prober.sh", "echo 200");

    let config = PlayerConfig {
        player_bin: player.to_str().unwrap().to_string(),
        prober_bin: prober.to_str().unwrap().to_string(),
        download_dir: download_dir.path().to_path_buf(),
        download_timeout: Duration::from_secs(5),
        user_agent: "phono-test".to_string(),
        referer: String::new(),
        terminate_grace: Duration::from_secs(1),
        cleanup_delay: Duration::from_millis(50),
    };

    let store = Arc::new(MemoryStore::new());
    let controller = PlaybackController::new(config, store.clone()).unwrap();
    let base_url = serve_track().await;

    Harness {
        controller,
        store,
        base_url,
        download_dir,
        _bin_dir: bin_dir,
    }
}

impl Harness {
    fn track_url(&self) -> String {
        format!("{}/track.mp3", self.base_url)
    }

    async fn play(&self, token: &str) {
        self.controller
            .play(
                self.track_url(),
                Some(token.to_string()),
                SongInfo::default(),
            )
            .await;
    }

    /// Polls status until `predicate` holds or a generous timeout expires.
    async fn wait_for(
        &self,
        predicate: impl Fn(&StatusResponse) -> bool,
        what: &str,
    ) -> StatusResponse {
        for _ in 0..200 {
            let status = self.controller.status().await;
            if predicate(&status) {
                return status;
            }
            tokio::time::sleep(Duration::from_millis(25)).await;
        }
        panic!(
            "timed out waiting for: {what}; last status: {:?}",
            self.controller.status().await
        );
    }

    async fn player_status(&self) -> Option<PlayerStatusRecord> {
        self.store
            .get(KEY_PLAYER_STATUS)
            .await
            .unwrap()
            .map(|raw| serde_json::from_str(&raw).unwrap())
    }

    async fn current_track_raw(&self) -> Option<String> {
        self.store.get(KEY_CURRENT).await.unwrap()
    }

    fn download_count(&self) -> usize {
        std::fs::read_dir(self.download_dir.path()).unwrap().count()
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_play_reaches_playing_state() {
    let h = harness("exec sleep 300").await;

    let ack = h
        .controller
        .play(h.track_url(), Some("t1".to_string()), SongInfo::default())
        .await;
    assert!(ack.status);
    assert_eq!(ack.track_token.as_deref(), Some("t1"));

    let status = h.wait_for(|s| s.playing, "playback to start").await;
    assert_eq!(status.track_token.as_deref(), Some("t1"));
    assert_eq!(status.duration, Some(200.0));
    assert!(!status.paused);

    let record = h.player_status().await.unwrap();
    assert!(record.playing);
    assert_eq!(record.play_uuid.as_deref(), Some("t1"));
    assert!(h.current_track_raw().await.is_some());

    h.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_with_nothing_active_is_a_noop_success() {
    let h = harness("exec sleep 300").await;

    let response = h.controller.stop().await;
    assert!(response.status);
    assert!(!response.playing);

    let record = h.player_status().await.unwrap();
    assert!(!record.playing);
    assert_eq!(h.download_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_freezes_position_and_resume_continues() {
    let h = harness("exec sleep 300").await;
    h.play("t1").await;
    h.wait_for(|s| s.playing, "playback to start").await;

    tokio::time::sleep(Duration::from_millis(300)).await;
    let paused = h.controller.pause().unwrap();
    assert!(paused.status && paused.paused);

    let frozen = h.controller.status().await;
    assert!(frozen.paused);
    assert!(!frozen.playing);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let still_frozen = h.controller.status().await;
    assert_eq!(still_frozen.position, frozen.position);

    // Idempotent second pause
    let again = h.controller.pause().unwrap();
    assert!(again.status && again.paused);

    let resumed = h.controller.resume().unwrap();
    assert!(resumed.status && !resumed.paused);

    // Position picks up where the pause left it, then advances
    let after = h.controller.status().await;
    assert!(after.position >= frozen.position);
    assert!(after.position - frozen.position < 0.3);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let later = h.controller.status().await;
    assert!(later.position > after.position);

    h.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_pause_without_session_fails() {
    let h = harness("exec sleep 300").await;
    assert!(h.controller.pause().is_err());
    assert!(h.controller.resume().is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_seek_repositions_with_clamping() {
    let h = harness("exec sleep 300").await;
    h.play("t1").await;
    h.wait_for(|s| s.playing, "playback to start").await;

    let response = h.controller.seek(150.5).await.unwrap();
    assert!(response.status);
    assert!((response.position - 150.5).abs() < 1e-9);

    let status = h.controller.status().await;
    assert!(status.playing);
    assert!(status.position >= 150.5 && status.position < 152.0);

    // Beyond the duration the target clamps to it
    let response = h.controller.seek(500.0).await.unwrap();
    assert_eq!(response.position, 200.0);

    // Negative targets clamp to zero
    let response = h.controller.seek(-10.0).await.unwrap();
    assert_eq!(response.position, 0.0);

    h.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_seek_while_paused_resets_pause_state() {
    let h = harness("exec sleep 300").await;
    h.play("t1").await;
    h.wait_for(|s| s.playing, "playback to start").await;

    h.controller.pause().unwrap();
    let response = h.controller.seek(42.0).await.unwrap();
    assert!(response.status);

    let status = h.controller.status().await;
    assert!(!status.paused);
    assert!(status.playing);
    assert!(status.position >= 42.0 && status.position < 44.0);

    h.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_seek_without_session_fails() {
    let h = harness("exec sleep 300").await;
    assert!(h.controller.seek(10.0).await.is_err());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_natural_exit_cleans_up_everything() {
    // Player exits on its own almost immediately.
    let h = harness("sleep 0.5").await;
    h.play("t1").await;
    h.wait_for(|s| s.playing, "playback to start").await;

    let status = h
        .wait_for(|s| !s.playing && s.track_token.is_none(), "natural exit")
        .await;
    assert!(!status.paused);

    let record = h.player_status().await.unwrap();
    assert!(!record.playing);
    assert!(h.current_track_raw().await.is_none());

    // The audio file is deleted after the grace delay
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.download_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_play_supersedes_play() {
    let h = harness("exec sleep 300").await;
    h.play("t1").await;
    h.wait_for(|s| s.playing, "first playback").await;

    h.play("t2").await;
    let status = h
        .wait_for(
            |s| s.playing && s.track_token.as_deref() == Some("t2"),
            "second playback",
        )
        .await;
    assert_eq!(status.track_token.as_deref(), Some("t2"));

    let record = h.player_status().await.unwrap();
    assert_eq!(record.play_uuid.as_deref(), Some("t2"));

    // The first session's audio file is eventually removed; only the
    // live session's file remains.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.download_count(), 1);

    h.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_concurrent_pauses_converge() {
    let h = harness("exec sleep 300").await;
    h.play("t1").await;
    h.wait_for(|s| s.playing, "playback to start").await;

    let a = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.pause() })
    };
    let b = {
        let controller = h.controller.clone();
        tokio::spawn(async move { controller.pause() })
    };
    let (a, b) = (a.await.unwrap(), b.await.unwrap());

    // Both calls succeed (one as an idempotent no-op) and the session
    // ends up paused exactly once.
    assert!(a.unwrap().paused);
    assert!(b.unwrap().paused);
    let status = h.controller.status().await;
    assert!(status.paused && !status.playing);

    h.controller.resume().unwrap();
    h.controller.stop().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn test_download_failure_publishes_idle() {
    let h = harness("exec sleep 300").await;

    // Nothing listens on this port
    h.controller
        .play(
            "http://127.0.0.1:1/nope.mp3".to_string(),
            Some("t1".to_string()),
            SongInfo::default(),
        )
        .await;

    h.wait_for(|s| s.track_token.is_none(), "session abort").await;
    let record = h.player_status().await.unwrap();
    assert!(!record.playing);
    assert!(h.current_track_raw().await.is_none());
    assert_eq!(h.download_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_spawn_failure_publishes_idle_and_removes_file() {
    let mut h = harness("exec sleep 300").await;
    // Rebuild the controller with a player binary that cannot exist.
    let config = PlayerConfig {
        player_bin: "/nonexistent/player-binary".to_string(),
        prober_bin: "true".to_string(),
        download_dir: h.download_dir.path().to_path_buf(),
        download_timeout: Duration::from_secs(5),
        user_agent: String::new(),
        referer: String::new(),
        terminate_grace: Duration::from_secs(1),
        cleanup_delay: Duration::from_millis(50),
    };
    h.controller = PlaybackController::new(config, h.store.clone()).unwrap();

    h.controller
        .play(h.track_url(), Some("t1".to_string()), SongInfo::default())
        .await;

    h.wait_for(|s| s.track_token.is_none(), "session abort").await;
    let record = h.player_status().await.unwrap();
    assert!(!record.playing);

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.download_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_stop_while_paused() {
    let h = harness("exec sleep 300").await;
    h.play("t1").await;
    h.wait_for(|s| s.playing, "playback to start").await;

    h.controller.pause().unwrap();
    let response = h.controller.stop().await;
    assert!(response.status && !response.playing);

    let status = h.controller.status().await;
    assert!(!status.playing && status.track_token.is_none());

    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(h.download_count(), 0);
}
