//! REST control surface for the playback service.
//!
//! Every route is a thin delegation into the controller. Domain failures
//! (nothing playing, signal failed, ...) are reported as HTTP 200 bodies
//! with `status: false`, matching the historical wire contract; transport
//! errors never carry playback semantics.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use phonoplayer::{PlaybackController, PlayerError};
use phonostore::SongInfo;

/// Query parameters of `/play`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PlayParams {
    /// Remote location of the audio content
    pub url: String,
    /// Caller-supplied correlation token for this play request
    #[serde(default, rename = "trackToken", alias = "uuid")]
    pub track_token: Option<String>,
    /// Track title to mirror into the shared store
    #[serde(default)]
    pub name: Option<String>,
    /// Artist names
    #[serde(default)]
    pub artists: Option<String>,
    /// Album title
    #[serde(default)]
    pub album: Option<String>,
    /// Cover art URL
    #[serde(default)]
    pub cover: Option<String>,
}

/// Query parameters of `/seek`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SeekParams {
    /// Target position in seconds; fractional values are honored
    pub position: f64,
}

/// Body returned for domain failures.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub status: bool,
    pub message: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

fn domain_error(err: PlayerError) -> axum::response::Response {
    (
        StatusCode::OK,
        Json(ErrorResponse {
            status: false,
            message: err.to_string(),
        }),
    )
        .into_response()
}

/// Start playback of a remote audio URL
///
/// Any active playback is stopped first. The response acknowledges the
/// request; download and player startup continue in the background.
#[utoipa::path(
    get,
    path = "/play",
    params(PlayParams),
    responses(
        (status = 200, description = "Playback acknowledged", body = phonoplayer::PlayResponse)
    )
)]
pub async fn play(
    State(controller): State<PlaybackController>,
    Query(params): Query<PlayParams>,
) -> impl IntoResponse {
    let song = SongInfo {
        name: params.name,
        artists: params.artists,
        album: params.album,
        cover: params.cover,
    };
    Json(controller.play(params.url, params.track_token, song).await)
}

/// Stop playback
#[utoipa::path(
    get,
    path = "/stop",
    responses(
        (status = 200, description = "Playback stopped (idempotent)", body = phonoplayer::StopResponse)
    )
)]
pub async fn stop(State(controller): State<PlaybackController>) -> impl IntoResponse {
    Json(controller.stop().await)
}

/// Pause playback
#[utoipa::path(
    get,
    path = "/pause",
    responses(
        (status = 200, description = "Paused, or failure body when nothing is playing", body = phonoplayer::PauseResponse)
    )
)]
pub async fn pause(State(controller): State<PlaybackController>) -> impl IntoResponse {
    match controller.pause() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => domain_error(err),
    }
}

/// Resume playback
#[utoipa::path(
    get,
    path = "/resume",
    responses(
        (status = 200, description = "Resumed, or failure body when nothing is playing", body = phonoplayer::PauseResponse)
    )
)]
pub async fn resume(State(controller): State<PlaybackController>) -> impl IntoResponse {
    match controller.resume() {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => domain_error(err),
    }
}

/// Seek to a position in seconds
#[utoipa::path(
    get,
    path = "/seek",
    params(SeekParams),
    responses(
        (status = 200, description = "Seek applied (position clamped to the track duration)", body = phonoplayer::SeekResponse)
    )
)]
pub async fn seek(
    State(controller): State<PlaybackController>,
    Query(params): Query<SeekParams>,
) -> impl IntoResponse {
    match controller.seek(params.position).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(err) => domain_error(err),
    }
}

/// Current playback status with progress
#[utoipa::path(
    get,
    path = "/status",
    responses(
        (status = 200, description = "Progress snapshot", body = phonoplayer::StatusResponse)
    )
)]
pub async fn status(State(controller): State<PlaybackController>) -> impl IntoResponse {
    Json(controller.status().await)
}

/// Health check
#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse))
)]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        service: "phono".to_string(),
    })
}

/// Builds the control-surface router over a shared controller.
pub fn router(controller: PlaybackController) -> Router {
    Router::new()
        .route("/play", get(play))
        .route("/stop", get(stop))
        .route("/pause", get(pause))
        .route("/resume", get(resume))
        .route("/seek", get(seek))
        .route("/status", get(status))
        .route("/health", get(health))
        .with_state(controller)
}
