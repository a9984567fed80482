//! OpenAPI documentation for the control surface.

use utoipa::OpenApi;

use crate::api;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Phono AudioService",
        description = "Playback-control service driving an external audio player",
        version = "0.1.0"
    ),
    paths(
        api::play,
        api::stop,
        api::pause,
        api::resume,
        api::seek,
        api::status,
        api::health,
    ),
    components(schemas(
        phonoplayer::PlayResponse,
        phonoplayer::StopResponse,
        phonoplayer::PauseResponse,
        phonoplayer::SeekResponse,
        phonoplayer::StatusResponse,
        phonostore::SongInfo,
        api::ErrorResponse,
        api::HealthResponse,
    ))
)]
pub struct ApiDoc;
