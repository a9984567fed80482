use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use phonoconfig::get_config;
use phonoplayer::{PlaybackController, PlayerConfig};
use phonostore::{MemoryStore, RedisStore, StateStore};

#[tokio::main]
async fn main() -> Result<()> {
    phonoserver::logs::init_logging();

    let config = get_config();

    let store_url = config.get_store_url();
    let store: Arc<dyn StateStore> = match RedisStore::connect(&store_url).await {
        Ok(store) => {
            info!(url = %store_url, "Connected to shared store");
            Arc::new(store)
        }
        Err(err) => {
            warn!(url = %store_url, error = %err, "Shared store unavailable, state mirroring disabled");
            Arc::new(MemoryStore::new())
        }
    };

    let player_config = PlayerConfig {
        player_bin: config.get_player_bin(),
        prober_bin: config.get_prober_bin(),
        download_dir: PathBuf::from(config.get_download_dir()?),
        download_timeout: Duration::from_secs(config.get_download_timeout_secs()),
        user_agent: config.get_user_agent(),
        referer: config.get_referer(),
        terminate_grace: Duration::from_secs(config.get_terminate_grace_secs()),
        cleanup_delay: Duration::from_millis(config.get_cleanup_delay_ms()),
    };
    info!(player = %player_config.player_bin, prober = %player_config.prober_bin, "Player configured");

    let controller = PlaybackController::new(player_config, store)?;
    // A previous run may have left stale "playing" state behind.
    controller.reset_store().await;

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = phonoserver::api::router(controller)
        .merge(
            SwaggerUi::new("/swagger-ui")
                .url("/api-docs/openapi.json", phonoserver::ApiDoc::openapi()),
        )
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.get_http_port()));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "Phono audio service listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown requested");
}
