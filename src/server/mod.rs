pub mod handlers;
pub mod state;
pub mod url_validation;

use crate::config::Config;
use axum::{
    Router,
    http::{HeaderValue, header::HeaderName},
    middleware,
    response::Response,
    routing::get,
};
use state::AppState;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

/// Build the application router over `state`.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::health::health_check))
        .route("/health", get(handlers::health::health_check))
        .route("/metrics", get(handlers::health::metrics))
        .route("/favicon.ico", get(handlers::health::favicon))
        .route("/stream", get(handlers::stream::stream_url))
        .route("/stream/{video_id}", get(handlers::stream::stream_redirect))
        .route("/proxy-stream", get(handlers::relay::proxy_stream))
        .route("/search", get(handlers::catalog::search))
        .route("/metadata", get(handlers::catalog::metadata))
        .route("/trending", get(handlers::catalog::trending))
        .route("/playlist", get(handlers::catalog::playlist))
        .route("/album", get(handlers::catalog::album))
        .route("/artist", get(handlers::catalog::artist))
        .fallback(get(handlers::health::catch_all))
        .layer(middleware::map_response(add_version_header))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn add_version_header(mut response: Response) -> Response {
    response.headers_mut().insert(
        HeaderName::from_static("x-songrelay-version"),
        HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
    );
    response
}

/// Start the Axum HTTP server and the cache sweeper; returns on Ctrl-C.
pub async fn start(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("0.0.0.0:{}", config.port);
    let sweep_interval = config.cache_sweep_interval_secs;

    let state = AppState::new(config)?;
    let shutdown = CancellationToken::new();

    let sweeper = (sweep_interval > 0).then(|| {
        state
            .streams
            .cache()
            .spawn_sweeper(Duration::from_secs(sweep_interval), shutdown.clone())
    });

    let app = build_router(state);

    let listener = match tokio::net::TcpListener::bind(addr.as_str()).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind to address {}: {}", addr, e);
            return Err(e.into());
        }
    };

    info!("Server listening on http://{}", addr);

    let signal = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested");
            signal.cancel();
        })
        .await;

    shutdown.cancel();
    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }

    if let Err(e) = served {
        error!("Server error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
