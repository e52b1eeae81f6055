// src/server/mod.rs

//! HTTP query API consumed by the dashboard.

pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::{get, put},
};
use tokio::{net::TcpListener, signal};
use tower_http::cors::{Any, CorsLayer};

use crate::error::Result;
use crate::models::ServerConfig;
use crate::storage::Store;

/// Store handle shared by every handler.
pub type SharedStore = Arc<Store>;

/// Build the API router.
pub fn router(store: SharedStore, cors_max_age: Duration) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(cors_max_age);

    Router::new()
        .route("/", get(routes::health))
        .route("/api/students", get(routes::students))
        .route("/api/homeworks", get(routes::homeworks))
        .route("/api/llms", get(routes::llms))
        .route("/api/posts", get(routes::posts).post(routes::create_post))
        .route("/api/posts/:post_id", put(routes::update_post))
        .route(
            "/api/submissions",
            get(routes::submission).post(routes::create_submission),
        )
        .route("/api/sentiment", get(routes::sentiment))
        .layer(cors)
        .with_state(store)
}

/// Serve the API until Ctrl+C or SIGTERM.
pub async fn serve(config: &ServerConfig, store: SharedStore) -> Result<()> {
    let app = router(store, Duration::from_secs(config.cors_max_age_secs));

    let address = config.address();
    let listener = TcpListener::bind(&address).await?;
    log::info!("Server running on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => log::info!("Received Ctrl+C, shutting down"),
            Err(e) => log::error!("Failed to listen for Ctrl+C: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                log::info!("Received SIGTERM, shutting down");
            }
            Err(e) => {
                log::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
