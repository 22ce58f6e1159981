//! HTTP API
//!
//! Routes for health, login, chat and session management over [`AppState`].

pub mod error;
mod routes;
pub mod schemas;
mod state;

pub use error::{ApiError, ErrorResponse};
pub use state::AppState;

use anyhow::{Context, Result};
use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/login", post(routes::login))
        .route("/chat", post(routes::chat))
        .route(
            "/sessions/:user_id/:session_id",
            get(routes::session_info).delete(routes::clear_session),
        )
        .route(
            "/sessions/:user_id/:session_id/history",
            get(routes::session_history),
        )
        .route(
            "/sessions/:user_id/:session_id/summary",
            get(routes::session_summary),
        )
        .route("/users/:user_id/accounts", get(routes::user_accounts))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Serve until ctrl-c
pub async fn serve(state: AppState, bind_address: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {bind_address}"))?;
    info!(address = bind_address, "adscope API listening");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("received shutdown signal, stopping server");
        })
        .await
        .context("HTTP server failed")
}
