//! HTTP/WebSocket API for the landlord server.
//!
//! # Endpoints Overview
//!
//! - `GET /ws?userid=<id>&username=<name>` - Establish a player session
//! - `GET /health` - Server health status
//!
//! Everything a player does after connecting travels as JSON array frames
//! over the websocket; see [`landlord::net::messages`].
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use landlord::RoomManager;
//! use landlord_server::{api::{AppState, create_router}, config::ServerConfig};
//! use std::sync::Arc;
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let config = ServerConfig::from_env(None);
//! let state = AppState {
//!     registry: Arc::new(RoomManager::new(config.room_configs(), config.robots)),
//!     config: Arc::new(config),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:6969").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is configured permissively for development. In production, configure
//! appropriate origins, methods, and headers.

pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use landlord::RoomManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RoomManager>,
    pub config: Arc<ServerConfig>,
}

/// Create the API router.
///
/// # Arguments
///
/// - `state`: Application state with the room registry
///
/// # Returns
///
/// Configured Axum router ready to serve requests
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// # Example
///
/// ```bash
/// curl http://localhost:6969/health
/// # {"status":"healthy","version":"0.1.0","rooms":2,"tables":0}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let rooms = state.registry.list_rooms().await.len();
    let tables = state.registry.active_table_count().await;

    let response = json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "rooms": rooms,
        "tables": tables,
    });

    (StatusCode::OK, Json(response))
}
