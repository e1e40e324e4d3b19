//! HTTP handlers.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    response::{Html, IntoResponse, Response},
};

use super::websocket::handle_socket;
use crate::bridge::Bridge;

/// Terminal page served at `/`.
pub const INDEX_HTML: &str = include_str!("../../assets/index.html");

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub bridge: Arc<Bridge>,
}

impl AppState {
    pub fn new(bridge: Arc<Bridge>) -> Self {
        Self { bridge }
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bridge", &self.bridge)
            .finish()
    }
}

/// Health check endpoint.
pub async fn health() -> &'static str {
    "OK"
}

/// Root route: upgrade WebSocket requests, serve the terminal view otherwise.
pub async fn index(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_socket(socket, state))
            .into_response(),
        Err(_) => Html(INDEX_HTML).into_response(),
    }
}
