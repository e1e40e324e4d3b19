//! HTTP and WebSocket surface.
//!
//! ## Endpoints
//!
//! - `GET /` - Terminal view, or a WebSocket upgrade when the request asks
//!   for one
//! - `GET /health` - Health check
//!
//! Each WebSocket connection gets its own [`Session`](crate::bridge::Session).
//! Inbound frames (text or binary) are raw terminal input; process output is
//! sent back as text frames with no envelope.
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use webterm_bridge::api::{serve, AppState, ServerConfig};
//! use webterm_bridge::bridge::{Bridge, ScriptTarget};
//! use webterm_bridge::interpreter::InterpreterLocator;
//! use webterm_bridge::process::SpawnMode;
//!
//! #[tokio::main]
//! async fn main() -> webterm_bridge::Result<()> {
//!     let bridge = Bridge::new(
//!         ScriptTarget::new("run.py", "."),
//!         SpawnMode::Pipe.launcher(),
//!         InterpreterLocator::new(),
//!     );
//!     let state = AppState::new(Arc::new(bridge));
//!     serve(ServerConfig::new("127.0.0.1", 3000), state).await
//! }
//! ```

pub mod handlers;
pub mod router;
pub mod websocket;

pub use handlers::AppState;
pub use router::{create_router, serve, shutdown_signal, ServerConfig};
