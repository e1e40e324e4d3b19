//! # webterm-bridge
//!
//! Browser terminal bridge: every WebSocket connection gets its own Python
//! process running a fixed script, with the socket wired to the process's
//! standard streams.
//!
//! ## Features
//!
//! - **Interpreter discovery**: probes `PYTHON`, `PYTHON_BIN` and platform
//!   defaults, reporting every candidate tried when none works
//! - **Pipe or PTY**: redirected pipes by default, a native PTY on request
//! - **Lifecycle**: the process dies with the connection and the connection
//!   closes when the process exits
//! - **Raw frames**: input `\r` becomes `\n`; output is streamed as UTF-8 text
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use webterm_bridge::{api, Config};
//!
//! #[tokio::main]
//! async fn main() -> webterm_bridge::Result<()> {
//!     webterm_bridge::logging::try_init().ok();
//!
//!     let config = Config::default();
//!     let state = api::AppState::new(Arc::new(config.build_bridge()));
//!     api::serve(api::ServerConfig::default(), state).await
//! }
//! ```

pub mod api;
pub mod bridge;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod error;
pub mod interpreter;
pub mod logging;
pub mod process;
pub mod text;

// Re-export commonly used types
pub use bridge::{
    Bridge, ConnectionHandle, ConnectionId, Outbound, ScriptTarget, Session, SessionState,
};
pub use config::Config;
pub use error::{BridgeError, Result};
pub use interpreter::{Interpreter, InterpreterLocator, LocatorHints, Platform};
pub use process::{Launcher, PipeLauncher, PtyLauncher, SpawnMode, SpawnSpec};
