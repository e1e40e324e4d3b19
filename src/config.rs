//! Configuration management for webterm-bridge.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. Configuration file (JSON)
//! 4. Default values

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::api::ServerConfig;
use crate::bridge::{Bridge, ScriptTarget};
use crate::cli::Args;
use crate::credentials;
use crate::interpreter::InterpreterLocator;
use crate::process::SpawnMode;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Server configuration.
    pub server: ServerSection,
    /// What each connection runs.
    pub bridge: BridgeSection,
    /// Startup credential file.
    pub credentials: CredentialsSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Server configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Enable graceful shutdown.
    pub graceful_shutdown: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            graceful_shutdown: true,
        }
    }
}

/// Bridge configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    /// Script run for every connection, relative to `root_dir`.
    pub script: PathBuf,
    /// Working directory of the script.
    pub root_dir: PathBuf,
    /// Run the interpreter with `-u`.
    pub unbuffered: bool,
    /// Pipes or PTY.
    pub spawn_mode: SpawnMode,
    /// Probe for an interpreter once instead of on every connection.
    pub cache_interpreter: bool,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            script: PathBuf::from("run.py"),
            root_dir: PathBuf::from("."),
            unbuffered: true,
            spawn_mode: SpawnMode::Pipe,
            cache_interpreter: false,
        }
    }
}

/// Credentials configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialsSection {
    /// Environment variable holding the blob.
    pub env_var: String,
    /// File the blob is written to.
    pub path: PathBuf,
}

impl Default for CredentialsSection {
    fn default() -> Self {
        Self {
            env_var: credentials::DEFAULT_ENV_VAR.to_string(),
            path: PathBuf::from(credentials::DEFAULT_PATH),
        }
    }
}

/// Logging configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace) or a filter directive.
    ///
    /// `None` leaves filtering to `RUST_LOG`, falling back to
    /// `webterm_bridge=info`.
    pub level: Option<String>,
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        self.apply_env_with(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_with<F>(&mut self, var: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms set PORT and expect the service on all interfaces
        if let Some(port) = var("PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
            self.server.host = "0.0.0.0".to_string();
        }

        if let Some(host) = var("WEBTERM_HOST") {
            self.server.host = host;
        }

        if let Some(port) = var("WEBTERM_PORT").and_then(|p| p.trim().parse().ok()) {
            self.server.port = port;
        }

        if let Some(script) = var("WEBTERM_SCRIPT").filter(|s| !s.is_empty()) {
            self.bridge.script = PathBuf::from(script);
        }

        if let Some(root) = var("WEBTERM_ROOT").filter(|s| !s.is_empty()) {
            self.bridge.root_dir = PathBuf::from(root);
        }

        if let Some(mode) = var("WEBTERM_SPAWN_MODE").and_then(|m| m.parse().ok()) {
            self.bridge.spawn_mode = mode;
        }

        // RUST_LOG keeps its usual meaning and is read by the subscriber itself
        if let Some(level) = var("WEBTERM_LOG_LEVEL") {
            self.logging.level = Some(level);
        } else if var("RUST_LOG").is_some() {
            self.logging.level = None;
        }
    }

    /// Apply CLI argument overrides.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(host) = args.host {
            self.server.host = host.to_string();
        }

        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref script) = args.script {
            self.bridge.script = script.clone();
        }

        if let Some(ref root) = args.root {
            self.bridge.root_dir = root.clone();
        }

        if args.pty {
            self.bridge.spawn_mode = SpawnMode::Pty;
        }

        if let Some(ref level) = args.log_level {
            self.logging.level = Some(level.clone());
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load(args: &Args) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        if let Some(ref path) = args.config {
            config = Config::from_file(path)?;
        }

        config.apply_env();
        config.apply_args(args);

        Ok(config)
    }

    /// Convert to ServerConfig for the HTTP server.
    pub fn to_server_config(&self) -> Result<ServerConfig, ConfigError> {
        let host: IpAddr = self
            .server
            .host
            .parse()
            .map_err(|_| ConfigError::InvalidHost(self.server.host.clone()))?;

        let mut server_config = ServerConfig::new(host.to_string(), self.server.port);
        if !self.server.graceful_shutdown {
            server_config = server_config.without_graceful_shutdown();
        }

        Ok(server_config)
    }

    /// The script target described by the bridge section.
    pub fn script_target(&self) -> ScriptTarget {
        ScriptTarget::new(self.bridge.script.clone(), self.bridge.root_dir.clone())
            .unbuffered(self.bridge.unbuffered)
    }

    /// Build the shared bridge with the configured launcher.
    pub fn build_bridge(&self) -> Bridge {
        let locator = InterpreterLocator::new().caching(self.bridge.cache_interpreter);
        Bridge::new(
            self.script_target(),
            self.bridge.spawn_mode.launcher(),
            locator,
        )
    }

    /// Get the configured log level, if any.
    pub fn log_filter(&self) -> Option<&str> {
        self.logging.level.as_deref()
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
    /// Invalid host address.
    InvalidHost(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
            Self::InvalidHost(host) => write!(f, "invalid host address: {}", host),
        }
    }
}

impl std::error::Error for ConfigError {}
