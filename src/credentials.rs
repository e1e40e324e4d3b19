//! Startup credential file.
//!
//! Hosting platforms hand service credentials to the process as one
//! environment variable. The script expects them on disk, so the raw value is
//! written out once before the server starts accepting connections.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

/// Default variable holding the credential blob.
pub const DEFAULT_ENV_VAR: &str = "CREDS";

/// Default file the blob is written to.
pub const DEFAULT_PATH: &str = "creds.json";

/// Outcome of [`write_from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialsOutcome {
    /// The variable was unset; nothing was written.
    Skipped,
    /// The blob was written to this path.
    Written(PathBuf),
    /// Writing failed; the error has been logged.
    Failed,
}

/// Write `value` verbatim to `path`, replacing any existing file.
pub fn write_value(value: &str, path: &Path) -> io::Result<()> {
    fs::write(path, value.as_bytes())
}

/// Copy the variable `env_var` into `path` if it is set.
///
/// Failures are logged and otherwise ignored; the server still starts.
pub fn write_from_env(env_var: &str, path: &Path) -> CredentialsOutcome {
    let Some(value) = std::env::var_os(env_var) else {
        debug!(env_var, "credential variable not set");
        return CredentialsOutcome::Skipped;
    };

    let value = value.to_string_lossy();
    match write_value(&value, path) {
        Ok(()) => {
            info!(path = %path.display(), "credentials written");
            CredentialsOutcome::Written(path.to_path_buf())
        }
        Err(e) => {
            warn!(path = %path.display(), "failed to write credentials: {}", e);
            CredentialsOutcome::Failed
        }
    }
}
