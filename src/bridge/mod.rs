//! WebSocket-to-process bridge.
//!
//! A [`Bridge`] holds what every connection shares: the interpreter locator,
//! the process launcher and the target script. Each connection gets its own
//! [`Session`], which owns at most one child process and tears it down when
//! either side goes away.

mod connection;
pub mod diagnostics;
mod id;
mod session;
mod state;

pub use connection::{ConnectionHandle, Outbound};
pub use id::ConnectionId;
pub use session::Session;
pub use state::SessionState;

use std::path::PathBuf;
use std::sync::Arc;

use crate::interpreter::{Interpreter, InterpreterLocator, LocatorHints};
use crate::process::{Launcher, SpawnSpec};

/// Environment variable forced on the child so its output is UTF-8.
pub const ENCODING_ENV: (&str, &str) = ("PYTHONIOENCODING", "utf-8");

/// The script every session runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptTarget {
    /// Script path, relative to `root_dir` unless absolute.
    pub script: PathBuf,
    /// Working directory of the child.
    pub root_dir: PathBuf,
    /// Pass `-u` so output is not block-buffered.
    pub unbuffered: bool,
}

impl ScriptTarget {
    pub fn new(script: impl Into<PathBuf>, root_dir: impl Into<PathBuf>) -> Self {
        Self {
            script: script.into(),
            root_dir: root_dir.into(),
            unbuffered: true,
        }
    }

    pub fn unbuffered(mut self, enabled: bool) -> Self {
        self.unbuffered = enabled;
        self
    }

    pub fn script_path(&self) -> PathBuf {
        self.root_dir.join(&self.script)
    }

    /// Build the spawn request for a resolved interpreter.
    pub fn spawn_spec(&self, interpreter: &Interpreter) -> SpawnSpec {
        let extra: &[&str] = if self.unbuffered { &["-u"] } else { &[] };
        let script = self.script_path();
        SpawnSpec::new(interpreter.command.clone())
            .args(interpreter.args_for(extra, &script.to_string_lossy()))
            .cwd(self.root_dir.clone())
            .env(ENCODING_ENV.0, ENCODING_ENV.1)
    }
}

/// Shared per-server bridge state.
pub struct Bridge {
    locator: Arc<InterpreterLocator>,
    launcher: Arc<dyn Launcher>,
    target: ScriptTarget,
    hints: Option<LocatorHints>,
}

impl Bridge {
    pub fn new(
        target: ScriptTarget,
        launcher: Arc<dyn Launcher>,
        locator: InterpreterLocator,
    ) -> Self {
        Self {
            locator: Arc::new(locator),
            launcher,
            target,
            hints: None,
        }
    }

    /// Use fixed locator hints instead of reading the environment on every
    /// connection.
    pub fn with_hints(mut self, hints: LocatorHints) -> Self {
        self.hints = Some(hints);
        self
    }

    pub fn target(&self) -> &ScriptTarget {
        &self.target
    }

    pub fn locator(&self) -> &InterpreterLocator {
        &self.locator
    }

    /// Hints for the next resolution.
    pub(crate) fn hints(&self) -> LocatorHints {
        self.hints.clone().unwrap_or_else(LocatorHints::from_env)
    }

    pub(crate) fn locator_arc(&self) -> Arc<InterpreterLocator> {
        Arc::clone(&self.locator)
    }

    pub(crate) fn launcher(&self) -> &dyn Launcher {
        self.launcher.as_ref()
    }

    /// Create the session for a newly opened connection.
    pub fn session(self: &Arc<Self>, conn: ConnectionHandle) -> Session {
        Session::new(Arc::clone(self), conn)
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("target", &self.target)
            .field("locator", &self.locator)
            .field("hints", &self.hints)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn python3() -> Interpreter {
        Interpreter {
            command: "python3".into(),
            prefix: vec![],
            tried: vec!["python3".into()],
        }
    }

    #[test]
    #[cfg(unix)]
    fn test_spawn_spec_unbuffered() {
        let target = ScriptTarget::new("run.py", "/srv/atm");
        let spec = target.spawn_spec(&python3());

        assert_eq!(spec.program, "python3");
        assert_eq!(spec.args, vec!["-u".to_string(), "/srv/atm/run.py".to_string()]);
        assert_eq!(spec.cwd, PathBuf::from("/srv/atm"));
        assert_eq!(spec.env.get("PYTHONIOENCODING").map(String::as_str), Some("utf-8"));
    }

    #[test]
    fn test_spawn_spec_with_prefix_buffered() {
        let target = ScriptTarget::new("run.py", "app").unbuffered(false);
        let interp = Interpreter {
            command: "py".into(),
            prefix: vec!["-3".into()],
            tried: vec![],
        };
        let spec = target.spawn_spec(&interp);

        assert_eq!(spec.program, "py");
        assert_eq!(spec.args[0], "-3");
        assert_eq!(spec.args.len(), 2);
        assert!(spec.args[1].ends_with("run.py"));
    }

    #[test]
    #[cfg(unix)]
    fn test_absolute_script_path_kept() {
        let target = ScriptTarget::new("/opt/scripts/main.py", "/srv/atm");
        assert_eq!(target.script_path(), PathBuf::from("/opt/scripts/main.py"));
    }
}
