//! Cross-platform Python interpreter discovery.
//!
//! Candidates are probed in order (overrides from `PYTHON` and `PYTHON_BIN`,
//! then platform defaults) by running `<candidate> --version`; the first one
//! that exits successfully wins.
//!
//! ```
//! use webterm_bridge::interpreter::{InterpreterLocator, LocatorHints, Platform};
//!
//! let locator = InterpreterLocator::with_probe(|cmd: &str, _: &[String]| cmd == "python");
//! let found = locator.locate(&LocatorHints::new(Platform::Posix)).unwrap();
//! assert_eq!(found.command, "python");
//! assert_eq!(found.tried, vec!["python3", "python"]);
//! ```

mod candidates;
mod probe;

pub use candidates::{Candidate, LocatorHints, Platform, PRIMARY_ENV, SECONDARY_ENV};
pub use probe::{SystemProbe, VersionProbe};

use std::sync::{Arc, Mutex};

use tracing::{debug, info};

use crate::error::BridgeError;
use crate::Result;

/// A runnable interpreter command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interpreter {
    /// Binary name or path.
    pub command: String,
    /// Fixed arguments placed before anything else (e.g. `-3` for `py`).
    pub prefix: Vec<String>,
    /// Candidate strings probed before (and including) this one.
    pub tried: Vec<String>,
}

impl Interpreter {
    /// Full argument list for running `script`.
    pub fn args_for(&self, extra: &[&str], script: &str) -> Vec<String> {
        self.prefix
            .iter()
            .cloned()
            .chain(extra.iter().map(|s| s.to_string()))
            .chain(std::iter::once(script.to_string()))
            .collect()
    }
}

/// Probe candidates in order and return the first viable one.
pub fn resolve(hints: &LocatorHints, probe: &dyn VersionProbe) -> Result<Interpreter> {
    let mut tried = Vec::new();

    for raw in hints.candidates() {
        tried.push(raw.clone());
        let Some(candidate) = Candidate::parse(&raw) else {
            continue;
        };

        if probe.is_viable(&candidate.command, &candidate.prefix) {
            debug!(candidate = %raw, "interpreter candidate accepted");
            return Ok(Interpreter {
                command: candidate.command,
                prefix: candidate.prefix,
                tried,
            });
        }
        debug!(candidate = %raw, "interpreter candidate rejected");
    }

    Err(BridgeError::InterpreterNotFound { tried })
}

/// Interpreter lookup with an optional process-wide cache.
///
/// Without caching every call probes from scratch, so a newly installed
/// interpreter is picked up by the next connection.
pub struct InterpreterLocator {
    probe: Arc<dyn VersionProbe>,
    cache_enabled: bool,
    cached: Mutex<Option<Interpreter>>,
}

impl InterpreterLocator {
    /// Locator backed by [`SystemProbe`].
    pub fn new() -> Self {
        Self::with_probe(SystemProbe)
    }

    /// Locator backed by a custom probe.
    pub fn with_probe(probe: impl VersionProbe + 'static) -> Self {
        Self {
            probe: Arc::new(probe),
            cache_enabled: false,
            cached: Mutex::new(None),
        }
    }

    /// Remember the first successful resolution.
    pub fn caching(mut self, enabled: bool) -> Self {
        self.cache_enabled = enabled;
        self
    }

    /// Resolve an interpreter for `hints`.
    ///
    /// Blocks while candidates are probed.
    pub fn locate(&self, hints: &LocatorHints) -> Result<Interpreter> {
        if self.cache_enabled {
            let cached = self.cached.lock().map_err(|_| BridgeError::LockPoisoned)?;
            if let Some(found) = cached.as_ref() {
                return Ok(found.clone());
            }
        }

        let found = resolve(hints, self.probe.as_ref())?;
        info!(command = %found.command, prefix = ?found.prefix, "interpreter resolved");

        if self.cache_enabled {
            let mut cached = self.cached.lock().map_err(|_| BridgeError::LockPoisoned)?;
            *cached = Some(found.clone());
        }

        Ok(found)
    }

    /// Drop a cached resolution.
    pub fn invalidate(&self) {
        if let Ok(mut cached) = self.cached.lock() {
            cached.take();
        }
    }
}

impl Default for InterpreterLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for InterpreterLocator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InterpreterLocator")
            .field("cache_enabled", &self.cache_enabled)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn accept(names: &'static [&'static str]) -> impl Fn(&str, &[String]) -> bool + Send + Sync {
        move |cmd: &str, _: &[String]| names.iter().any(|name| *name == cmd)
    }

    #[test]
    fn test_first_viable_wins() {
        let found = resolve(
            &LocatorHints::new(Platform::Posix),
            &accept(&["python3", "python"]),
        )
        .unwrap();
        assert_eq!(found.command, "python3");
        assert_eq!(found.tried, vec!["python3"]);
    }

    #[test]
    fn test_primary_override_preferred() {
        let hints = LocatorHints::new(Platform::Posix).with_primary("/usr/local/bin/python3.11");
        let found = resolve(&hints, &accept(&["/usr/local/bin/python3.11", "python3"])).unwrap();
        assert_eq!(found.command, "/usr/local/bin/python3.11");
    }

    #[test]
    fn test_secondary_after_primary() {
        let hints = LocatorHints::new(Platform::Posix)
            .with_primary("missing-python")
            .with_secondary("python");
        let found = resolve(&hints, &accept(&["python", "python3"])).unwrap();
        assert_eq!(found.command, "python");
        assert_eq!(found.tried, vec!["missing-python", "python"]);
    }

    #[test]
    fn test_windows_py_launcher_prefix() {
        let found = resolve(&LocatorHints::new(Platform::Windows), &accept(&["py"])).unwrap();
        // "py -3" is probed before bare "py"
        assert_eq!(found.command, "py");
        assert_eq!(found.prefix, vec!["-3"]);
        assert_eq!(found.tried, vec!["python", "python3", "py -3"]);
    }

    #[test]
    fn test_prefix_passed_to_probe() {
        let probe = |cmd: &str, prefix: &[String]| cmd == "py" && prefix.is_empty();
        let found = resolve(&LocatorHints::new(Platform::Windows), &probe).unwrap();
        assert!(found.prefix.is_empty());
        assert_eq!(found.tried.last().map(String::as_str), Some("py"));
    }

    #[test]
    fn test_not_found_lists_every_candidate() {
        let hints = LocatorHints::new(Platform::Windows).with_primary("C:\\Python\\python.exe");
        let err = resolve(&hints, &accept(&[])).unwrap_err();
        match err {
            BridgeError::InterpreterNotFound { tried } => assert_eq!(
                tried,
                vec!["C:\\Python\\python.exe", "python", "python3", "py -3", "py"]
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_whitespace_override_reported_as_tried() {
        let hints = LocatorHints::new(Platform::Posix).with_primary("   ");
        let err = resolve(&hints, &accept(&[])).unwrap_err();
        match err {
            BridgeError::InterpreterNotFound { tried } => {
                assert_eq!(tried, vec!["   ", "python3", "python"])
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_args_for() {
        let interp = Interpreter {
            command: "py".into(),
            prefix: vec!["-3".into()],
            tried: vec![],
        };
        assert_eq!(interp.args_for(&["-u"], "run.py"), vec!["-3", "-u", "run.py"]);
    }

    #[test]
    fn test_uncached_probes_every_time() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let locator = InterpreterLocator::with_probe(move |_: &str, _: &[String]| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        });

        let hints = LocatorHints::new(Platform::Posix);
        locator.locate(&hints).unwrap();
        locator.locate(&hints).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cache_and_invalidate() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let locator = InterpreterLocator::with_probe(move |_: &str, _: &[String]| {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .caching(true);

        let hints = LocatorHints::new(Platform::Posix);
        locator.locate(&hints).unwrap();
        locator.locate(&hints).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        locator.invalidate();
        locator.locate(&hints).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_failures_are_not_cached() {
        let locator = InterpreterLocator::with_probe(|_: &str, _: &[String]| false).caching(true);
        let hints = LocatorHints::new(Platform::Posix);
        assert!(locator.locate(&hints).is_err());
        assert!(locator.locate(&hints).is_err());
    }
}
