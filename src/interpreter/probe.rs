//! Viability probes for interpreter candidates.

use std::process::{Command, Stdio};

use tracing::trace;

/// Decides whether a candidate command can be launched.
pub trait VersionProbe: Send + Sync {
    /// Returns true when `<command> <prefix...> --version` launches and
    /// exits with status 0.
    fn is_viable(&self, command: &str, prefix: &[String]) -> bool;
}

impl<F> VersionProbe for F
where
    F: Fn(&str, &[String]) -> bool + Send + Sync,
{
    fn is_viable(&self, command: &str, prefix: &[String]) -> bool {
        self(command, prefix)
    }
}

/// Probe that runs the candidate synchronously.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemProbe;

impl VersionProbe for SystemProbe {
    fn is_viable(&self, command: &str, prefix: &[String]) -> bool {
        let status = Command::new(command)
            .args(prefix)
            .arg("--version")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match status {
            Ok(status) => {
                trace!(command, ?status, "version probe finished");
                status.success()
            }
            Err(e) => {
                trace!(command, error = %e, "version probe failed to launch");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closure_probe() {
        let probe = |command: &str, _: &[String]| command == "python3";
        assert!(probe.is_viable("python3", &[]));
        assert!(!probe.is_viable("python", &[]));
    }

    #[test]
    fn test_system_probe_missing_binary() {
        assert!(!SystemProbe.is_viable("definitely-not-a-real-interpreter-xyz", &[]));
    }

    #[test]
    #[cfg(unix)]
    fn test_system_probe_nonzero_exit() {
        // `false` ignores its arguments and exits 1
        assert!(!SystemProbe.is_viable("false", &[]));
    }

    #[test]
    #[cfg(unix)]
    fn test_system_probe_zero_exit() {
        assert!(SystemProbe.is_viable("true", &[]));
    }
}
