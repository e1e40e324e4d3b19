//! Platform detection and candidate list construction.

/// Primary override environment variable.
pub const PRIMARY_ENV: &str = "PYTHON";

/// Secondary override environment variable.
pub const SECONDARY_ENV: &str = "PYTHON_BIN";

const WINDOWS_DEFAULTS: &[&str] = &["python", "python3", "py -3", "py"];
const POSIX_DEFAULTS: &[&str] = &["python3", "python"];

/// Platform family, as far as interpreter naming is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Windows family (`win32`, `windows`).
    Windows,
    /// Everything else.
    Posix,
}

impl Platform {
    /// The platform this binary was built for.
    pub fn current() -> Self {
        Self::from_identifier(std::env::consts::OS)
    }

    /// Classify a platform identifier such as `linux`, `darwin` or `win32`.
    pub fn from_identifier(id: &str) -> Self {
        if id.to_ascii_lowercase().starts_with("win") {
            Platform::Windows
        } else {
            Platform::Posix
        }
    }

    /// Default interpreter names, in probe order.
    pub fn defaults(&self) -> &'static [&'static str] {
        match self {
            Platform::Windows => WINDOWS_DEFAULTS,
            Platform::Posix => POSIX_DEFAULTS,
        }
    }
}

impl Default for Platform {
    fn default() -> Self {
        Self::current()
    }
}

/// Inputs to interpreter resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocatorHints {
    pub platform: Platform,
    /// Value of the primary override, checked first.
    pub primary: Option<String>,
    /// Value of the secondary override.
    pub secondary: Option<String>,
}

impl LocatorHints {
    /// Hints for `platform` with no overrides.
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            primary: None,
            secondary: None,
        }
    }

    /// Read the overrides from the process environment.
    pub fn from_env() -> Self {
        Self {
            platform: Platform::current(),
            primary: std::env::var(PRIMARY_ENV).ok(),
            secondary: std::env::var(SECONDARY_ENV).ok(),
        }
    }

    pub fn with_primary(mut self, value: impl Into<String>) -> Self {
        self.primary = Some(value.into());
        self
    }

    pub fn with_secondary(mut self, value: impl Into<String>) -> Self {
        self.secondary = Some(value.into());
        self
    }

    /// Ordered candidate strings: overrides first, then platform defaults.
    ///
    /// Empty overrides are skipped; anything else, even whitespace, is kept
    /// so it shows up in the tried list.
    pub fn candidates(&self) -> Vec<String> {
        let overrides = [self.primary.as_deref(), self.secondary.as_deref()];
        overrides
            .into_iter()
            .flatten()
            .filter(|value| !value.is_empty())
            .chain(self.platform.defaults().iter().copied())
            .map(str::to_string)
            .collect()
    }
}

/// A candidate split into a command and its fixed argument prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub command: String,
    pub prefix: Vec<String>,
}

impl Candidate {
    /// Split a candidate string on whitespace (`"py -3"` → `py` + `["-3"]`).
    ///
    /// Returns `None` for a blank string.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split_whitespace();
        let command = parts.next()?.to_string();
        Some(Self {
            command,
            prefix: parts.map(str::to_string).collect(),
        })
    }
}
