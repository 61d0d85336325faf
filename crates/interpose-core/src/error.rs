use std::path::PathBuf;
use thiserror::Error;

/// Result alias for interpose operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for interpose operations.
///
/// Every variant describes a failure for exactly one module; the hook never
/// lets one module's error leak into another module's load.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config at {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The host resolver rejected a specifier.
    #[error("Cannot resolve '{specifier}'{}: {message}", parent_suffix(.parent.as_deref()))]
    Resolution {
        specifier: String,
        parent: Option<String>,
        message: String,
    },

    /// Export names of a module could not be determined.
    #[error("Cannot enumerate exports of {url}: {reason}")]
    Enumeration { url: String, reason: String },

    /// `export * from` declarations form a cycle.
    #[error("Cyclic re-export: {}", .chain.join(" -> "))]
    CyclicExport { chain: Vec<String> },

    /// `export * from` chain is deeper than the configured limit.
    #[error("Re-export chain from {url} exceeds depth limit of {limit}")]
    ReexportDepth { url: String, limit: usize },

    /// The next hook in the chain failed.
    #[error("{hook} failed for {url}: {message}")]
    Host {
        hook: &'static str,
        url: String,
        message: String,
    },
}

impl Error {
    /// Build a resolution error.
    #[must_use]
    pub fn resolution(
        specifier: impl Into<String>,
        parent: Option<&str>,
        message: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            specifier: specifier.into(),
            parent: parent.map(str::to_string),
            message: message.into(),
        }
    }

    /// Build an enumeration error.
    #[must_use]
    pub fn enumeration(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Enumeration {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Build a host hook error.
    #[must_use]
    pub fn host(hook: &'static str, url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Host {
            hook,
            url: url.into(),
            message: message.into(),
        }
    }
}

fn parent_suffix(parent: Option<&str>) -> String {
    parent.map(|p| format!(" from {p}")).unwrap_or_default()
}
