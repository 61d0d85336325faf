use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Query key that marks an identifier as intercepted.
pub const DEFAULT_MARKER_KEY: &str = "iitm";

/// Default limit on nested `export * from` chains.
pub const DEFAULT_MAX_REEXPORT_DEPTH: usize = 64;

/// Extensions that identify a loadable script (as opposed to an
/// extensionless or foreign-format program entrypoint).
pub const DEFAULT_SCRIPTABLE_EXTENSIONS: &[&str] = &["js", "mjs", "cjs", "ts", "mts", "cts"];

/// Configuration for the interception hook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct HookConfig {
    /// Query parameter used as the interception marker.
    pub marker_key: String,

    /// URL of the registration module imported by every shim.
    pub register_url: String,

    /// URLs of the hook's own modules. Imports made from these are never
    /// intercepted.
    pub hook_urls: Vec<String>,

    /// Extensions (without the dot) treated as scripts.
    pub scriptable_extensions: Vec<String>,

    /// Maximum `export * from` nesting before giving up.
    pub max_reexport_depth: usize,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            marker_key: DEFAULT_MARKER_KEY.to_string(),
            register_url: String::new(),
            hook_urls: Vec::new(),
            scriptable_extensions: DEFAULT_SCRIPTABLE_EXTENSIONS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            max_reexport_depth: DEFAULT_MAX_REEXPORT_DEPTH,
        }
    }
}

impl HookConfig {
    /// Create a config whose shims import `register` from `register_url`.
    #[must_use]
    pub fn new(register_url: impl Into<String>) -> Self {
        Self {
            register_url: register_url.into(),
            ..Default::default()
        }
    }

    /// Load a config from a JSON file. Missing keys take their defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| Error::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Add a URL belonging to the hook itself.
    #[must_use]
    pub fn with_hook_url(mut self, url: impl Into<String>) -> Self {
        self.hook_urls.push(url.into());
        self
    }

    /// Set the marker query key.
    #[must_use]
    pub fn with_marker_key(mut self, key: impl Into<String>) -> Self {
        self.marker_key = key.into();
        self
    }

    /// Set the re-export depth limit.
    #[must_use]
    pub fn with_max_reexport_depth(mut self, depth: usize) -> Self {
        self.max_reexport_depth = depth;
        self
    }

    /// Whether `url` is one of the hook's own modules.
    ///
    /// `hook.mjs` and `hook.js` siblings are the same module shipped in two
    /// formats.
    #[must_use]
    pub fn is_hook_url(&self, url: &str) -> bool {
        self.hook_urls
            .iter()
            .any(|own| own == url || own.replace("hook.mjs", "hook.js") == url)
    }
}
