//! Process-wide hook state.

use rustc_hash::FxHashMap;
use std::sync::{OnceLock, PoisonError, RwLock};

/// State shared by every hook invocation in one process.
///
/// Entries are never removed; the map holds one entry per intercepted
/// module for the life of the process.
#[derive(Debug, Default)]
pub struct HookState {
    /// Resolved URL -> specifier as written by the importer.
    specifiers: RwLock<FxHashMap<String, String>>,
    /// The program's root module, set at most once.
    entrypoint: OnceLock<String>,
}

impl HookState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remember_specifier(&self, url: impl Into<String>, specifier: impl Into<String>) {
        self.specifiers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(url.into(), specifier.into());
    }

    #[must_use]
    pub fn specifier_for(&self, url: &str) -> Option<String> {
        self.specifiers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(url)
            .cloned()
    }

    /// Record the entrypoint. Returns false if one was already recorded.
    pub fn record_entrypoint(&self, url: &str) -> bool {
        self.entrypoint.set(url.to_string()).is_ok()
    }

    #[must_use]
    pub fn entrypoint(&self) -> Option<&str> {
        self.entrypoint.get().map(String::as_str)
    }

    #[must_use]
    pub fn is_entrypoint(&self, url: &str) -> bool {
        self.entrypoint() == Some(url)
    }

    /// Number of remembered specifiers.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.specifiers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_entrypoint_set_once() {
        let state = HookState::new();
        assert!(state.entrypoint().is_none());
        assert!(state.record_entrypoint("file:///app/main"));
        assert!(!state.record_entrypoint("file:///app/other"));
        assert_eq!(state.entrypoint(), Some("file:///app/main"));
        assert!(state.is_entrypoint("file:///app/main"));
        assert!(!state.is_entrypoint("file:///app/other"));
    }

    #[test]
    fn test_specifier_map() {
        let state = HookState::new();
        state.remember_specifier("file:///app/node_modules/pkg/index.js", "pkg");
        assert_eq!(
            state
                .specifier_for("file:///app/node_modules/pkg/index.js")
                .as_deref(),
            Some("pkg")
        );
        assert!(state.specifier_for("file:///app/x.js").is_none());
        assert_eq!(state.pending_len(), 1);
    }

    #[test]
    fn test_concurrent_writers() {
        let state = Arc::new(HookState::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let state = Arc::clone(&state);
                std::thread::spawn(move || {
                    state.remember_specifier(format!("file:///m{i}.mjs"), format!("./m{i}.mjs"));
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(state.pending_len(), 8);
    }
}
