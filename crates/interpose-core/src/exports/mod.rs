//! Export discovery for intercepted modules.
//!
//! Static scanners for ES module and CommonJS sources, plus the enumerator
//! that picks a strategy for the running host.

mod cjs;
mod enumerate;
mod esm;

pub use cjs::{scan_cjs_exports, CjsExports};
pub use enumerate::{ExportEnumerator, HostEnumerator};
pub use esm::scan_esm_exports;

use std::fmt;

/// Prefix of the sentinel that encodes `export * from '<specifier>'`.
pub const STAR_SENTINEL_PREFIX: &str = "* from ";

/// One entry of a module's export list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExportName {
    /// A plain export binding.
    Named(String),
    /// `export * from '<specifier>'`, with the specifier as written.
    StarFrom(String),
}

impl ExportName {
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    #[must_use]
    pub fn star_from(specifier: impl Into<String>) -> Self {
        Self::StarFrom(specifier.into())
    }

    /// Decode an entry from its string form (`name` or `* from spec`).
    #[must_use]
    pub fn parse(entry: &str) -> Self {
        match entry.strip_prefix(STAR_SENTINEL_PREFIX) {
            Some(spec) => Self::StarFrom(spec.to_string()),
            None => Self::Named(entry.to_string()),
        }
    }

    #[must_use]
    pub fn is_star(&self) -> bool {
        matches!(self, Self::StarFrom(_))
    }
}

impl fmt::Display for ExportName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => f.write_str(name),
            Self::StarFrom(spec) => write!(f, "{STAR_SENTINEL_PREFIX}{spec}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentinel_parse() {
        assert_eq!(ExportName::parse("foo"), ExportName::named("foo"));
        assert_eq!(
            ExportName::parse("* from ./b.mjs"),
            ExportName::star_from("./b.mjs")
        );
        assert!(ExportName::parse("* from lodash").is_star());
        // Only the exact prefix counts.
        assert_eq!(ExportName::parse("*from x"), ExportName::named("*from x"));
    }

    #[test]
    fn test_sentinel_display() {
        assert_eq!(ExportName::star_from("./c.mjs").to_string(), "* from ./c.mjs");
        assert_eq!(ExportName::named("default").to_string(), "default");
    }
}
