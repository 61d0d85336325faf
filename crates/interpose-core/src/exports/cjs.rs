//! CommonJS export scanner.
//!
//! Pattern-based detection of `exports.x = ...` style assignments. This is
//! necessarily approximate; anything computed at runtime is missed.

use regex_lite::Regex;
use rustc_hash::FxHashSet;
use std::sync::OnceLock;

/// Names found in a CommonJS module.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CjsExports {
    /// Exported names in first-appearance order, ending with `default`.
    pub names: Vec<String>,
    /// Specifiers of `module.exports = require(...)` re-exports.
    pub reexports: Vec<String>,
}

fn define_property_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"Object\.defineProperty\(\s*(?:module\.)?exports\s*,\s*["']([^"']+)["']"#)
            .expect("valid regex")
    })
}

fn exports_dot_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?:^|[^.\w$])(?:module\.)?exports\.([A-Za-z_$][\w$]*)\s*=[^=]")
            .expect("valid regex")
    })
}

fn exports_index_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?:module\.)?exports\[\s*["']([^"']+)["']\s*\]\s*=[^=]"#)
            .expect("valid regex")
    })
}

fn module_exports_object_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"module\.exports\s*=\s*\{([^}]*)\}").expect("valid regex"))
}

fn module_exports_require_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"module\.exports\s*=\s*require\(\s*["']([^"']+)["']\s*\)"#)
            .expect("valid regex")
    })
}

/// Scan CommonJS source for exported names and whole-module re-exports.
#[must_use]
pub fn scan_cjs_exports(source: &str) -> CjsExports {
    let mut found: Vec<(usize, String)> = Vec::new();

    for re in [define_property_re(), exports_dot_re(), exports_index_re()] {
        for cap in re.captures_iter(source) {
            if let Some(name) = cap.get(1) {
                found.push((name.start(), name.as_str().to_string()));
            }
        }
    }

    for cap in module_exports_object_re().captures_iter(source) {
        if let Some(body) = cap.get(1) {
            let mut offset = body.start();
            for entry in body.as_str().split(',') {
                if let Some(name) = object_key(entry) {
                    found.push((offset, name));
                }
                offset += entry.len() + 1;
            }
        }
    }

    found.sort_by_key(|(pos, _)| *pos);

    let mut seen = FxHashSet::default();
    let mut names: Vec<String> = found
        .into_iter()
        .map(|(_, name)| name)
        .filter(|name| name != "__esModule" && seen.insert(name.clone()))
        .collect();
    if !seen.contains("default") {
        names.push("default".to_string());
    }

    let reexports = module_exports_require_re()
        .captures_iter(source)
        .filter_map(|cap| cap.get(1).map(|m| m.as_str().to_string()))
        .collect();

    CjsExports { names, reexports }
}

/// Property name of one `module.exports = { ... }` entry.
fn object_key(entry: &str) -> Option<String> {
    let entry = entry.trim();
    if entry.is_empty() || entry.starts_with("...") {
        return None;
    }
    let key = entry
        .split(|c: char| c == ':' || c == '(' || c.is_whitespace())
        .next()?
        .trim_matches(|c: char| c == '"' || c == '\'');
    let valid = !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '$' || c == '-');
    valid.then(|| key.to_string())
}
