//! Shim source synthesis.
//!
//! A [`Shim`] is the typed form of the module served in place of an
//! intercepted one: the namespaces it imports, one settable binding per
//! export, and the registration call. [`Shim::render`] is the only place that
//! knows the surface syntax.
//!
//! Rendered layout:
//!
//! ```text
//! import { register } from "<register url>"
//! import * as namespace from "<real url>"
//! import * as __ns0 from "<star target>"
//!
//! const _ = Object.assign({}, __ns0, namespace)
//! const set = {}
//!
//! let $x = _.x
//! export { $x as x }
//! set.x = (v) => {
//!   $x = v
//!   return true
//! }
//!
//! register("<real url>", _, set, "<specifier>")
//! ```
//!
//! Names that are not identifiers use `$<index>` locals and quoted keys.
//! An exported `__proto__` switches the snapshot to a null-prototype object
//! and its setter to `Object.defineProperty`.

use crate::star::{Expansion, NamespaceImport};
use rustc_hash::FxHashSet;
use std::fmt::Write;

/// One exported name with its settable local binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportBinding {
    pub name: String,
}

/// A synthesized replacement module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Shim {
    register_url: String,
    real_url: String,
    specifier: Option<String>,
    imports: Vec<NamespaceImport>,
    bindings: Vec<ExportBinding>,
}

/// Builds a [`Shim`], keeping one binding per export name.
#[derive(Debug)]
pub struct ShimBuilder {
    shim: Shim,
    seen: FxHashSet<String>,
}

impl ShimBuilder {
    #[must_use]
    pub fn new(register_url: impl Into<String>, real_url: impl Into<String>) -> Self {
        Self {
            shim: Shim {
                register_url: register_url.into(),
                real_url: real_url.into(),
                specifier: None,
                imports: Vec::new(),
                bindings: Vec::new(),
            },
            seen: FxHashSet::default(),
        }
    }

    /// The specifier as written by the importer, reported to `register`.
    #[must_use]
    pub fn with_specifier(mut self, specifier: Option<String>) -> Self {
        self.shim.specifier = specifier;
        self
    }

    /// Add a binding for `name`. Returns false if the name already has one.
    pub fn add_export(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if !self.seen.insert(name.clone()) {
            return false;
        }
        self.shim.bindings.push(ExportBinding { name });
        true
    }

    /// Splice in the namespaces and names of a star export.
    pub fn merge(&mut self, expansion: Expansion) {
        self.shim.imports.extend(expansion.imports);
        for name in expansion.setters {
            self.add_export(name);
        }
    }

    #[must_use]
    pub fn finish(self) -> Shim {
        self.shim
    }
}

impl Shim {
    #[must_use]
    pub fn real_url(&self) -> &str {
        &self.real_url
    }

    #[must_use]
    pub fn bindings(&self) -> &[ExportBinding] {
        &self.bindings
    }

    #[must_use]
    pub fn imports(&self) -> &[NamespaceImport] {
        &self.imports
    }

    /// Serialize to module source text.
    #[must_use]
    pub fn render(&self) -> String {
        let mut out = String::new();

        let _ = writeln!(out, "import {{ register }} from {}", js_string(&self.register_url));
        let _ = writeln!(out, "import * as namespace from {}", js_string(&self.real_url));
        for import in &self.imports {
            let _ = writeln!(out, "import * as {} from {}", import.ident, js_string(&import.url));
        }
        out.push('\n');

        let mut sources: Vec<&str> = self.imports.iter().map(|i| i.ident.as_str()).collect();
        sources.push("namespace");
        // A `__proto__` export must land as an own property, not the prototype.
        let target = if self.bindings.iter().any(|b| b.name == PROTO) {
            "Object.create(null)"
        } else {
            "{}"
        };
        let _ = writeln!(out, "const _ = Object.assign({target}, {})", sources.join(", "));
        out.push_str("const set = {}\n\n");

        for (index, binding) in self.bindings.iter().enumerate() {
            render_binding(&mut out, index, &binding.name);
        }

        let specifier = self
            .specifier
            .as_deref()
            .map_or_else(|| "undefined".to_string(), js_string);
        let _ = writeln!(
            out,
            "register({}, _, set, {})",
            js_string(&self.real_url),
            specifier
        );
        out
    }
}

fn render_binding(out: &mut String, index: usize, name: &str) {
    let (local, property, export_name) = if is_identifier(name) {
        (format!("${name}"), format!(".{name}"), name.to_string())
    } else {
        let quoted = js_string(name);
        (format!("${index}"), format!("[{quoted}]"), quoted)
    };

    let _ = writeln!(out, "let {local} = _{property}");
    let _ = writeln!(out, "export {{ {local} as {export_name} }}");
    if name == PROTO {
        let _ = writeln!(
            out,
            "Object.defineProperty(set, {export_name}, {{ enumerable: true, value: (v) => {{"
        );
        let _ = writeln!(out, "  {local} = v");
        out.push_str("  return true\n} })\n\n");
        return;
    }
    let _ = writeln!(out, "set{property} = (v) => {{");
    let _ = writeln!(out, "  {local} = v");
    out.push_str("  return true\n}\n\n");
}

const PROTO: &str = "__proto__";

/// Quote `s` as a JS string literal.
fn js_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

fn is_identifier(name: &str) -> bool {
    if name == PROTO {
        return false;
    }
    let mut chars = name.chars();
    chars
        .next()
        .is_some_and(|c| c.is_alphabetic() || c == '_' || c == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}
