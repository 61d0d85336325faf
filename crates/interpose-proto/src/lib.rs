#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! Loader-hook protocol types for interpose.
//!
//! This crate defines the request/response shapes exchanged between a host
//! runtime's module loader and the interception hook. Field names follow the
//! host's own JSON shape (`parentURL`, `importAttributes`, `shortCircuit`) so
//! the types can cross an IPC or FFI boundary as plain JSON.
//!
//! ## Hook eras
//! - Modern hosts call `resolve` and `load`.
//! - Legacy hosts call `resolve`, `getSource` and `getFormat`; `load` is
//!   still exposed for hosts in between.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Module format as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModuleFormat {
    /// Built-in module (`node:fs`). Has no source.
    Builtin,
    /// CommonJS script.
    Commonjs,
    /// JSON document.
    Json,
    /// ECMAScript module.
    Module,
    /// WebAssembly module.
    Wasm,
    /// Anything the host reports that we don't model.
    #[serde(other)]
    Unknown,
}

impl ModuleFormat {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Commonjs => "commonjs",
            Self::Json => "json",
            Self::Module => "module",
            Self::Wasm => "wasm",
            Self::Unknown => "unknown",
        }
    }
}

/// Import attributes (`with { type: "json" }`), keyed by attribute name.
pub type ImportAttributes = BTreeMap<String, String>;

/// Context passed to `resolve`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveContext {
    /// URL of the importing module. `None` for the program entrypoint.
    #[serde(rename = "parentURL", default, skip_serializing_if = "Option::is_none")]
    pub parent_url: Option<String>,
    /// Export conditions in effect.
    #[serde(default)]
    pub conditions: Vec<String>,
    /// Import attributes (newer hosts).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_attributes: Option<ImportAttributes>,
    /// Import assertions (older hosts; renamed to attributes later).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_assertions: Option<ImportAttributes>,
}

impl ResolveContext {
    /// Context for an import made from `parent`.
    #[must_use]
    pub fn from_parent(parent: impl Into<String>) -> Self {
        Self {
            parent_url: Some(parent.into()),
            ..Default::default()
        }
    }

    /// Set an import attribute.
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.import_attributes
            .get_or_insert_with(ImportAttributes::new)
            .insert(key.into(), value.into());
        self
    }

    /// Content type requested via attributes or assertions, if any.
    #[must_use]
    pub fn import_type(&self) -> Option<&str> {
        self.import_attributes
            .as_ref()
            .and_then(|a| a.get("type"))
            .or_else(|| self.import_assertions.as_ref().and_then(|a| a.get("type")))
            .map(String::as_str)
    }
}

/// Result of `resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolveOutput {
    /// Resolved module URL.
    pub url: String,
    /// Format hint, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ModuleFormat>,
    /// Stop the host from consulting further resolve hooks.
    #[serde(default)]
    pub short_circuit: bool,
}

impl ResolveOutput {
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            format: None,
            short_circuit: false,
        }
    }

    #[must_use]
    pub fn with_format(mut self, format: ModuleFormat) -> Self {
        self.format = Some(format);
        self
    }
}

/// Context passed to `load`, `getSource` and `getFormat`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadContext {
    /// Format hint carried over from `resolve`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<ModuleFormat>,
    #[serde(default)]
    pub conditions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_attributes: Option<ImportAttributes>,
}

/// Result of `load`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadOutput {
    pub format: Option<ModuleFormat>,
    /// Module source. Built-ins (and some CommonJS loads) have none.
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub short_circuit: bool,
}

/// Result of `getSource` (legacy hosts).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceOutput {
    #[serde(default)]
    pub source: Option<String>,
}

/// Result of `getFormat` (legacy hosts).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FormatOutput {
    pub format: Option<ModuleFormat>,
}

/// One of the hook entry points a host may call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum HookKind {
    Resolve,
    Load,
    GetSource,
    GetFormat,
}

impl HookKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resolve => "resolve",
            Self::Load => "load",
            Self::GetSource => "getSource",
            Self::GetFormat => "getFormat",
        }
    }
}

/// Loader API generation of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HookEra {
    /// `resolve` + `load`.
    Modern,
    /// `resolve` + `getSource` + `getFormat` (and `load` for transitional hosts).
    Legacy,
}

impl HookEra {
    /// Hooks to export for this era.
    #[must_use]
    pub fn hooks(&self) -> &'static [HookKind] {
        match self {
            Self::Modern => &[HookKind::Resolve, HookKind::Load],
            Self::Legacy => &[
                HookKind::Resolve,
                HookKind::Load,
                HookKind::GetSource,
                HookKind::GetFormat,
            ],
        }
    }
}
