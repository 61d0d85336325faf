#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::must_use_candidate)]

//! Module-loading interceptor.
//!
//! Plugs into a host runtime's loader hooks and serves every imported module
//! through a generated shim whose exports can be replaced at runtime. An
//! instrumentation layer receives each module's exports and setters through a
//! single `register(url, exports, setters, specifier)` call.
//!
//! ## Pipeline
//! - [`marker`] tags intercepted URLs so the shim and the real module are
//!   distinct modules to the host.
//! - [`exports`] lists a module's export names.
//! - [`star`] flattens `export * from` chains.
//! - [`shim`] renders the replacement source.
//! - [`hook`] ties them into the resolve/load lifecycle.

pub mod config;
pub mod error;
pub mod exports;
pub mod hook;
pub mod host;
pub mod marker;
pub mod runtime;
pub mod shim;
pub mod star;

pub use config::HookConfig;
pub use error::{Error, Result};
pub use exports::{ExportEnumerator, ExportName, HostEnumerator};
pub use hook::{HookState, InterceptHook};
pub use host::NextHooks;
pub use marker::MarkerCodec;
pub use runtime::{Capabilities, FileSchemePolicy, RuntimeInfo};
pub use shim::{Shim, ShimBuilder};
pub use star::{Expansion, NamespaceIds, StarExpander};

pub use interpose_proto as proto;
