//! The seam to the host runtime's own loader.
//!
//! Every hook entry point receives the "next" hook in the host's chain. The
//! hook delegates to it for real resolution and source delivery, and the
//! export enumerator uses it to read the modules it analyzes.

use crate::error::{Error, Result};
use futures::future::{BoxFuture, FutureExt};
use interpose_proto::{
    FormatOutput, LoadContext, LoadOutput, ResolveContext, ResolveOutput, SourceOutput,
};

/// The next loader hook in the host's chain.
///
/// Only `resolve` and `load` are required. Legacy hosts override
/// `get_source`/`get_format`; hosts that can evaluate a module and list its
/// namespace keys override `import_namespace_keys`.
pub trait NextHooks: Send + Sync {
    /// Resolve `specifier` the way the host normally would.
    fn resolve<'a>(
        &'a self,
        specifier: &'a str,
        ctx: &'a ResolveContext,
    ) -> BoxFuture<'a, Result<ResolveOutput>>;

    /// Load `url` the way the host normally would.
    fn load<'a>(&'a self, url: &'a str, ctx: &'a LoadContext) -> BoxFuture<'a, Result<LoadOutput>>;

    /// Source half of `load` (legacy hosts).
    fn get_source<'a>(
        &'a self,
        url: &'a str,
        ctx: &'a LoadContext,
    ) -> BoxFuture<'a, Result<SourceOutput>> {
        async move {
            let out = self.load(url, ctx).await?;
            Ok(SourceOutput { source: out.source })
        }
        .boxed()
    }

    /// Format half of `load` (legacy hosts).
    fn get_format<'a>(
        &'a self,
        url: &'a str,
        ctx: &'a LoadContext,
    ) -> BoxFuture<'a, Result<FormatOutput>> {
        async move {
            let out = self.load(url, ctx).await?;
            Ok(FormatOutput { format: out.format })
        }
        .boxed()
    }

    /// Evaluate `url` and list the keys of its namespace.
    ///
    /// This runs the module's top-level code; it is the fallback for hosts
    /// without static export analysis and for built-ins, which have no
    /// source to analyze.
    fn import_namespace_keys<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<Vec<String>>> {
        async move {
            Err(Error::enumeration(
                url,
                "host cannot evaluate modules to list their exports",
            ))
        }
        .boxed()
    }
}
