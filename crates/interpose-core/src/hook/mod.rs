//! Loader hook lifecycle.
//!
//! [`InterceptHook`] implements the host's loader hooks. On `resolve` it
//! decides whether a module is intercepted and, if so, hands back a marked
//! URL. On `load` (or `getSource` on legacy hosts) a marked URL is answered
//! with a synthesized shim that imports the real module and exposes a setter
//! per export.
//!
//! Decision order in `resolve`:
//! 1. A parentless resolution without a scriptable extension is the
//!    program's entrypoint and is forced to CommonJS.
//! 2. Imports made by a marked module or by the hook's own modules pass
//!    through.
//! 3. JSON imports pass through.
//! 4. Everything else is remembered and marked.

mod state;

pub use state::HookState;

use crate::config::HookConfig;
use crate::error::Result;
use crate::exports::{ExportEnumerator, ExportName, HostEnumerator};
use crate::host::NextHooks;
use crate::marker::MarkerCodec;
use crate::runtime::{Capabilities, RuntimeInfo};
use crate::shim::ShimBuilder;
use crate::star::{NamespaceIds, StarExpander};
use interpose_proto::{
    FormatOutput, HookKind, LoadContext, LoadOutput, ModuleFormat, ResolveContext, ResolveOutput,
    SourceOutput,
};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, trace};
use url::Url;

/// The module-loading interceptor.
pub struct InterceptHook {
    config: HookConfig,
    caps: Capabilities,
    codec: MarkerCodec,
    state: Arc<HookState>,
    enumerator: Arc<dyn ExportEnumerator>,
}

impl InterceptHook {
    /// Create a hook for the given runtime, with fresh state and the
    /// host-backed enumerator.
    #[must_use]
    pub fn new(config: HookConfig, runtime: &RuntimeInfo) -> Self {
        let caps = runtime.capabilities();
        let codec = MarkerCodec::new(config.marker_key.clone(), caps);
        Self {
            config,
            caps,
            codec,
            state: Arc::new(HookState::new()),
            enumerator: Arc::new(HostEnumerator::new(caps)),
        }
    }

    /// Share state with other hook instances in the same process.
    #[must_use]
    pub fn with_state(mut self, state: Arc<HookState>) -> Self {
        self.state = state;
        self
    }

    #[must_use]
    pub fn with_enumerator(mut self, enumerator: Arc<dyn ExportEnumerator>) -> Self {
        self.enumerator = enumerator;
        self
    }

    /// The hooks this host should be given.
    #[must_use]
    pub fn exposed_hooks(&self) -> &'static [HookKind] {
        self.caps.era().hooks()
    }

    #[must_use]
    pub fn state(&self) -> &HookState {
        &self.state
    }

    #[must_use]
    pub fn codec(&self) -> &MarkerCodec {
        &self.codec
    }

    #[must_use]
    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    /// The `resolve` hook.
    pub async fn resolve(
        &self,
        specifier: &str,
        ctx: &ResolveContext,
        next: &dyn NextHooks,
    ) -> Result<ResolveOutput> {
        let parent = ctx.parent_url.as_deref().unwrap_or_default();
        let specifier = self.codec.unmark(specifier);

        let mut next_ctx = ctx.clone();
        if self.caps.windows && parent.starts_with("file:node") {
            next_ctx.parent_url = None;
        }
        let resolved = next.resolve(&specifier, &next_ctx).await?;

        if parent.is_empty() && !self.has_scriptable_extension(&resolved.url) {
            if self.state.record_entrypoint(&resolved.url) {
                debug!(url = %resolved.url, "recorded entrypoint");
            }
            return Ok(ResolveOutput::new(resolved.url).with_format(ModuleFormat::Commonjs));
        }

        if self.config.is_hook_url(parent) || self.codec.has_marker(parent) {
            trace!(url = %resolved.url, parent, "passthrough: imported by intercepted module");
            return Ok(resolved);
        }

        if ctx.import_type() == Some("json") {
            trace!(url = %resolved.url, "passthrough: json import");
            return Ok(resolved);
        }

        let Some(marked) = self.codec.mark(&resolved.url) else {
            trace!(url = %resolved.url, "passthrough: not a url");
            return Ok(resolved);
        };
        self.state.remember_specifier(resolved.url.as_str(), specifier.as_str());
        debug!(url = %resolved.url, specifier = %specifier, "intercepting module");

        Ok(ResolveOutput {
            url: marked,
            format: resolved.format,
            short_circuit: true,
        })
    }

    /// The `load` hook.
    pub async fn load(
        &self,
        url: &str,
        ctx: &LoadContext,
        next: &dyn NextHooks,
    ) -> Result<LoadOutput> {
        if !self.codec.has_marker(url) {
            return next.load(url, ctx).await;
        }
        let source = self.rewrite_marked(url, ctx, next).await?;
        Ok(LoadOutput {
            format: Some(ModuleFormat::Module),
            source: Some(source),
            short_circuit: true,
        })
    }

    /// The `getSource` hook (legacy hosts).
    pub async fn get_source(
        &self,
        url: &str,
        ctx: &LoadContext,
        next: &dyn NextHooks,
    ) -> Result<SourceOutput> {
        if !self.codec.has_marker(url) {
            return next.get_source(url, ctx).await;
        }
        let source = self.rewrite_marked(url, ctx, next).await?;
        Ok(SourceOutput {
            source: Some(source),
        })
    }

    /// The `getFormat` hook (legacy hosts).
    pub async fn get_format(
        &self,
        url: &str,
        ctx: &LoadContext,
        next: &dyn NextHooks,
    ) -> Result<FormatOutput> {
        if self.codec.has_marker(url) {
            return Ok(FormatOutput {
                format: Some(ModuleFormat::Module),
            });
        }
        if self.state.is_entrypoint(url) {
            return Ok(FormatOutput {
                format: Some(ModuleFormat::Commonjs),
            });
        }
        next.get_format(url, ctx).await
    }

    /// Build the shim source for a marked URL.
    pub async fn rewrite_marked(
        &self,
        url: &str,
        ctx: &LoadContext,
        next: &dyn NextHooks,
    ) -> Result<String> {
        let real_url = self.codec.unmark(url);
        let exports = self.enumerator.enumerate(&real_url, ctx, next).await?;

        let mut builder = ShimBuilder::new(self.config.register_url.as_str(), real_url.as_str())
            .with_specifier(self.state.specifier_for(&real_url));
        let expander = StarExpander::new(
            self.enumerator.as_ref(),
            next,
            ctx,
            self.config.max_reexport_depth,
        );
        let mut ids = NamespaceIds::new();
        let mut chain = vec![real_url.clone()];

        for export in exports {
            match export {
                ExportName::Named(name) => {
                    builder.add_export(name);
                }
                ExportName::StarFrom(specifier) => {
                    let expansion = expander
                        .expand(specifier, real_url.clone(), &mut ids, &mut chain)
                        .await?;
                    builder.merge(expansion);
                }
            }
        }

        let shim = builder.finish();
        debug!(
            url = %real_url,
            exports = shim.bindings().len(),
            namespaces = shim.imports().len(),
            "rewrote intercepted module"
        );
        Ok(shim.render())
    }

    fn has_scriptable_extension(&self, url: &str) -> bool {
        let path = Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string());
        Path::new(&path)
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.config.scriptable_extensions.iter().any(|e| e == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hook(version: &str) -> InterceptHook {
        let runtime = RuntimeInfo::parse(version, false).unwrap();
        InterceptHook::new(HookConfig::new("file:///hook/lib/register.js"), &runtime)
    }

    #[test]
    fn test_exposed_hooks_by_era() {
        assert_eq!(
            hook("v20.11.0").exposed_hooks(),
            &[HookKind::Resolve, HookKind::Load]
        );
        assert_eq!(hook("v16.12.0").exposed_hooks().len(), 2);
        assert_eq!(hook("v16.11.0").exposed_hooks().len(), 4);
    }

    #[test]
    fn test_scriptable_extension() {
        let h = hook("v20.11.0");
        assert!(h.has_scriptable_extension("file:///app/main.mjs"));
        assert!(h.has_scriptable_extension("file:///app/main.ts?x=1"));
        assert!(!h.has_scriptable_extension("file:///app/bin/cli"));
        assert!(!h.has_scriptable_extension("file:///app/main.jsx"));
        assert!(!h.has_scriptable_extension("file:///app/js"));
    }
}
