//! Export enumeration for a module URL.

use super::{scan_cjs_exports, scan_esm_exports, ExportName};
use crate::error::{Error, Result};
use crate::host::NextHooks;
use crate::runtime::Capabilities;
use futures::future::{BoxFuture, FutureExt};
use interpose_proto::{LoadContext, ModuleFormat, ResolveContext};
use rustc_hash::FxHashSet;
use tracing::{debug, trace};
use url::Url;

/// Lists the exports of a module.
///
/// Implementations may suspend on I/O. A failure means the module can't be
/// intercepted; the caller fails that one load.
pub trait ExportEnumerator: Send + Sync {
    fn enumerate<'a>(
        &'a self,
        url: &'a str,
        ctx: &'a LoadContext,
        next: &'a dyn NextHooks,
    ) -> BoxFuture<'a, Result<Vec<ExportName>>>;
}

/// Enumerator backed by the host's own loader.
///
/// Reads the module through the next hook and scans it statically. Hosts
/// without static analysis support get the evaluating fallback instead,
/// which runs the module to read its namespace keys.
#[derive(Debug, Clone)]
pub struct HostEnumerator {
    caps: Capabilities,
}

impl HostEnumerator {
    /// Create an enumerator for the given host.
    ///
    /// Capabilities derived from a [`RuntimeInfo`](crate::runtime::RuntimeInfo)
    /// only enable static analysis on hosts with the `load` hook. Hand-built
    /// capabilities may pair static analysis with a legacy host; sources are
    /// then read through `get_format` and `get_source`.
    #[must_use]
    pub fn new(caps: Capabilities) -> Self {
        Self { caps }
    }

    /// Fetch format and source through whichever hooks this host has.
    async fn fetch(
        &self,
        url: &str,
        ctx: &LoadContext,
        next: &dyn NextHooks,
    ) -> Result<(Option<ModuleFormat>, Option<String>)> {
        let fetched = if self.caps.has_modern_load_hook {
            next.load(url, ctx)
                .await
                .map(|out| (out.format, out.source))
        } else {
            match next.get_format(url, ctx).await {
                Ok(format) => {
                    let source_ctx = LoadContext {
                        format: format.format,
                        ..ctx.clone()
                    };
                    next.get_source(url, &source_ctx)
                        .await
                        .map(|out| (format.format, out.source))
                }
                Err(err) => Err(err),
            }
        };
        fetched.map_err(|err| into_enumeration(url, err))
    }

    async fn builtin_exports(&self, url: &str, next: &dyn NextHooks) -> Result<Vec<ExportName>> {
        let mut keys = next
            .import_namespace_keys(url)
            .await
            .map_err(|err| into_enumeration(url, err))?;
        if !keys.iter().any(|k| k == "default") {
            keys.push("default".to_string());
        }
        Ok(keys.into_iter().map(ExportName::Named).collect())
    }

    /// Exports of a CommonJS module, following `module.exports = require(...)`.
    fn cjs_exports<'a>(
        &'a self,
        url: String,
        source: String,
        ctx: &'a LoadContext,
        next: &'a dyn NextHooks,
        visited: &'a mut FxHashSet<String>,
    ) -> BoxFuture<'a, Result<Vec<String>>> {
        async move {
            visited.insert(url.clone());
            let found = scan_cjs_exports(&source);
            let mut names = found.names;
            let inner_ctx = LoadContext {
                format: None,
                ..ctx.clone()
            };

            for spec in found.reexports {
                let resolved = next
                    .resolve(&spec, &ResolveContext::from_parent(url.as_str()))
                    .await
                    .map_err(|err| into_enumeration(&url, err))?;
                if !visited.insert(resolved.url.clone()) {
                    trace!(url = %resolved.url, "skipping revisited commonjs re-export");
                    continue;
                }
                let (_, inner_source) = self.fetch(&resolved.url, &inner_ctx, next).await?;
                let inner_source = match inner_source {
                    Some(source) => source,
                    None => read_file_url(&resolved.url).await?,
                };
                let inner = self
                    .cjs_exports(resolved.url, inner_source, ctx, next, &mut *visited)
                    .await?;
                for name in inner {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }

            Ok(names)
        }
        .boxed()
    }

    async fn static_exports(
        &self,
        url: &str,
        ctx: &LoadContext,
        next: &dyn NextHooks,
    ) -> Result<Vec<ExportName>> {
        let (format, source) = self.fetch(url, ctx, next).await?;

        let source = match source {
            Some(source) => source,
            None if format == Some(ModuleFormat::Builtin) => {
                return self.builtin_exports(url, next).await;
            }
            None => read_file_url(url).await?,
        };

        let exports = match format {
            Some(ModuleFormat::Module) => scan_esm_exports(&source),
            Some(ModuleFormat::Commonjs) => {
                let mut visited = FxHashSet::default();
                self.cjs_exports(url.to_string(), source, ctx, next, &mut visited)
                    .await?
                    .into_iter()
                    .map(ExportName::Named)
                    .collect()
            }
            Some(ModuleFormat::Json) => vec![ExportName::named("default")],
            Some(ModuleFormat::Wasm | ModuleFormat::Builtin) => {
                return Err(Error::enumeration(
                    url,
                    format!(
                        "{} modules can't be analyzed statically",
                        format.map_or("unknown", |f| f.as_str())
                    ),
                ));
            }
            Some(ModuleFormat::Unknown) | None => {
                let esm = scan_esm_exports(&source);
                if esm.is_empty() {
                    let mut visited = FxHashSet::default();
                    self.cjs_exports(url.to_string(), source, ctx, next, &mut visited)
                        .await?
                        .into_iter()
                        .map(ExportName::Named)
                        .collect()
                } else {
                    esm
                }
            }
        };

        Ok(exports)
    }
}

impl ExportEnumerator for HostEnumerator {
    fn enumerate<'a>(
        &'a self,
        url: &'a str,
        ctx: &'a LoadContext,
        next: &'a dyn NextHooks,
    ) -> BoxFuture<'a, Result<Vec<ExportName>>> {
        async move {
            if !self.caps.supports_native_enumeration {
                debug!(url, "enumerating exports by evaluating module");
                let keys = next
                    .import_namespace_keys(url)
                    .await
                    .map_err(|err| into_enumeration(url, err))?;
                return Ok(keys.into_iter().map(ExportName::Named).collect());
            }
            let exports = self.static_exports(url, ctx, next).await?;
            trace!(url, count = exports.len(), "enumerated exports");
            Ok(exports)
        }
        .boxed()
    }
}

/// Report a host failure as an enumeration failure of `url`.
fn into_enumeration(url: &str, err: Error) -> Error {
    match err {
        Error::Enumeration { .. } => err,
        other => Error::enumeration(url, other.to_string()),
    }
}

/// Read a `file:` URL from disk, for loads where the host supplied no source.
async fn read_file_url(url: &str) -> Result<String> {
    let path = Url::parse(url)
        .ok()
        .filter(|u| u.scheme() == "file")
        .and_then(|u| u.to_file_path().ok())
        .ok_or_else(|| Error::enumeration(url, "no source available"))?;
    tokio::fs::read_to_string(&path)
        .await
        .map_err(|err| Error::enumeration(url, format!("{}: {err}", path.display())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::{FileSchemePolicy, RuntimeInfo};
    use interpose_proto::{FormatOutput, LoadOutput, ResolveOutput, SourceOutput};
    use std::collections::HashMap;

    #[derive(Default)]
    struct MapHost {
        modules: HashMap<String, (Option<ModuleFormat>, Option<String>)>,
        namespaces: HashMap<String, Vec<String>>,
    }

    impl MapHost {
        fn module(mut self, url: &str, format: Option<ModuleFormat>, source: Option<&str>) -> Self {
            self.modules
                .insert(url.to_string(), (format, source.map(str::to_string)));
            self
        }

        fn namespace(mut self, url: &str, keys: &[&str]) -> Self {
            self.namespaces
                .insert(url.to_string(), keys.iter().map(|k| (*k).to_string()).collect());
            self
        }
    }

    impl NextHooks for MapHost {
        fn resolve<'a>(
            &'a self,
            specifier: &'a str,
            ctx: &'a ResolveContext,
        ) -> BoxFuture<'a, Result<ResolveOutput>> {
            async move {
                let base = ctx.parent_url.as_deref().unwrap_or("file:///");
                if !specifier.starts_with('.') && !specifier.starts_with('/') {
                    return Err(Error::resolution(specifier, Some(base), "package not found"));
                }
                let url = Url::parse(base)
                    .and_then(|b| b.join(specifier))
                    .map_err(|e| Error::resolution(specifier, Some(base), e.to_string()))?;
                Ok(ResolveOutput::new(url.as_str()))
            }
            .boxed()
        }

        fn load<'a>(
            &'a self,
            url: &'a str,
            _ctx: &'a LoadContext,
        ) -> BoxFuture<'a, Result<LoadOutput>> {
            async move {
                let (format, source) = self
                    .modules
                    .get(url)
                    .cloned()
                    .ok_or_else(|| Error::host("load", url, "not found"))?;
                Ok(LoadOutput {
                    format,
                    source,
                    short_circuit: false,
                })
            }
            .boxed()
        }

        fn import_namespace_keys<'a>(
            &'a self,
            url: &'a str,
        ) -> BoxFuture<'a, Result<Vec<String>>> {
            async move {
                self.namespaces
                    .get(url)
                    .cloned()
                    .ok_or_else(|| Error::host("import", url, "not evaluable"))
            }
            .boxed()
        }
    }

    fn enumerator(version: &str) -> HostEnumerator {
        HostEnumerator::new(RuntimeInfo::parse(version, false).unwrap().capabilities())
    }

    fn names(exports: &[ExportName]) -> Vec<String> {
        exports.iter().map(ToString::to_string).collect()
    }

    #[tokio::test]
    async fn test_esm_module() {
        let host = MapHost::default().module(
            "file:///app/a.mjs",
            Some(ModuleFormat::Module),
            Some("export const a = 1\nexport * from './b.mjs'"),
        );
        let exports = enumerator("v20.11.0")
            .enumerate("file:///app/a.mjs", &LoadContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(names(&exports), vec!["a", "* from ./b.mjs"]);
    }

    #[tokio::test]
    async fn test_cjs_reexport_is_flattened() {
        let host = MapHost::default()
            .module(
                "file:///app/index.cjs",
                Some(ModuleFormat::Commonjs),
                Some("module.exports = require('./impl.cjs')"),
            )
            .module(
                "file:///app/impl.cjs",
                Some(ModuleFormat::Commonjs),
                Some("exports.run = () => {}\nmodule.exports = require('./index.cjs')"),
            );
        let exports = enumerator("v20.11.0")
            .enumerate("file:///app/index.cjs", &LoadContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(names(&exports), vec!["default", "run"]);
    }

    #[tokio::test]
    async fn test_unknown_format_falls_back_to_cjs() {
        let host = MapHost::default().module(
            "file:///app/lib.js",
            None,
            Some("exports.helper = 1"),
        );
        let exports = enumerator("v20.11.0")
            .enumerate("file:///app/lib.js", &LoadContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(names(&exports), vec!["helper", "default"]);
    }

    #[tokio::test]
    async fn test_builtin_uses_namespace_keys() {
        let host = MapHost::default()
            .module("node:fs", Some(ModuleFormat::Builtin), None)
            .namespace("node:fs", &["readFile", "writeFile"]);
        let exports = enumerator("v20.11.0")
            .enumerate("node:fs", &LoadContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(names(&exports), vec!["readFile", "writeFile", "default"]);
    }

    #[tokio::test]
    async fn test_missing_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("disk.cjs");
        std::fs::write(&path, "exports.fromDisk = true").unwrap();
        let url = Url::from_file_path(&path).unwrap().to_string();

        let host = MapHost::default().module(&url, Some(ModuleFormat::Commonjs), None);
        let exports = enumerator("v20.11.0")
            .enumerate(&url, &LoadContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(names(&exports), vec!["fromDisk", "default"]);
    }

    #[tokio::test]
    async fn test_degraded_mode_evaluates() {
        let host = MapHost::default().namespace("file:///app/a.mjs", &["x", "y"]);
        let exports = enumerator("v16.11.0")
            .enumerate("file:///app/a.mjs", &LoadContext::default(), &host)
            .await
            .unwrap();
        assert_eq!(names(&exports), vec!["x", "y"]);
    }

    #[tokio::test]
    async fn test_failure_is_enumeration_error() {
        let host = MapHost::default();
        let err = enumerator("v20.11.0")
            .enumerate("file:///app/missing.mjs", &LoadContext::default(), &host)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Enumeration { .. }));
        assert!(err.to_string().contains("file:///app/missing.mjs"));
    }

    #[tokio::test]
    async fn test_failed_reexport_resolution_is_enumeration_error() {
        let host = MapHost::default().module(
            "file:///app/index.cjs",
            Some(ModuleFormat::Commonjs),
            Some("module.exports = require('missing-pkg')"),
        );
        let err = enumerator("v20.11.0")
            .enumerate("file:///app/index.cjs", &LoadContext::default(), &host)
            .await
            .unwrap_err();
        match err {
            Error::Enumeration { url, reason } => {
                assert_eq!(url, "file:///app/index.cjs");
                assert!(reason.contains("missing-pkg"), "{reason}");
            }
            other => panic!("expected enumeration error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_failed_evaluation_is_enumeration_error() {
        let host = MapHost::default();
        let err = enumerator("v16.11.0")
            .enumerate("file:///app/a.mjs", &LoadContext::default(), &host)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Enumeration { .. }), "{err}");

        let host = MapHost::default().module("node:vm", Some(ModuleFormat::Builtin), None);
        let err = enumerator("v20.11.0")
            .enumerate("node:vm", &LoadContext::default(), &host)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Enumeration { .. }), "{err}");
    }

    /// Legacy host: no `load`, only `getFormat`/`getSource`.
    struct LegacyHost;

    impl NextHooks for LegacyHost {
        fn resolve<'a>(
            &'a self,
            specifier: &'a str,
            _ctx: &'a ResolveContext,
        ) -> BoxFuture<'a, Result<ResolveOutput>> {
            async move { Ok(ResolveOutput::new(specifier)) }.boxed()
        }

        fn load<'a>(
            &'a self,
            url: &'a str,
            _ctx: &'a LoadContext,
        ) -> BoxFuture<'a, Result<LoadOutput>> {
            async move { Err(Error::host("load", url, "not a hook on this host")) }.boxed()
        }

        fn get_source<'a>(
            &'a self,
            _url: &'a str,
            ctx: &'a LoadContext,
        ) -> BoxFuture<'a, Result<SourceOutput>> {
            async move {
                assert_eq!(ctx.format, Some(ModuleFormat::Module));
                Ok(SourceOutput {
                    source: Some("export const legacy = 1".to_string()),
                })
            }
            .boxed()
        }

        fn get_format<'a>(
            &'a self,
            _url: &'a str,
            _ctx: &'a LoadContext,
        ) -> BoxFuture<'a, Result<FormatOutput>> {
            async move {
                Ok(FormatOutput {
                    format: Some(ModuleFormat::Module),
                })
            }
            .boxed()
        }
    }

    #[tokio::test]
    async fn test_static_analysis_on_legacy_hooks() {
        let caps = Capabilities {
            has_modern_load_hook: false,
            supports_native_enumeration: true,
            file_scheme: FileSchemePolicy::UnlessFile,
            windows: false,
        };
        let exports = HostEnumerator::new(caps)
            .enumerate("file:///app/a.mjs", &LoadContext::default(), &LegacyHost)
            .await
            .unwrap();
        assert_eq!(names(&exports), vec!["legacy"]);
    }
}
