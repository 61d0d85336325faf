//! `export * from` expansion.
//!
//! A star export forwards every name of another module. The shim can't
//! re-export it wholesale and still own a settable binding per name, so each
//! target is imported as a namespace and its names are flattened into the
//! shim's binding list. Nested star exports are followed recursively.

use crate::error::{Error, Result};
use crate::exports::{ExportEnumerator, ExportName};
use crate::host::NextHooks;
use futures::future::{BoxFuture, FutureExt};
use interpose_proto::{LoadContext, ResolveContext};
use tracing::debug;
use url::Url;

/// Hands out namespace identifiers, unique within one synthesized source.
///
/// Identifiers never start with `$`, so they can't collide with the `$name`
/// locals the shim declares for exports.
#[derive(Debug, Default)]
pub struct NamespaceIds {
    next: usize,
}

impl NamespaceIds {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self) -> String {
        let id = format!("__ns{}", self.next);
        self.next += 1;
        id
    }
}

/// `import * as <ident> from <url>` in the synthesized source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceImport {
    pub ident: String,
    pub url: String,
}

/// The flattened result of one star export, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Expansion {
    pub imports: Vec<NamespaceImport>,
    /// Names that need a setter, read from the merged namespace snapshot.
    pub setters: Vec<String>,
}

impl Expansion {
    /// Identifiers of the imported namespaces.
    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.imports.iter().map(|import| import.ident.as_str())
    }

    pub fn merge(&mut self, other: Expansion) {
        self.imports.extend(other.imports);
        self.setters.extend(other.setters);
    }
}

/// Expands star exports of one module being rewritten.
pub struct StarExpander<'a> {
    enumerator: &'a dyn ExportEnumerator,
    next: &'a dyn NextHooks,
    ctx: LoadContext,
    max_depth: usize,
}

impl<'a> StarExpander<'a> {
    pub fn new(
        enumerator: &'a dyn ExportEnumerator,
        next: &'a dyn NextHooks,
        ctx: &LoadContext,
        max_depth: usize,
    ) -> Self {
        // Targets are loaded with their own format, not the re-exporter's.
        let ctx = LoadContext {
            format: None,
            ..ctx.clone()
        };
        Self {
            enumerator,
            next,
            ctx,
            max_depth,
        }
    }

    /// Expand `export * from '<specifier>'` found in `parent_url`.
    ///
    /// `chain` holds the URLs of the modules currently being expanded,
    /// starting with the module being rewritten. Re-entering one of them is a
    /// cyclic re-export and fails the rewrite.
    pub fn expand<'s>(
        &'s self,
        specifier: String,
        parent_url: String,
        ids: &'s mut NamespaceIds,
        chain: &'s mut Vec<String>,
    ) -> BoxFuture<'s, Result<Expansion>> {
        async move {
            let url = self.resolve_target(&specifier, &parent_url).await?;

            if chain.contains(&url) {
                let mut chain = chain.clone();
                chain.push(url);
                return Err(Error::CyclicExport { chain });
            }
            if chain.len() > self.max_depth {
                return Err(Error::ReexportDepth {
                    url,
                    limit: self.max_depth,
                });
            }

            let names = self.enumerator.enumerate(&url, &self.ctx, self.next).await?;

            let mut expansion = Expansion::default();
            expansion.imports.push(NamespaceImport {
                ident: ids.next_id(),
                url: url.clone(),
            });

            chain.push(url.clone());
            for name in names {
                match name {
                    // Star exports never forward a default export.
                    ExportName::Named(name) if name == "default" => {}
                    ExportName::Named(name) => expansion.setters.push(name),
                    ExportName::StarFrom(inner) => {
                        let nested = self
                            .expand(inner, url.clone(), &mut *ids, &mut *chain)
                            .await?;
                        expansion.merge(nested);
                    }
                }
            }
            chain.pop();

            debug!(
                url = %url,
                parent = %parent_url,
                names = expansion.setters.len(),
                "expanded star export"
            );
            Ok(expansion)
        }
        .boxed()
    }

    /// URL of a star export target.
    ///
    /// Relative and absolute paths are joined against the re-exporting
    /// module; full URLs are taken as-is; bare specifiers go through the
    /// host resolver.
    async fn resolve_target(&self, specifier: &str, parent_url: &str) -> Result<String> {
        let is_path = specifier.starts_with("./")
            || specifier.starts_with("../")
            || specifier.starts_with('/');
        if is_path {
            return Url::parse(parent_url)
                .and_then(|base| base.join(specifier))
                .map(String::from)
                .map_err(|err| Error::resolution(specifier, Some(parent_url), err.to_string()));
        }
        if Url::parse(specifier).is_ok() {
            return Ok(specifier.to_string());
        }
        let resolved = self
            .next
            .resolve(specifier, &ResolveContext::from_parent(parent_url))
            .await?;
        Ok(resolved.url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use interpose_proto::{LoadOutput, ResolveOutput};
    use std::collections::HashMap;

    /// Enumerator over a fixed table of export lists.
    struct TableEnumerator(HashMap<&'static str, Vec<ExportName>>);

    impl ExportEnumerator for TableEnumerator {
        fn enumerate<'a>(
            &'a self,
            url: &'a str,
            _ctx: &'a LoadContext,
            _next: &'a dyn NextHooks,
        ) -> BoxFuture<'a, Result<Vec<ExportName>>> {
            async move {
                self.0
                    .get(url)
                    .cloned()
                    .ok_or_else(|| Error::enumeration(url, "unknown module"))
            }
            .boxed()
        }
    }

    /// Resolves bare specifiers into `node_modules`.
    struct PackageHost;

    impl NextHooks for PackageHost {
        fn resolve<'a>(
            &'a self,
            specifier: &'a str,
            _ctx: &'a ResolveContext,
        ) -> BoxFuture<'a, Result<ResolveOutput>> {
            async move {
                Ok(ResolveOutput::new(format!(
                    "file:///app/node_modules/{specifier}/index.mjs"
                )))
            }
            .boxed()
        }

        fn load<'a>(
            &'a self,
            url: &'a str,
            _ctx: &'a LoadContext,
        ) -> BoxFuture<'a, Result<LoadOutput>> {
            async move { Err(Error::host("load", url, "unused")) }.boxed()
        }
    }

    fn table(entries: &[(&'static str, &[&str])]) -> TableEnumerator {
        TableEnumerator(
            entries
                .iter()
                .map(|(url, names)| (*url, names.iter().map(|n| ExportName::parse(n)).collect()))
                .collect(),
        )
    }

    async fn expand_from_root(
        enumerator: &TableEnumerator,
        specifier: &str,
        max_depth: usize,
    ) -> Result<Expansion> {
        let expander = StarExpander::new(
            enumerator,
            &PackageHost,
            &LoadContext::default(),
            max_depth,
        );
        let mut ids = NamespaceIds::new();
        let mut chain = vec!["file:///app/a.mjs".to_string()];
        expander
            .expand(
                specifier.to_string(),
                "file:///app/a.mjs".to_string(),
                &mut ids,
                &mut chain,
            )
            .await
    }

    #[test]
    fn test_namespace_ids_are_sequential() {
        let mut ids = NamespaceIds::new();
        assert_eq!(ids.next_id(), "__ns0");
        assert_eq!(ids.next_id(), "__ns1");
    }

    #[tokio::test]
    async fn test_single_level() {
        let enumerator = table(&[("file:///app/b.mjs", &["x", "default"])]);
        let expansion = expand_from_root(&enumerator, "./b.mjs", 8).await.unwrap();
        assert_eq!(expansion.namespaces().collect::<Vec<_>>(), vec!["__ns0"]);
        assert_eq!(expansion.imports[0].url, "file:///app/b.mjs");
        assert_eq!(expansion.setters, vec!["x"]);
    }

    #[tokio::test]
    async fn test_nested_star_exports() {
        let enumerator = table(&[
            ("file:///app/b.mjs", &["b1", "* from ./lib/c.mjs"]),
            ("file:///app/lib/c.mjs", &["y", "* from pkg"]),
            ("file:///app/node_modules/pkg/index.mjs", &["z"]),
        ]);
        let expansion = expand_from_root(&enumerator, "./b.mjs", 8).await.unwrap();
        assert_eq!(
            expansion.namespaces().collect::<Vec<_>>(),
            vec!["__ns0", "__ns1", "__ns2"]
        );
        assert_eq!(
            expansion.imports.iter().map(|i| i.url.as_str()).collect::<Vec<_>>(),
            vec![
                "file:///app/b.mjs",
                "file:///app/lib/c.mjs",
                "file:///app/node_modules/pkg/index.mjs"
            ]
        );
        assert_eq!(expansion.setters, vec!["b1", "y", "z"]);
    }

    #[tokio::test]
    async fn test_cycle_is_an_error() {
        let enumerator = table(&[("file:///app/b.mjs", &["x", "* from ./a.mjs"])]);
        let err = expand_from_root(&enumerator, "./b.mjs", 8).await.unwrap_err();
        match err {
            Error::CyclicExport { chain } => assert_eq!(
                chain,
                vec!["file:///app/a.mjs", "file:///app/b.mjs", "file:///app/a.mjs"]
            ),
            other => panic!("expected cyclic export error, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_diamond_is_not_a_cycle() {
        let enumerator = table(&[
            ("file:///app/b.mjs", &["* from ./d.mjs", "* from ./c.mjs"]),
            ("file:///app/c.mjs", &["* from ./d.mjs"]),
            ("file:///app/d.mjs", &["shared"]),
        ]);
        let expansion = expand_from_root(&enumerator, "./b.mjs", 8).await.unwrap();
        assert_eq!(expansion.setters, vec!["shared", "shared"]);
        assert_eq!(expansion.imports.len(), 4);
    }

    #[tokio::test]
    async fn test_depth_limit() {
        let enumerator = table(&[
            ("file:///app/b.mjs", &["* from ./c.mjs"]),
            ("file:///app/c.mjs", &["* from ./d.mjs"]),
            ("file:///app/d.mjs", &["deep"]),
        ]);
        let err = expand_from_root(&enumerator, "./b.mjs", 2).await.unwrap_err();
        assert!(matches!(err, Error::ReexportDepth { limit: 2, .. }));
    }

    #[tokio::test]
    async fn test_enumeration_failure_propagates() {
        let enumerator = table(&[]);
        let err = expand_from_root(&enumerator, "./missing.mjs", 8).await.unwrap_err();
        assert!(matches!(err, Error::Enumeration { .. }));
    }
}
