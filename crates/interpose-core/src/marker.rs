//! Interception marker codec.
//!
//! A marked identifier is the module URL with an extra query parameter
//! (`?iitm=true` by default). The host treats it as a distinct module, which
//! is what lets the hook serve a shim under the marked URL while the shim
//! itself imports the real, unmarked module.
//!
//! Nothing here fails: identifiers that don't parse as URLs are reported as
//! unmarked and returned unchanged.

use crate::runtime::Capabilities;
use url::{form_urlencoded, Url};

/// Encodes and decodes the interception marker.
#[derive(Debug, Clone)]
pub struct MarkerCodec {
    key: String,
    caps: Capabilities,
}

impl MarkerCodec {
    #[must_use]
    pub fn new(key: impl Into<String>, caps: Capabilities) -> Self {
        Self {
            key: key.into(),
            caps,
        }
    }

    /// The query key used as the marker.
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether `id` carries the marker.
    #[must_use]
    pub fn has_marker(&self, id: &str) -> bool {
        Url::parse(id).is_ok_and(|url| url.query_pairs().any(|(k, _)| k == self.key))
    }

    /// Add the marker to `id`.
    ///
    /// Already-marked identifiers are returned as-is. Returns `None` when
    /// `id` is not a URL; such identifiers can't be intercepted.
    #[must_use]
    pub fn mark(&self, id: &str) -> Option<String> {
        let mut url = Url::parse(id).ok()?;
        if url.query_pairs().any(|(k, _)| k == self.key) {
            return Some(id.to_string());
        }

        let mut pairs = self.other_pairs(&url);
        pairs.push((self.key.clone(), "true".to_string()));
        set_pairs(&mut url, &pairs);

        if self.caps.file_scheme.needs_prefix(url.scheme()) {
            Some(format!("file:{url}"))
        } else {
            Some(url.into())
        }
    }

    /// Remove the marker from `id`, undoing any scheme prefix the runtime
    /// needed while marked.
    #[must_use]
    pub fn unmark(&self, id: &str) -> String {
        let Ok(mut url) = Url::parse(id) else {
            return id.to_string();
        };

        if url.query_pairs().any(|(k, _)| k == self.key) {
            let pairs = self.other_pairs(&url);
            set_pairs(&mut url, &pairs);
        }

        let href: String = url.into();
        if !self.caps.normalizes_scheme() {
            return href;
        }
        if let Some(rest) = href.strip_prefix("file:///node:") {
            return format!("node:{rest}");
        }
        if let Some(rest) = href.strip_prefix("file:node:") {
            return format!("node:{rest}");
        }
        href
    }

    fn other_pairs(&self, url: &Url) -> Vec<(String, String)> {
        url.query_pairs()
            .filter(|(k, _)| k != &self.key)
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }
}

fn set_pairs(url: &mut Url, pairs: &[(String, String)]) {
    if pairs.is_empty() {
        url.set_query(None);
        return;
    }
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    url.set_query(Some(&query));
}
