//! Link resolution and per-analysis deduplication

use crate::url::{classify_link, LinkClass};
use std::collections::HashSet;
use url::Url;

/// A link seen for the first time during one analysis
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredLink {
    /// Resolved absolute URL, fragment removed
    pub url: Url,

    /// Internal or external relative to the analyzed page
    pub class: LinkClass,
}

/// Resolves hrefs against the analyzed page and remembers what it has seen
///
/// One resolver lives for exactly one analysis; its seen-set is the
/// deduplication scope.
#[derive(Debug)]
pub struct LinkResolver {
    base: Url,
    seen: HashSet<String>,
    internal: usize,
    external: usize,
}

impl LinkResolver {
    pub fn new(base: Url) -> Self {
        Self {
            base,
            seen: HashSet::new(),
            internal: 0,
            external: 0,
        }
    }

    /// The page URL links are resolved against
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolves a raw href and returns it only on first sighting
    ///
    /// Returns None when the link should be skipped:
    /// - empty or fragment-only hrefs
    /// - hrefs that fail to resolve
    /// - non-HTTP(S) results (mailto:, javascript:, tel:, data:)
    /// - URLs already seen in this analysis
    pub fn resolve(&mut self, href: &str) -> Option<DiscoveredLink> {
        let url = resolve_href(href, &self.base)?;

        if !self.seen.insert(url.as_str().to_string()) {
            return None;
        }

        let class = classify_link(&url, &self.base);
        match class {
            LinkClass::Internal => self.internal += 1,
            LinkClass::External => self.external += 1,
        }

        Some(DiscoveredLink { url, class })
    }

    /// Number of unique internal links seen so far
    pub fn internal_count(&self) -> usize {
        self.internal
    }

    /// Number of unique external links seen so far
    pub fn external_count(&self) -> usize {
        self.external
    }
}

/// Resolves a link href to an absolute URL without deduplication
pub fn resolve_href(href: &str, base: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);

    Some(url)
}
