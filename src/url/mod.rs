//! URL handling module for Page-Lens
//!
//! This module provides normalization of the URL a caller asks to analyze,
//! resolution of raw hrefs found on a page, and internal/external classification.

mod normalize;
mod resolve;

pub use normalize::normalize_target;
pub use resolve::{resolve_href, DiscoveredLink, LinkResolver};

use serde::{Deserialize, Serialize};
use url::Url;

/// Where a discovered link points relative to the analyzed page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkClass {
    /// Same host and port as the analyzed page
    Internal,
    /// Any other host or port
    External,
}

impl LinkClass {
    pub fn is_internal(&self) -> bool {
        matches!(self, Self::Internal)
    }
}

/// Classifies a resolved link against the analyzed page
///
/// A link is internal iff its host and explicit port are exactly the page's.
/// There is no subdomain folding and no `www.` stripping, so
/// `blog.example.com` is external to `example.com`, and so is
/// `example.com:8443`. A default port is not explicit.
///
/// # Examples
///
/// ```
/// use page_lens::url::{classify_link, LinkClass};
/// use url::Url;
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let link = Url::parse("https://www.example.com/about").unwrap();
/// assert_eq!(classify_link(&link, &base), LinkClass::External);
/// ```
pub fn classify_link(link: &Url, base: &Url) -> LinkClass {
    if link.host_str() == base.host_str() && link.port() == base.port() {
        LinkClass::Internal
    } else {
        LinkClass::External
    }
}
