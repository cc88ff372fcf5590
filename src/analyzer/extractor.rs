//! Single-pass feature extraction over a parsed document
//!
//! The walk is iterative: an explicit stack of nodes replaces recursion, so
//! deeply nested markup cannot exhaust the call stack. Children are pushed in
//! reverse to visit nodes in document order.

use crate::analyzer::login::is_login_form;
use crate::models::{
    HeadingCounts, ImageAnalysis, LinkProfile, MediaCounts, MetaTags, MobileFlags, SchemaFormat,
    SchemaMarkup, SocialSignals,
};
use crate::url::{resolve_href, DiscoveredLink, LinkResolver};
use scraper::node::Node;
use scraper::{ElementRef, Html};
use url::Url;

/// Version reported when no doctype identifies one
pub const HTML5_ASSUMED: &str = "HTML5 (assumed)";

/// Doctype identifier labels, checked in order
const DOCTYPE_LABELS: &[&str] = &["HTML 4.01", "XHTML 1.0", "XHTML 1.1"];

const FRAMEWORKS: &[&str] = &["react", "angular", "vue", "jquery", "bootstrap"];
const AD_NETWORKS: &[&str] = &["adsense", "doubleclick", "adroll", "taboola", "outbrain"];
const KNOWN_CMS: &[(&str, &str)] = &[
    ("wordpress", "WordPress"),
    ("joomla", "Joomla"),
    ("drupal", "Drupal"),
];
const SOCIAL_HOSTS: &[&str] = &[
    "facebook.com",
    "twitter.com",
    "x.com",
    "instagram.com",
    "linkedin.com",
    "youtube.com",
];

/// Text inside these elements is not page content
const NON_CONTENT: &[&str] = &["script", "style", "noscript", "template"];

/// Everything one walk of a document yields
#[derive(Debug, Default)]
pub struct PageFeatures {
    pub html_version: String,
    pub title: String,
    pub headings: HeadingCounts,
    pub has_login_form: bool,

    /// Unique links in document order
    pub links: Vec<DiscoveredLink>,
    pub internal_links: usize,
    pub external_links: usize,

    /// Whitespace-joined content text
    pub text: String,

    pub meta_tags: MetaTags,
    pub canonical_url: String,
    pub images: ImageAnalysis,
    pub media: MediaCounts,
    pub aria_elements: usize,
    pub mobile: MobileFlags,
    pub social: SocialSignals,
    pub frameworks: Vec<String>,
    pub advertising: Vec<String>,

    /// CMS identified from markup, if any
    pub cms: Option<String>,
    pub schema: SchemaMarkup,
    pub cookie_consent: bool,
    pub link_profile: LinkProfile,

    /// Sub-resources the page references
    pub resources: usize,
}

/// Walks `html` once and collects every signal
///
/// # Arguments
///
/// * `html` - The parsed document
/// * `base` - URL of the analyzed page; hrefs resolve against it
pub fn extract(html: &Html, base: &Url) -> PageFeatures {
    let mut walker = Walker {
        features: PageFeatures::default(),
        resolver: LinkResolver::new(base.clone()),
        version: None,
        title: None,
        text_parts: Vec::new(),
        json_ld: false,
        microdata: false,
    };

    let mut stack = vec![html.tree.root()];
    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Doctype(doctype) => {
                if walker.version.is_none() {
                    walker.version = Some(
                        doctype_version(&[doctype.public_id(), doctype.system_id()]).to_string(),
                    );
                }
            }
            Node::Text(text) => {
                let in_content = node
                    .parent()
                    .and_then(|p| p.value().as_element())
                    .map_or(true, |el| !NON_CONTENT.contains(&el.name()));
                let trimmed = text.trim();
                if in_content && !trimmed.is_empty() {
                    walker.text_parts.push(trimmed.to_string());
                }
            }
            Node::Element(_) => {
                if let Some(element) = ElementRef::wrap(node) {
                    walker.visit(element);
                }
            }
            _ => {}
        }

        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }

    walker.finish()
}

/// HTML version from a doctype's identifiers
///
/// No identifiers means the HTML5 doctype. Otherwise the first identifier
/// containing a known label decides; unknown identifiers fall back to
/// [`HTML5_ASSUMED`].
pub fn doctype_version(identifiers: &[&str]) -> &'static str {
    if identifiers.iter().all(|id| id.is_empty()) {
        return "HTML5";
    }

    for id in identifiers {
        if let Some(label) = DOCTYPE_LABELS.iter().find(|label| id.contains(*label)) {
            return label;
        }
    }

    HTML5_ASSUMED
}

struct Walker {
    features: PageFeatures,
    resolver: LinkResolver,
    version: Option<String>,
    title: Option<String>,
    text_parts: Vec<String>,
    json_ld: bool,
    microdata: bool,
}

impl Walker {
    fn visit(&mut self, element: ElementRef<'_>) {
        let el = element.value();
        let name = el.name();

        match name {
            "title" => {
                if self.title.is_none() {
                    if let Some(text) = first_text(element) {
                        self.title = Some(text);
                    }
                }
            }
            "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
                if let Ok(level) = name[1..].parse::<u8>() {
                    self.features.headings.increment(level);
                }
            }
            "a" => self.visit_anchor(element),
            "form" => {
                if !self.features.has_login_form && is_login_form(element) {
                    self.features.has_login_form = true;
                }
            }
            "meta" => self.visit_meta(element),
            "link" => {
                let rel = el.attr("rel").unwrap_or("").to_ascii_lowercase();
                let href = el.attr("href").unwrap_or("");
                if rel.split_whitespace().any(|r| r == "canonical")
                    && self.features.canonical_url.is_empty()
                {
                    self.features.canonical_url = href.to_string();
                }
                if rel.split_whitespace().any(|r| r == "stylesheet") && !href.is_empty() {
                    self.features.resources += 1;
                    self.note_asset_path(href);
                }
            }
            "script" => self.visit_script(element),
            "img" => {
                self.features.images.total += 1;
                self.features.media.images_count += 1;
                if el.attr("alt").map_or(true, |alt| alt.trim().is_empty()) {
                    self.features.images.missing_alt += 1;
                }
                self.count_src(element);
            }
            "video" => {
                self.features.media.video_count += 1;
                self.count_src(element);
            }
            "audio" => {
                self.features.media.audio_count += 1;
                self.count_src(element);
            }
            "source" | "iframe" => self.count_src(element),
            _ => {}
        }

        self.scan_attributes(element);
    }

    fn visit_anchor(&mut self, element: ElementRef<'_>) {
        let el = element.value();
        let href = el.attr("href").unwrap_or("");

        if let Some(text) = first_text(element) {
            *self
                .features
                .link_profile
                .anchor_text
                .entry(text)
                .or_default() += 1;
        }

        if el
            .attr("rel")
            .map_or(false, |rel| rel.to_ascii_lowercase().contains("nofollow"))
        {
            self.features.link_profile.no_follow += 1;
        }

        if let Some(url) = resolve_href(href, self.resolver.base()) {
            if url.host_str().map_or(false, is_social_host) {
                self.features.social.social_links += 1;
            }
        }

        if let Some(link) = self.resolver.resolve(href) {
            self.features.links.push(link);
        }
    }

    fn visit_meta(&mut self, element: ElementRef<'_>) {
        let el = element.value();
        let name = el.attr("name").unwrap_or("").to_ascii_lowercase();
        let property = el.attr("property").unwrap_or("").to_ascii_lowercase();
        let content = el.attr("content").unwrap_or("");
        let meta = &mut self.features.meta_tags;

        match name.as_str() {
            "description" => meta.description = content.to_string(),
            "keywords" => meta.keywords = content.to_string(),
            "robots" => meta.robots = content.to_string(),
            "viewport" => {
                self.features.mobile.viewport = true;
                if content.contains("width=device-width") {
                    self.features.mobile.responsive_design = true;
                }
            }
            "generator" => {
                if self.features.cms.is_none() && !content.trim().is_empty() {
                    self.features.cms = Some(cms_from_generator(content));
                }
            }
            _ => {}
        }

        if matches!(property.as_str(), "og:title" | "og:description" | "og:image") {
            self.features.social.open_graph = true;
        }

        let twitter = ["twitter:card", "twitter:title", "twitter:description"];
        if twitter.contains(&property.as_str()) || twitter.contains(&name.as_str()) {
            self.features.social.twitter_cards = true;
        }
    }

    fn visit_script(&mut self, element: ElementRef<'_>) {
        let el = element.value();
        let script_type = el.attr("type").unwrap_or("").trim().to_ascii_lowercase();
        let src = el.attr("src").unwrap_or("");
        let inline: String = element.text().collect();

        if !src.is_empty() {
            self.features.resources += 1;
            self.note_asset_path(src);
        }

        if script_type == "application/ld+json" {
            self.json_ld = true;
            self.features.schema.has_schema = true;
            for schema_type in json_ld_types(&inline) {
                self.push_schema_type(schema_type);
            }
            return;
        }

        let src_lower = src.to_lowercase();
        let inline_lower = inline.to_lowercase();
        let mentions = |needle: &str| src_lower.contains(needle) || inline_lower.contains(needle);

        for framework in FRAMEWORKS {
            if mentions(framework) && !self.features.frameworks.iter().any(|f| f == framework) {
                self.features.frameworks.push(framework.to_string());
            }
        }

        for network in AD_NETWORKS {
            if mentions(network) && !self.features.advertising.iter().any(|a| a == network) {
                self.features.advertising.push(network.to_string());
            }
        }

        if inline_lower.contains("cookie")
            && (inline_lower.contains("consent") || inline_lower.contains("gdpr"))
        {
            self.features.cookie_consent = true;
        }
    }

    fn scan_attributes(&mut self, element: ElementRef<'_>) {
        let mut aria = false;

        for (key, value) in element.value().attrs() {
            if key.starts_with("aria-") || key == "role" {
                aria = true;
            }

            if key == "itemtype" || key == "itemprop" {
                self.microdata = true;
                self.features.schema.has_schema = true;
            }

            if key == "itemtype" && value.contains("schema.org/") {
                for item_type in value.split_whitespace() {
                    let stripped = item_type
                        .trim_start_matches("https://schema.org/")
                        .trim_start_matches("http://schema.org/");
                    self.push_schema_type(stripped.to_string());
                }
            }
        }

        if aria {
            self.features.aria_elements += 1;
        }
    }

    fn push_schema_type(&mut self, schema_type: String) {
        if !schema_type.is_empty() && !self.features.schema.schema_types.contains(&schema_type) {
            self.features.schema.schema_types.push(schema_type);
        }
    }

    fn count_src(&mut self, element: ElementRef<'_>) {
        if let Some(src) = element.value().attr("src").filter(|s| !s.trim().is_empty()) {
            self.features.resources += 1;
            self.note_asset_path(src);
        }
    }

    /// Asset paths under `wp-content` identify WordPress
    fn note_asset_path(&mut self, path: &str) {
        if self.features.cms.is_none() && path.contains("/wp-content/") {
            self.features.cms = Some("WordPress".to_string());
        }
    }

    fn finish(mut self) -> PageFeatures {
        self.features.html_version = self.version.unwrap_or_else(|| HTML5_ASSUMED.to_string());

        let title = self.title.unwrap_or_default();
        self.features.meta_tags.title = title.clone();
        self.features.title = title;

        self.features.schema.format = if self.json_ld {
            Some(SchemaFormat::JsonLd)
        } else if self.microdata {
            Some(SchemaFormat::Microdata)
        } else {
            None
        };

        self.features.internal_links = self.resolver.internal_count();
        self.features.external_links = self.resolver.external_count();
        self.features.text = self.text_parts.join(" ");
        self.features
    }
}

/// Trimmed first child of an element when it is non-empty text
fn first_text(element: ElementRef<'_>) -> Option<String> {
    element
        .first_child()
        .and_then(|child| child.value().as_text().map(|t| t.trim().to_string()))
        .filter(|t| !t.is_empty())
}

fn is_social_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    SOCIAL_HOSTS
        .iter()
        .any(|social| host == *social || host.ends_with(&format!(".{}", social)))
}

fn cms_from_generator(content: &str) -> String {
    let lowered = content.to_lowercase();
    KNOWN_CMS
        .iter()
        .find(|(needle, _)| lowered.contains(needle))
        .map(|(_, name)| name.to_string())
        .unwrap_or_else(|| content.trim().to_string())
}

/// `@type` values of a JSON-LD block, including nested objects and `@graph`
///
/// Invalid JSON yields no types.
pub fn json_ld_types(body: &str) -> Vec<String> {
    let Ok(root) = serde_json::from_str::<serde_json::Value>(body) else {
        return Vec::new();
    };

    let mut types = Vec::new();
    let mut stack = vec![&root];

    while let Some(value) = stack.pop() {
        match value {
            serde_json::Value::Object(map) => {
                match map.get("@type") {
                    Some(serde_json::Value::String(t)) => types.push(t.clone()),
                    Some(serde_json::Value::Array(items)) => types.extend(
                        items
                            .iter()
                            .filter_map(|item| item.as_str().map(str::to_string)),
                    ),
                    _ => {}
                }
                let nested: Vec<_> = map.iter().filter(|(k, _)| *k != "@type").collect();
                stack.extend(nested.into_iter().rev().map(|(_, v)| v));
            }
            serde_json::Value::Array(items) => stack.extend(items.iter().rev()),
            _ => {}
        }
    }

    types
}
