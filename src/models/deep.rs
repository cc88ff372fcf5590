//! Deep analysis record and its signal groups
//!
//! Several values are heuristic placeholders (contrast issues, total media
//! size, max crawl depth) and are always reported as zero.

use crate::models::HeadingCounts;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Comprehensive analysis of one page, linked 1:1 to an `AnalysisResult`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeepAnalysisResult {
    /// Identifier of the owning analysis; set by the service before saving
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis_id: Option<i64>,

    pub url: String,
    pub created_at: DateTime<Utc>,
    pub performance: PerformanceMetrics,
    pub seo: SeoAnalysis,
    pub accessibility: AccessibilitySignals,
    pub content: ContentAnalysis,
    pub security: SecurityFlags,
    pub mobile: MobileFlags,
    pub social: SocialSignals,
    pub technology: TechnologyFingerprint,
    pub media: MediaCounts,
    pub schema: SchemaMarkup,
    pub cookies: CookieProfile,
    pub links: LinkProfile,
}

impl DeepAnalysisResult {
    /// True when the record is older than `window` at `now`
    pub fn is_stale(&self, now: DateTime<Utc>, window: std::time::Duration) -> bool {
        match chrono::Duration::from_std(window) {
            Ok(window) => now - self.created_at > window,
            Err(_) => false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceMetrics {
    /// Seconds from request start until the body was read
    pub load_time: f64,

    /// Milliseconds until response headers arrived
    pub ttfb: f64,

    /// Body size in bytes
    pub resource_size: u64,

    /// Sub-resources referenced by the page
    pub requests: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeoAnalysis {
    pub meta_tags: MetaTags,
    pub images: ImageAnalysis,
    pub header_structure: HeaderStructure,
    pub canonical_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetaTags {
    pub title: String,
    pub description: String,
    pub keywords: String,
    pub robots: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAnalysis {
    pub total: usize,
    pub missing_alt: usize,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderStructure {
    pub proper: bool,
}

impl HeaderStructure {
    /// A structure is proper when there is at least one h1 and no level is
    /// skipped (some level above n present while level n is absent).
    pub fn from_counts(headings: &HeadingCounts) -> Self {
        Self {
            proper: is_proper_header_structure(headings),
        }
    }
}

/// See [`HeaderStructure::from_counts`]
pub fn is_proper_header_structure(headings: &HeadingCounts) -> bool {
    if headings.h1 == 0 {
        return false;
    }

    let deepest = (1..=6u8)
        .rev()
        .find(|&level| headings.get(level) > 0)
        .unwrap_or(1);

    (1..=deepest).all(|level| headings.get(level) > 0)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilitySignals {
    /// Elements carrying at least one `aria-*` or `role` attribute
    pub aria_attributes: usize,
    pub contrast_issues: usize,
    pub keyboard_navigation: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentAnalysis {
    pub word_count: usize,

    /// Top keywords by percentage of total words
    pub keyword_density: BTreeMap<String, f64>,

    pub readability_score: f64,
    pub text_to_html_ratio: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityFlags {
    pub https: bool,
    pub csp_headers: bool,
    pub xss_protection: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MobileFlags {
    pub viewport: bool,
    pub responsive_design: bool,
    pub touch_friendly: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSignals {
    pub open_graph: bool,
    pub twitter_cards: bool,
    pub social_links: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TechnologyFingerprint {
    pub server: String,
    pub cms: String,
    pub frameworks: Vec<String>,
    pub advertising: Vec<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MediaCounts {
    pub images_count: usize,
    pub video_count: usize,
    pub audio_count: usize,
    pub total_size: u64,
}

/// Encoding used for schema.org markup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemaFormat {
    #[serde(rename = "JSON-LD")]
    JsonLd,
    Microdata,
}

impl std::fmt::Display for SchemaFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JsonLd => write!(f, "JSON-LD"),
            Self::Microdata => write!(f, "Microdata"),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaMarkup {
    pub has_schema: bool,
    pub schema_types: Vec<String>,
    pub format: Option<SchemaFormat>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CookieProfile {
    pub total_count: usize,
    pub first_party: usize,
    pub third_party: usize,
    pub has_consent: bool,
    pub max_age_days: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkProfile {
    pub anchor_text: BTreeMap<String, usize>,
    pub no_follow: usize,
    pub broken_links: usize,
    pub max_depth: usize,
}
