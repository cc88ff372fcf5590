//! Assembly of a deep analysis from a fetched page and its extracted features

use crate::analyzer::checker::LinkTally;
use crate::analyzer::content;
use crate::analyzer::extractor::PageFeatures;
use crate::analyzer::fetcher::{CookieInfo, FetchedPage};
use crate::models::{
    AccessibilitySignals, ContentAnalysis, CookieProfile, DeepAnalysisResult, HeaderStructure,
    LinkProfile, MobileFlags, PerformanceMetrics, SecurityFlags, SeoAnalysis,
    TechnologyFingerprint,
};
use chrono::Utc;
use url::Url;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Builds the deep record
///
/// `tally` is None when links were not probed; the broken-link count is
/// then zero.
pub fn assemble(
    target: &Url,
    page: &FetchedPage,
    features: PageFeatures,
    tally: Option<&LinkTally>,
) -> DeepAnalysisResult {
    let host = page.final_url.host_str().unwrap_or_default();
    let mut cookies = cookie_profile(&page.cookies, host);
    cookies.has_consent = features.cookie_consent;

    let text = &features.text;
    DeepAnalysisResult {
        analysis_id: None,
        url: target.to_string(),
        created_at: Utc::now(),
        performance: PerformanceMetrics {
            load_time: page.elapsed.as_secs_f64(),
            ttfb: page.ttfb.as_secs_f64() * 1000.0,
            resource_size: page.size(),
            requests: features.resources,
        },
        seo: SeoAnalysis {
            meta_tags: features.meta_tags.clone(),
            images: features.images,
            header_structure: HeaderStructure::from_counts(&features.headings),
            canonical_url: features.canonical_url.clone(),
        },
        accessibility: AccessibilitySignals {
            aria_attributes: features.aria_elements,
            contrast_issues: 0,
            keyboard_navigation: features.aria_elements > 0,
        },
        content: ContentAnalysis {
            word_count: content::count_words(text),
            keyword_density: content::keyword_density(text),
            readability_score: content::readability_score(text),
            text_to_html_ratio: content::text_to_html_ratio(text.len(), page.size()),
        },
        security: SecurityFlags {
            https: target.scheme() == "https",
            csp_headers: !page.header("content-security-policy").is_empty(),
            xss_protection: !page.header("x-xss-protection").is_empty(),
        },
        mobile: MobileFlags {
            touch_friendly: features.mobile.viewport,
            ..features.mobile
        },
        social: features.social,
        technology: TechnologyFingerprint {
            server: page.header("server").to_string(),
            cms: features.cms.clone().unwrap_or_else(|| "Unknown".to_string()),
            frameworks: features.frameworks.clone(),
            advertising: features.advertising.clone(),
        },
        media: features.media,
        schema: features.schema.clone(),
        cookies,
        links: LinkProfile {
            broken_links: tally.map_or(0, LinkTally::broken),
            max_depth: 0,
            ..features.link_profile
        },
    }
}

/// Counts first- and third-party cookies and the longest max-age
///
/// A cookie is first-party when it has no domain attribute or its domain
/// covers the page host.
pub fn cookie_profile(cookies: &[CookieInfo], host: &str) -> CookieProfile {
    let mut profile = CookieProfile {
        total_count: cookies.len(),
        ..CookieProfile::default()
    };

    for cookie in cookies {
        if is_first_party(cookie.domain.as_deref(), host) {
            profile.first_party += 1;
        } else {
            profile.third_party += 1;
        }

        if let Some(max_age) = cookie.max_age {
            profile.max_age_days = profile.max_age_days.max(max_age.as_secs() / SECONDS_PER_DAY);
        }
    }

    profile
}

fn is_first_party(domain: Option<&str>, host: &str) -> bool {
    let domain = domain.unwrap_or("").trim_start_matches('.').to_ascii_lowercase();
    if domain.is_empty() {
        return true;
    }

    let host = host.to_ascii_lowercase();
    host == domain || host.ends_with(&format!(".{}", domain))
}
