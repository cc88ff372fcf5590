//! Console rendering
//!
//! Plain-text views of analyses for the terminal.

use crate::analyzer::BatchReport;
use crate::models::{AnalysisResult, DeepAnalysisResult, LinkStatus};
use crate::output::{or_dash, yes_no};

/// Formats a single analysis
pub fn format_analysis(result: &AnalysisResult) -> String {
    let mut out = String::new();

    match result.id {
        Some(id) => out.push_str(&format!("=== Analysis #{} ===\n\n", id)),
        None => out.push_str("=== Analysis ===\n\n"),
    }

    out.push_str(&format!("  URL:          {}\n", result.url));
    out.push_str(&format!("  Title:        {}\n", or_dash(&result.title)));
    out.push_str(&format!("  HTML version: {}\n", result.html_version));
    out.push_str(&format!("  Login form:   {}\n", yes_no(result.has_login_form)));
    if let Some(owner) = &result.owner_id {
        out.push_str(&format!("  Owner:        {}\n", owner));
    }
    out.push_str(&format!(
        "  Analyzed at:  {}\n\n",
        result.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out.push_str("Headings:\n");
    let line: Vec<String> = (1..=6)
        .map(|level| format!("h{}={}", level, result.headings.get(level)))
        .collect();
    out.push_str(&format!("  {}\n\n", line.join("  ")));

    out.push_str("Links:\n");
    out.push_str(&link_line("Internal", &result.internal_links));
    out.push_str(&link_line("External", &result.external_links));

    out
}

fn link_line(label: &str, status: &LinkStatus) -> String {
    let mut line = format!(
        "  {:<9} {} total, {} accessible, {} inaccessible",
        format!("{}:", label),
        status.count,
        status.accessible(),
        status.inaccessible
    );
    if status.unchecked > 0 {
        line.push_str(&format!(", {} unchecked", status.unchecked));
    }
    line.push('\n');
    line
}

/// Formats a deep analysis, section by section
pub fn format_deep_analysis(deep: &DeepAnalysisResult) -> String {
    let mut out = String::new();

    match deep.analysis_id {
        Some(id) => out.push_str(&format!("=== Deep Analysis #{} ===\n\n", id)),
        None => out.push_str("=== Deep Analysis ===\n\n"),
    }
    out.push_str(&format!("  URL: {}\n", deep.url));
    out.push_str(&format!(
        "  Computed at: {}\n\n",
        deep.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    let p = &deep.performance;
    out.push_str("Performance:\n");
    out.push_str(&format!("  Load time:     {:.3}s\n", p.load_time));
    out.push_str(&format!("  TTFB:          {:.1}ms\n", p.ttfb));
    out.push_str(&format!("  Resource size: {} bytes\n", p.resource_size));
    out.push_str(&format!("  Requests:      {}\n\n", p.requests));

    let seo = &deep.seo;
    out.push_str("SEO:\n");
    out.push_str(&format!("  Title:        {}\n", or_dash(&seo.meta_tags.title)));
    out.push_str(&format!(
        "  Description:  {}\n",
        or_dash(&seo.meta_tags.description)
    ));
    out.push_str(&format!("  Keywords:     {}\n", or_dash(&seo.meta_tags.keywords)));
    out.push_str(&format!("  Robots:       {}\n", or_dash(&seo.meta_tags.robots)));
    out.push_str(&format!("  Canonical:    {}\n", or_dash(&seo.canonical_url)));
    out.push_str(&format!(
        "  Images:       {} ({} missing alt)\n",
        seo.images.total, seo.images.missing_alt
    ));
    out.push_str(&format!(
        "  Headings ok:  {}\n\n",
        yes_no(seo.header_structure.proper)
    ));

    let a = &deep.accessibility;
    out.push_str("Accessibility:\n");
    out.push_str(&format!("  ARIA attributes:     {}\n", a.aria_attributes));
    out.push_str(&format!("  Contrast issues:     {}\n", a.contrast_issues));
    out.push_str(&format!(
        "  Keyboard navigation: {}\n\n",
        yes_no(a.keyboard_navigation)
    ));

    let c = &deep.content;
    out.push_str("Content:\n");
    out.push_str(&format!("  Words:       {}\n", c.word_count));
    out.push_str(&format!("  Readability: {:.1}\n", c.readability_score));
    out.push_str(&format!("  Text/HTML:   {:.1}%\n", c.text_to_html_ratio));
    if !c.keyword_density.is_empty() {
        let mut keywords: Vec<_> = c.keyword_density.iter().collect();
        keywords.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
        out.push_str("  Top keywords:\n");
        for (word, density) in keywords {
            out.push_str(&format!("    {:<16} {:.2}%\n", word, density));
        }
    }
    out.push('\n');

    let s = &deep.security;
    out.push_str("Security:\n");
    out.push_str(&format!("  HTTPS:            {}\n", yes_no(s.https)));
    out.push_str(&format!("  CSP header:       {}\n", yes_no(s.csp_headers)));
    out.push_str(&format!("  XSS protection:   {}\n\n", yes_no(s.xss_protection)));

    let m = &deep.mobile;
    out.push_str("Mobile:\n");
    out.push_str(&format!("  Viewport:       {}\n", yes_no(m.viewport)));
    out.push_str(&format!("  Responsive:     {}\n", yes_no(m.responsive_design)));
    out.push_str(&format!("  Touch friendly: {}\n\n", yes_no(m.touch_friendly)));

    let social = &deep.social;
    out.push_str("Social:\n");
    out.push_str(&format!("  Open Graph:    {}\n", yes_no(social.open_graph)));
    out.push_str(&format!("  Twitter cards: {}\n", yes_no(social.twitter_cards)));
    out.push_str(&format!("  Social links:  {}\n\n", social.social_links));

    let t = &deep.technology;
    out.push_str("Technology:\n");
    out.push_str(&format!("  Server:      {}\n", or_dash(&t.server)));
    out.push_str(&format!("  CMS:         {}\n", t.cms));
    out.push_str(&format!("  Frameworks:  {}\n", or_dash(&t.frameworks.join(", "))));
    out.push_str(&format!(
        "  Advertising: {}\n\n",
        or_dash(&t.advertising.join(", "))
    ));

    let media = &deep.media;
    out.push_str("Media:\n");
    out.push_str(&format!(
        "  {} images, {} videos, {} audio\n\n",
        media.images_count, media.video_count, media.audio_count
    ));

    let schema = &deep.schema;
    out.push_str("Schema:\n");
    match schema.format {
        Some(format) if schema.has_schema => {
            out.push_str(&format!("  Format: {}\n", format));
            out.push_str(&format!(
                "  Types:  {}\n\n",
                or_dash(&schema.schema_types.join(", "))
            ));
        }
        _ => out.push_str("  none\n\n"),
    }

    let cookies = &deep.cookies;
    out.push_str("Cookies:\n");
    out.push_str(&format!(
        "  {} total ({} first-party, {} third-party)\n",
        cookies.total_count, cookies.first_party, cookies.third_party
    ));
    out.push_str(&format!("  Consent banner: {}\n", yes_no(cookies.has_consent)));
    out.push_str(&format!("  Longest max-age: {} days\n\n", cookies.max_age_days));

    let links = &deep.links;
    out.push_str("Links:\n");
    out.push_str(&format!("  Nofollow: {}\n", links.no_follow));
    out.push_str(&format!("  Broken:   {}\n", links.broken_links));
    if !links.anchor_text.is_empty() {
        let mut anchors: Vec<_> = links.anchor_text.iter().collect();
        anchors.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
        out.push_str("  Top anchor texts:\n");
        for (text, count) in anchors.into_iter().take(10) {
            out.push_str(&format!("    {:>4}  {}\n", count, text));
        }
    }

    out
}

/// Formats the outcome of a batch
pub fn format_batch_report(report: &BatchReport) -> String {
    let mut out = String::new();

    out.push_str("=== Batch Analysis ===\n\n");
    out.push_str(&format!("  Succeeded: {}\n", report.succeeded()));
    out.push_str(&format!("  Failed:    {}\n\n", report.failed()));

    for result in &report.results {
        let id = result
            .id
            .map(|id| format!("#{}", id))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "  {:>6}  {}  ({} internal, {} external links)\n",
            id, result.url, result.internal_links.count, result.external_links.count
        ));
    }

    if report.failed() > 0 {
        out.push('\n');
        out.push_str(&report.summary());
        out.push('\n');
    }

    out
}

/// Prints an analysis to stdout
pub fn print_analysis(result: &AnalysisResult) {
    print!("{}", format_analysis(result));
}

/// Prints a deep analysis to stdout
pub fn print_deep_analysis(deep: &DeepAnalysisResult) {
    print!("{}", format_deep_analysis(deep));
}

/// Prints a batch report to stdout
pub fn print_batch_report(report: &BatchReport) {
    print!("{}", format_batch_report(report));
}
