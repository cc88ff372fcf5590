//! Markdown report generation
//!
//! This module writes a human-readable markdown report of one analysis,
//! optionally followed by its deep analysis.

use crate::models::{AnalysisResult, DeepAnalysisResult, LinkStatus};
use crate::output::{or_dash, yes_no, OutputError, OutputResult};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes a markdown report for an analysis
///
/// # Arguments
///
/// * `result` - The analysis to report on
/// * `deep` - Its deep analysis, when one has been computed
/// * `output_path` - Path where the markdown file should be written
///
/// # Returns
///
/// * `Ok(())` - Successfully wrote the report
/// * `Err(OutputError)` - Failed to write the report
pub fn generate_markdown_report(
    result: &AnalysisResult,
    deep: Option<&DeepAnalysisResult>,
    output_path: &Path,
) -> OutputResult<()> {
    let markdown = format_markdown_report(result, deep);

    let mut file = File::create(output_path)
        .map_err(|e| OutputError::Write(format!("{}: {}", output_path.display(), e)))?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats an analysis as markdown
///
/// # Returns
///
/// A formatted markdown string
pub fn format_markdown_report(result: &AnalysisResult, deep: Option<&DeepAnalysisResult>) -> String {
    let mut md = String::new();

    // Title
    md.push_str("# Page-Lens Analysis Report\n\n");

    // Page metadata
    md.push_str("## Page\n\n");
    if let Some(id) = result.id {
        md.push_str(&format!("- **Analysis ID**: {}\n", id));
    }
    md.push_str(&format!("- **URL**: {}\n", result.url));
    md.push_str(&format!("- **Title**: {}\n", or_dash(&result.title)));
    md.push_str(&format!("- **HTML Version**: {}\n", result.html_version));
    md.push_str(&format!(
        "- **Login Form**: {}\n",
        yes_no(result.has_login_form)
    ));
    if let Some(owner) = &result.owner_id {
        md.push_str(&format!("- **Owner**: {}\n", owner));
    }
    md.push_str(&format!("- **Analyzed At**: {}\n\n", result.created_at.to_rfc3339()));

    // Headings
    md.push_str("## Headings\n\n");
    md.push_str("| Level | Count |\n");
    md.push_str("|-------|-------|\n");
    for level in 1..=6 {
        md.push_str(&format!("| h{} | {} |\n", level, result.headings.get(level)));
    }
    md.push('\n');

    // Links
    md.push_str("## Links\n\n");
    md.push_str("| Kind | Total | Accessible | Inaccessible | Unchecked |\n");
    md.push_str("|------|-------|------------|--------------|-----------|\n");
    md.push_str(&link_row("Internal", &result.internal_links));
    md.push_str(&link_row("External", &result.external_links));
    md.push('\n');

    if let Some(deep) = deep {
        format_deep_sections(&mut md, deep);
    }

    md.push_str("---\n\n");
    md.push_str("*Generated by Page-Lens*\n");

    md
}

fn link_row(kind: &str, status: &LinkStatus) -> String {
    format!(
        "| {} | {} | {} | {} | {} |\n",
        kind,
        status.count,
        status.accessible(),
        status.inaccessible,
        status.unchecked
    )
}

fn format_deep_sections(md: &mut String, deep: &DeepAnalysisResult) {
    md.push_str("## Performance\n\n");
    md.push_str(&format!("- **Load Time**: {:.3}s\n", deep.performance.load_time));
    md.push_str(&format!("- **TTFB**: {:.1}ms\n", deep.performance.ttfb));
    md.push_str(&format!(
        "- **Resource Size**: {} bytes\n",
        deep.performance.resource_size
    ));
    md.push_str(&format!("- **Requests**: {}\n\n", deep.performance.requests));

    md.push_str("## SEO\n\n");
    let meta = &deep.seo.meta_tags;
    md.push_str(&format!("- **Description**: {}\n", or_dash(&meta.description)));
    md.push_str(&format!("- **Keywords**: {}\n", or_dash(&meta.keywords)));
    md.push_str(&format!("- **Robots**: {}\n", or_dash(&meta.robots)));
    md.push_str(&format!(
        "- **Canonical URL**: {}\n",
        or_dash(&deep.seo.canonical_url)
    ));
    md.push_str(&format!(
        "- **Images Missing Alt**: {} of {}\n",
        deep.seo.images.missing_alt, deep.seo.images.total
    ));
    md.push_str(&format!(
        "- **Proper Heading Structure**: {}\n\n",
        yes_no(deep.seo.header_structure.proper)
    ));

    md.push_str("## Signals\n\n");
    md.push_str("| Signal | Value |\n");
    md.push_str("|--------|-------|\n");
    let rows: [(&str, String); 12] = [
        ("HTTPS", yes_no(deep.security.https).to_string()),
        ("CSP Header", yes_no(deep.security.csp_headers).to_string()),
        ("XSS Protection", yes_no(deep.security.xss_protection).to_string()),
        ("Viewport", yes_no(deep.mobile.viewport).to_string()),
        ("Open Graph", yes_no(deep.social.open_graph).to_string()),
        ("Twitter Cards", yes_no(deep.social.twitter_cards).to_string()),
        ("Social Links", deep.social.social_links.to_string()),
        ("ARIA Attributes", deep.accessibility.aria_attributes.to_string()),
        ("Word Count", deep.content.word_count.to_string()),
        (
            "Readability",
            format!("{:.1}", deep.content.readability_score),
        ),
        ("CMS", deep.technology.cms.clone()),
        ("Broken Links", deep.links.broken_links.to_string()),
    ];
    for (signal, value) in rows {
        md.push_str(&format!("| {} | {} |\n", signal, value));
    }
    md.push('\n');

    if !deep.content.keyword_density.is_empty() {
        md.push_str("## Top Keywords\n\n");
        md.push_str("| Keyword | Density |\n");
        md.push_str("|---------|---------|\n");

        let mut keywords: Vec<_> = deep.content.keyword_density.iter().collect();
        keywords.sort_by(|a, b| b.1.total_cmp(a.1).then_with(|| a.0.cmp(b.0)));
        for (word, density) in keywords {
            md.push_str(&format!("| {} | {:.2}% |\n", word, density));
        }
        md.push('\n');
    }

    if deep.schema.has_schema {
        md.push_str("## Structured Data\n\n");
        if let Some(format) = deep.schema.format {
            md.push_str(&format!("- **Format**: {}\n", format));
        }
        for schema_type in &deep.schema.schema_types {
            md.push_str(&format!("- {}\n", schema_type));
        }
        md.push('\n');
    }

    if !deep.technology.frameworks.is_empty() || !deep.technology.advertising.is_empty() {
        md.push_str("## Technology\n\n");
        md.push_str(&format!(
            "- **Frameworks**: {}\n",
            or_dash(&deep.technology.frameworks.join(", "))
        ));
        md.push_str(&format!(
            "- **Advertising**: {}\n\n",
            or_dash(&deep.technology.advertising.join(", "))
        ));
    }
}
