//! Statistics display
//!
//! Renders the aggregate [`Stats`] loaded from storage.

use crate::storage::Stats;

/// Formats statistics for the terminal
pub fn format_statistics(stats: &Stats) -> String {
    let mut out = String::new();

    out.push_str("=== Analysis Statistics ===\n\n");

    out.push_str("Overview:\n");
    out.push_str(&format!("  Total analyses: {}\n", stats.total_analyses));
    out.push_str(&format!("  Unique URLs: {}\n", stats.unique_urls));
    out.push_str(&format!("  Distinct owners: {}\n", stats.distinct_owners));
    out.push('\n');

    out.push_str("Recent Activity:\n");
    for (label, count) in [
        ("Last 24 hours", stats.analyses_last_24h),
        ("Last 7 days", stats.analyses_last_7d),
        ("Last 30 days", stats.analyses_last_30d),
    ] {
        let percentage = if stats.total_analyses > 0 {
            (count as f64 / stats.total_analyses as f64) * 100.0
        } else {
            0.0
        };
        out.push_str(&format!("  {}: {} ({:.1}%)\n", label, count, percentage));
    }
    out.push('\n');

    match &stats.most_analyzed_host {
        Some(host) => out.push_str(&format!("Most analyzed host: {}\n", host)),
        None => out.push_str("Most analyzed host: -\n"),
    }
    out.push_str(&format!(
        "Generated at: {}\n",
        stats.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    out
}

/// Prints statistics to stdout
pub fn print_statistics(stats: &Stats) {
    print!("{}", format_statistics(stats));
}
