//! Markdown summary generation
//!
//! This module renders a `CrawlReport` as a human-readable markdown file.

use crate::output::report::CrawlReport;
use crate::output::traits::OutputResult;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Writes the markdown summary of a crawl to `output_path`
pub fn generate_markdown_summary(report: &CrawlReport, output_path: &Path) -> OutputResult<()> {
    let markdown = format_markdown_summary(report);

    let mut file = File::create(output_path)?;
    file.write_all(markdown.as_bytes())?;

    Ok(())
}

/// Formats a crawl report as markdown
pub fn format_markdown_summary(report: &CrawlReport) -> String {
    let mut md = String::new();

    md.push_str("# Sumi-Harvest Crawl Summary\n\n");

    // Run metadata
    md.push_str("## Run Information\n\n");
    md.push_str(&format!("- **Seed**: {}\n", report.seed_url));
    md.push_str(&format!("- **Started**: {}\n", report.started_at.to_rfc3339()));
    if let Some(finished) = &report.finished_at {
        md.push_str(&format!("- **Finished**: {}\n", finished.to_rfc3339()));
    }
    if let Some(duration) = report.duration_seconds() {
        md.push_str(&format!(
            "- **Duration**: {} seconds ({:.2} minutes)\n",
            duration,
            duration as f64 / 60.0
        ));
    }
    md.push_str(&format!("- **Stopped because**: {}\n", report.stop_reason));
    if let Some(hash) = &report.config_hash {
        md.push_str(&format!("- **Config Hash**: {}\n", hash));
    }
    md.push('\n');

    // Overall statistics
    md.push_str("## Overall Statistics\n\n");
    md.push_str(&format!("- **Pages Visited**: {}\n", report.pages_visited));
    md.push_str(&format!("- **Pages Failed**: {}\n", report.pages_failed));
    md.push_str(&format!("- **Records**: {}\n", report.records_emitted));
    md.push_str(&format!("- **Empty Records**: {}\n", report.empty_records));
    md.push_str(&format!("- **Media Files**: {}\n", report.media_downloaded));
    md.push_str(&format!("- **Blocked by robots.txt**: {}\n", report.robots_blocked));
    md.push_str(&format!(
        "- **Rate-limit Retries**: {}\n",
        report.rate_limit_retries
    ));
    md.push_str(&format!(
        "- **Success Rate**: {:.2}%\n\n",
        report.success_rate()
    ));

    // Link admission
    md.push_str("## Links\n\n");
    md.push_str("| Outcome | Count |\n");
    md.push_str("|---------|-------|\n");
    md.push_str(&format!("| Discovered | {} |\n", report.links_discovered));
    md.push_str(&format!("| Queued | {} |\n", report.links_queued));
    md.push_str(&format!("| Too Deep | {} |\n", report.skipped_depth));
    md.push_str(&format!("| Filtered by Pattern | {} |\n", report.skipped_filtered));
    md.push_str(&format!("| Off-site | {} |\n", report.skipped_off_site));
    md.push_str(&format!("| Duplicate | {} |\n", report.skipped_duplicate));
    md.push_str(&format!("| Invalid | {} |\n\n", report.skipped_invalid));

    // Depth breakdown
    if !report.depth_breakdown.is_empty() {
        md.push_str("## Depth Breakdown\n\n");
        md.push_str("| Depth | Pages |\n");
        md.push_str("|-------|-------|\n");
        for (depth, count) in &report.depth_breakdown {
            md.push_str(&format!("| {} | {} |\n", depth, count));
        }
        md.push('\n');
    }

    // Failures
    if !report.failures.is_empty() {
        md.push_str("## Failed URLs\n\n");
        md.push_str("| URL | Reason |\n");
        md.push_str("|-----|--------|\n");
        for failure in report.failures.iter().take(50) {
            md.push_str(&format!("| {} | {} |\n", failure.url, failure.reason));
        }
        if report.failures.len() > 50 {
            md.push_str(&format!("\n... and {} more\n", report.failures.len() - 50));
        }
        md.push('\n');
    }

    md
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::report::StopReason;
    use tempfile::TempDir;

    fn create_test_report() -> CrawlReport {
        let mut report = CrawlReport::new("https://example.com/");
        report.config_hash = Some("abc123".to_string());
        report.record_visit(0);
        report.record_visit(1);
        report.record_visit(1);
        report.record_failure("https://example.com/gone", "HTTP status 404");
        report.records_emitted = 3;
        report.links_discovered = 12;
        report.finish(StopReason::FrontierExhausted);
        report
    }

    #[test]
    fn test_format_markdown_summary() {
        let markdown = format_markdown_summary(&create_test_report());

        assert!(markdown.contains("# Sumi-Harvest Crawl Summary"));
        assert!(markdown.contains("- **Seed**: https://example.com/"));
        assert!(markdown.contains("- **Config Hash**: abc123"));
        assert!(markdown.contains("- **Pages Visited**: 3"));
        assert!(markdown.contains("| Discovered | 12 |"));
        assert!(markdown.contains("frontier exhausted"));
    }

    #[test]
    fn test_markdown_depth_and_failures() {
        let markdown = format_markdown_summary(&create_test_report());

        assert!(markdown.contains("## Depth Breakdown"));
        assert!(markdown.contains("| 0 | 1 |"));
        assert!(markdown.contains("| 1 | 2 |"));
        assert!(markdown.contains("| https://example.com/gone | HTTP status 404 |"));
    }

    #[test]
    fn test_markdown_without_failures_has_no_section() {
        let mut report = CrawlReport::new("https://example.com/");
        report.finish(StopReason::Interrupted);
        let markdown = format_markdown_summary(&report);

        assert!(!markdown.contains("Failed URLs"));
        assert!(!markdown.contains("Depth Breakdown"));
    }

    #[test]
    fn test_generate_markdown_summary_writes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("summary.md");

        generate_markdown_summary(&create_test_report(), &path).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.starts_with("# Sumi-Harvest Crawl Summary"));
    }
}
