//! Formatted terminal output for `list`, `frequency` and `render`.
//!
//! Formatting lives here so the pipeline stays free of presentation and the
//! output can be checked in tests as plain strings.

use std::path::Path;

use crate::app::pipeline::BatchSummary;
use crate::chart::ChartSpec;
use crate::domain::SeriesMetadata;

/// One line per chart: key, title and the series it requests.
pub fn format_chart_list(book: &[ChartSpec]) -> String {
    let key_width = book.iter().map(|c| c.key.len()).max().unwrap_or(0).max(3);
    let mut out = String::new();
    out.push_str(&format!("{:<key_width$}  {}\n", "KEY", "TITLE [SERIES]"));
    for chart in book {
        out.push_str(&format!(
            "{:<key_width$}  {} [{}]\n",
            chart.key,
            chart.title,
            chart.query.series_names().join(", ")
        ));
    }
    out
}

/// Native frequency (and currency, when known) per series.
pub fn format_frequencies(metadata: &[SeriesMetadata]) -> String {
    let name_width = metadata.iter().map(|m| m.name.len()).max().unwrap_or(0).max(6);
    let mut out = String::new();
    for meta in metadata {
        let mut line = format!("{:<name_width$}  {:<11}", meta.name, meta.frequency.label());
        if let Some(currency) = &meta.currency {
            line.push_str(&format!("  {currency}"));
        }
        if let Some(description) = &meta.description {
            line.push_str(&format!("  {description}"));
        }
        out.push_str(line.trim_end());
        out.push('\n');
    }
    out
}

/// Rendered and failed charts after a batch.
pub fn format_batch_summary(summary: &BatchSummary, out_dir: &Path) -> String {
    let mut out = format!(
        "Rendered {} chart(s) into {}",
        summary.rendered.len(),
        out_dir.display()
    );
    if summary.failed.is_empty() {
        out.push('\n');
        return out;
    }
    out.push_str(&format!("; {} failed:\n", summary.failed.len()));
    for (key, err) in &summary.failed {
        out.push_str(&format!("  {key}: {err} (exit code {})\n", err.exit_code()));
    }
    out
}
