//! Report formatting utilities for Sentry outputs.

use std::fmt::Write;

use serde::Serialize;

use crate::domain::{CategoryScores, HealthReport, ValidationOutcome};
use crate::pipeline::ModelAnalysis;

/// Render a health report as Markdown under the given title.
pub fn render_health_markdown(title: &str, report: &HealthReport) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Model Health Report: {title}\n");
    append_summary(&mut output, report);
    append_category_scores(&mut output, &report.category_scores);
    append_recommendations(&mut output, report);
    output
}

/// Render a full analysis (summary, outcomes, health) as Markdown.
pub fn render_analysis_markdown(analysis: &ModelAnalysis) -> String {
    let mut output = render_health_markdown(&analysis.summary.filename, &analysis.report);
    let summary = &analysis.summary;
    let _ = writeln!(output, "### Model");
    let _ = writeln!(output, "- Schema: {}", summary.ifc_version);
    let _ = writeln!(
        output,
        "- Elements: {} ({} validated)",
        summary.total_elements, summary.validated_elements
    );
    let _ = writeln!(output, "- Storeys: {}", summary.building_stories);
    let _ = writeln!(output, "- Spaces: {}", summary.spaces);
    let _ = writeln!(output);
    append_outcomes(&mut output, &analysis.outcomes);
    output
}

/// Render any serializable report payload as JSON.
pub fn render_json<T: Serialize + ?Sized>(payload: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(payload)
}

/// Category scores ordered worst first, ties broken by name.
pub fn format_category_scores(scores: &CategoryScores) -> Vec<(String, f64)> {
    let mut items: Vec<(String, f64)> = scores.iter().map(|(k, v)| (k.clone(), *v)).collect();
    items.sort_by(|a, b| {
        a.1.partial_cmp(&b.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });
    items
}

fn append_summary(output: &mut String, report: &HealthReport) {
    let _ = writeln!(
        output,
        "- Score: {:.1} (grade {})",
        report.overall_score, report.health_grade
    );
    let _ = writeln!(
        output,
        "- Issues: {} total ({} critical, {} warning, {} info)",
        report.total_issues, report.critical_issues, report.warning_issues, report.info_issues
    );
    let _ = writeln!(output);
}

fn append_category_scores(output: &mut String, scores: &CategoryScores) {
    if scores.is_empty() {
        let _ = writeln!(output, "### Categories\nNo categories scored.\n");
        return;
    }
    let _ = writeln!(output, "### Categories");
    for (category, score) in format_category_scores(scores) {
        let _ = writeln!(output, "- {category}: {score:.1}");
    }
    let _ = writeln!(output);
}

fn append_recommendations(output: &mut String, report: &HealthReport) {
    if report.recommendations.is_empty() {
        let _ = writeln!(output, "### Recommendations\nNo recommendations.\n");
        return;
    }
    let _ = writeln!(output, "### Recommendations");
    for item in &report.recommendations {
        let _ = writeln!(
            output,
            "- [{}] {}: {} ({})",
            item.priority.as_str(),
            item.title,
            item.description,
            item.action
        );
    }
    let _ = writeln!(output);
}

fn append_outcomes(output: &mut String, outcomes: &[ValidationOutcome]) {
    let _ = writeln!(output, "### Rules");
    if outcomes.is_empty() {
        let _ = writeln!(output, "No rules evaluated.\n");
        return;
    }
    let _ = writeln!(output, "| Rule | Category | Status | Issues |");
    let _ = writeln!(output, "| --- | --- | --- | --- |");
    for outcome in outcomes {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            outcome.rule_name, outcome.category, outcome.status, outcome.issue_count
        );
    }
    let _ = writeln!(output);
}
