#![deny(missing_docs)]
//! Sentry command-line interface.
//!
//! Scores validation outcomes and analyses IFC models locally, and talks to a
//! running Sentry server for uploads and project listings.

mod client;

use clap::{Args, Parser, Subcommand, ValueEnum};
use client::{ProjectDetail, ProjectSummary, SentryApi, ServerArgs, UploadResponse};
use sentry_core::storage::allowed_file;
use sentry_core::{
    AnalysisPipeline, HealthReport, HealthScorer, ModelAnalysis, ModelInsights, OutcomeRecord,
    Xorshift64, format_category_scores, render_analysis_markdown, render_health_markdown,
    render_json,
};
use serde::Serialize;
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub(crate) type CliResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Analysis of a local model together with its derived insights.
#[derive(Debug, Clone, PartialEq, Serialize)]
struct LocalAnalysis {
    #[serde(flatten)]
    analysis: ModelAnalysis,
    insights: ModelInsights,
}

#[derive(Parser)]
#[command(name = "sentry", version, about = "Sentry model health CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct OutputArgs {
    /// Output format for report data.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
    /// Write the report to a file instead of stdout.
    #[arg(long = "report-output")]
    report_output: Option<PathBuf>,
}

#[derive(ValueEnum, Copy, Clone, Debug, Eq, PartialEq)]
enum OutputFormat {
    Text,
    Json,
    Markdown,
}

#[derive(Subcommand)]
enum Commands {
    /// Score a JSON array of validation outcomes.
    Score {
        /// JSON file holding the outcome records.
        #[arg(short, long)]
        input: PathBuf,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Run the simulated analysis on a local IFC model.
    Analyze {
        /// Model file to analyse.
        #[arg(short, long)]
        file: PathBuf,
        /// Seed for reproducible results.
        #[arg(long)]
        seed: Option<u64>,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Upload a model to the server.
    Upload {
        /// Model file to upload.
        #[arg(short, long)]
        file: PathBuf,
        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// List projects on the server.
    Projects {
        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
    /// Show one project with its rule outcomes.
    Project {
        /// Project id.
        #[arg(long)]
        id: String,
        #[command(flatten)]
        server: ServerArgs,
        #[command(flatten)]
        report: OutputArgs,
    },
}

#[cfg(not(test))]
#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Score { input, report } => run_score(&input, &report).await?,
        Commands::Analyze { file, seed, report } => run_analyze(&file, seed, &report).await?,
        Commands::Upload {
            file,
            server,
            report,
        } => {
            let client = client::ReqwestSentryClient::new()?;
            run_upload(&client, &server, &file, &report).await?
        }
        Commands::Projects { server, report } => {
            let client = client::ReqwestSentryClient::new()?;
            run_projects(&client, &server, &report).await?
        }
        Commands::Project { id, server, report } => {
            let client = client::ReqwestSentryClient::new()?;
            run_project(&client, &server, &id, &report).await?
        }
    }

    Ok(())
}

#[cfg(test)]
fn main() {}

async fn run_score(input: &Path, output: &OutputArgs) -> CliResult<()> {
    let raw = tokio::fs::read_to_string(input).await?;
    let report = score_json(&raw)?;
    let title = input
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or("outcomes");
    let contents = match output.format {
        OutputFormat::Text => render_health_text(title, &report),
        OutputFormat::Json => render_json(&report)?,
        OutputFormat::Markdown => render_health_markdown(title, &report),
    };
    emit_output(output, contents).await
}

fn score_json(raw: &str) -> CliResult<HealthReport> {
    let records: Vec<OutcomeRecord> = serde_json::from_str(raw)?;
    Ok(HealthScorer::new().score_records(&records)?)
}

async fn run_analyze(file: &Path, seed: Option<u64>, output: &OutputArgs) -> CliResult<()> {
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| format!("{} has no file name", file.display()))?;
    if !allowed_file(filename) {
        return Err(format!("{filename} is not an .ifc model").into());
    }
    let size = tokio::fs::metadata(file).await?.len();
    let local = analyze_model(filename, size, seed)?;
    let contents = match output.format {
        OutputFormat::Text => {
            let mut text = render_analysis_text(&local.analysis);
            text.push_str(&render_insights_text(&local.insights));
            text
        }
        OutputFormat::Json => render_json(&local)?,
        OutputFormat::Markdown => {
            let mut markdown = render_analysis_markdown(&local.analysis);
            markdown.push_str(&render_insights_markdown(&local.insights));
            markdown
        }
    };
    emit_output(output, contents).await
}

fn analyze_model(filename: &str, size: u64, seed: Option<u64>) -> CliResult<LocalAnalysis> {
    let mut rng = match seed {
        Some(seed) => Xorshift64::new(seed),
        None => Xorshift64::from_entropy(),
    };
    let pipeline = AnalysisPipeline::new();
    let analysis = pipeline.analyze(filename, size, &mut rng)?;
    let insights = pipeline.insights(&analysis.summary, &mut rng);
    Ok(LocalAnalysis { analysis, insights })
}

async fn run_upload<C: SentryApi>(
    client: &C,
    server: &ServerArgs,
    file: &Path,
    output: &OutputArgs,
) -> CliResult<()> {
    let response = client::upload_file(client, server, file).await?;
    let contents = match output.format {
        OutputFormat::Text | OutputFormat::Markdown => render_upload_text(&response),
        OutputFormat::Json => render_json(&response)?,
    };
    emit_output(output, contents).await
}

async fn run_projects<C: SentryApi>(
    client: &C,
    server: &ServerArgs,
    output: &OutputArgs,
) -> CliResult<()> {
    let projects = client::list_projects(client, server).await?;
    let contents = match output.format {
        OutputFormat::Text => render_projects_text(&projects),
        OutputFormat::Json => render_json(&projects)?,
        OutputFormat::Markdown => render_projects_markdown(&projects),
    };
    emit_output(output, contents).await
}

async fn run_project<C: SentryApi>(
    client: &C,
    server: &ServerArgs,
    id: &str,
    output: &OutputArgs,
) -> CliResult<()> {
    let detail = client::fetch_project(client, server, id).await?;
    let contents = match output.format {
        OutputFormat::Text => render_project_text(&detail),
        OutputFormat::Json => render_json(&detail)?,
        OutputFormat::Markdown => match &detail.health_report {
            Some(report) => render_health_markdown(&detail.project.name, report),
            None => render_projects_markdown(std::slice::from_ref(&detail.project)),
        },
    };
    emit_output(output, contents).await
}

async fn emit_output(output: &OutputArgs, contents: String) -> CliResult<()> {
    if let Some(path) = &output.report_output {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, contents).await?;
    } else {
        print!("{contents}");
    }
    Ok(())
}

fn render_health_text(title: &str, report: &HealthReport) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "Model: {title}");
    let _ = writeln!(
        output,
        "Score: {:.1} (grade {})",
        report.overall_score, report.health_grade
    );
    let _ = writeln!(
        output,
        "Issues: {} critical, {} warning, {} info",
        report.critical_issues, report.warning_issues, report.info_issues
    );
    if report.category_scores.is_empty() {
        let _ = writeln!(output, "Categories: none scored");
    } else {
        let _ = writeln!(output, "Categories:");
        for (category, score) in format_category_scores(&report.category_scores) {
            let _ = writeln!(output, "- {category}: {score:.1}");
        }
    }
    if !report.recommendations.is_empty() {
        let _ = writeln!(output, "Recommendations:");
        for item in &report.recommendations {
            let _ = writeln!(
                output,
                "- [{}] {}: {}",
                item.priority.as_str(),
                item.title,
                item.action
            );
        }
    }
    output
}

fn render_analysis_text(analysis: &ModelAnalysis) -> String {
    let summary = &analysis.summary;
    let mut output = render_health_text(&summary.filename, &analysis.report);
    let _ = writeln!(output, "Schema: {}", summary.ifc_version);
    let _ = writeln!(
        output,
        "Elements: {} ({} validated)",
        summary.total_elements, summary.validated_elements
    );
    let _ = writeln!(output, "Rules:");
    for outcome in &analysis.outcomes {
        let _ = writeln!(
            output,
            "- {} [{}]: {} ({} issues)",
            outcome.rule_name, outcome.category, outcome.status, outcome.issue_count
        );
    }
    output
}

fn render_insights_text(insights: &ModelInsights) -> String {
    let mut output = String::new();
    let stats = &insights.statistics;
    let _ = writeln!(
        output,
        "Statistics: {:.1} elements per storey, {:.1}% validated, {:?} complexity",
        stats.element_density,
        stats.validation_coverage * 100.0,
        stats.geometry_complexity
    );
    let _ = writeln!(
        output,
        "Property sets: {} common, {} custom ({:.1}% coverage)",
        insights.properties.common_property_sets.len(),
        insights.properties.custom_property_sets.len(),
        insights.properties.properties_coverage * 100.0
    );
    if !insights.custom_results.is_empty() {
        let _ = writeln!(output, "Custom rules:");
        for result in &insights.custom_results {
            let _ = writeln!(
                output,
                "- {}: {} ({} issues)",
                result.name, result.status, result.issues
            );
        }
    }
    output
}

fn render_insights_markdown(insights: &ModelInsights) -> String {
    let mut output = String::new();
    let stats = &insights.statistics;
    let _ = writeln!(output, "### Statistics");
    let _ = writeln!(output, "- Elements per storey: {:.1}", stats.element_density);
    let _ = writeln!(
        output,
        "- Validation coverage: {:.1}%",
        stats.validation_coverage * 100.0
    );
    let _ = writeln!(output, "- Geometry complexity: {:?}", stats.geometry_complexity);
    let _ = writeln!(
        output,
        "- Property sets: {}",
        insights
            .properties
            .common_property_sets
            .iter()
            .chain(&insights.properties.custom_property_sets)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    );
    let _ = writeln!(output);
    if !insights.custom_results.is_empty() {
        let _ = writeln!(output, "### Custom rules");
        for result in &insights.custom_results {
            let _ = writeln!(
                output,
                "- {}: {} ({} issues)",
                result.name, result.status, result.issues
            );
        }
        let _ = writeln!(output);
    }
    output
}

fn render_upload_text(response: &UploadResponse) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "{}", response.message);
    let _ = writeln!(output, "Project: {}", response.project_id);
    let _ = writeln!(
        output,
        "File: {} ({} bytes)",
        response.filename, response.file_size
    );
    let _ = writeln!(output, "Status: {}", response.status);
    output
}

fn render_projects_text(projects: &[ProjectSummary]) -> String {
    if projects.is_empty() {
        return "No projects found.\n".to_string();
    }
    let mut output = String::new();
    for project in projects {
        let _ = writeln!(
            output,
            "{}  {}  {:.1}  {}  ({} critical, {} warning, {} info)",
            project.id,
            project.name,
            project.health_score,
            project.status,
            project.issues.critical,
            project.issues.warning,
            project.issues.info
        );
    }
    output
}

fn render_projects_markdown(projects: &[ProjectSummary]) -> String {
    let mut output = String::new();
    let _ = writeln!(output, "# Projects\n");
    if projects.is_empty() {
        let _ = writeln!(output, "No projects found.");
        return output;
    }
    let _ = writeln!(output, "| Name | Status | Score | Size | Uploaded |");
    let _ = writeln!(output, "| --- | --- | --- | --- | --- |");
    for project in projects {
        let _ = writeln!(
            output,
            "| {} | {} | {:.1} | {} | {} |",
            project.name, project.status, project.health_score, project.file_size, project.upload_date
        );
    }
    output
}

fn render_project_text(detail: &ProjectDetail) -> String {
    let project = &detail.project;
    let mut output = match &detail.health_report {
        Some(report) => render_health_text(&project.name, report),
        None => format!(
            "Model: {}\nScore: {:.1}\n",
            project.name, project.health_score
        ),
    };
    let _ = writeln!(output, "Status: {}", project.status);
    let _ = writeln!(output, "Uploaded: {}", project.upload_date);
    if detail.validation_results.is_empty() {
        let _ = writeln!(output, "Rules: none recorded");
    } else {
        let _ = writeln!(output, "Rules:");
        for result in &detail.validation_results {
            let _ = writeln!(
                output,
                "- {} [{}]: {} ({} issues)",
                result.rule_name, result.category, result.status, result.issues_count
            );
        }
    }
    output
}
