//! Database models for the Sentry server.

use chrono::NaiveDateTime;
use diesel::prelude::*;
use sentry_core::{HealthReport, ValidationOutcome};
use sentry_core::processor::ModelSummary;

use crate::schema::{projects, validation_results};

/// Lifecycle of an uploaded project.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProjectStatus {
    /// Stored and waiting on analysis.
    Processing,
    /// Analysis finished and results are persisted.
    Completed,
    /// Analysis failed; the score is zero.
    Error,
}

impl ProjectStatus {
    /// Stored representation.
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Processing => "Processing",
            ProjectStatus::Completed => "Completed",
            ProjectStatus::Error => "Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Identifiable, Selectable)]
#[diesel(table_name = projects)]
/// Project database record.
pub struct ProjectRecord {
    /// Project identifier.
    pub id: String,
    /// Display name derived from the file name.
    pub name: String,
    /// Sanitised upload file name.
    pub filename: String,
    /// Location of the stored model.
    pub file_path: String,
    /// Size in bytes.
    pub file_size: i64,
    /// Upload timestamp (UTC).
    pub upload_date: NaiveDateTime,
    /// Overall health score.
    pub health_score: f64,
    /// Status string, see [`ProjectStatus`].
    pub status: String,
    /// Element count reported by processing.
    pub total_elements: i64,
    /// Validated element count reported by processing.
    pub validated_elements: i64,
    /// Rules that ended critical.
    pub critical_issues: i32,
    /// Rules that ended with a warning.
    pub warning_issues: i32,
    /// Rules that ended informational.
    pub info_issues: i32,
    /// Serialized health report, once scored.
    pub health_report: Option<String>,
}

impl ProjectRecord {
    /// A freshly uploaded project awaiting analysis.
    pub fn processing(
        name: String,
        filename: String,
        file_path: String,
        file_size: i64,
        upload_date: NaiveDateTime,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            filename,
            file_path,
            file_size,
            upload_date,
            health_score: 0.0,
            status: ProjectStatus::Processing.as_str().to_string(),
            total_elements: 0,
            validated_elements: 0,
            critical_issues: 0,
            warning_issues: 0,
            info_issues: 0,
            health_report: None,
        }
    }

    /// Decode the stored health report, if present and readable.
    pub fn report(&self) -> Option<HealthReport> {
        self.health_report
            .as_deref()
            .and_then(|raw| serde_json::from_str(raw).ok())
    }
}

#[derive(Debug, Clone, PartialEq, AsChangeset)]
#[diesel(table_name = projects)]
#[diesel(treat_none_as_null = true)]
/// Result columns written once analysis settles.
pub struct ProjectUpdate {
    /// New status string.
    pub status: String,
    /// Overall health score.
    pub health_score: f64,
    /// Element count.
    pub total_elements: i64,
    /// Validated element count.
    pub validated_elements: i64,
    /// Critical rule count.
    pub critical_issues: i32,
    /// Warning rule count.
    pub warning_issues: i32,
    /// Info rule count.
    pub info_issues: i32,
    /// Serialized health report.
    pub health_report: Option<String>,
}

impl ProjectUpdate {
    /// Columns for a successfully analysed model.
    pub fn completed(summary: &ModelSummary, report: &HealthReport) -> Self {
        Self {
            status: ProjectStatus::Completed.as_str().to_string(),
            health_score: report.overall_score,
            total_elements: saturating_i64(summary.total_elements),
            validated_elements: saturating_i64(summary.validated_elements),
            critical_issues: saturating_i32(report.critical_issues),
            warning_issues: saturating_i32(report.warning_issues),
            info_issues: saturating_i32(report.info_issues),
            health_report: serde_json::to_string(report).ok(),
        }
    }

    /// Columns for a project whose analysis failed.
    pub fn failed() -> Self {
        Self {
            status: ProjectStatus::Error.as_str().to_string(),
            health_score: 0.0,
            total_elements: 0,
            validated_elements: 0,
            critical_issues: 0,
            warning_issues: 0,
            info_issues: 0,
            health_report: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Queryable, Insertable, Identifiable, Associations, Selectable)]
#[diesel(table_name = validation_results)]
#[diesel(belongs_to(ProjectRecord, foreign_key = project_id))]
/// One persisted rule outcome.
pub struct ValidationResultRecord {
    /// Row identifier.
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Evaluation order within the project.
    pub position: i32,
    /// Rule name.
    pub rule_name: String,
    /// Rule category.
    pub category: String,
    /// Outcome status string.
    pub status: String,
    /// Issue count.
    pub issues_count: i32,
    /// Rule description.
    pub description: String,
    /// Creation timestamp (UTC).
    pub created_date: NaiveDateTime,
}

impl ValidationResultRecord {
    /// Rows for every outcome of an analysis, in evaluation order.
    pub fn from_outcomes(
        project_id: &str,
        outcomes: &[ValidationOutcome],
        created_date: NaiveDateTime,
    ) -> Vec<Self> {
        outcomes
            .iter()
            .enumerate()
            .map(|(position, outcome)| Self {
                id: uuid::Uuid::new_v4().to_string(),
                project_id: project_id.to_string(),
                position: position as i32,
                rule_name: outcome.rule_name.clone(),
                category: outcome.category.clone(),
                status: outcome.status.as_str().to_string(),
                issues_count: saturating_i32(outcome.issue_count),
                description: outcome.description.clone(),
                created_date,
            })
            .collect()
    }
}

fn saturating_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn saturating_i32(value: u32) -> i32 {
    i32::try_from(value).unwrap_or(i32::MAX)
}
