//! Domain entities for Sentry.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, SentryError};

/// Schema compliance category.
pub const CATEGORY_SCHEMA: &str = "Schema";
/// Geometry and clash category.
pub const CATEGORY_GEOMETRY: &str = "Geometry";
/// Property set completeness category.
pub const CATEGORY_PROPERTIES: &str = "Properties";
/// Data integrity category.
pub const CATEGORY_DATA: &str = "Data";
/// Naming and unit standards category.
pub const CATEGORY_STANDARDS: &str = "Standards";
/// Material assignment category.
pub const CATEGORY_MATERIALS: &str = "Materials";
/// Spatial structure category.
pub const CATEGORY_STRUCTURE: &str = "Structure";
/// Category assigned to outcomes that do not name one.
pub const DEFAULT_CATEGORY: &str = "Other";

/// Per-category score keyed by category name.
pub type CategoryScores = BTreeMap<String, f64>;

/// Result status of a single validation rule.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    /// The rule found nothing to report.
    Passed,
    /// The rule found issues worth attention.
    Warning,
    /// The rule found blocking issues.
    Critical,
    /// The rule found informational findings.
    Info,
}

impl OutcomeStatus {
    /// Stable wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Passed => "passed",
            OutcomeStatus::Warning => "warning",
            OutcomeStatus::Critical => "critical",
            OutcomeStatus::Info => "info",
        }
    }

    /// Parse a wire label, ignoring case and surrounding whitespace.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "passed" => Some(OutcomeStatus::Passed),
            "warning" => Some(OutcomeStatus::Warning),
            "critical" => Some(OutcomeStatus::Critical),
            "info" => Some(OutcomeStatus::Info),
            _ => None,
        }
    }
}

impl fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One rule's result with its issue count and category tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValidationOutcome {
    /// Name of the rule that produced the outcome.
    #[serde(alias = "name")]
    pub rule_name: String,
    /// Category the rule belongs to.
    #[serde(default = "default_category")]
    pub category: String,
    /// Rule status.
    pub status: OutcomeStatus,
    /// Number of issues the rule reported.
    #[serde(alias = "issues")]
    pub issue_count: u32,
    /// Human-readable rule description.
    #[serde(default)]
    pub description: String,
}

impl ValidationOutcome {
    /// Create an outcome without a description.
    pub fn new(
        rule_name: impl Into<String>,
        category: impl Into<String>,
        status: OutcomeStatus,
        issue_count: u32,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            category: category.into(),
            status,
            issue_count,
            description: String::new(),
        }
    }

    /// Attach a description to the outcome.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// Loosely typed outcome as received from an external validation step.
///
/// Every field is optional on the wire; [`ValidationOutcome::try_from`] rejects
/// records missing a rule name, status, or issue count.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct OutcomeRecord {
    /// Rule name.
    #[serde(default, alias = "name")]
    pub rule_name: Option<String>,
    /// Category name; defaults to `Other`.
    #[serde(default)]
    pub category: Option<String>,
    /// Status label.
    #[serde(default)]
    pub status: Option<String>,
    /// Issue count.
    #[serde(default, alias = "issues")]
    pub issue_count: Option<i64>,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
}

impl TryFrom<OutcomeRecord> for ValidationOutcome {
    type Error = SentryError;

    fn try_from(record: OutcomeRecord) -> Result<Self> {
        let rule_name = record
            .rule_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(|| SentryError::InvalidInput("outcome is missing rule_name".to_string()))?;
        let raw_status = record.status.ok_or_else(|| {
            SentryError::InvalidInput(format!("outcome `{rule_name}` is missing status"))
        })?;
        let status = OutcomeStatus::parse(&raw_status).ok_or_else(|| {
            SentryError::InvalidInput(format!(
                "outcome `{rule_name}` has unknown status `{raw_status}`"
            ))
        })?;
        let raw_count = record.issue_count.ok_or_else(|| {
            SentryError::InvalidInput(format!("outcome `{rule_name}` is missing issue_count"))
        })?;
        let issue_count = u32::try_from(raw_count).map_err(|_| {
            SentryError::InvalidInput(format!(
                "outcome `{rule_name}` has out-of-range issue_count {raw_count}"
            ))
        })?;
        let category = record
            .category
            .map(|category| category.trim().to_string())
            .filter(|category| !category.is_empty())
            .unwrap_or_else(default_category);

        Ok(Self {
            rule_name,
            category,
            status,
            issue_count,
            description: record.description.unwrap_or_default(),
        })
    }
}

/// Recommendation urgency.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    /// Address before anything else.
    High,
    /// Address soon.
    Medium,
    /// Nice to have.
    Low,
}

impl Priority {
    /// Stable wire label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// Actionable advice derived from validation outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Recommendation {
    /// Urgency of the recommendation.
    pub priority: Priority,
    /// Short title.
    pub title: String,
    /// What was observed.
    pub description: String,
    /// What to do about it.
    pub action: String,
}

/// Letter bucket derived from the overall score.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
pub enum HealthGrade {
    /// Score of at least 90.
    A,
    /// Score of at least 80.
    B,
    /// Score of at least 70.
    C,
    /// Score of at least 60.
    D,
    /// Anything lower.
    F,
}

impl HealthGrade {
    /// Bucket a score; thresholds are inclusive lower bounds.
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            HealthGrade::A
        } else if score >= 80.0 {
            HealthGrade::B
        } else if score >= 70.0 {
            HealthGrade::C
        } else if score >= 60.0 {
            HealthGrade::D
        } else {
            HealthGrade::F
        }
    }

    /// Letter label.
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthGrade::A => "A",
            HealthGrade::B => "B",
            HealthGrade::C => "C",
            HealthGrade::D => "D",
            HealthGrade::F => "F",
        }
    }
}

impl fmt::Display for HealthGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregated model health derived from validation outcomes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthReport {
    /// Overall score, 0-100, rounded to one decimal.
    pub overall_score: f64,
    /// Unweighted per-category scores.
    pub category_scores: CategoryScores,
    /// Number of outcomes with a critical, warning, or info status.
    pub total_issues: u32,
    /// Number of critical outcomes.
    pub critical_issues: u32,
    /// Number of warning outcomes.
    pub warning_issues: u32,
    /// Number of info outcomes.
    pub info_issues: u32,
    /// Up to five recommendations in generation order.
    pub recommendations: Vec<Recommendation>,
    /// Letter grade.
    pub health_grade: HealthGrade,
}

impl HealthReport {
    /// Report returned when there is nothing to score.
    pub fn empty() -> Self {
        Self {
            overall_score: 0.0,
            category_scores: BTreeMap::new(),
            total_issues: 0,
            critical_issues: 0,
            warning_issues: 0,
            info_issues: 0,
            recommendations: Vec::new(),
            health_grade: HealthGrade::F,
        }
    }
}
