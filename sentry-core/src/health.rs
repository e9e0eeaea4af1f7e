//! Health score aggregation over validation outcomes.

use std::collections::BTreeMap;

use crate::domain::{
    CATEGORY_DATA, CATEGORY_GEOMETRY, CATEGORY_MATERIALS, CATEGORY_PROPERTIES, CATEGORY_SCHEMA,
    CATEGORY_STANDARDS, HealthGrade, HealthReport, OutcomeRecord, OutcomeStatus, Priority,
    Recommendation, ValidationOutcome,
};
use crate::error::{Result, SentryError};

const MAX_RECOMMENDATIONS: usize = 5;
const PROPERTY_ISSUE_THRESHOLD: u32 = 20;

/// Per-severity multipliers and penalty caps.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SeverityWeights {
    /// Multiplier for critical outcomes.
    pub critical: f64,
    /// Multiplier for warning outcomes.
    pub warning: f64,
    /// Multiplier for info outcomes.
    pub info: f64,
}

impl Default for SeverityWeights {
    fn default() -> Self {
        Self {
            critical: 10.0,
            warning: 3.0,
            info: 1.0,
        }
    }
}

/// Category multipliers used to weight raw penalties.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryWeights {
    weights: BTreeMap<String, f64>,
    fallback: f64,
}

impl CategoryWeights {
    /// Build a weight table from explicit entries and a fallback weight.
    pub fn new<I, S>(entries: I, fallback: f64) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            weights: entries
                .into_iter()
                .map(|(name, weight)| (name.into(), weight))
                .collect(),
            fallback,
        }
    }

    /// Weight for a category, falling back for unlisted ones.
    pub fn weight(&self, category: &str) -> f64 {
        self.weights.get(category).copied().unwrap_or(self.fallback)
    }
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self::new(
            [
                (CATEGORY_SCHEMA, 0.25),
                (CATEGORY_GEOMETRY, 0.20),
                (CATEGORY_PROPERTIES, 0.20),
                (CATEGORY_DATA, 0.15),
                (CATEGORY_STANDARDS, 0.10),
                (CATEGORY_MATERIALS, 0.10),
            ],
            0.05,
        )
    }
}

/// Converts validation outcomes into a [`HealthReport`].
///
/// Scoring is pure: the scorer holds only its weight tables and never mutates
/// them, so a single instance can be shared between threads.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HealthScorer {
    severity: SeverityWeights,
    categories: CategoryWeights,
}

impl HealthScorer {
    /// Create a scorer with the default weight tables.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a scorer with custom weight tables.
    pub fn with_weights(severity: SeverityWeights, categories: CategoryWeights) -> Self {
        Self {
            severity,
            categories,
        }
    }

    /// Validate loosely typed records and score them.
    ///
    /// Fails on the first malformed record without producing a partial report.
    pub fn score_records(&self, records: &[OutcomeRecord]) -> Result<HealthReport> {
        let outcomes = records
            .iter()
            .cloned()
            .map(ValidationOutcome::try_from)
            .collect::<Result<Vec<_>>>()?;
        self.score(&outcomes)
    }

    /// Score a sequence of validation outcomes.
    pub fn score(&self, outcomes: &[ValidationOutcome]) -> Result<HealthReport> {
        if outcomes.is_empty() {
            return Ok(HealthReport::empty());
        }

        let mut category_penalties: BTreeMap<String, f64> = BTreeMap::new();
        let mut total_weighted = 0.0;
        let mut max_possible = 0.0;

        for outcome in outcomes {
            let penalty = self.raw_penalty(outcome);
            let weight = self.categories.weight(&outcome.category);

            *category_penalties
                .entry(outcome.category.clone())
                .or_insert(0.0) += penalty;
            total_weighted += penalty * weight;
            max_possible += 100.0 * weight;
        }

        if max_possible == 0.0 || !max_possible.is_finite() {
            return Err(SentryError::DivisionUndefined);
        }

        let overall = (100.0 - total_weighted / max_possible * 100.0).clamp(0.0, 100.0);
        let category_scores = category_penalties
            .into_iter()
            .map(|(category, penalty)| (category, (100.0 - penalty).max(0.0)))
            .collect();

        let critical_issues = count_status(outcomes, OutcomeStatus::Critical);
        let warning_issues = count_status(outcomes, OutcomeStatus::Warning);
        let info_issues = count_status(outcomes, OutcomeStatus::Info);

        Ok(HealthReport {
            overall_score: round_one_decimal(overall),
            category_scores,
            total_issues: critical_issues + warning_issues + info_issues,
            critical_issues,
            warning_issues,
            info_issues,
            recommendations: recommendations(outcomes, overall),
            health_grade: HealthGrade::from_score(overall),
        })
    }

    fn raw_penalty(&self, outcome: &ValidationOutcome) -> f64 {
        let issues = f64::from(outcome.issue_count);
        match outcome.status {
            OutcomeStatus::Critical => (issues * self.severity.critical).min(100.0),
            OutcomeStatus::Warning => (issues * self.severity.warning).min(50.0),
            OutcomeStatus::Info => (issues * self.severity.info).min(25.0),
            OutcomeStatus::Passed => 0.0,
        }
    }
}

/// Score outcomes with the default weight tables.
pub fn score(outcomes: &[ValidationOutcome]) -> Result<HealthReport> {
    HealthScorer::new().score(outcomes)
}

fn count_status(outcomes: &[ValidationOutcome], status: OutcomeStatus) -> u32 {
    outcomes
        .iter()
        .filter(|outcome| outcome.status == status)
        .count() as u32
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn recommendations(outcomes: &[ValidationOutcome], overall: f64) -> Vec<Recommendation> {
    let mut items = Vec::new();

    let critical = count_status(outcomes, OutcomeStatus::Critical);
    if critical > 0 {
        items.push(recommendation(
            Priority::High,
            "Resolve Critical Issues",
            format!("Address {critical} critical validation failures"),
            "Review and fix critical errors in model data and geometry",
        ));
    }

    if outcomes.iter().any(|outcome| {
        outcome.category == CATEGORY_SCHEMA && outcome.status != OutcomeStatus::Passed
    }) {
        items.push(recommendation(
            Priority::High,
            "Fix Schema Compliance",
            "Model does not fully comply with IFC schema",
            "Review IFC export settings and fix schema violations",
        ));
    }

    if outcomes.iter().any(|outcome| {
        outcome.category == CATEGORY_PROPERTIES && outcome.issue_count > PROPERTY_ISSUE_THRESHOLD
    }) {
        items.push(recommendation(
            Priority::Medium,
            "Improve Property Completeness",
            "Many elements are missing required properties",
            "Add missing property sets to improve data quality",
        ));
    }

    if overall < 60.0 {
        items.push(recommendation(
            Priority::High,
            "Comprehensive Model Review",
            "Model health score is below acceptable threshold",
            "Perform thorough review of all model elements and data",
        ));
    } else if overall < 80.0 {
        items.push(recommendation(
            Priority::Medium,
            "Model Quality Improvements",
            "Several areas need attention to improve model quality",
            "Focus on resolving warning-level issues and data gaps",
        ));
    }

    items.truncate(MAX_RECOMMENDATIONS);
    items
}

fn recommendation(
    priority: Priority,
    title: &str,
    description: impl Into<String>,
    action: &str,
) -> Recommendation {
    Recommendation {
        priority,
        title: title.to_string(),
        description: description.into(),
        action: action.to_string(),
    }
}
