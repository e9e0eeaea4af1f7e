//! Simulated validation rule set.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{
    CATEGORY_DATA, CATEGORY_GEOMETRY, CATEGORY_MATERIALS, CATEGORY_PROPERTIES, CATEGORY_SCHEMA,
    CATEGORY_STANDARDS, CATEGORY_STRUCTURE, OutcomeStatus, ValidationOutcome,
};
use crate::processor::ModelSummary;
use crate::random::RandomSource;

/// Static description of a validation rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct RuleDefinition {
    /// Rule name.
    pub name: String,
    /// What the rule checks.
    pub description: String,
    /// Category the rule reports under.
    pub category: String,
    /// Nominal severity of the rule.
    pub severity: OutcomeStatus,
}

impl RuleDefinition {
    fn new(name: &str, description: &str, category: &str, severity: OutcomeStatus) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            severity,
        }
    }
}

/// An optional rule a project can enable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CustomRule {
    /// Rule name.
    pub name: String,
    /// What the rule checks.
    pub description: String,
    /// Whether the rule is enabled by default.
    pub enabled: bool,
}

/// Result of running a custom rule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CustomRuleResult {
    /// Rule name.
    pub name: String,
    /// Rule status.
    pub status: OutcomeStatus,
    /// Issue count.
    pub issues: u32,
    /// Summary of the run.
    pub details: String,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum RuleKind {
    Schema,
    PropertyCompleteness,
    ClashDetection,
    DataIntegrity,
    Generic,
}

fn rule_kind(name: &str) -> RuleKind {
    match name {
        "IFC Schema Validation" => RuleKind::Schema,
        "Property Completeness" => RuleKind::PropertyCompleteness,
        "Clash Detection" => RuleKind::ClashDetection,
        "Data Integrity" => RuleKind::DataIntegrity,
        _ => RuleKind::Generic,
    }
}

/// Runs the built-in rule set against a processed model.
#[derive(Debug, Clone)]
pub struct ValidationService {
    rules: Vec<RuleDefinition>,
}

impl Default for ValidationService {
    fn default() -> Self {
        Self::new()
    }
}

impl ValidationService {
    /// Create a service with the built-in rules.
    pub fn new() -> Self {
        Self {
            rules: vec![
                RuleDefinition::new(
                    "IFC Schema Validation",
                    "Validates IFC file structure and syntax",
                    CATEGORY_SCHEMA,
                    OutcomeStatus::Critical,
                ),
                RuleDefinition::new(
                    "Property Completeness",
                    "Checks for required property sets",
                    CATEGORY_PROPERTIES,
                    OutcomeStatus::Warning,
                ),
                RuleDefinition::new(
                    "Clash Detection",
                    "Identifies geometric interferences",
                    CATEGORY_GEOMETRY,
                    OutcomeStatus::Critical,
                ),
                RuleDefinition::new(
                    "Data Integrity",
                    "Verifies data consistency and validity",
                    CATEGORY_DATA,
                    OutcomeStatus::Warning,
                ),
                RuleDefinition::new(
                    "Naming Convention",
                    "Checks compliance with naming standards",
                    CATEGORY_STANDARDS,
                    OutcomeStatus::Info,
                ),
                RuleDefinition::new(
                    "Material Assignment",
                    "Validates material data completeness",
                    CATEGORY_MATERIALS,
                    OutcomeStatus::Warning,
                ),
                RuleDefinition::new(
                    "Spatial Structure",
                    "Verifies building hierarchy",
                    CATEGORY_STRUCTURE,
                    OutcomeStatus::Critical,
                ),
                RuleDefinition::new(
                    "Units Consistency",
                    "Checks for consistent unit usage",
                    CATEGORY_STANDARDS,
                    OutcomeStatus::Warning,
                ),
            ],
        }
    }

    /// Built-in rule definitions in evaluation order.
    pub fn rules(&self) -> &[RuleDefinition] {
        &self.rules
    }

    /// Run every rule against the summary.
    pub fn validate_model<R: RandomSource + ?Sized>(
        &self,
        summary: &ModelSummary,
        rng: &mut R,
    ) -> Vec<ValidationOutcome> {
        self.rules
            .iter()
            .map(|rule| run_rule(rule, summary, rng))
            .collect()
    }

    /// Optional rules available to projects.
    pub fn custom_rules(&self) -> Vec<CustomRule> {
        vec![
            CustomRule {
                name: "Fire Rating Requirements".to_string(),
                description: "Validates fire rating properties for safety compliance".to_string(),
                enabled: true,
            },
            CustomRule {
                name: "Accessibility Standards".to_string(),
                description: "Checks compliance with accessibility requirements".to_string(),
                enabled: false,
            },
            CustomRule {
                name: "Energy Performance".to_string(),
                description: "Validates energy-related properties and values".to_string(),
                enabled: true,
            },
        ]
    }

    /// Run a custom rule by name.
    pub fn run_custom_validation<R: RandomSource + ?Sized>(
        &self,
        rule_name: &str,
        rng: &mut R,
    ) -> CustomRuleResult {
        let status = match rng.range_u64(0, 2) {
            0 => OutcomeStatus::Passed,
            1 => OutcomeStatus::Warning,
            _ => OutcomeStatus::Critical,
        };
        CustomRuleResult {
            name: rule_name.to_string(),
            status,
            issues: rng.range_u64(0, 20) as u32,
            details: format!("Custom validation completed for {rule_name}"),
        }
    }
}

fn run_rule<R: RandomSource + ?Sized>(
    rule: &RuleDefinition,
    summary: &ModelSummary,
    rng: &mut R,
) -> ValidationOutcome {
    let (status, issues) = match rule_kind(&rule.name) {
        RuleKind::Schema => {
            if summary.schema_valid {
                (OutcomeStatus::Passed, 0)
            } else {
                (OutcomeStatus::Critical, rng.range_u64(1, 5))
            }
        }
        RuleKind::PropertyCompleteness => {
            let coverage = rng.uniform(0.7, 0.95);
            if coverage > 0.9 {
                (OutcomeStatus::Passed, 0)
            } else if coverage > 0.8 {
                (OutcomeStatus::Warning, rng.range_u64(10, 50))
            } else {
                (OutcomeStatus::Critical, rng.range_u64(50, 100))
            }
        }
        RuleKind::ClashDetection => {
            let elements = summary.total_elements;
            let clash_probability = (elements as f64 / 10_000.0).min(0.3);
            if rng.next_f64() >= clash_probability {
                (OutcomeStatus::Passed, 0)
            } else {
                let upper = (elements / 100).clamp(1, 20);
                (OutcomeStatus::Critical, rng.range_u64(1, upper))
            }
        }
        RuleKind::DataIntegrity => {
            if rng.chance(0.8) {
                (OutcomeStatus::Passed, 0)
            } else {
                (OutcomeStatus::Warning, rng.range_u64(1, 10))
            }
        }
        RuleKind::Generic => match rng.weighted_index(&[0.6, 0.3, 0.1]) {
            Some(1) => (OutcomeStatus::Warning, rng.range_u64(5, 30)),
            Some(2) => (OutcomeStatus::Critical, rng.range_u64(10, 50)),
            _ => (OutcomeStatus::Passed, 0),
        },
    };

    ValidationOutcome::new(&rule.name, &rule.category, status, issues as u32)
        .with_description(&rule.description)
}
