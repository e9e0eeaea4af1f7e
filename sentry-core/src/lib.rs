#![deny(missing_docs)]
//! Sentry core library.
//!
//! Domain types, the model health scorer, and the simulated analysis
//! pipeline shared by the Sentry server and CLI.

pub mod domain;
pub mod error;
/// Mock dashboard and issue fixtures.
pub mod fixtures;
pub mod health;
pub mod pipeline;
pub mod processor;
pub mod random;
pub mod report;
pub mod storage;
pub mod validation;

pub use domain::{
    CategoryScores, HealthGrade, HealthReport, OutcomeRecord, OutcomeStatus, Priority,
    Recommendation, ValidationOutcome,
};
pub use error::{Result, SentryError};
pub use health::{CategoryWeights, HealthScorer, SeverityWeights, score};
pub use pipeline::{AnalysisPipeline, ModelAnalysis, ModelInsights};
pub use processor::{
    GeometryComplexity, ModelProcessor, ModelStatistics, ModelSummary, PropertyInventory,
    model_statistics,
};
pub use random::{RandomSource, Xorshift64};
pub use report::{format_category_scores, render_analysis_markdown, render_health_markdown, render_json};
pub use storage::{FileInfo, FileStore, LocalFileStore, StoredFile};
pub use validation::{CustomRule, CustomRuleResult, RuleDefinition, ValidationService};
