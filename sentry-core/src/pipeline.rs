//! End-to-end simulated analysis: process, validate, score.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{HealthReport, ValidationOutcome};
use crate::error::{Result, SentryError};
use crate::health::HealthScorer;
use crate::processor::{
    ModelProcessor, ModelStatistics, ModelSummary, PropertyInventory, model_statistics,
};
use crate::random::RandomSource;
use crate::storage::FileStore;
use crate::validation::{CustomRuleResult, ValidationService};

/// Everything produced by analysing one model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelAnalysis {
    /// Fabricated processing summary.
    pub summary: ModelSummary,
    /// Rule outcomes in evaluation order.
    pub outcomes: Vec<ValidationOutcome>,
    /// Aggregated health.
    pub report: HealthReport,
}

/// Supplementary details about an analysed model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInsights {
    /// Density, coverage, and complexity.
    pub statistics: ModelStatistics,
    /// Property sets found in the model.
    pub properties: PropertyInventory,
    /// Results of the enabled custom rules, in catalog order.
    pub custom_results: Vec<CustomRuleResult>,
}

/// Chains the processor, rule set, and scorer.
#[derive(Debug, Clone, Default)]
pub struct AnalysisPipeline {
    processor: ModelProcessor,
    validator: ValidationService,
    scorer: HealthScorer,
}

impl AnalysisPipeline {
    /// Pipeline with the built-in rule set and default weights.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyse a model given its name and size.
    pub fn analyze<R: RandomSource + ?Sized>(
        &self,
        filename: &str,
        file_size: u64,
        rng: &mut R,
    ) -> Result<ModelAnalysis> {
        let summary = self.processor.process(filename, file_size, rng)?;
        let outcomes = self.validator.validate_model(&summary, rng);
        let report = self.scorer.score(&outcomes)?;
        Ok(ModelAnalysis {
            summary,
            outcomes,
            report,
        })
    }

    /// Statistics, property sets, and enabled custom rule results for a summary.
    pub fn insights<R: RandomSource + ?Sized>(
        &self,
        summary: &ModelSummary,
        rng: &mut R,
    ) -> ModelInsights {
        let properties = self.processor.extract_properties(rng);
        let custom_results = self
            .validator
            .custom_rules()
            .into_iter()
            .filter(|rule| rule.enabled)
            .map(|rule| self.validator.run_custom_validation(&rule.name, rng))
            .collect();
        ModelInsights {
            statistics: model_statistics(summary),
            properties,
            custom_results,
        }
    }

    /// Analyse a file already held by `store`.
    pub fn analyze_stored<F: FileStore + ?Sized, R: RandomSource + ?Sized>(
        &self,
        store: &F,
        filename: &str,
        path: &Path,
        rng: &mut R,
    ) -> Result<ModelAnalysis> {
        let info = store.file_info(path)?.ok_or_else(|| {
            SentryError::Other(format!("stored model not found: {}", path.display()))
        })?;
        self.analyze(filename, info.size, rng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Xorshift64;
    use crate::storage::{FileInfo, MockFileStore};
    use std::path::PathBuf;

    #[test]
    fn analyze_is_deterministic_for_a_seed() {
        let pipeline = AnalysisPipeline::new();
        let first = pipeline
            .analyze("tower.ifc", 2_000_000, &mut Xorshift64::new(77))
            .expect("first");
        let second = pipeline
            .analyze("tower.ifc", 2_000_000, &mut Xorshift64::new(77))
            .expect("second");
        assert_eq!(first, second);
        assert_eq!(first.outcomes.len(), 8);
        assert!((0.0..=100.0).contains(&first.report.overall_score));
    }

    #[test]
    fn analyze_stored_reads_size_from_store() {
        let mut store = MockFileStore::new();
        store
            .expect_file_info()
            .withf(|path| path == Path::new("/uploads/tower_1234abcd.ifc"))
            .returning(|_| {
                Ok(Some(FileInfo {
                    filename: "tower_1234abcd.ifc".to_string(),
                    size: 40_000_000,
                    modified: None,
                }))
            });

        let analysis = AnalysisPipeline::new()
            .analyze_stored(
                &store,
                "tower.ifc",
                &PathBuf::from("/uploads/tower_1234abcd.ifc"),
                &mut Xorshift64::new(3),
            )
            .expect("analysis");

        assert_eq!(analysis.summary.file_size, 40_000_000);
        assert_eq!(analysis.summary.filename, "tower.ifc");
    }

    #[test]
    fn analyze_stored_fails_when_file_is_missing() {
        let mut store = MockFileStore::new();
        store.expect_file_info().returning(|_| Ok(None));

        let error = AnalysisPipeline::new()
            .analyze_stored(
                &store,
                "tower.ifc",
                Path::new("/uploads/gone.ifc"),
                &mut Xorshift64::new(3),
            )
            .expect_err("missing file");
        assert!(format!("{error}").contains("not found"));
    }

    #[test]
    fn insights_run_only_enabled_custom_rules() {
        let pipeline = AnalysisPipeline::new();
        let mut rng = Xorshift64::new(21);
        let analysis = pipeline
            .analyze("tower.ifc", 60_000_000, &mut rng)
            .expect("analysis");
        let insights = pipeline.insights(&analysis.summary, &mut rng);

        let names: Vec<&str> = insights
            .custom_results
            .iter()
            .map(|result| result.name.as_str())
            .collect();
        assert_eq!(names, vec!["Fire Rating Requirements", "Energy Performance"]);
        assert!((0.6..0.95).contains(&insights.properties.properties_coverage));
        assert_eq!(
            insights.statistics.geometry_complexity,
            crate::processor::GeometryComplexity::High
        );
    }

    #[test]
    fn analyze_propagates_processor_errors() {
        let error = AnalysisPipeline::new()
            .analyze("", 10, &mut Xorshift64::new(1))
            .expect_err("empty name");
        assert!(matches!(error, SentryError::InvalidInput(_)));
    }
}
