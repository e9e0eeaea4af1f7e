//! Simulated building-model processing.
//!
//! Uploaded files are never parsed. Summaries are fabricated from the file size
//! and a caller-supplied [`RandomSource`], so a fixed seed yields a fixed summary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::error::{Result, SentryError};
use crate::random::{RandomSource, choose};

/// IFC schema versions the simulator reports.
pub const SUPPORTED_VERSIONS: [&str; 4] = ["IFC2X3", "IFC4", "IFC4X1", "IFC4X3"];

const BYTES_PER_ELEMENT: u64 = 10_000;
const MIN_ESTIMATED_ELEMENTS: u64 = 100;

/// Axis-aligned model extents in metres.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct BoundingBox {
    /// Minimum x.
    pub min_x: f64,
    /// Minimum y.
    pub min_y: f64,
    /// Minimum z.
    pub min_z: f64,
    /// Maximum x.
    pub max_x: f64,
    /// Maximum y.
    pub max_y: f64,
    /// Maximum z.
    pub max_z: f64,
}

/// Fabricated result of "processing" a model file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelSummary {
    /// Original file name.
    pub filename: String,
    /// File size in bytes.
    pub file_size: u64,
    /// Reported schema version.
    pub ifc_version: String,
    /// Total element count.
    pub total_elements: u64,
    /// Elements that passed structural checks.
    pub validated_elements: u64,
    /// Number of storeys.
    pub building_stories: u64,
    /// Number of spaces.
    pub spaces: u64,
    /// Elements carrying at least one property set.
    pub properties_found: u64,
    /// Whether geometry looked valid.
    pub geometry_valid: bool,
    /// Whether the schema looked valid.
    pub schema_valid: bool,
    /// Simulated processing time in seconds.
    pub processing_time: f64,
    /// Element counts keyed by IFC entity name.
    pub elements_by_type: BTreeMap<String, u64>,
    /// Model extents.
    pub bounding_box: BoundingBox,
}

/// Property set inventory of a model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PropertyInventory {
    /// Standard property sets present.
    pub common_property_sets: Vec<String>,
    /// Project or company specific property sets present.
    pub custom_property_sets: Vec<String>,
    /// Share of elements with complete properties, 0-1.
    pub properties_coverage: f64,
}

/// Geometry complexity bucket.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum GeometryComplexity {
    /// At most 1000 elements.
    Low,
    /// At most 5000 elements.
    Medium,
    /// More than 5000 elements.
    High,
}

/// Statistics derived from a [`ModelSummary`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ModelStatistics {
    /// Elements per storey.
    pub element_density: f64,
    /// Validated elements over total elements.
    pub validation_coverage: f64,
    /// Complexity bucket.
    pub geometry_complexity: GeometryComplexity,
}

/// Produces [`ModelSummary`] values for uploaded files.
#[derive(Debug, Default, Clone, Copy)]
pub struct ModelProcessor;

impl ModelProcessor {
    /// Create a processor.
    pub fn new() -> Self {
        Self
    }

    /// Fabricate a summary for a file of the given size.
    pub fn process<R: RandomSource + ?Sized>(
        &self,
        filename: &str,
        file_size: u64,
        rng: &mut R,
    ) -> Result<ModelSummary> {
        if filename.trim().is_empty() {
            return Err(SentryError::InvalidInput(
                "model file name must not be empty".to_string(),
            ));
        }

        let estimated = MIN_ESTIMATED_ELEMENTS.max(file_size / BYTES_PER_ELEMENT);
        let total_elements = (estimated as i64 + rng.range_i64(-50, 200)).max(1) as u64;
        let validated_elements = (total_elements as f64 * rng.uniform(0.85, 0.98)) as u64;
        let building_stories = rng.range_u64(1, 20);
        let spaces = rng.range_u64(10, (total_elements / 10).max(10));
        let properties_found = rng.range_u64(total_elements / 2, total_elements);
        let ifc_version = choose(rng, &SUPPORTED_VERSIONS)
            .copied()
            .unwrap_or(SUPPORTED_VERSIONS[0])
            .to_string();
        let geometry_valid = rng.chance(0.5);
        let schema_valid = rng.chance(2.0 / 3.0);
        let processing_time = round_two(rng.uniform(2.5, 45.0));

        let mut elements_by_type = BTreeMap::new();
        elements_by_type.insert("IfcWall".to_string(), rng.range_u64(50, 500));
        elements_by_type.insert("IfcSlab".to_string(), rng.range_u64(10, 100));
        elements_by_type.insert("IfcBeam".to_string(), rng.range_u64(20, 200));
        elements_by_type.insert("IfcColumn".to_string(), rng.range_u64(10, 80));
        elements_by_type.insert("IfcDoor".to_string(), rng.range_u64(5, 50));
        elements_by_type.insert("IfcWindow".to_string(), rng.range_u64(10, 100));
        elements_by_type.insert("IfcSpace".to_string(), spaces);
        elements_by_type.insert("IfcBuildingStorey".to_string(), building_stories);

        let bounding_box = BoundingBox {
            min_x: round_two(rng.uniform(-50.0, 0.0)),
            min_y: round_two(rng.uniform(-50.0, 0.0)),
            min_z: round_two(rng.uniform(-5.0, 0.0)),
            max_x: round_two(rng.uniform(50.0, 200.0)),
            max_y: round_two(rng.uniform(50.0, 200.0)),
            max_z: round_two(rng.uniform(20.0, 100.0)),
        };

        Ok(ModelSummary {
            filename: filename.to_string(),
            file_size,
            ifc_version,
            total_elements,
            validated_elements,
            building_stories,
            spaces,
            properties_found,
            geometry_valid,
            schema_valid,
            processing_time,
            elements_by_type,
            bounding_box,
        })
    }

    /// Fabricate the property set inventory of a model.
    pub fn extract_properties<R: RandomSource + ?Sized>(&self, rng: &mut R) -> PropertyInventory {
        PropertyInventory {
            common_property_sets: [
                "Pset_WallCommon",
                "Pset_SlabCommon",
                "Pset_BeamCommon",
                "Pset_DoorCommon",
                "Pset_WindowCommon",
            ]
            .iter()
            .map(|name| name.to_string())
            .collect(),
            custom_property_sets: vec![
                "ProjectSpecific_Materials".to_string(),
                "CompanyStandard_Elements".to_string(),
            ],
            properties_coverage: rng.uniform(0.6, 0.95),
        }
    }
}

/// Derive density, coverage, and complexity from a summary.
pub fn model_statistics(summary: &ModelSummary) -> ModelStatistics {
    let total = summary.total_elements;
    let geometry_complexity = if total > 5_000 {
        GeometryComplexity::High
    } else if total > 1_000 {
        GeometryComplexity::Medium
    } else {
        GeometryComplexity::Low
    };
    ModelStatistics {
        element_density: total as f64 / summary.building_stories.max(1) as f64,
        validation_coverage: summary.validated_elements as f64 / total.max(1) as f64,
        geometry_complexity,
    }
}

fn round_two(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::random::Xorshift64;

    #[test]
    fn process_rejects_empty_file_name() {
        let mut rng = Xorshift64::new(1);
        let error = ModelProcessor::new()
            .process("  ", 1_000, &mut rng)
            .expect_err("empty name");
        assert!(matches!(error, SentryError::InvalidInput(_)));
    }

    #[test]
    fn process_scales_elements_with_file_size() {
        let processor = ModelProcessor::new();
        for seed in 1..50 {
            let mut rng = Xorshift64::new(seed);
            let summary = processor
                .process("tower.ifc", 50_000_000, &mut rng)
                .expect("process");
            assert!((4_950..=5_200).contains(&summary.total_elements));
            assert!(summary.validated_elements <= summary.total_elements);
            assert!(summary.properties_found >= summary.total_elements / 2);
            assert!(summary.properties_found <= summary.total_elements);
            assert!((1..=20).contains(&summary.building_stories));
            assert!(SUPPORTED_VERSIONS.contains(&summary.ifc_version.as_str()));
            assert_eq!(summary.elements_by_type["IfcSpace"], summary.spaces);
        }
    }

    #[test]
    fn small_files_still_report_elements() {
        let processor = ModelProcessor::new();
        for seed in 1..50 {
            let mut rng = Xorshift64::new(seed);
            let summary = processor.process("tiny.ifc", 10, &mut rng).expect("process");
            assert!(summary.total_elements >= 50);
            assert!(summary.spaces >= 10);
        }
    }

    #[test]
    fn same_seed_produces_same_summary() {
        let processor = ModelProcessor::new();
        let first = processor
            .process("a.ifc", 123_456, &mut Xorshift64::new(9))
            .expect("first");
        let second = processor
            .process("a.ifc", 123_456, &mut Xorshift64::new(9))
            .expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn statistics_bucket_complexity() {
        let mut rng = Xorshift64::new(3);
        let mut summary = ModelProcessor::new()
            .process("a.ifc", 0, &mut rng)
            .expect("process");
        summary.total_elements = 6_000;
        summary.validated_elements = 3_000;
        summary.building_stories = 6;
        let stats = model_statistics(&summary);
        assert_eq!(stats.geometry_complexity, GeometryComplexity::High);
        assert_eq!(stats.element_density, 1_000.0);
        assert_eq!(stats.validation_coverage, 0.5);

        summary.total_elements = 1_000;
        assert_eq!(
            model_statistics(&summary).geometry_complexity,
            GeometryComplexity::Low
        );
    }

    #[test]
    fn property_inventory_lists_sets() {
        let mut rng = Xorshift64::new(5);
        let inventory = ModelProcessor::new().extract_properties(&mut rng);
        assert_eq!(inventory.common_property_sets.len(), 5);
        assert_eq!(inventory.custom_property_sets.len(), 2);
        assert!((0.6..0.95).contains(&inventory.properties_coverage));
    }
}
