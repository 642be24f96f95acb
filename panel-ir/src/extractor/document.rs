//! Whole-document extraction report
//!
//! Aggregates per-field results and the circuit table into one report a
//! reviewer (or the document assembler) can act on.

use super::fields::CRITICAL_FIELDS;
use super::{ConfidenceLevel, FieldExtraction};
use crate::circuits::CircuitTable;
use panel_common::config::ExtractionConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Field counts per confidence level
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub total_fields: usize,
    pub high_confidence: usize,
    pub medium_confidence: usize,
    pub low_confidence: usize,
    pub missing: usize,
}

/// Extraction result for one document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentExtraction {
    /// Per-field results in field-table order
    pub panel_specs: Vec<FieldExtraction>,
    /// Mean of all field confidences
    pub overall_confidence: f64,
    /// Fields at Low or Missing confidence
    pub gaps: Vec<String>,
    pub needs_manual_review: bool,
    /// Circuit count stated in the text, if any
    pub declared_circuit_count: Option<u32>,
    pub circuits: CircuitTable,
}

impl DocumentExtraction {
    /// Score a set of field results
    ///
    /// Manual review is required when the mean confidence is below the
    /// review threshold, when more than `max_gap_fields` fields are gaps, or
    /// when `panel_name` or `voltage` is missing outright.
    pub fn assess(
        panel_specs: Vec<FieldExtraction>,
        circuits: CircuitTable,
        declared_circuit_count: Option<u32>,
        config: &ExtractionConfig,
    ) -> Self {
        let overall_confidence = if panel_specs.is_empty() {
            0.0
        } else {
            panel_specs.iter().map(|f| f.confidence).sum::<f64>() / panel_specs.len() as f64
        };

        let gaps: Vec<String> = panel_specs
            .iter()
            .filter(|f| f.confidence_level.is_gap())
            .map(|f| f.field_name.clone())
            .collect();

        let critical_missing = panel_specs.iter().any(|f| {
            f.confidence_level == ConfidenceLevel::Missing
                && CRITICAL_FIELDS.contains(&f.field_name.as_str())
        });

        let needs_manual_review = overall_confidence < config.review_confidence_threshold
            || gaps.len() > config.max_gap_fields
            || critical_missing;

        info!(
            overall_confidence,
            gaps = gaps.len(),
            needs_manual_review,
            circuits_found = circuits.count as usize - circuits.missing_circuits.len(),
            "Document extraction assessed"
        );

        Self {
            panel_specs,
            overall_confidence,
            gaps,
            needs_manual_review,
            declared_circuit_count,
            circuits,
        }
    }

    pub fn field(&self, name: &str) -> Option<&FieldExtraction> {
        self.panel_specs.iter().find(|f| f.field_name == name)
    }

    /// Extracted value of a field, if found
    pub fn value(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(|f| f.value.as_deref())
    }

    pub fn stats(&self) -> ExtractionStats {
        let count = |level| {
            self.panel_specs
                .iter()
                .filter(|f| f.confidence_level == level)
                .count()
        };
        ExtractionStats {
            total_fields: self.panel_specs.len(),
            high_confidence: count(ConfidenceLevel::High),
            medium_confidence: count(ConfidenceLevel::Medium),
            low_confidence: count(ConfidenceLevel::Low),
            missing: count(ConfidenceLevel::Missing),
        }
    }
}
