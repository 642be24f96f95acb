//! Confidence-scored field extraction
//!
//! Given unstructured text lines (OCR output or free text) and a field
//! spec, finds the best candidate value with a calibrated confidence and
//! the source line it came from.
//!
//! # Architecture
//! Extraction is an ordered list of [`ExtractionStrategy`] implementations
//! evaluated left to right with early exit:
//! 1. [`StructuredPattern`] - anchored `label: value` regex over the joined text
//! 2. [`LabelVariantScan`] - per-line exact then fuzzy label matching
//!
//! The extractor never fails. A field nobody finds is reported as
//! `ConfidenceLevel::Missing` with no value.

pub mod document;
pub mod fields;
pub mod strategies;

pub use document::{DocumentExtraction, ExtractionStats};
pub use fields::{default_field_specs, FieldSpec};
pub use strategies::{LabelVariantScan, StructuredPattern};

use panel_common::config::ExtractionConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

// ============================================================================
// Confidence
// ============================================================================

/// Discretised confidence bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// score >= 0.8
    High,
    /// 0.5 <= score < 0.8
    Medium,
    /// 0.2 <= score < 0.5
    Low,
    /// score < 0.2, or nothing found
    Missing,
}

impl ConfidenceLevel {
    pub fn from_score(score: f64) -> Self {
        if score >= 0.8 {
            ConfidenceLevel::High
        } else if score >= 0.5 {
            ConfidenceLevel::Medium
        } else if score >= 0.2 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Missing
        }
    }

    /// Low and Missing fields need a human or a fallback
    pub fn is_gap(self) -> bool {
        matches!(self, ConfidenceLevel::Low | ConfidenceLevel::Missing)
    }
}

/// Result of extracting one field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldExtraction {
    pub field_name: String,
    pub value: Option<String>,
    /// Confidence score (0.0-1.0)
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    /// Raw line the value was taken from
    pub source_line: Option<String>,
    /// Raw match quality reported by the winning strategy
    pub match_score: f64,
}

impl FieldExtraction {
    /// Not-found result
    pub fn missing(field_name: impl Into<String>) -> Self {
        Self {
            field_name: field_name.into(),
            value: None,
            confidence: 0.0,
            confidence_level: ConfidenceLevel::Missing,
            source_line: None,
            match_score: 0.0,
        }
    }

    fn from_candidate(field_name: &str, candidate: Candidate) -> Self {
        let confidence = candidate.confidence.clamp(0.0, 1.0);
        Self {
            field_name: field_name.to_string(),
            value: Some(candidate.value),
            confidence,
            confidence_level: ConfidenceLevel::from_score(confidence),
            source_line: candidate.source_line,
            match_score: candidate.match_score,
        }
    }

    pub fn needs_review(&self) -> bool {
        self.confidence_level.is_gap()
    }
}

// ============================================================================
// Strategy trait
// ============================================================================

/// Value proposed by a single strategy
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub value: String,
    pub confidence: f64,
    pub match_score: f64,
    pub source_line: Option<String>,
}

/// One step of the extraction fallback chain
///
/// Strategies are pure: same lines and spec, same answer. Returning `None`
/// passes control to the next strategy.
pub trait ExtractionStrategy: Send + Sync {
    /// Strategy name for debug logging
    fn name(&self) -> &'static str;

    /// Best candidate for `spec` in `lines`, if any
    fn find(&self, lines: &[&str], spec: &FieldSpec) -> Option<Candidate>;
}

// ============================================================================
// Extractor
// ============================================================================

/// Ordered strategy chain
pub struct ConfidenceExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
}

impl ConfidenceExtractor {
    pub fn new(strategies: Vec<Box<dyn ExtractionStrategy>>) -> Self {
        Self { strategies }
    }

    /// Structured pattern first, then label variant scan at the configured
    /// fuzzy threshold
    pub fn from_config(config: &ExtractionConfig) -> Self {
        Self::new(vec![
            Box::new(StructuredPattern),
            Box::new(LabelVariantScan::new(config.fuzzy_threshold)),
        ])
    }

    /// Extract one field
    ///
    /// # Arguments
    /// * `lines` - Text lines in source order
    /// * `spec` - Field name, structured pattern and label variants
    ///
    /// # Returns
    /// The first strategy's candidate, or a Missing result
    pub fn extract<S: AsRef<str>>(&self, lines: &[S], spec: &FieldSpec) -> FieldExtraction {
        let lines: Vec<&str> = lines.iter().map(AsRef::as_ref).collect();

        for strategy in &self.strategies {
            if let Some(candidate) = strategy.find(&lines, spec) {
                debug!(
                    field = %spec.name,
                    strategy = strategy.name(),
                    value = %candidate.value,
                    confidence = candidate.confidence,
                    "Field extracted"
                );
                return FieldExtraction::from_candidate(&spec.name, candidate);
            }
        }

        debug!(field = %spec.name, "Field not found");
        FieldExtraction::missing(spec.name.clone())
    }
}

impl Default for ConfidenceExtractor {
    fn default() -> Self {
        Self::from_config(&ExtractionConfig::default())
    }
}
