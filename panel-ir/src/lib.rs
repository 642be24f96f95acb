//! # Panel IR
//!
//! Normalization and validation engine for electrical panel schedules.
//! Raw inputs from several producers become one canonical, validated
//! intermediate representation ([`ScheduleIR`]) that renderers consume.
//!
//! Components:
//! - [`extractor`] - confidence-scored field extraction from text lines
//! - [`circuits`] - circuit line parsing and gap-filled circuit tables
//! - [`merge`] - precedence merge of override, session, template and fallback layers
//! - [`normalize`] - phase, main breaker, voltage, amperage and pole normalizers
//! - [`ir`] - the IR itself and its validator
//!
//! Around them: conversational recognisers ([`conversation`]), source
//! assembly ([`assembly`]), the session store boundary ([`session`]) and
//! preflight analysis ([`preflight`]).

pub mod assembly;
pub mod circuits;
pub mod conversation;
pub mod error;
pub mod extractor;
pub mod ir;
pub mod merge;
pub mod normalize;
pub mod preflight;
pub mod schema;
pub mod session;
pub mod value;

pub use crate::assembly::{AssembledSchedule, DocumentOptions, FallbackNote, ManualEdits};
pub use crate::circuits::{build_circuit_table, CircuitRow, CircuitTable};
pub use crate::error::{IrError, IrResult, SchemaViolation, ValidationErrors, ValidationIssue};
pub use crate::extractor::{ConfidenceExtractor, ConfidenceLevel, DocumentExtraction, FieldExtraction};
pub use crate::ir::{assemble_ir, CircuitDraft, HeaderDraft, ScheduleIR};
pub use crate::merge::{MergeLayers, MergeResolver, TaskParameters};
pub use crate::value::Scalar;

use crate::extractor::fields::declared_circuit_count;
use crate::extractor::{default_field_specs, FieldSpec};
use panel_common::config::ExtractionConfig;
use tracing::info;

/// Extraction pipeline built once from configuration
///
/// Owns the compiled field table and the ordered strategy chain. Cheap to
/// share by reference; nothing in it is mutated after construction.
pub struct PipelineContext {
    config: ExtractionConfig,
    field_specs: Vec<FieldSpec>,
    extractor: ConfidenceExtractor,
}

impl PipelineContext {
    pub fn new(config: ExtractionConfig) -> Self {
        let extractor = ConfidenceExtractor::from_config(&config);
        Self {
            config,
            field_specs: default_field_specs(),
            extractor,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    pub fn field_specs(&self) -> &[FieldSpec] {
        &self.field_specs
    }

    /// Extract one field with an explicit spec
    pub fn extract<S: AsRef<str>>(&self, lines: &[S], spec: &FieldSpec) -> FieldExtraction {
        self.extractor.extract(lines, spec)
    }

    /// Extract one field from the built-in field table by name
    ///
    /// `None` when the table has no such field.
    pub fn extract_field<S: AsRef<str>>(&self, lines: &[S], name: &str) -> Option<FieldExtraction> {
        self.field_specs
            .iter()
            .find(|spec| spec.name == name)
            .map(|spec| self.extract(lines, spec))
    }

    /// Extract every header field and build the circuit table
    ///
    /// # Arguments
    /// * `lines` - Text lines in source order
    /// * `declared` - Circuit count known to the caller; when `None` a count
    ///   stated in the text is used if there is one
    pub fn extract_document<S: AsRef<str>>(
        &self,
        lines: &[S],
        declared: Option<u32>,
    ) -> DocumentExtraction {
        let declared = declared.or_else(|| declared_circuit_count(lines));
        let specs: Vec<FieldExtraction> = self
            .field_specs
            .iter()
            .map(|spec| self.extract(lines, spec))
            .collect();
        let circuits = self.build_circuit_table(lines, declared);

        info!(
            lines = lines.len(),
            fields = specs.len(),
            circuits = circuits.count,
            "Document extracted"
        );
        DocumentExtraction::assess(specs, circuits, declared, &self.config)
    }

    pub fn build_circuit_table<S: AsRef<str>>(&self, lines: &[S], declared: Option<u32>) -> CircuitTable {
        build_circuit_table(lines, declared)
    }

    pub fn assemble_ir(&self, header: HeaderDraft, circuits: Vec<CircuitDraft>) -> IrResult<ScheduleIR> {
        assemble_ir(header, circuits)
    }

    /// Extract a document and assemble its schedule in one step
    pub fn assemble_document<S: AsRef<str>>(
        &self,
        lines: &[S],
        declared: Option<u32>,
        options: DocumentOptions<'_>,
    ) -> IrResult<(DocumentExtraction, AssembledSchedule)> {
        let doc = self.extract_document(lines, declared);
        let assembled = assembly::assemble_from_document(&doc, options)?;
        Ok((doc, assembled))
    }
}

impl Default for PipelineContext {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}
