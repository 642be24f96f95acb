//! Schedule intermediate representation
//!
//! [`ScheduleIR`] is the single artifact every renderer consumes. The only
//! way to obtain one is [`assemble_ir`] (or deserialisation, which goes
//! through the same checks), so any value that exists is internally
//! consistent.
//!
//! # Validation order
//! 1. Header schema (labels, cells, counts): first mismatch fails
//!    immediately as [`IrError::Schema`]
//! 2. Header domain rules and per-circuit rules: all collected
//! 3. Collection rules (unique numbers, row formula re-check)
//!
//! Any issue from steps 2-3 fails the whole call as
//! [`IrError::Validation`]; nothing partially built is returned.

pub mod circuit;
pub mod header;

pub use circuit::{row_for_circuit, CircuitDraft, CircuitRecord, Side};
pub use header::{HeaderBlock, HeaderDraft, NameValuePair};

use crate::error::{IrError, IrResult, ValidationErrors, ValidationIssue};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// IR format version written by this crate
pub const IR_VERSION: &str = "1.0.0";

fn default_version() -> String {
    IR_VERSION.to_string()
}

/// Plain, unvalidated form of a schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleDraft {
    #[serde(default = "default_version")]
    pub version: String,
    pub header: HeaderDraft,
    #[serde(default)]
    pub circuits: Vec<CircuitDraft>,
}

/// Validated panel schedule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ScheduleDraft")]
pub struct ScheduleIR {
    version: String,
    header: HeaderBlock,
    circuits: Vec<CircuitRecord>,
}

impl ScheduleIR {
    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn header(&self) -> &HeaderBlock {
        &self.header
    }

    /// Circuits in input order
    pub fn circuits(&self) -> &[CircuitRecord] {
        &self.circuits
    }

    pub fn circuit(&self, number: u32) -> Option<&CircuitRecord> {
        self.circuits.iter().find(|c| c.ckt() == number)
    }

    /// Plain form; feeding it back to [`ScheduleDraft::assemble`] yields an
    /// equal IR
    pub fn to_draft(&self) -> ScheduleDraft {
        ScheduleDraft {
            version: self.version.clone(),
            header: self.header.to_draft(),
            circuits: self.circuits.iter().map(CircuitRecord::to_draft).collect(),
        }
    }
}

impl ScheduleDraft {
    /// Validate and build the IR
    pub fn assemble(self) -> IrResult<ScheduleIR> {
        let mut issues = Vec::new();

        let header = HeaderBlock::validate(self.header, &mut issues)?;

        let mut seen = BTreeSet::new();
        let mut circuits = Vec::with_capacity(self.circuits.len());
        for draft in self.circuits {
            if !seen.insert(draft.ckt) {
                issues.push(ValidationIssue::new(
                    format!("circuits[ckt={}].ckt", draft.ckt),
                    "a unique circuit number",
                    format!("duplicate {}", draft.ckt),
                ));
            }
            circuits.push(CircuitRecord::validate(draft, &mut issues));
        }

        if issues.is_empty() {
            issues.extend(check_rows(&circuits));
        }

        if !issues.is_empty() {
            debug!(issues = issues.len(), "Schedule rejected");
            return Err(IrError::Validation(ValidationErrors { issues }));
        }

        let version = if self.version.trim().is_empty() {
            default_version()
        } else {
            self.version
        };

        info!(
            panel = header.panel_name(),
            circuits = circuits.len(),
            "Schedule IR assembled"
        );

        Ok(ScheduleIR {
            version,
            header,
            circuits,
        })
    }
}

impl TryFrom<ScheduleDraft> for ScheduleIR {
    type Error = IrError;

    fn try_from(draft: ScheduleDraft) -> Result<Self, Self::Error> {
        draft.assemble()
    }
}

/// Collection-level row check over already validated records
fn check_rows(circuits: &[CircuitRecord]) -> Vec<ValidationIssue> {
    circuits
        .iter()
        .filter(|c| c.excel_row() != row_for_circuit(c.ckt()))
        .map(|c| {
            ValidationIssue::new(
                format!("circuits[ckt={}].excel_row", c.ckt()),
                row_for_circuit(c.ckt()).to_string(),
                c.excel_row().to_string(),
            )
        })
        .collect()
}

/// Build a validated schedule from header fields and circuit rows
///
/// # Errors
/// - [`IrError::Schema`] on the first header layout mismatch
/// - [`IrError::Validation`] with every domain-rule violation found
pub fn assemble_ir(header: HeaderDraft, circuits: Vec<CircuitDraft>) -> IrResult<ScheduleIR> {
    ScheduleDraft {
        version: default_version(),
        header,
        circuits,
    }
    .assemble()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{LeftField, RightField};
    use crate::value::Scalar;

    fn header() -> HeaderDraft {
        HeaderDraft::from_values(
            "  lp-1 ",
            LeftField::ALL.map(|f| Scalar::text(f.fallback_default().to_lowercase())),
            RightField::ALL.map(|f| Scalar::text(f.fallback_default())),
        )
    }

    #[test]
    fn test_header_values_normalized() {
        let mut h = header();
        h.left_params[LeftField::Phase.index()].value = Scalar::text("three phase");
        h.left_params[LeftField::MainCircuitBreaker.index()].value = Scalar::text("225 amp");
        let ir = assemble_ir(h, vec![CircuitDraft::new(1, 20.0, 16.0)]).unwrap();

        assert_eq!(ir.version(), IR_VERSION);
        assert_eq!(ir.header().panel_name(), "lp-1");
        assert_eq!(ir.header().left(LeftField::Phase), &Scalar::text("3PH"));
        assert_eq!(ir.header().left(LeftField::MainCircuitBreaker), &Scalar::text("225A"));
        assert_eq!(ir.header().left(LeftField::Mounting), &Scalar::text("SURFACE"));
        assert_eq!(ir.header().right(RightField::UlListedShortCircuitRating), &Scalar::text("22KA"));
    }

    #[test]
    fn test_label_mismatch_is_schema_violation() {
        let mut h = header();
        h.left_params.swap(0, 1);
        let err = assemble_ir(h, vec![]).unwrap_err();
        match err {
            IrError::Schema(v) => assert_eq!(v.location, "left_params[0].name_cell"),
            other => panic!("expected schema violation, got {other}"),
        }
    }

    #[test]
    fn test_wrong_param_count_is_schema_violation() {
        let mut h = header();
        h.right_params.pop();
        assert!(matches!(assemble_ir(h, vec![]), Err(IrError::Schema(_))));
    }

    #[test]
    fn test_unrecognized_phase_rejected() {
        let mut h = header();
        h.left_params[LeftField::Phase.index()].value = Scalar::text("TWO PHASE");
        let err = assemble_ir(h, vec![]).unwrap_err();
        assert_eq!(err.issues()[0].field, "header.PHASE");
        assert_eq!(err.issues()[0].actual, "'TWO PHASE'");
    }

    #[test]
    fn test_reserved_cell_must_be_blank() {
        let mut h = header();
        h.right_unused_value = Some("X".to_string());
        let err = assemble_ir(h, vec![]).unwrap_err();
        assert_eq!(err.issues()[0].field, "header.O9");
    }

    #[test]
    fn test_issues_collected_across_header_and_circuits() {
        let mut h = header();
        h.left_params[LeftField::Phase.index()].value = Scalar::text("2PH");
        let circuits = vec![
            CircuitDraft::new(1, 20.0, 20.0),
            CircuitDraft::new(2, 20.0, 10.0),
            CircuitDraft::new(2, 30.0, 10.0),
        ];
        let err = assemble_ir(h, circuits).unwrap_err();
        let fields: Vec<_> = err.issues().iter().map(|i| i.field.as_str()).collect();
        assert_eq!(
            fields,
            vec!["header.PHASE", "circuits[ckt=1].load_amps", "circuits[ckt=2].ckt"]
        );
    }

    #[test]
    fn test_round_trip_through_json() {
        let ir = assemble_ir(
            header(),
            vec![
                CircuitDraft::new(1, 20.0, 16.0).with_poles(1).with_phases(true, false, false),
                CircuitDraft::new(4, 30.0, 12.5).with_description("spare"),
            ],
        )
        .unwrap();

        let json = serde_json::to_string(&ir).unwrap();
        let back: ScheduleIR = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ir);
        assert_eq!(ir.to_draft().assemble().unwrap(), ir);
    }

    #[test]
    fn test_deserialising_invalid_schedule_fails() {
        let ir = assemble_ir(header(), vec![CircuitDraft::new(1, 20.0, 16.0)]).unwrap();
        let mut json = serde_json::to_value(&ir).unwrap();
        json["circuits"][0]["load_amps"] = serde_json::json!(20.0);
        assert!(serde_json::from_value::<ScheduleIR>(json).is_err());
    }
}
