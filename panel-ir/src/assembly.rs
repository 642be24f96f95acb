//! Schedule assembly from producer sources
//!
//! Each producer (document extraction, accumulated session parameters,
//! manual edits) is turned into header and circuit drafts and then passed
//! through [`assemble_ir`]. Builder policies shared by all producers:
//! - a missing or non-positive breaker rating becomes 20 A
//! - a load within 0.1 A of the breaker is replaced by a fixed share of it
//! - missing poles become 1
//! - phase flags follow the bus rotation of the circuit's row, so pole and
//!   phase counts always agree
//! - a missing description becomes `CIRCUIT <n>`

use crate::circuits::CircuitRow;
use crate::error::IrResult;
use crate::extractor::DocumentExtraction;
use crate::ir::circuit::{MAX_CIRCUIT, MIN_CIRCUIT, MIN_ROW};
use crate::ir::{assemble_ir, row_for_circuit, CircuitDraft, HeaderDraft, ScheduleIR};
use crate::merge::{MergeLayers, MergeResolver, TaskParameters, TemplateDefaults};
use crate::normalize::{normalize_phase, parse_amps, parse_poles, parse_voltage, PhaseValue};
use crate::schema::{HeaderField, LeftField, RightField, DEFAULT_PANEL_NAME};
use crate::value::Scalar;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{info, warn};

/// Breaker rating used when none is known
pub const DEFAULT_BREAKER_AMPS: f64 = 20.0;
/// Description of the placeholder circuit in an empty session schedule
pub const SPARE_DESCRIPTION: &str = "SPARE";

/// Loads closer than this to the breaker rating are replaced
const LOAD_REPAIR_BAND: f64 = 0.1;

static FIRST_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+(?:\.\d+)?").expect("static regex"));

// ============================================================================
// Circuit policies
// ============================================================================

/// Load handling for one producer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadPolicy {
    /// Missing load is 0 A; a load equal to the breaker becomes 75 % of it
    Document,
    /// Missing load is 80 % of the breaker; an equal load becomes 80 %
    Session,
}

impl LoadPolicy {
    fn factor(self) -> f64 {
        match self {
            LoadPolicy::Document => 0.75,
            LoadPolicy::Session => 0.8,
        }
    }

    fn missing_load(self, breaker: f64) -> f64 {
        match self {
            LoadPolicy::Document => 0.0,
            LoadPolicy::Session => breaker * self.factor(),
        }
    }
}

/// Phase flags for a circuit by bus rotation
///
/// Row 12 starts on A, row 13 on B, row 14 on C, and so on; a multi-pole
/// breaker takes consecutive phases from its starting phase.
pub fn phase_flags(ckt: u32, poles: u8) -> [bool; 3] {
    let start = (row_for_circuit(ckt).saturating_sub(MIN_ROW) % 3) as usize;
    let mut flags = [false; 3];
    for i in 0..poles.min(3) as usize {
        flags[(start + i) % 3] = true;
    }
    flags
}

/// Raw circuit values before builder policies
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CircuitValues {
    pub breaker_amps: Option<f64>,
    pub load_amps: Option<f64>,
    pub poles: Option<u8>,
    pub description: Option<String>,
}

impl CircuitValues {
    /// Apply builder policies and produce a draft for circuit `ckt`
    pub fn into_draft(self, ckt: u32, policy: LoadPolicy) -> CircuitDraft {
        let breaker = self
            .breaker_amps
            .filter(|b| b.is_finite() && *b > 0.0)
            .unwrap_or(DEFAULT_BREAKER_AMPS);
        let mut load = self
            .load_amps
            .filter(|l| l.is_finite() && *l >= 0.0)
            .unwrap_or_else(|| policy.missing_load(breaker));
        if (breaker - load).abs() < LOAD_REPAIR_BAND {
            load = breaker * policy.factor();
        }

        let poles = self.poles.filter(|p| (1..=3).contains(p)).unwrap_or(1);
        let [a, b, c] = phase_flags(ckt, poles);
        let description = self
            .description
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty() && d != crate::circuits::MISSING)
            .unwrap_or_else(|| format!("CIRCUIT {}", ckt));

        CircuitDraft::new(ckt, breaker, load)
            .with_poles(poles)
            .with_phases(a, b, c)
            .with_description(description)
    }
}

fn first_number(text: &str) -> Option<f64> {
    FIRST_NUMBER
        .find(text)
        .and_then(|m| m.as_str().parse().ok())
}

fn json_amps(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_amps(s).or_else(|| first_number(s)),
        _ => None,
    }
}

fn json_poles(value: Option<&Value>) -> Option<u8> {
    match value? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|p| p.fract() == 0.0 && *p >= 0.0).map(|p| p as u64))
            .and_then(|p| u8::try_from(p).ok()),
        Value::String(s) => parse_poles(s),
        _ => None,
    }
}

fn scalar_amps(value: &Scalar) -> Option<f64> {
    match value {
        Scalar::Number(n) => Some(*n),
        other => other.as_text().and_then(|s| parse_amps(&s).or_else(|| first_number(&s))),
    }
}

fn scalar_poles(value: &Scalar) -> Option<u8> {
    match value {
        Scalar::Number(n) if n.fract() == 0.0 && (1.0..=3.0).contains(n) => Some(*n as u8),
        other => other.as_text().and_then(|s| parse_poles(&s)),
    }
}

// ============================================================================
// Header
// ============================================================================

fn header_from_params(panel_name: &str, params: &TaskParameters) -> HeaderDraft {
    HeaderDraft::from_values(
        panel_name,
        LeftField::ALL.map(|f| params.panel_spec(f.param_key())),
        RightField::ALL.map(|f| params.panel_spec(f.param_key())),
    )
}

/// Extracted value rejected during assembly in favour of a lower layer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackNote {
    pub field: String,
    pub rejected: String,
    pub reason: String,
}

/// Why an extracted header value cannot be used, if it cannot
fn reject_reason(field: HeaderField, raw: &str) -> Option<&'static str> {
    match field {
        HeaderField::Left(LeftField::Phase) => match normalize_phase(&Scalar::text(raw)) {
            PhaseValue::Canonical(_) => None,
            _ => Some("not a recognised phase"),
        },
        HeaderField::Left(LeftField::Voltage) => {
            parse_voltage(raw).is_unknown().then_some("not a parseable voltage")
        }
        HeaderField::Left(LeftField::MainBusAmps) => {
            first_number(raw).is_none().then_some("no amperage")
        }
        _ => None,
    }
}

// ============================================================================
// Producers
// ============================================================================

/// Options for document assembly
#[derive(Debug, Clone, Copy, Default)]
pub struct DocumentOptions<'a> {
    /// Panel name that wins over the extracted one
    pub panel_name_override: Option<&'a str>,
    /// Template defaults below the extracted values
    pub template: Option<&'a TemplateDefaults>,
}

/// Validated schedule plus values that were dropped on the way
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledSchedule {
    pub ir: ScheduleIR,
    pub notes: Vec<FallbackNote>,
}

/// Assemble a schedule from a document extraction
///
/// **Algorithm:**
/// 1. Accepted extracted header values form the highest merge layer;
///    values that fail their normalizer are noted and skipped
/// 2. Template and fallback defaults fill the rest
/// 3. Found circuit rows become circuits; gap rows and rows with neither a
///    description nor a breaker rating are left out
pub fn assemble_from_document(
    doc: &DocumentExtraction,
    options: DocumentOptions<'_>,
) -> IrResult<AssembledSchedule> {
    let mut extracted = TaskParameters::new();
    let mut notes = Vec::new();

    for field in HeaderField::all() {
        let key = field.param_key();
        let Some(raw) = doc.value(key) else {
            continue;
        };
        match reject_reason(field, raw) {
            None => extracted.set_panel_spec(key, raw),
            Some(reason) => {
                warn!(field = key, value = raw, reason, "Extracted value rejected, using fallback");
                notes.push(FallbackNote {
                    field: key.to_string(),
                    rejected: raw.to_string(),
                    reason: reason.to_string(),
                });
            }
        }
    }

    let merged = MergeResolver::resolve(MergeLayers {
        overrides: Some(&extracted),
        session: None,
        template: options.template,
    })
    .params;

    let panel_name = options
        .panel_name_override
        .filter(|n| !n.trim().is_empty())
        .or_else(|| doc.value(crate::extractor::fields::PANEL_NAME))
        .unwrap_or(DEFAULT_PANEL_NAME);

    let circuits: Vec<CircuitDraft> = doc
        .circuits
        .found_rows()
        .filter(|row| !(row.description.is_missing() && row.breaker_amps.is_missing()))
        .map(|row| circuit_values_from_row(row).into_draft(row.number, LoadPolicy::Document))
        .collect();

    info!(
        panel = panel_name,
        circuits = circuits.len(),
        fallbacks = notes.len(),
        "Assembling schedule from document"
    );

    let ir = assemble_ir(header_from_params(panel_name, &merged), circuits)?;
    Ok(AssembledSchedule { ir, notes })
}

fn circuit_values_from_row(row: &CircuitRow) -> CircuitValues {
    CircuitValues {
        breaker_amps: row.breaker_amps.as_found().and_then(first_number),
        load_amps: row.load.as_found().and_then(first_number),
        poles: row.breaker_poles.as_found().and_then(parse_poles),
        description: row.description.as_found().map(str::to_uppercase),
    }
}

/// Assemble a schedule from accumulated session parameters
///
/// Header values come from `panel_specs` over template and fallback
/// defaults. Circuits come from the `circuits` sub-map; entries whose key is
/// not a circuit number in 1..=84 are skipped with a warning. A session with
/// no circuits yields a single `SPARE` circuit 1.
pub fn assemble_from_session(
    params: &TaskParameters,
    template: Option<&TemplateDefaults>,
) -> IrResult<ScheduleIR> {
    let merged = MergeResolver::resolve(MergeLayers {
        overrides: None,
        session: Some(params),
        template,
    })
    .params;
    let panel_name = params.panel_name().unwrap_or(DEFAULT_PANEL_NAME);

    let mut entries: BTreeMap<u32, &Value> = BTreeMap::new();
    if let Some(circuits) = params.circuits() {
        for (key, value) in circuits {
            match key.trim().parse::<u32>() {
                Ok(number) if (MIN_CIRCUIT..=MAX_CIRCUIT).contains(&number) => {
                    entries.insert(number, value);
                }
                Ok(number) => warn!(number, "Skipping session circuit outside the panel range"),
                Err(_) => warn!(key = %key, "Skipping session circuit with non-numeric key"),
            }
        }
    }

    let mut circuits: Vec<CircuitDraft> = entries
        .into_iter()
        .map(|(number, value)| {
            CircuitValues {
                breaker_amps: json_amps(value.get("breaker_amps")),
                load_amps: json_amps(value.get("phase_amps")),
                poles: json_poles(value.get("poles")),
                description: value
                    .get("description")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            }
            .into_draft(number, LoadPolicy::Session)
        })
        .collect();

    if circuits.is_empty() {
        info!("No circuits in session, emitting a single spare");
        circuits.push(
            CircuitValues {
                description: Some(SPARE_DESCRIPTION.to_string()),
                ..Default::default()
            }
            .into_draft(1, LoadPolicy::Session),
        );
    }

    assemble_ir(header_from_params(panel_name, &merged), circuits)
}

/// One circuit row from the manual edit form
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualCircuit {
    pub number: u32,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub load: Scalar,
    #[serde(default)]
    pub breaker_amps: Scalar,
    #[serde(default)]
    pub breaker_poles: Scalar,
}

/// Header and circuits as corrected by a human reviewer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManualEdits {
    #[serde(default)]
    pub panel_name: Option<String>,
    /// Header values keyed by `panel_specs` key
    #[serde(default)]
    pub panel_specs: BTreeMap<String, Scalar>,
    #[serde(default)]
    pub circuits: Vec<ManualCircuit>,
}

/// Assemble a schedule from manual edits
///
/// Edits are the reviewer's final word: header values are used as given
/// with no defaults, and circuits without a description are left out.
pub fn assemble_from_manual_edits(edits: &ManualEdits) -> IrResult<ScheduleIR> {
    let value = |key: &str| {
        edits
            .panel_specs
            .get(key)
            .filter(|v| !v.is_blank())
            .cloned()
            .unwrap_or_default()
    };
    let header = HeaderDraft::from_values(
        edits
            .panel_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(DEFAULT_PANEL_NAME),
        LeftField::ALL.map(|f| value(f.param_key())),
        RightField::ALL.map(|f| value(f.param_key())),
    );

    let circuits: Vec<CircuitDraft> = edits
        .circuits
        .iter()
        .filter(|c| c.description.as_deref().is_some_and(|d| !d.trim().is_empty()))
        .map(|c| {
            CircuitValues {
                breaker_amps: scalar_amps(&c.breaker_amps),
                load_amps: scalar_amps(&c.load),
                poles: scalar_poles(&c.breaker_poles),
                description: c.description.as_ref().map(|d| d.to_uppercase()),
            }
            .into_draft(c.number, LoadPolicy::Document)
        })
        .collect();

    assemble_ir(header, circuits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Side;
    use serde_json::json;

    #[test]
    fn test_phase_rotation() {
        assert_eq!(phase_flags(1, 1), [true, false, false]);
        assert_eq!(phase_flags(2, 1), [true, false, false]);
        assert_eq!(phase_flags(3, 1), [false, true, false]);
        assert_eq!(phase_flags(5, 1), [false, false, true]);
        assert_eq!(phase_flags(7, 1), [true, false, false]);
        assert_eq!(phase_flags(5, 2), [true, false, true]);
        assert_eq!(phase_flags(1, 3), [true, true, true]);
    }

    #[test]
    fn test_policies() {
        let draft = CircuitValues::default().into_draft(4, LoadPolicy::Document);
        assert_eq!(draft.breaker_amps, DEFAULT_BREAKER_AMPS);
        assert_eq!(draft.load_amps, 0.0);
        assert_eq!(draft.poles, Some(1));
        assert_eq!(draft.side, Side::Even);
        assert_eq!(draft.description.as_deref(), Some("CIRCUIT 4"));

        let equal = CircuitValues {
            breaker_amps: Some(20.0),
            load_amps: Some(20.05),
            ..Default::default()
        };
        assert_eq!(equal.clone().into_draft(1, LoadPolicy::Document).load_amps, 15.0);
        assert_eq!(equal.into_draft(1, LoadPolicy::Session).load_amps, 16.0);

        let session_default = CircuitValues::default().into_draft(1, LoadPolicy::Session);
        assert_eq!(session_default.load_amps, 16.0);
    }

    #[test]
    fn test_empty_session_gets_spare() {
        let ir = assemble_from_session(&TaskParameters::new_task(), None).unwrap();
        assert_eq!(ir.circuits().len(), 1);
        let spare = &ir.circuits()[0];
        assert_eq!(spare.ckt(), 1);
        assert_eq!(spare.description(), Some(SPARE_DESCRIPTION));
        assert_eq!(spare.breaker_amps(), 20.0);
        assert_eq!(spare.load_amps(), 16.0);
        assert_eq!(spare.phases(), [true, false, false]);
        assert_eq!(ir.header().panel_name(), DEFAULT_PANEL_NAME);
    }

    #[test]
    fn test_session_circuits_and_specs() {
        let params = TaskParameters::from_value(json!({
            "task_id": "X",
            "panel_name": "LP-2",
            "panel_specs": {"voltage": "208Y/120V", "phase": "3", "main_breaker": "225"},
            "circuits": {
                "3": {"description": "lighting", "breaker_amps": 20, "phase_amps": 16, "poles": 2},
                "1": {"description": "receptacles", "breaker_amps": "30A"},
                "bogus": {"description": "ignored"}
            }
        }))
        .unwrap();

        let ir = assemble_from_session(&params, None).unwrap();
        assert_eq!(ir.header().panel_name(), "LP-2");
        assert_eq!(ir.header().left(LeftField::Phase), &Scalar::text("3PH"));
        assert_eq!(ir.header().left(LeftField::MainCircuitBreaker), &Scalar::text("225A"));
        assert_eq!(ir.header().left(LeftField::Wire), &Scalar::text("4W+G"));

        let numbers: Vec<_> = ir.circuits().iter().map(|c| c.ckt()).collect();
        assert_eq!(numbers, vec![1, 3]);
        let c1 = ir.circuit(1).unwrap();
        assert_eq!(c1.breaker_amps(), 30.0);
        assert_eq!(c1.load_amps(), 24.0);
        let c3 = ir.circuit(3).unwrap();
        assert_eq!(c3.poles(), Some(2));
        assert_eq!(c3.phases(), [false, true, true]);
        assert_eq!(c3.description(), Some("LIGHTING"));
    }

    #[test]
    fn test_session_skips_out_of_range_keys() {
        let params = TaskParameters::from_value(json!({
            "circuits": {
                "0": {"description": "zero", "breaker_amps": 20, "phase_amps": 10},
                "2": {"description": "pump", "breaker_amps": 30, "phase_amps": 20, "poles": 2.0},
                "85": {"description": "beyond", "breaker_amps": 20, "phase_amps": 10}
            }
        }))
        .unwrap();

        let ir = assemble_from_session(&params, None).unwrap();
        let numbers: Vec<_> = ir.circuits().iter().map(|c| c.ckt()).collect();
        assert_eq!(numbers, vec![2]);
        assert_eq!(ir.circuit(2).unwrap().poles(), Some(2));
    }

    #[test]
    fn test_json_poles_accepts_whole_floats() {
        assert_eq!(json_poles(Some(&json!(2.0))), Some(2));
        assert_eq!(json_poles(Some(&json!(3))), Some(3));
        assert_eq!(json_poles(Some(&json!("1P"))), Some(1));
        assert_eq!(json_poles(Some(&json!(1.5))), None);
        assert_eq!(json_poles(Some(&json!(-2.0))), None);
        assert_eq!(json_poles(None), None);
    }

    #[test]
    fn test_manual_edits() {
        let edits: ManualEdits = serde_json::from_value(json!({
            "panel_name": "LP-3",
            "panel_specs": {"voltage": "480Y/277V", "phase": "3PH", "main_breaker": ""},
            "circuits": [
                {"number": 2, "description": "pump", "load": "12.5", "breaker_amps": 30, "breaker_poles": "3P"},
                {"number": 4, "description": "", "breaker_amps": 20}
            ]
        }))
        .unwrap();

        let ir = assemble_from_manual_edits(&edits).unwrap();
        assert_eq!(ir.header().left(LeftField::MainCircuitBreaker), &Scalar::text("MLO"));
        assert_eq!(ir.header().left(LeftField::Mounting), &Scalar::Absent);
        assert_eq!(ir.circuits().len(), 1);
        let pump = &ir.circuits()[0];
        assert_eq!(pump.load_amps(), 12.5);
        assert_eq!(pump.poles(), Some(3));
        assert_eq!(pump.phases(), [true, true, true]);
    }
}
