//! Circuit records

use crate::error::{ValidationErrors, ValidationIssue};
use crate::value::format_number;
use serde::{Deserialize, Serialize};

/// Lowest circuit number
pub const MIN_CIRCUIT: u32 = 1;
/// Highest circuit number
pub const MAX_CIRCUIT: u32 = 84;
/// First schedule row holding circuits
pub const MIN_ROW: u32 = 12;
/// Last schedule row holding circuits
pub const MAX_ROW: u32 = 53;
/// Description length limit, in characters
pub const DESCRIPTION_MAX_CHARS: usize = 39;
/// Breaker and load closer than this are treated as equal
pub const BREAKER_LOAD_EPSILON: f64 = 1e-6;

/// Column side of a circuit; odd numbers on the left, even on the right
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Odd,
    Even,
}

impl Side {
    pub fn for_circuit(number: u32) -> Side {
        if number % 2 == 1 {
            Side::Odd
        } else {
            Side::Even
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Odd => "odd",
            Side::Even => "even",
        }
    }
}

/// Schedule row of a circuit: `11 + ceil(n / 2)`
///
/// Circuits 2k-1 and 2k share a row.
pub fn row_for_circuit(number: u32) -> u32 {
    11 + number / 2 + number % 2
}

/// Circuit as supplied by a producer, not yet validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitDraft {
    pub ckt: u32,
    pub side: Side,
    pub excel_row: u32,
    pub breaker_amps: f64,
    pub load_amps: f64,
    #[serde(default)]
    pub poles: Option<u8>,
    #[serde(default, rename = "phA")]
    pub ph_a: Option<bool>,
    #[serde(default, rename = "phB")]
    pub ph_b: Option<bool>,
    #[serde(default, rename = "phC")]
    pub ph_c: Option<bool>,
    #[serde(default)]
    pub description: Option<String>,
}

impl CircuitDraft {
    /// Draft with side and row derived from the circuit number
    pub fn new(ckt: u32, breaker_amps: f64, load_amps: f64) -> Self {
        Self {
            ckt,
            side: Side::for_circuit(ckt),
            excel_row: row_for_circuit(ckt),
            breaker_amps,
            load_amps,
            poles: None,
            ph_a: None,
            ph_b: None,
            ph_c: None,
            description: None,
        }
    }

    pub fn with_poles(mut self, poles: u8) -> Self {
        self.poles = Some(poles);
        self
    }

    pub fn with_phases(mut self, a: bool, b: bool, c: bool) -> Self {
        self.ph_a = Some(a);
        self.ph_b = Some(b);
        self.ph_c = Some(c);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Validated circuit
///
/// Side matches parity, the row matches [`row_for_circuit`], breaker and
/// load differ, and set phase flags agree with the pole count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CircuitRecord {
    ckt: u32,
    side: Side,
    excel_row: u32,
    breaker_amps: f64,
    load_amps: f64,
    poles: Option<u8>,
    #[serde(rename = "phA")]
    ph_a: Option<bool>,
    #[serde(rename = "phB")]
    ph_b: Option<bool>,
    #[serde(rename = "phC")]
    ph_c: Option<bool>,
    description: Option<String>,
}

impl CircuitRecord {
    /// Validate a single circuit
    pub fn try_new(draft: CircuitDraft) -> Result<CircuitRecord, ValidationErrors> {
        let mut issues = Vec::new();
        let record = Self::validate(draft, &mut issues);
        ValidationErrors::check(issues)?;
        Ok(record)
    }

    /// Normalize a draft, appending every rule violation to `issues`
    pub(crate) fn validate(draft: CircuitDraft, issues: &mut Vec<ValidationIssue>) -> CircuitRecord {
        let n = draft.ckt;
        let field = |name: &str| format!("circuits[ckt={}].{}", n, name);

        if !(MIN_CIRCUIT..=MAX_CIRCUIT).contains(&n) {
            issues.push(ValidationIssue::new(
                field("ckt"),
                format!("{}..={}", MIN_CIRCUIT, MAX_CIRCUIT),
                n.to_string(),
            ));
        }
        if !(MIN_ROW..=MAX_ROW).contains(&draft.excel_row) {
            issues.push(ValidationIssue::new(
                field("excel_row"),
                format!("{}..={}", MIN_ROW, MAX_ROW),
                draft.excel_row.to_string(),
            ));
        }
        let side = Side::for_circuit(n);
        if draft.side != side {
            issues.push(ValidationIssue::new(
                field("side"),
                format!("'{}' for circuit {}", side.as_str(), n),
                format!("'{}'", draft.side.as_str()),
            ));
        }
        let row = row_for_circuit(n);
        if draft.excel_row != row {
            issues.push(ValidationIssue::new(
                field("excel_row"),
                format!("{} (11 + ceil({}/2))", row, n),
                draft.excel_row.to_string(),
            ));
        }

        for (name, amps) in [("breaker_amps", draft.breaker_amps), ("load_amps", draft.load_amps)] {
            if !amps.is_finite() || amps < 0.0 {
                issues.push(ValidationIssue::new(field(name), "a finite value >= 0", amps.to_string()));
            }
        }

        if let Some(poles) = draft.poles {
            if !(1..=3).contains(&poles) {
                issues.push(ValidationIssue::new(field("poles"), "1, 2 or 3", poles.to_string()));
            }
            let energized = [draft.ph_a, draft.ph_b, draft.ph_c]
                .iter()
                .filter(|flag| **flag == Some(true))
                .count();
            if energized > 0 && energized != poles as usize {
                issues.push(ValidationIssue::new(
                    field("poles"),
                    format!("{} (phase flags set)", energized),
                    poles.to_string(),
                ));
            }
        }

        if (draft.breaker_amps - draft.load_amps).abs() <= BREAKER_LOAD_EPSILON {
            issues.push(ValidationIssue::new(
                field("load_amps"),
                format!("a value different from breaker_amps ({})", format_number(draft.breaker_amps)),
                format_number(draft.load_amps),
            ));
        }

        let description = draft
            .description
            .map(|d| d.trim().to_uppercase().chars().take(DESCRIPTION_MAX_CHARS).collect::<String>())
            .map(|d| d.trim_end().to_string())
            .filter(|d| !d.is_empty());

        CircuitRecord {
            ckt: n,
            side: draft.side,
            excel_row: draft.excel_row,
            breaker_amps: draft.breaker_amps,
            load_amps: draft.load_amps,
            poles: draft.poles,
            ph_a: draft.ph_a,
            ph_b: draft.ph_b,
            ph_c: draft.ph_c,
            description,
        }
    }

    pub fn ckt(&self) -> u32 {
        self.ckt
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn excel_row(&self) -> u32 {
        self.excel_row
    }

    pub fn breaker_amps(&self) -> f64 {
        self.breaker_amps
    }

    pub fn load_amps(&self) -> f64 {
        self.load_amps
    }

    pub fn poles(&self) -> Option<u8> {
        self.poles
    }

    /// Phase flags A, B, C (unset counts as not energized)
    pub fn phases(&self) -> [bool; 3] {
        [
            self.ph_a.unwrap_or(false),
            self.ph_b.unwrap_or(false),
            self.ph_c.unwrap_or(false),
        ]
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn to_draft(&self) -> CircuitDraft {
        CircuitDraft {
            ckt: self.ckt,
            side: self.side,
            excel_row: self.excel_row,
            breaker_amps: self.breaker_amps,
            load_amps: self.load_amps,
            poles: self.poles,
            ph_a: self.ph_a,
            ph_b: self.ph_b,
            ph_c: self.ph_c,
            description: self.description.clone(),
        }
    }
}
