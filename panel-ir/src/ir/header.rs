//! Header block: panel name plus the fixed 8 + 7 parameter layout

use crate::error::{SchemaViolation, ValidationIssue};
use crate::normalize::{normalize_main_breaker, normalize_phase, PhaseValue};
use crate::schema::{
    LeftField, RightField, LEFT_PARAM_COUNT, PANEL_NAME_CELL, RIGHT_PARAM_COUNT,
    RIGHT_UNUSED_VALUE_CELL,
};
use crate::value::Scalar;
use serde::{Deserialize, Serialize};

/// One header parameter: label cell, value cell, label text, value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameValuePair {
    pub name_cell: String,
    pub value_cell: String,
    pub name_text: String,
    #[serde(default)]
    pub value: Scalar,
}

impl NameValuePair {
    /// Pair laid out for a left-side field
    pub fn left(field: LeftField, value: impl Into<Scalar>) -> Self {
        Self {
            name_cell: field.label_cell(),
            value_cell: field.value_cell(),
            name_text: field.label().to_string(),
            value: value.into(),
        }
    }

    /// Pair laid out for a right-side field
    pub fn right(field: RightField, value: impl Into<Scalar>) -> Self {
        Self {
            name_cell: field.label_cell(),
            value_cell: field.value_cell(),
            name_text: field.label().to_string(),
            value: value.into(),
        }
    }
}

fn default_panel_name_cell() -> String {
    PANEL_NAME_CELL.to_string()
}

fn default_unused_cell() -> String {
    RIGHT_UNUSED_VALUE_CELL.to_string()
}

/// Header as supplied by a producer, not yet validated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderDraft {
    #[serde(default = "default_panel_name_cell")]
    pub panel_name_cell: String,
    pub panel_name: String,
    pub left_params: Vec<NameValuePair>,
    pub right_params: Vec<NameValuePair>,
    #[serde(default = "default_unused_cell")]
    pub right_unused_value_cell: String,
    #[serde(default)]
    pub right_unused_value: Option<String>,
}

impl HeaderDraft {
    /// Draft with schema-correct labels and cells for the given values
    pub fn from_values(
        panel_name: impl Into<String>,
        left: [Scalar; LEFT_PARAM_COUNT],
        right: [Scalar; RIGHT_PARAM_COUNT],
    ) -> Self {
        Self {
            panel_name_cell: default_panel_name_cell(),
            panel_name: panel_name.into(),
            left_params: LeftField::ALL
                .into_iter()
                .zip(left)
                .map(|(field, value)| NameValuePair::left(field, value))
                .collect(),
            right_params: RightField::ALL
                .into_iter()
                .zip(right)
                .map(|(field, value)| NameValuePair::right(field, value))
                .collect(),
            right_unused_value_cell: default_unused_cell(),
            right_unused_value: None,
        }
    }
}

/// Validated header block
///
/// Labels and cells match the fixed layout, PHASE is `1PH`/`3PH` (or blank),
/// MAIN CIRCUIT BREAKER is `MLO` or `<n>A`, text values are trimmed and
/// upper-cased, and the reserved `O9` cell is blank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderBlock {
    panel_name_cell: String,
    panel_name: String,
    left_params: [NameValuePair; LEFT_PARAM_COUNT],
    right_params: [NameValuePair; RIGHT_PARAM_COUNT],
    right_unused_value_cell: String,
    right_unused_value: Option<String>,
}

impl HeaderBlock {
    /// Validate a draft
    ///
    /// Schema mismatches return immediately. Domain problems (bad PHASE,
    /// non-blank reserved cell) are appended to `issues`.
    pub(crate) fn validate(
        draft: HeaderDraft,
        issues: &mut Vec<ValidationIssue>,
    ) -> Result<HeaderBlock, SchemaViolation> {
        if !cell_eq(&draft.panel_name_cell, PANEL_NAME_CELL) {
            return Err(SchemaViolation::new(
                "panel_name_cell",
                PANEL_NAME_CELL,
                draft.panel_name_cell,
            ));
        }
        if !cell_eq(&draft.right_unused_value_cell, RIGHT_UNUSED_VALUE_CELL) {
            return Err(SchemaViolation::new(
                "right_unused_value_cell",
                RIGHT_UNUSED_VALUE_CELL,
                draft.right_unused_value_cell,
            ));
        }

        let left_params: [NameValuePair; LEFT_PARAM_COUNT] =
            draft.left_params.try_into().map_err(|v: Vec<NameValuePair>| {
                SchemaViolation::new(
                    "left_params",
                    format!("{} parameters", LEFT_PARAM_COUNT),
                    format!("{} parameters", v.len()),
                )
            })?;
        let right_params: [NameValuePair; RIGHT_PARAM_COUNT] =
            draft.right_params.try_into().map_err(|v: Vec<NameValuePair>| {
                SchemaViolation::new(
                    "right_params",
                    format!("{} parameters", RIGHT_PARAM_COUNT),
                    format!("{} parameters", v.len()),
                )
            })?;

        for (field, pair) in LeftField::ALL.iter().zip(left_params.iter()) {
            check_layout(
                &format!("left_params[{}]", field.index()),
                pair,
                field.label(),
                &field.label_cell(),
                &field.value_cell(),
            )?;
        }
        for (field, pair) in RightField::ALL.iter().zip(right_params.iter()) {
            check_layout(
                &format!("right_params[{}]", field.index()),
                pair,
                field.label(),
                &field.label_cell(),
                &field.value_cell(),
            )?;
        }

        let left_params = left_params.map(|pair| canonical_pair(pair, issues));
        let right_params = right_params.map(|pair| NameValuePair {
            value: pair.value.canonical_text(),
            ..pair
        });

        if let Some(unused) = &draft.right_unused_value {
            if !unused.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("header.{}", RIGHT_UNUSED_VALUE_CELL),
                    "blank (reserved cell)",
                    format!("'{}'", unused),
                ));
            }
        }

        Ok(HeaderBlock {
            panel_name_cell: PANEL_NAME_CELL.to_string(),
            panel_name: draft.panel_name.trim().to_string(),
            left_params,
            right_params,
            right_unused_value_cell: RIGHT_UNUSED_VALUE_CELL.to_string(),
            right_unused_value: None,
        })
    }

    pub fn panel_name(&self) -> &str {
        &self.panel_name
    }

    pub fn left_params(&self) -> &[NameValuePair; LEFT_PARAM_COUNT] {
        &self.left_params
    }

    pub fn right_params(&self) -> &[NameValuePair; RIGHT_PARAM_COUNT] {
        &self.right_params
    }

    /// Value of a left-side field
    pub fn left(&self, field: LeftField) -> &Scalar {
        &self.left_params[field.index()].value
    }

    /// Value of a right-side field
    pub fn right(&self, field: RightField) -> &Scalar {
        &self.right_params[field.index()].value
    }

    /// Plain, unvalidated form of this header
    pub fn to_draft(&self) -> HeaderDraft {
        HeaderDraft {
            panel_name_cell: self.panel_name_cell.clone(),
            panel_name: self.panel_name.clone(),
            left_params: self.left_params.to_vec(),
            right_params: self.right_params.to_vec(),
            right_unused_value_cell: self.right_unused_value_cell.clone(),
            right_unused_value: self.right_unused_value.clone(),
        }
    }
}

fn cell_eq(actual: &str, expected: &str) -> bool {
    actual.trim().eq_ignore_ascii_case(expected)
}

fn check_layout(
    location: &str,
    pair: &NameValuePair,
    label: &str,
    label_cell: &str,
    value_cell: &str,
) -> Result<(), SchemaViolation> {
    if !cell_eq(&pair.name_cell, label_cell) {
        return Err(SchemaViolation::new(
            format!("{}.name_cell", location),
            label_cell,
            pair.name_cell.clone(),
        ));
    }
    if !cell_eq(&pair.value_cell, value_cell) {
        return Err(SchemaViolation::new(
            format!("{}.value_cell", location),
            value_cell,
            pair.value_cell.clone(),
        ));
    }
    if pair.name_text.trim().to_uppercase() != label {
        return Err(SchemaViolation::new(
            format!("{}.name_text", location),
            format!("'{}'", label),
            format!("'{}'", pair.name_text),
        ));
    }
    Ok(())
}

/// Canonical labels/cells and normalized value for a left-side pair
fn canonical_pair(pair: NameValuePair, issues: &mut Vec<ValidationIssue>) -> NameValuePair {
    let label = pair.name_text.trim().to_uppercase();
    let value = if label == LeftField::Phase.label() {
        match normalize_phase(&pair.value) {
            PhaseValue::Canonical(canonical) => Scalar::text(canonical),
            PhaseValue::Blank => pair.value.canonical_text(),
            PhaseValue::Unrecognized(raw) => {
                issues.push(ValidationIssue::new(
                    format!("header.{}", label),
                    "1PH or 3PH",
                    format!("'{}'", raw),
                ));
                Scalar::Text(raw)
            }
        }
    } else if label == LeftField::MainCircuitBreaker.label() {
        Scalar::Text(normalize_main_breaker(&pair.value))
    } else {
        pair.value.canonical_text()
    };

    NameValuePair {
        name_cell: pair.name_cell.trim().to_uppercase(),
        value_cell: pair.value_cell.trim().to_uppercase(),
        name_text: label,
        value,
    }
}
