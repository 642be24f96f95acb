//! Error types for panel-ir
//!
//! Two failure classes exist for schedule assembly:
//! - **Schema violations**: the header does not follow the fixed label/cell
//!   layout. This is an upstream programming defect and is never repaired.
//! - **Domain-rule violations**: bad circuit numbering, pole/phase mismatch,
//!   breaker equal to load, and so on. All of them are collected so the
//!   caller can fix the input in one pass.
//!
//! Extraction misses and merge conflicts are not errors; they are carried
//! as data (`ConfidenceLevel::Missing`, `MergeWarning`).

use std::fmt;
use thiserror::Error;

/// Result type for IR operations
pub type IrResult<T> = Result<T, IrError>;

/// Top-level error for schedule assembly and its collaborators
#[derive(Debug, Error)]
pub enum IrError {
    /// Header layout does not match the fixed schema
    #[error("Schema violation: {0}")]
    Schema(#[from] SchemaViolation),

    /// One or more domain rules failed
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationErrors),

    /// Session store collaborator failed
    #[error("Session store error: {0}")]
    Store(#[from] panel_common::Error),
}

impl IrError {
    /// Domain issues, if this is a validation failure
    pub fn issues(&self) -> &[ValidationIssue] {
        match self {
            IrError::Validation(errors) => &errors.issues,
            _ => &[],
        }
    }
}

/// Header schema mismatch
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{location}: expected {expected}, got {actual}")]
pub struct SchemaViolation {
    /// Position that failed, e.g. `left_params[2].name_text`
    pub location: String,
    pub expected: String,
    pub actual: String,
}

impl SchemaViolation {
    pub fn new(
        location: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            location: location.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

/// One field-addressed domain-rule violation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationIssue {
    /// Offending field, e.g. `circuits[4].poles` or `header.PHASE`
    pub field: String,
    pub expected: String,
    pub actual: String,
}

impl ValidationIssue {
    pub fn new(
        field: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: expected {}, got {}", self.field, self.expected, self.actual)
    }
}

/// Every domain-rule violation found in one assembly attempt
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationErrors {
    pub issues: Vec<ValidationIssue>,
}

impl ValidationErrors {
    /// Fails with the collected issues, or succeeds if there are none
    pub fn check(issues: Vec<ValidationIssue>) -> Result<(), ValidationErrors> {
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors { issues })
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} issue(s)", self.issues.len())?;
        for issue in &self.issues {
            write!(f, "; {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_message_names_field_and_values() {
        let issue = ValidationIssue::new("circuits[0].poles", "2 (phases set)", "3");
        assert_eq!(issue.to_string(), "circuits[0].poles: expected 2 (phases set), got 3");
    }

    #[test]
    fn test_check_passes_when_empty() {
        assert!(ValidationErrors::check(vec![]).is_ok());
        let err = ValidationErrors::check(vec![ValidationIssue::new("a", "b", "c")]).unwrap_err();
        assert_eq!(err.to_string(), "1 issue(s); a: expected b, got c");
    }
}
