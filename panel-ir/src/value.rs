//! Header cell values
//!
//! A header value is one of four shapes. Normalizers match on these
//! exhaustively instead of probing an untyped value.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Scalar cell value: text, number, boolean, or absent
///
/// Serialised untagged: `null`, `true`, `480.0`, `"3PH"`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    #[default]
    Absent,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl Scalar {
    /// Text scalar from anything string-like
    pub fn text(value: impl Into<String>) -> Self {
        Scalar::Text(value.into())
    }

    /// Text scalar for non-blank input, `Absent` otherwise
    pub fn non_blank(value: Option<&str>) -> Self {
        match value {
            Some(v) if !v.trim().is_empty() => Scalar::Text(v.to_string()),
            _ => Scalar::Absent,
        }
    }

    /// True for `Absent` and whitespace-only text
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Absent => true,
            Scalar::Text(s) => s.trim().is_empty(),
            Scalar::Bool(_) | Scalar::Number(_) => false,
        }
    }

    /// Render as text; `None` for `Absent`
    ///
    /// Whole numbers render without a fractional part (`800.0` -> `"800"`).
    pub fn as_text(&self) -> Option<String> {
        match self {
            Scalar::Absent => None,
            Scalar::Bool(b) => Some(b.to_string()),
            Scalar::Number(n) => Some(format_number(*n)),
            Scalar::Text(s) => Some(s.clone()),
        }
    }

    /// Trim and upper-case text; other variants are returned unchanged
    pub fn canonical_text(self) -> Self {
        match self {
            Scalar::Text(s) => Scalar::Text(s.trim().to_uppercase()),
            other => other,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "<absent>"),
        }
    }
}

impl From<&str> for Scalar {
    fn from(value: &str) -> Self {
        Scalar::Text(value.to_string())
    }
}

impl From<String> for Scalar {
    fn from(value: String) -> Self {
        Scalar::Text(value)
    }
}

impl From<f64> for Scalar {
    fn from(value: f64) -> Self {
        Scalar::Number(value)
    }
}

impl From<bool> for Scalar {
    fn from(value: bool) -> Self {
        Scalar::Bool(value)
    }
}

impl<T: Into<Scalar>> From<Option<T>> for Scalar {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Scalar::Absent)
    }
}

impl From<&Value> for Scalar {
    /// Arrays and objects are kept as their JSON text
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Scalar::Absent,
            Value::Bool(b) => Scalar::Bool(*b),
            Value::Number(n) => n.as_f64().map_or(Scalar::Absent, Scalar::Number),
            Value::String(s) => Scalar::Text(s.clone()),
            other => Scalar::Text(other.to_string()),
        }
    }
}

impl From<Scalar> for Value {
    fn from(value: Scalar) -> Self {
        match value {
            Scalar::Absent => Value::Null,
            Scalar::Bool(b) => Value::Bool(b),
            Scalar::Number(n) => serde_json::Number::from_f64(n).map_or(Value::Null, Value::Number),
            Scalar::Text(s) => Value::String(s),
        }
    }
}

/// Format a number without a trailing `.0` when it is whole
pub fn format_number(n: f64) -> String {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_untagged_serde_shapes() {
        assert_eq!(serde_json::to_string(&Scalar::Absent).unwrap(), "null");
        assert_eq!(serde_json::to_string(&Scalar::text("3PH")).unwrap(), "\"3PH\"");

        let parsed: Vec<Scalar> = serde_json::from_str(r#"[null, true, 480, "MLO"]"#).unwrap();
        assert_eq!(
            parsed,
            vec![
                Scalar::Absent,
                Scalar::Bool(true),
                Scalar::Number(480.0),
                Scalar::text("MLO")
            ]
        );
    }

    #[test]
    fn test_whole_numbers_render_without_fraction() {
        assert_eq!(Scalar::Number(800.0).as_text().as_deref(), Some("800"));
        assert_eq!(Scalar::Number(2.5).as_text().as_deref(), Some("2.5"));
    }

    #[test]
    fn test_blankness() {
        assert!(Scalar::Absent.is_blank());
        assert!(Scalar::text("  ").is_blank());
        assert!(!Scalar::Number(0.0).is_blank());
        assert_eq!(Scalar::non_blank(Some(" ")), Scalar::Absent);
    }

    #[test]
    fn test_json_value_conversion() {
        assert_eq!(Scalar::from(&serde_json::json!(400)), Scalar::Number(400.0));
        assert_eq!(Scalar::from(&serde_json::json!("MLO")), Scalar::text("MLO"));
        assert_eq!(Scalar::from(&Value::Null), Scalar::Absent);
        assert_eq!(Value::from(Scalar::Number(f64::NAN)), Value::Null);
        assert_eq!(Value::from(Scalar::text("3PH")), serde_json::json!("3PH"));
    }

    #[test]
    fn test_canonical_text_trims_and_uppercases() {
        assert_eq!(Scalar::text("  surface ").canonical_text(), Scalar::text("SURFACE"));
        assert_eq!(Scalar::Number(3.0).canonical_text(), Scalar::Number(3.0));
    }
}
