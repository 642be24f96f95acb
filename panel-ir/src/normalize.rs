//! Field normalizers
//!
//! Pure functions that canonicalise a single raw header or circuit field.
//! Every normalizer is idempotent: feeding it its own output returns the
//! same value.

use crate::value::Scalar;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Canonical single-phase designation
pub const SINGLE_PHASE: &str = "1PH";
/// Canonical three-phase designation
pub const THREE_PHASE: &str = "3PH";
/// Canonical main-lug-only designation
pub const MAIN_LUG_ONLY: &str = "MLO";

/// Phrases meaning "no main breaker, lugs only" (matched as substrings)
const LUG_ONLY_HINTS: &[&str] = &[
    "MLO",
    "MAIN LUG",
    "MAIN LUGS",
    "LUGS ONLY",
    "NO MAIN",
    "NO MCB",
    "NOT MCB",
    "NOT A MCB",
    "NOT BREAKER",
];

static NEGATION: Lazy<Regex> = Lazy::new(|| Regex::new(r"\bNOT\b").expect("static regex"));

static FIRST_INTEGER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d+").expect("static regex"));

static AMPS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*(\d+(?:\.\d+)?)\s*(?:A|AMPS?|AMPERES?)?\s*$").expect("static regex")
});

static POLES: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^\s*([123])\s*(?:P|-?\s*POLES?)?\s*$").expect("static regex")
});

/// Outcome of phase normalization
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhaseValue {
    /// `1PH` or `3PH`
    Canonical(&'static str),
    /// No value supplied
    Blank,
    /// Non-empty input that is neither single nor three phase (upper-cased)
    Unrecognized(String),
}

impl PhaseValue {
    /// Canonical text, if recognised
    pub fn canonical(&self) -> Option<&'static str> {
        match self {
            PhaseValue::Canonical(s) => Some(s),
            _ => None,
        }
    }

    /// Best-effort text form: canonical, empty, or the upper-cased input
    pub fn into_text(self) -> String {
        match self {
            PhaseValue::Canonical(s) => s.to_string(),
            PhaseValue::Blank => String::new(),
            PhaseValue::Unrecognized(s) => s,
        }
    }
}

/// Normalize a PHASE value to `1PH` / `3PH`
///
/// Glyphs and words (`Ø`, `PHASE`, `PH`, stray `O`) are stripped; anything
/// starting with `1` or mentioning SINGLE/ONE is single phase, anything
/// starting with `3` or mentioning THREE is three phase. Other non-empty
/// input is passed through upper-cased as `Unrecognized` so the caller can
/// decide; the IR validator rejects it.
pub fn normalize_phase(raw: &Scalar) -> PhaseValue {
    let Some(text) = raw.as_text() else {
        return PhaseValue::Blank;
    };
    let upper = text.trim().to_uppercase();
    if upper.is_empty() {
        return PhaseValue::Blank;
    }

    let stripped = upper
        .replace(|c: char| c == 'Ø' || c == 'Φ', "")
        .replace("PHASE", "")
        .replace("PH", "");
    let words = stripped.trim();

    if words.contains("SINGLE") || words.starts_with("ONE") {
        return PhaseValue::Canonical(SINGLE_PHASE);
    }
    if words.contains("THREE") {
        return PhaseValue::Canonical(THREE_PHASE);
    }

    let compact: String = words
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-' && *c != 'O')
        .collect();
    if compact.starts_with('1') {
        PhaseValue::Canonical(SINGLE_PHASE)
    } else if compact.starts_with('3') {
        PhaseValue::Canonical(THREE_PHASE)
    } else {
        debug!(raw = %upper, "Unrecognized phase value");
        PhaseValue::Unrecognized(upper)
    }
}

/// Normalize a MAIN CIRCUIT BREAKER value to `MLO` or `<amps>A`
///
/// Absent input, lug-only phrasing, negated breaker phrasing, and text with
/// no rating all resolve to `MLO`. Otherwise the first integer is the rating.
pub fn normalize_main_breaker(raw: &Scalar) -> String {
    let Some(text) = raw.as_text() else {
        return MAIN_LUG_ONLY.to_string();
    };
    let upper = text.trim().to_uppercase();

    if LUG_ONLY_HINTS.iter().any(|hint| upper.contains(hint)) {
        return MAIN_LUG_ONLY.to_string();
    }
    if NEGATION.is_match(&upper)
        && (upper.contains("MCB") || upper.contains("MAIN") || upper.contains("BREAKER"))
    {
        return MAIN_LUG_ONLY.to_string();
    }

    if let Some(m) = FIRST_INTEGER.find(&upper) {
        let digits = m.as_str().trim_start_matches('0');
        let digits = if digits.is_empty() { "0" } else { digits };
        return format!("{}A", digits);
    }

    if !upper.is_empty() && !upper.contains("MCB") && !upper.contains("BREAKER") {
        debug!(raw = %upper, "Main breaker value has no rating, defaulting to MLO");
    }
    MAIN_LUG_ONLY.to_string()
}

/// Line-to-line / line-to-neutral voltage pair
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VoltageRating {
    pub line_to_line: Option<f64>,
    pub line_to_neutral: Option<f64>,
}

impl VoltageRating {
    /// Both values absent (unparseable or empty input)
    pub fn is_unknown(&self) -> bool {
        self.line_to_line.is_none() && self.line_to_neutral.is_none()
    }
}

/// Parse voltage notations such as `480Y/277V`, `208-120`, `240V`, `120/240 VAC`
///
/// With two numbers the first is line-to-line and the second line-to-neutral.
/// Unparseable input yields both values `None`; callers treat that as
/// missing, never as zero.
pub fn parse_voltage(raw: &str) -> VoltageRating {
    let mut s = raw.to_uppercase();
    for token in ["VOLTS", "VOLT", "VAC", "V"] {
        s = s.replace(token, "");
    }
    let s: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != 'Y')
        .map(|c| if c == '-' { '/' } else { c })
        .collect();

    if s.is_empty() {
        return VoltageRating::default();
    }

    match s.split_once('/') {
        Some((a, b)) => match (parse_positive(a), parse_positive(b)) {
            (Some(ll), Some(ln)) => VoltageRating {
                line_to_line: Some(ll),
                line_to_neutral: Some(ln),
            },
            _ => VoltageRating::default(),
        },
        None => VoltageRating {
            line_to_line: parse_positive(&s),
            line_to_neutral: None,
        },
    }
}

fn parse_positive(s: &str) -> Option<f64> {
    s.parse::<f64>().ok().filter(|v| v.is_finite() && *v > 0.0)
}

/// Parse an amperage such as `20`, `20A`, `20 AMPS`, `15.5 A`
pub fn parse_amps(raw: &str) -> Option<f64> {
    AMPS.captures(raw)
        .and_then(|c| c[1].parse::<f64>().ok())
        .filter(|v| v.is_finite())
}

/// Parse a pole count such as `2`, `2P`, `3 POLE`, `1-pole`
pub fn parse_poles(raw: &str) -> Option<u8> {
    POLES.captures(raw).and_then(|c| c[1].parse::<u8>().ok())
}
