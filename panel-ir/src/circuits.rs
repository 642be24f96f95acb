//! Circuit table builder
//!
//! Reconstructs a complete table of N circuits from sparse OCR/free-text
//! lines. Every slot 1..=N is present; circuits with no evidence carry the
//! `MISSING` sentinel in every field instead of being left out.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Sentinel for a field with no source evidence
pub const MISSING: &str = "MISSING";

/// Smallest table ever produced
pub const MIN_CIRCUITS: u32 = 18;
/// Largest table ever produced (and highest legal circuit number)
pub const MAX_CIRCUITS: u32 = 84;

/// Fields scored for row confidence (everything except the number)
const SCORED_FIELDS: f64 = 4.0;

static CIRCUIT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*(?P<num>\d{1,3})[A-Ca-c]?(?P<body>[\s\-:.,]+\S.*)$").expect("static regex")
});

// Description is lazy so the optional load/amps/poles tokens bind from the
// right end of the line.
static CIRCUIT_BODY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(?P<desc>.*?)(?:[\s\-,]+(?P<load>\d+(?:\.\d+)?)\s*(?:KVA|KW|VA|W)?)?(?:[\s\-,]+(?P<amps>\d{1,4})\s*A(?:MPS?)?)?(?:[\s\-,]+(?P<poles>[123])\s*P(?:OLE)?)?\s*$",
    )
    .expect("static regex")
});

/// One circuit field: a raw value, or the `MISSING` sentinel
///
/// Serialises as a plain string so downstream consumers see `"MISSING"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CircuitField {
    Found(String),
    Missing,
}

impl CircuitField {
    fn from_match(m: Option<regex::Match<'_>>) -> Self {
        match m.map(|m| m.as_str().trim()) {
            Some(s) if !s.is_empty() => CircuitField::Found(s.to_string()),
            _ => CircuitField::Missing,
        }
    }

    pub fn as_found(&self) -> Option<&str> {
        match self {
            CircuitField::Found(s) => Some(s),
            CircuitField::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, CircuitField::Missing)
    }
}

impl From<String> for CircuitField {
    fn from(value: String) -> Self {
        if value == MISSING {
            CircuitField::Missing
        } else {
            CircuitField::Found(value)
        }
    }
}

impl From<CircuitField> for String {
    fn from(value: CircuitField) -> Self {
        match value {
            CircuitField::Found(s) => s,
            CircuitField::Missing => MISSING.to_string(),
        }
    }
}

/// One slot of the circuit table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitRow {
    pub number: u32,
    pub description: CircuitField,
    /// Numeric load value; any unit is dropped
    pub load: CircuitField,
    pub breaker_amps: CircuitField,
    pub breaker_poles: CircuitField,
    /// `1 - missing_fields / 4` for found rows, 0.0 for gap rows
    pub confidence: f64,
    /// Line the row was parsed from; `None` for gap rows
    pub source_line: Option<String>,
}

impl CircuitRow {
    /// Gap row: every field `MISSING`
    pub fn missing(number: u32) -> Self {
        Self {
            number,
            description: CircuitField::Missing,
            load: CircuitField::Missing,
            breaker_amps: CircuitField::Missing,
            breaker_poles: CircuitField::Missing,
            confidence: 0.0,
            source_line: None,
        }
    }

    pub fn is_found(&self) -> bool {
        self.source_line.is_some()
    }

    fn missing_fields(&self) -> usize {
        [&self.description, &self.load, &self.breaker_amps, &self.breaker_poles]
            .iter()
            .filter(|f| f.is_missing())
            .count()
    }
}

/// Gap-filled circuit table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitTable {
    /// Exactly `count` rows, numbered 1..=count
    pub rows: Vec<CircuitRow>,
    pub count: u32,
    /// Share of rows backed by a source line
    pub found_ratio: f64,
    /// Numbers of gap rows
    pub missing_circuits: Vec<u32>,
    /// Lines that did not parse as a circuit
    pub skipped_lines: usize,
}

impl CircuitTable {
    pub fn found_rows(&self) -> impl Iterator<Item = &CircuitRow> {
        self.rows.iter().filter(|r| r.is_found())
    }
}

/// Parse one line into a found row
///
/// Returns `None` when the line has no leading circuit number in 1..=84
/// or no description after it. Bare rating tokens such as `60A` or `225`
/// are not circuits.
pub fn parse_circuit_line(line: &str) -> Option<CircuitRow> {
    let head = CIRCUIT_LINE.captures(line)?;
    let number: u32 = head["num"].parse().ok()?;
    if !(1..=MAX_CIRCUITS).contains(&number) {
        return None;
    }

    let caps = CIRCUIT_BODY.captures(&head["body"])?;
    let desc = caps
        .name("desc")
        .map(|m| m.as_str().trim().trim_start_matches(['-', ':', '.', ',']).trim())
        .filter(|s| !s.is_empty())?;

    let mut row = CircuitRow::missing(number);
    row.description = CircuitField::Found(desc.to_string());
    row.load = CircuitField::from_match(caps.name("load"));
    row.breaker_amps = CircuitField::from_match(caps.name("amps"));
    row.breaker_poles = CircuitField::from_match(caps.name("poles"));

    row.confidence = 1.0 - row.missing_fields() as f64 / SCORED_FIELDS;
    row.source_line = Some(line.to_string());
    Some(row)
}

/// Total circuit count for a table
///
/// Without a declaration: the highest observed number rounded up to even.
/// With one: the declared value, made even by adding one if odd. Both are
/// clamped to 18..=84.
pub fn resolve_circuit_count(max_observed: u32, declared: Option<u32>) -> u32 {
    match declared {
        None => {
            let even = max_observed.div_ceil(2) * 2;
            even.clamp(MIN_CIRCUITS, MAX_CIRCUITS)
        }
        Some(n) => {
            let n = n.clamp(MIN_CIRCUITS, MAX_CIRCUITS);
            if n % 2 == 1 {
                n + 1
            } else {
                n
            }
        }
    }
}

/// Build the gap-filled table
///
/// # Arguments
/// * `lines` - Raw text lines in source order
/// * `declared` - Circuit count stated by the caller or the document
///
/// # Returns
/// One row per circuit 1..=N. A number seen on several lines keeps the last.
pub fn build_circuit_table<S: AsRef<str>>(lines: &[S], declared: Option<u32>) -> CircuitTable {
    let mut found: BTreeMap<u32, CircuitRow> = BTreeMap::new();
    let mut skipped = 0usize;

    for line in lines {
        match parse_circuit_line(line.as_ref()) {
            Some(row) => {
                found.insert(row.number, row);
            }
            None => {
                debug!(line = line.as_ref(), "Skipped non-circuit line");
                skipped += 1;
            }
        }
    }

    let max_observed = found.keys().next_back().copied().unwrap_or(0);
    let count = resolve_circuit_count(max_observed, declared);

    let rows: Vec<CircuitRow> = (1..=count)
        .map(|n| found.remove(&n).unwrap_or_else(|| CircuitRow::missing(n)))
        .collect();
    let missing_circuits: Vec<u32> = rows.iter().filter(|r| !r.is_found()).map(|r| r.number).collect();
    let found_count = rows.len() - missing_circuits.len();
    let found_ratio = found_count as f64 / rows.len() as f64;

    info!(
        count,
        found = found_count,
        missing = missing_circuits.len(),
        skipped,
        "Built circuit table"
    );

    CircuitTable {
        rows,
        count,
        found_ratio,
        missing_circuits,
        skipped_lines: skipped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn found(s: &str) -> CircuitField {
        CircuitField::Found(s.to_string())
    }

    #[test]
    fn test_parse_full_line() {
        let row = parse_circuit_line("1 - Lighting - 2.5kVA - 20A 1P").unwrap();
        assert_eq!(row.number, 1);
        assert_eq!(row.description, found("Lighting"));
        assert_eq!(row.load, found("2.5"));
        assert_eq!(row.breaker_amps, found("20"));
        assert_eq!(row.breaker_poles, found("1"));
        assert_eq!(row.confidence, 1.0);
    }

    #[test]
    fn test_parse_space_separated_line() {
        let row = parse_circuit_line("2  Receptacles  1.8  15A  1P").unwrap();
        assert_eq!(row.description, found("Receptacles"));
        assert_eq!(row.load, found("1.8"));
        assert_eq!(row.breaker_amps, found("15"));
        assert_eq!(row.breaker_poles, found("1"));
    }

    #[test]
    fn test_parse_partial_line_scores_missing_fields() {
        let row = parse_circuit_line("5 LIGHTING").unwrap();
        assert_eq!(row.description, found("LIGHTING"));
        assert!(row.load.is_missing());
        assert_eq!(row.confidence, 0.25);
        assert!(row.is_found());
    }

    #[test]
    fn test_parse_requires_description() {
        assert!(parse_circuit_line("7").is_none());
        assert!(parse_circuit_line("60A").is_none());
        assert!(parse_circuit_line("225").is_none());
        assert!(parse_circuit_line("12 - ").is_none());
        assert!(parse_circuit_line("3 20A 1P").is_none());
    }

    #[test]
    fn test_parse_rejects_non_circuit_lines() {
        assert!(parse_circuit_line("VOLTAGE: 480Y/277V").is_none());
        assert!(parse_circuit_line("480Y/277V").is_none());
        assert!(parse_circuit_line("3PH").is_none());
        assert!(parse_circuit_line("0 NOTHING").is_none());
        assert!(parse_circuit_line("99 TOO HIGH").is_none());
    }

    #[test]
    fn test_count_resolution() {
        assert_eq!(resolve_circuit_count(5, None), 18);
        assert_eq!(resolve_circuit_count(41, None), 42);
        assert_eq!(resolve_circuit_count(0, None), 18);
        assert_eq!(resolve_circuit_count(0, Some(41)), 42);
        assert_eq!(resolve_circuit_count(0, Some(100)), 84);
        assert_eq!(resolve_circuit_count(0, Some(2)), 18);
    }

    #[test]
    fn test_single_circuit_fills_to_minimum() {
        let table = build_circuit_table(&["5 LIGHTING 20A 1P"], None);
        assert_eq!(table.rows.len(), 18);
        assert_eq!(table.count, 18);
        for (i, row) in table.rows.iter().enumerate() {
            assert_eq!(row.number, i as u32 + 1);
            if row.number == 5 {
                assert_eq!(row.description, found("LIGHTING"));
            } else {
                assert_eq!(*row, CircuitRow::missing(row.number));
            }
        }
        assert_eq!(table.missing_circuits.len(), 17);
    }

    #[test]
    fn test_stray_rating_does_not_inflate_count() {
        let table = build_circuit_table(&["1 LIGHTING 20A 1P", "60A", "225"], None);
        assert_eq!(table.count, 18);
        assert_eq!(table.found_rows().map(|r| r.number).collect::<Vec<_>>(), vec![1]);
        assert_eq!(table.skipped_lines, 2);
    }

    #[test]
    fn test_duplicate_number_keeps_last_line() {
        let table = build_circuit_table(&["3 OLD", "3 NEW"], None);
        assert_eq!(table.rows[2].description, found("NEW"));
    }

    #[test]
    fn test_skipped_lines_counted() {
        let table = build_circuit_table(&["PANEL: LP-1", "1 LIGHTS", "NOTES"], Some(20));
        assert_eq!(table.skipped_lines, 2);
        assert_eq!(table.rows.len(), 20);
    }

    #[test]
    fn test_missing_serialises_as_sentinel() {
        let json = serde_json::to_value(CircuitRow::missing(4)).unwrap();
        assert_eq!(json["description"], "MISSING");
        assert_eq!(json["breaker_poles"], "MISSING");
        let back: CircuitField = serde_json::from_value(json["load"].clone()).unwrap();
        assert_eq!(back, CircuitField::Missing);
    }
}
