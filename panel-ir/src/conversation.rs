//! Parameter extraction from conversational text
//!
//! Pattern-based recognisers for typed or transcribed commands such as
//! `"480/277V 3 phase 4 wire, main bus 400A, MLO, surface mount"` and
//! `"circuits 1,3,5 are for lighting 2 pole 20A breaker phase amps 16"`.
//! Results are plain values that convert into a [`TaskParameters`] update
//! for the merge resolver.

use crate::merge::TaskParameters;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::debug;

fn compile(pattern: &str) -> Regex {
    Regex::new(pattern).expect("static regex")
}

static VOLTAGE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b(\d+(?:\s*y?\s*/\s*\d+)?)\s*v(?:olts?|oltage|ac)?\b"));
static PHASE: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)(?:\bphase\s*(?:is|:)?\s*(\d+|single|three|one)\b|\b(\d+|single|three|one)[\s-]*phase)")
});
static WIRE: Lazy<Regex> = Lazy::new(|| compile(r"(?i)(?:\bwire\s*(?:is|:)?\s*(\d+)|\b(\d+)\s*w(?:ire)?\b)"));
static BUS_AMPS: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)(?:main\s+bus(?:\s+amp(?:s|eres?)?)?|bus\s+amp(?:s|eres?)?)[\s:]+(\d+)")
});
static MLO: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\bmlo\b|main\s+lugs?\s+only"));
static MAIN_BREAKER: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b(?:main\s+breaker|breaker|mcb)[\s:]*([A-Z0-9/]+)"));
static MOUNTING: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b(flush|surface|recess(?:ed)?)\s*[\s-]?mount"));
static FED_FROM: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b(?:feed|fed)\s+from[\s:]*([A-Z0-9][A-Z0-9 \-]*)"));
static LOCATION: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b(?:location|located\s+(?:in|at))[\s:]*([^,.]+)"));

static CIRCUIT_NUMBERS: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(?:circuit|ckt)s?\s+(\d+(?:\s*(?:,|and|&)\s*\d+)*)")
});
static DESCRIPTION: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)\b(?:is|are)\s+(?:for\s+)?([^,]+?)(?:\s+(?:and\s+)?(?:is|are)\s+|\s+with\s+|\s+\d+[\s-]*pole|\s+\d+\s*a(?:mps?)?\b|\s*,|\s*$)")
});
static POLES: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b([123])[\s-]*p(?:oles?)?\b"));
static BREAKER_AMPS: Lazy<Regex> = Lazy::new(|| compile(r"(?i)\b(\d+)\s*a(?:mps?)?\b"));
static PHASE_AMPS: Lazy<Regex> = Lazy::new(|| {
    compile(r"(?i)(?:phase\s+amps?(?:\s+is)?\s+|per\s+phase\s+)(\d+(?:\.\d+)?)")
});
static NUMBER: Lazy<Regex> = Lazy::new(|| compile(r"\d+"));

/// Header values keyed by `panel_specs` key
pub type SpecValues = BTreeMap<String, String>;

/// Recognise panel header values in free text
///
/// Only keys that were actually mentioned are returned.
pub fn extract_panel_specs_from_text(text: &str) -> SpecValues {
    let mut specs = SpecValues::new();

    if let Some(c) = VOLTAGE.captures(text) {
        let digits: String = c[1].chars().filter(|ch| !ch.is_whitespace()).collect();
        specs.insert("voltage".into(), format!("{}V", digits.to_uppercase()));
    }

    if let Some(c) = PHASE.captures(text) {
        let raw = c.get(1).or_else(|| c.get(2)).map_or("", |m| m.as_str()).to_lowercase();
        let phase = match raw.as_str() {
            "three" | "3" => "3".to_string(),
            "single" | "one" | "1" => "1".to_string(),
            other => other.to_string(),
        };
        specs.insert("phase".into(), phase);
    }

    if let Some(c) = WIRE.captures(text) {
        if let Some(m) = c.get(1).or_else(|| c.get(2)) {
            specs.insert("wire".into(), format!("{}W", m.as_str()));
        }
    }

    if let Some(c) = BUS_AMPS.captures(text) {
        specs.insert("main_bus_amps".into(), c[1].to_string());
    }

    if MLO.is_match(text) {
        specs.insert("main_breaker".into(), "MLO".into());
    } else if let Some(c) = MAIN_BREAKER.captures(text) {
        specs.insert("main_breaker".into(), c[1].to_uppercase());
    }

    if let Some(c) = MOUNTING.captures(text) {
        let mounting = c[1].to_uppercase();
        let mounting = if mounting.starts_with("RECESS") {
            "RECESSED".to_string()
        } else {
            mounting
        };
        specs.insert("mounting".into(), mounting);
    }

    if let Some(c) = FED_FROM.captures(text) {
        specs.insert("fed_from".into(), c[1].trim().to_uppercase());
    }

    if let Some(c) = LOCATION.captures(text) {
        let location = c[1].trim();
        if !location.is_empty() {
            specs.insert("location".into(), location.to_uppercase());
        }
    }

    debug!(fields = specs.len(), "Panel specs recognised from text");
    specs
}

/// `panel_specs` update for the merge resolver
pub fn panel_specs_update(specs: &SpecValues) -> TaskParameters {
    let mut update = TaskParameters::new();
    for (key, value) in specs {
        update.set_panel_spec(key, value.clone());
    }
    update
}

/// Circuit values recognised in one utterance
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CircuitUpdate {
    /// Circuits the utterance applies to
    pub circuit_numbers: Vec<u32>,
    pub description: Option<String>,
    pub poles: Option<u8>,
    pub breaker_amps: Option<f64>,
    /// Per-phase load current
    pub phase_amps: Option<f64>,
}

impl CircuitUpdate {
    /// `circuits` update for the merge resolver, one entry per circuit number
    pub fn to_parameters(&self) -> TaskParameters {
        let mut fields = Map::new();
        if let Some(description) = &self.description {
            fields.insert("description".into(), Value::from(description.clone()));
        }
        if let Some(poles) = self.poles {
            fields.insert("poles".into(), Value::from(poles));
        }
        if let Some(amps) = self.breaker_amps {
            fields.insert("breaker_amps".into(), Value::from(amps));
        }
        if let Some(amps) = self.phase_amps {
            fields.insert("phase_amps".into(), Value::from(amps));
        }

        let mut update = TaskParameters::new();
        for &number in &self.circuit_numbers {
            update.set_circuit(number, fields.clone());
        }
        update
    }
}

/// Recognise circuit values in free text
///
/// Returns `None` unless the text names at least one circuit number.
pub fn extract_circuit_from_text(text: &str) -> Option<CircuitUpdate> {
    let numbers = CIRCUIT_NUMBERS.captures(text)?;
    let numbers_match = numbers.get(1)?;
    let circuit_numbers: Vec<u32> = NUMBER
        .find_iter(numbers_match.as_str())
        .filter_map(|m| m.as_str().parse().ok())
        .collect();
    if circuit_numbers.is_empty() {
        return None;
    }

    // Values are read after the circuit list so its numbers are not mistaken
    // for ratings.
    let rest = &text[numbers_match.end()..];

    let update = CircuitUpdate {
        circuit_numbers,
        description: DESCRIPTION
            .captures(rest)
            .map(|c| c[1].trim().to_uppercase())
            .filter(|d| !d.is_empty()),
        poles: POLES.captures(rest).and_then(|c| c[1].parse().ok()),
        breaker_amps: BREAKER_AMPS.captures(rest).and_then(|c| c[1].parse().ok()),
        phase_amps: PHASE_AMPS.captures(rest).and_then(|c| c[1].parse().ok()),
    };

    debug!(
        circuits = ?update.circuit_numbers,
        breaker = ?update.breaker_amps,
        "Circuit values recognised from text"
    );
    Some(update)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Scalar;

    #[test]
    fn test_panel_specs_sentence() {
        let specs = extract_panel_specs_from_text(
            "480/277V 3 phase 4 wire, main bus 400A, MLO, surface mount, fed from MDP-1, located in room 101",
        );
        assert_eq!(specs["voltage"], "480/277V");
        assert_eq!(specs["phase"], "3");
        assert_eq!(specs["wire"], "4W");
        assert_eq!(specs["main_bus_amps"], "400");
        assert_eq!(specs["main_breaker"], "MLO");
        assert_eq!(specs["mounting"], "SURFACE");
        assert_eq!(specs["fed_from"], "MDP-1");
        assert_eq!(specs["location"], "ROOM 101");
    }

    #[test]
    fn test_phase_words() {
        assert_eq!(extract_panel_specs_from_text("single phase")["phase"], "1");
        assert_eq!(extract_panel_specs_from_text("phase is three")["phase"], "3");
    }

    #[test]
    fn test_breaker_rating() {
        let specs = extract_panel_specs_from_text("main breaker 225A");
        assert_eq!(specs["main_breaker"], "225A");
    }

    #[test]
    fn test_unrelated_text_yields_nothing() {
        assert!(extract_panel_specs_from_text("hello there").is_empty());
        assert!(extract_circuit_from_text("hello there").is_none());
    }

    #[test]
    fn test_circuit_sentence() {
        let update =
            extract_circuit_from_text("circuits 1,3,5 are for lighting 2 pole 20A breaker phase amps 16").unwrap();
        assert_eq!(update.circuit_numbers, vec![1, 3, 5]);
        assert_eq!(update.description.as_deref(), Some("LIGHTING"));
        assert_eq!(update.poles, Some(2));
        assert_eq!(update.breaker_amps, Some(20.0));
        assert_eq!(update.phase_amps, Some(16.0));
    }

    #[test]
    fn test_circuit_list_numbers_not_read_as_ratings() {
        let update = extract_circuit_from_text("circuit 5 is for receptacles").unwrap();
        assert_eq!(update.circuit_numbers, vec![5]);
        assert_eq!(update.description.as_deref(), Some("RECEPTACLES"));
        assert_eq!(update.breaker_amps, None);
        assert_eq!(update.poles, None);
    }

    #[test]
    fn test_updates_convert_to_parameters() {
        let specs = extract_panel_specs_from_text("208/120V single phase");
        let params = panel_specs_update(&specs);
        assert_eq!(params.panel_spec("voltage"), Scalar::text("208/120V"));

        let circuits = extract_circuit_from_text("ckt 2 and 4 are for heaters 30A").unwrap().to_parameters();
        let map = circuits.circuits().unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map["4"]["breaker_amps"], serde_json::json!(30.0));
        assert_eq!(map["2"]["description"], serde_json::json!("HEATERS"));
    }
}
