//! Default field table for panel header extraction

use once_cell::sync::Lazy;
use regex::Regex;

/// Field name of the panel designation
pub const PANEL_NAME: &str = "panel_name";
/// Field name of the voltage rating
pub const VOLTAGE: &str = "voltage";

/// Fields whose absence always forces manual review
pub const CRITICAL_FIELDS: [&str; 2] = [PANEL_NAME, VOLTAGE];

/// What to look for when extracting one field
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub name: String,
    /// Structured `label: value` matcher confined to one line; the first
    /// capture group that took part in the match is the value
    pub pattern: Option<Regex>,
    /// Human-readable label spellings, most specific first
    pub variants: Vec<String>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, pattern: Option<Regex>, variants: &[&str]) -> Self {
        Self {
            name: name.into(),
            pattern,
            variants: variants.iter().map(|v| v.to_uppercase()).collect(),
        }
    }
}

fn compile(pattern: &str) -> Option<Regex> {
    Some(Regex::new(pattern).expect("static regex"))
}

/// Header fields in extraction order
///
/// Field names match the `panel_specs` keys used by the merge resolver.
pub fn default_field_specs() -> Vec<FieldSpec> {
    vec![
        FieldSpec::new(
            PANEL_NAME,
            compile(r"(?i)\b(?:panel[ \t]*(?:name|id|designation)|panelboard|panel)[ \t]*[:#][ \t]*([A-Z0-9][A-Z0-9\-]*)"),
            &["PANEL NAME", "PANEL", "PANELBOARD", "PANEL ID"],
        ),
        FieldSpec::new(
            VOLTAGE,
            compile(r"(?i)\b(?:voltage|volts?)[ \t]*:?[ \t]*(\d+[ \t]*Y?(?:[ \t]*[/-][ \t]*\d+)?[ \t]*(?:V(?:AC)?)?)"),
            &["VOLTAGE", "VOLT"],
        ),
        FieldSpec::new(
            "phase",
            compile(r"(?i)\bphases?[ \t]*:?[ \t]*([13])(?:[ \t]*(?:PH|Ø))?"),
            &["PHASE", "PHASES"],
        ),
        FieldSpec::new(
            "wire",
            compile(r"(?i)\bwires?[ \t]*:?[ \t]*(\d+[ \t]*W?(?:[ \t]*\+[ \t]*G)?)"),
            &["WIRE", "WIRES"],
        ),
        FieldSpec::new(
            "main_bus_amps",
            compile(r"(?i)\b(?:main[ \t]*bus[ \t]*amps?|bus[ \t]*amps?|main[ \t]*amps?|bus[ \t]*rating)[ \t]*:?[ \t]*(\d+)"),
            &["MAIN BUS AMPS", "BUS AMPS", "MAIN AMPS", "BUS RATING"],
        ),
        FieldSpec::new(
            "main_breaker",
            compile(r"(?im)\b(?:main[ \t]*(?:circuit[ \t]*)?breaker|mcb)[ \t]*:?[ \t]*([A-Z0-9][A-Z0-9 \-/]*?)[ \t]*$"),
            &["MAIN CIRCUIT BREAKER", "MAIN BREAKER", "MCB"],
        ),
        FieldSpec::new(
            "mounting",
            compile(r"(?i)\bmount(?:ing)?\b[ \t]*:?[ \t]*([A-Z]+)\b|\b(surface|flush|recess(?:ed)?)[ \t\-]*mount(?:ed|ing)?\b"),
            &["MOUNTING", "MOUNT"],
        ),
        FieldSpec::new("feed", compile(r"(?im)^[ \t]*feed[ \t]*:[ \t]*(\S.*?)[ \t]*$"), &["FEED"]),
        FieldSpec::new(
            "fed_from",
            compile(r"(?im)\b(?:fed|feed)[ \t]*from[ \t]*:?[ \t]*(\S.*?)[ \t]*$"),
            &["FED FROM", "FEED FROM"],
        ),
        FieldSpec::new(
            "location",
            compile(r"(?im)\b(?:location|loc)\b[ \t]*:?[ \t]*(\S.*?)[ \t]*$"),
            &["LOCATION", "LOC"],
        ),
    ]
}

static DECLARED_COUNT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:number[ \t]*of[ \t]*(?:circuits?|ckts?|spaces?)|circuits|ckts)[ \t]*:[ \t]*(\d{1,3})\b")
        .expect("static regex")
});

/// Circuit count stated in the text, e.g. `NUMBER OF CIRCUITS: 42`
pub fn declared_circuit_count<S: AsRef<str>>(lines: &[S]) -> Option<u32> {
    lines
        .iter()
        .find_map(|line| DECLARED_COUNT.captures(line.as_ref()))
        .and_then(|c| c[1].parse().ok())
}
