//! Preflight analysis of a validated schedule
//!
//! Deterministic engineering checks run before a schedule is handed to a
//! renderer: system topology, per-phase loading and balance, and the main
//! breaker against the bus rating. The result carries a plain-text summary
//! for human review.

use crate::ir::ScheduleIR;
use crate::normalize::{normalize_main_breaker, parse_voltage, MAIN_LUG_ONLY, SINGLE_PHASE, THREE_PHASE};
use crate::schema::LeftField;
use crate::value::{format_number, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt::Write;
use tracing::{info, warn};

/// Largest acceptable deviation of one phase from the mean, in percent
pub const MAX_IMBALANCE_PERCENT: f64 = 20.0;

/// Split-phase when line-to-line is within this many volts of twice line-to-neutral
const SPLIT_PHASE_TOLERANCE_V: f64 = 3.0;

/// Distribution system inferred from the header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemTopology {
    SinglePhaseTwoWire,
    SplitPhase,
    WyeGrounded,
    Delta,
    ThreePhaseUnspecified,
    Unknown,
}

impl SystemTopology {
    pub fn describe(self) -> &'static str {
        match self {
            SystemTopology::SinglePhaseTwoWire => "SINGLE-PHASE, 2-WIRE",
            SystemTopology::SplitPhase => "SINGLE-PHASE, 3-WIRE (SPLIT-PHASE)",
            SystemTopology::WyeGrounded => "3PH WYE, GROUNDED",
            SystemTopology::Delta => "3PH DELTA (LIKELY UNGROUNDED)",
            SystemTopology::ThreePhaseUnspecified => "3PH (UNSPECIFIED TOPOLOGY)",
            SystemTopology::Unknown => "UNKNOWN",
        }
    }
}

/// Infer the system topology
///
/// # Arguments
/// * `phase` - Canonical phase text (`1PH` / `3PH`)
/// * `wire` - WIRE header value, e.g. `4W+G`
/// * `line_to_line`, `line_to_neutral` - Parsed voltage pair
pub fn infer_topology(
    phase: &str,
    wire: &str,
    line_to_line: Option<f64>,
    line_to_neutral: Option<f64>,
) -> SystemTopology {
    let wire = wire.to_uppercase();
    match phase {
        SINGLE_PHASE => {
            let split_by_voltage = matches!(
                (line_to_line, line_to_neutral),
                (Some(ll), Some(ln)) if (ll - 2.0 * ln).abs() < SPLIT_PHASE_TOLERANCE_V
            );
            if wire.contains("3W") || split_by_voltage {
                SystemTopology::SplitPhase
            } else {
                SystemTopology::SinglePhaseTwoWire
            }
        }
        THREE_PHASE => {
            if wire.contains("4W") || line_to_neutral.is_some() {
                SystemTopology::WyeGrounded
            } else if wire.contains("3W") {
                SystemTopology::Delta
            } else {
                SystemTopology::ThreePhaseUnspecified
            }
        }
        _ => SystemTopology::Unknown,
    }
}

/// Connected load per phase in amps
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseLoads {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl PhaseLoads {
    /// Sum each circuit's load onto every phase it is energized on
    pub fn from_ir(ir: &ScheduleIR) -> Self {
        let mut totals = [0.0; 3];
        for circuit in ir.circuits() {
            for (total, on) in totals.iter_mut().zip(circuit.phases()) {
                if on {
                    *total += circuit.load_amps();
                }
            }
        }
        let [a, b, c] = totals;
        Self { a, b, c }
    }

    pub fn as_array(&self) -> [f64; 3] {
        [self.a, self.b, self.c]
    }

    /// Largest deviation from the mean as a percentage of the mean
    ///
    /// `None` when there is no load at all.
    pub fn imbalance_percent(&self) -> Option<f64> {
        let loads = self.as_array();
        let avg = loads.iter().sum::<f64>() / 3.0;
        if avg <= 0.0 {
            return None;
        }
        let worst = loads.iter().map(|l| (l - avg).abs()).fold(0.0, f64::max);
        Some(worst / avg * 100.0)
    }
}

/// Apparent power per phase in kVA for a topology
///
/// Wye and split-phase legs use line-to-neutral voltage, delta uses the
/// line-to-line share, single-phase 2-wire uses whichever voltage is known.
/// `None` when the needed voltage is unknown.
pub fn phase_kva(
    topology: SystemTopology,
    loads: &PhaseLoads,
    line_to_line: Option<f64>,
    line_to_neutral: Option<f64>,
) -> Option<[f64; 3]> {
    let per_phase = |volts: f64, divisor: f64| loads.as_array().map(|amps| amps * volts / divisor);
    let delta_divisor = 1000.0 * 3f64.sqrt();

    match topology {
        SystemTopology::WyeGrounded | SystemTopology::SplitPhase => {
            line_to_neutral.map(|v| per_phase(v, 1000.0))
        }
        SystemTopology::Delta => line_to_line.map(|v| per_phase(v, delta_divisor)),
        SystemTopology::ThreePhaseUnspecified => line_to_neutral
            .map(|v| per_phase(v, 1000.0))
            .or_else(|| line_to_line.map(|v| per_phase(v, delta_divisor))),
        SystemTopology::SinglePhaseTwoWire | SystemTopology::Unknown => {
            line_to_line.or(line_to_neutral).map(|v| per_phase(v, 1000.0))
        }
    }
}

/// Result of preflight analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreflightReport {
    pub panel_name: String,
    pub system: SystemTopology,
    pub line_voltage: Option<f64>,
    pub phase_voltage: Option<f64>,
    /// Three-phase panels are expected to be balanced
    pub balance_expected: bool,
    pub phase_loads: PhaseLoads,
    pub imbalance_percent: Option<f64>,
    pub phase_kva: Option<[f64; 3]>,
    pub main_bus_amps: Option<f64>,
    /// `None` for main-lug-only panels
    pub main_breaker_amps: Option<f64>,
    pub warnings: Vec<String>,
}

fn header_text(value: &Scalar) -> String {
    value.as_text().unwrap_or_default().trim().to_uppercase()
}

fn leading_number(text: &str) -> Option<f64> {
    let digits: String = text
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    digits.parse().ok()
}

/// Analyse a validated schedule
pub fn run_preflight(ir: &ScheduleIR) -> PreflightReport {
    let header = ir.header();
    let phase = header_text(header.left(LeftField::Phase));
    let wire = header_text(header.left(LeftField::Wire));
    let voltage = parse_voltage(&header_text(header.left(LeftField::Voltage)));

    let system = infer_topology(
        &phase,
        &wire,
        voltage.line_to_line,
        voltage.line_to_neutral,
    );

    let phase_loads = PhaseLoads::from_ir(ir);
    let imbalance_percent = phase_loads.imbalance_percent();
    let balance_expected = phase == THREE_PHASE;

    let main_bus_amps = leading_number(&header_text(header.left(LeftField::MainBusAmps)));
    let mcb = normalize_main_breaker(header.left(LeftField::MainCircuitBreaker));
    let main_breaker_amps = if mcb == MAIN_LUG_ONLY {
        None
    } else {
        leading_number(&mcb)
    };

    let mut warnings = Vec::new();
    if voltage.is_unknown() {
        warnings.push("VOLTAGE could not be parsed".to_string());
    }
    if let (Some(mcb), Some(bus)) = (main_breaker_amps, main_bus_amps) {
        if mcb > bus {
            warnings.push(format!(
                "MAIN CIRCUIT BREAKER {}A exceeds MAIN BUS AMPS {}A",
                format_number(mcb),
                format_number(bus)
            ));
        }
    }
    if let Some(bus) = main_bus_amps {
        for (name, load) in ["A", "B", "C"].iter().zip(phase_loads.as_array()) {
            if load > bus {
                warnings.push(format!(
                    "Phase {} load {:.1}A exceeds MAIN BUS AMPS {}A",
                    name,
                    load,
                    format_number(bus)
                ));
            }
        }
    }
    if balance_expected {
        if let Some(pct) = imbalance_percent.filter(|p| *p > MAX_IMBALANCE_PERCENT) {
            warnings.push(format!(
                "Phase imbalance {:.1}% exceeds {}%",
                pct,
                format_number(MAX_IMBALANCE_PERCENT)
            ));
        }
    }

    for warning in &warnings {
        warn!(panel = header.panel_name(), warning = %warning, "Preflight warning");
    }
    info!(
        panel = header.panel_name(),
        system = system.describe(),
        warnings = warnings.len(),
        "Preflight complete"
    );

    PreflightReport {
        panel_name: header.panel_name().to_string(),
        system,
        line_voltage: voltage.line_to_line,
        phase_voltage: voltage.line_to_neutral,
        balance_expected,
        phase_kva: phase_kva(system, &phase_loads, voltage.line_to_line, voltage.line_to_neutral),
        phase_loads,
        imbalance_percent,
        main_bus_amps,
        main_breaker_amps,
        warnings,
    }
}

impl PreflightReport {
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Plain-text summary for human review
    pub fn summary(&self, ir: &ScheduleIR) -> String {
        let mut out = String::new();
        let volts = |v: Option<f64>| v.map_or_else(|| "?".to_string(), format_number);

        let _ = writeln!(out, "PANEL SCHEDULE: {}", self.panel_name);
        let _ = writeln!(out, "SYSTEM: {}", self.system.describe());
        let _ = writeln!(
            out,
            "VOLTAGE: {} V line-to-line, {} V line-to-neutral",
            volts(self.line_voltage),
            volts(self.phase_voltage)
        );
        let _ = writeln!(
            out,
            "PHASE LOADS: A {:.1}A, B {:.1}A, C {:.1}A",
            self.phase_loads.a, self.phase_loads.b, self.phase_loads.c
        );
        if let Some(pct) = self.imbalance_percent {
            let _ = writeln!(out, "IMBALANCE: {:.1}%", pct);
        }
        if let Some([a, b, c]) = self.phase_kva {
            let _ = writeln!(out, "KVA: A {:.2}, B {:.2}, C {:.2}, TOTAL {:.2}", a, b, c, a + b + c);
        }

        let _ = writeln!(out, "CIRCUITS ({} total):", ir.circuits().len());
        let mut circuits: Vec<_> = ir.circuits().iter().collect();
        circuits.sort_by_key(|c| c.ckt());
        for c in circuits {
            let phases: String = ['A', 'B', 'C']
                .iter()
                .zip(c.phases())
                .filter(|(_, on)| *on)
                .map(|(p, _)| *p)
                .collect();
            let _ = writeln!(
                out,
                "CKT {:>2}: {:<40} | Breaker: {}A | Load: {}A | Poles: {} | Phase(s): {}",
                c.ckt(),
                c.description().unwrap_or("NO DESCRIPTION"),
                format_number(c.breaker_amps()),
                format_number(c.load_amps()),
                c.poles().map_or_else(|| "?".to_string(), |p| p.to_string()),
                if phases.is_empty() { "NONE".to_string() } else { phases }
            );
        }

        if self.warnings.is_empty() {
            out.push_str("WARNINGS: none\n");
        } else {
            out.push_str("WARNINGS:\n");
            for warning in &self.warnings {
                let _ = writeln!(out, "- {}", warning);
            }
        }
        out
    }
}
