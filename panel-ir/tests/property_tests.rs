//! Property tests for the layout formula, gap filling, normalizers and merge

use panel_ir::assembly::phase_flags;
use panel_ir::circuits::{build_circuit_table, MAX_CIRCUITS, MIN_CIRCUITS};
use panel_ir::ir::{row_for_circuit, CircuitRecord, Side};
use panel_ir::normalize::{normalize_main_breaker, normalize_phase, PhaseValue};
use panel_ir::{CircuitDraft, MergeResolver, Scalar, TaskParameters};
use proptest::prelude::*;
use serde_json::json;

proptest! {
    #[test]
    fn prop_row_formula_and_side(n in 1u32..=84) {
        prop_assert_eq!(row_for_circuit(n), 11 + (n + 1) / 2);
        let expected = if n % 2 == 1 { Side::Odd } else { Side::Even };
        prop_assert_eq!(Side::for_circuit(n), expected);

        let [a, b, c] = phase_flags(n, 1);
        let draft = CircuitDraft::new(n, 20.0, 10.0).with_poles(1).with_phases(a, b, c);
        let record = CircuitRecord::try_new(draft).unwrap();
        prop_assert_eq!(record.excel_row(), row_for_circuit(n));
        prop_assert_eq!(record.side(), expected);
    }

    #[test]
    fn prop_phase_flags_match_poles(n in 1u32..=84, poles in 1u8..=3) {
        let flags = phase_flags(n, poles);
        prop_assert_eq!(flags.iter().filter(|f| **f).count(), poles as usize);
    }

    #[test]
    fn prop_circuit_table_has_no_holes(
        numbers in proptest::collection::vec(1u32..=84, 0..30),
        declared in proptest::option::of(0u32..200),
    ) {
        let lines: Vec<String> = numbers.iter().map(|n| format!("{n} LOAD {n} 20A 1P")).collect();
        let table = build_circuit_table(&lines, declared);

        prop_assert!(table.count % 2 == 0);
        prop_assert!((MIN_CIRCUITS..=MAX_CIRCUITS).contains(&table.count));
        prop_assert_eq!(table.rows.len(), table.count as usize);
        for (i, row) in table.rows.iter().enumerate() {
            prop_assert_eq!(row.number, i as u32 + 1);
            if !row.is_found() {
                prop_assert!(row.description.is_missing());
                prop_assert!(row.load.is_missing());
                prop_assert!(row.breaker_amps.is_missing());
                prop_assert!(row.breaker_poles.is_missing());
            }
        }
        if declared.is_none() {
            for n in &numbers {
                prop_assert!(table.rows[*n as usize - 1].is_found());
            }
        }
    }

    #[test]
    fn prop_main_breaker_idempotent(raw in "[ -~]{0,16}") {
        let once = normalize_main_breaker(&Scalar::text(raw));
        let twice = normalize_main_breaker(&Scalar::text(once.clone()));
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_phase_idempotent(raw in "[ -~Ø]{0,12}") {
        if let PhaseValue::Canonical(canonical) = normalize_phase(&Scalar::text(raw)) {
            prop_assert_eq!(
                normalize_phase(&Scalar::text(canonical)),
                PhaseValue::Canonical(canonical)
            );
        }
    }

    #[test]
    fn prop_task_id_never_overwritten(incoming in "[a-z0-9-]{1,12}") {
        let session = TaskParameters::from_value(json!({"task_id": "X"})).unwrap();
        let update = TaskParameters::from_value(json!({"task_id": incoming, "panel_name": "LP"})).unwrap();
        let outcome = MergeResolver::apply_update(&session, update);
        prop_assert_eq!(outcome.params.task_id(), Some("X"));
    }
}
