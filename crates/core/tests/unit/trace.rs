//! # Trace Tests
//!
//! Command mnemonics and workload-to-event conversion.

use ddrpower_core::trace::{TimeUnit, Workload};
use ddrpower_core::{CommandKind, SimError};
use rstest::rstest;

use crate::common::harness::ddr5_timing;

#[rstest]
#[case("ACT", CommandKind::Act)]
#[case("rd", CommandKind::Rd)]
#[case(" WR ", CommandKind::Wr)]
#[case("PRE", CommandKind::Pre)]
#[case("PREA", CommandKind::PreA)]
#[case("REF", CommandKind::Ref)]
#[case("REFab", CommandKind::Ref)]
#[case("REFpb", CommandKind::RefPb)]
#[case("PDN", CommandKind::PowerDownEntry)]
#[case("PUP", CommandKind::PowerDownExit)]
#[case("SR", CommandKind::SelfRefreshEntry)]
#[case("SRX", CommandKind::SelfRefreshExit)]
#[case("END", CommandKind::End)]
#[case("END_OF_SIMULATION", CommandKind::End)]
fn test_parse_mnemonic(#[case] text: &str, #[case] kind: CommandKind) {
    assert_eq!(text.parse::<CommandKind>().unwrap(), kind);
}

#[test]
fn test_mnemonic_round_trip() {
    for kind in CommandKind::ALL {
        assert_eq!(kind.mnemonic().parse::<CommandKind>().unwrap(), kind);
    }
}

#[test]
fn test_unknown_mnemonic() {
    match "NOP".parse::<CommandKind>() {
        Err(SimError::UnknownCommand(name)) => assert_eq!(name, "NOP"),
        other => panic!("expected UnknownCommand, got {other:?}"),
    }
}

#[test]
fn test_command_scope() {
    assert!(CommandKind::Act.is_bank_command());
    assert!(CommandKind::RefPb.is_bank_command());
    assert!(!CommandKind::Ref.is_bank_command());
    assert!(!CommandKind::PreA.is_bank_command());
    assert!(CommandKind::Wr.is_column_access());
    assert!(!CommandKind::Act.is_column_access());
}

#[test]
fn test_serializes_as_mnemonic() {
    assert_eq!(serde_json::to_string(&CommandKind::PreA).unwrap(), "\"PREA\"");
}

fn workload(json: &str) -> Workload {
    serde_json::from_str(json).unwrap()
}

#[test]
fn test_cycles_scaled_by_tck() {
    let w = workload(
        r#"{ "commands": [
            { "timestamp": 0, "command": "ACT", "bank": 1, "row": 3 },
            { "timestamp": 64, "command": "RD", "bank": 1, "column": 8, "burstLength": 32 }
        ] }"#,
    );
    assert_eq!(w.metadata.time_unit, TimeUnit::Cycles);
    let events = w.to_events(&ddr5_timing()).unwrap();
    assert_eq!(events.len(), 2);
    assert_eq!(events[1].time_ns, 20.0);
    assert_eq!(events[1].bank, 1);
    assert_eq!(events[1].column, Some(8));
    assert_eq!(events[1].burst_length, Some(32));
    assert_eq!(events[0].row, Some(3));
    assert_eq!(events[0].rank, 0);
}

#[test]
fn test_nanosecond_timestamps_kept() {
    let w = workload(
        r#"{ "metadata": { "timeUnit": "ns", "dataRate": 4800, "temperature": 85 },
             "commands": [ { "timestamp": 12.5, "command": "REF", "rank": 1 } ] }"#,
    );
    let events = w.to_events(&ddr5_timing()).unwrap();
    assert_eq!(events[0].time_ns, 12.5);
    assert_eq!(events[0].rank, 1);
    assert_eq!(events[0].bank, 0);
    assert_eq!(w.metadata.data_rate, 4800);
    assert_eq!(w.metadata.temperature, 85.0);
}

#[test]
fn test_bank_command_without_bank() {
    let w = workload(r#"{ "commands": [ { "timestamp": 0, "command": "PRE" } ] }"#);
    match w.to_events(&ddr5_timing()) {
        Err(SimError::MissingField { index, command, field }) => {
            assert_eq!(index, 0);
            assert_eq!(command, CommandKind::Pre);
            assert_eq!(field, "bank");
        }
        other => panic!("expected MissingField, got {other:?}"),
    }
}

#[test]
fn test_activate_without_row() {
    let w = workload(
        r#"{ "commands": [
            { "timestamp": 0, "command": "REF" },
            { "timestamp": 1, "command": "ACT", "bank": 0 }
        ] }"#,
    );
    assert!(matches!(
        w.to_events(&ddr5_timing()),
        Err(SimError::MissingField { index: 1, field: "row", .. })
    ));
}

#[test]
fn test_zero_burst_length_rejected() {
    let w = workload(
        r#"{ "commands": [
            { "timestamp": 0, "command": "ACT", "bank": 0, "row": 1 },
            { "timestamp": 50, "command": "RD", "bank": 0, "burstLength": 0 }
        ] }"#,
    );
    assert!(matches!(
        w.to_events(&ddr5_timing()),
        Err(SimError::ZeroBurstLength {
            index: 1,
            command: CommandKind::Rd
        })
    ));
}

#[test]
fn test_unknown_command_in_workload() {
    let w = workload(r#"{ "commands": [ { "timestamp": 0, "command": "MRS" } ] }"#);
    assert!(matches!(w.to_events(&ddr5_timing()), Err(SimError::UnknownCommand(_))));
}

#[test]
fn test_toggle_defaults() {
    let w = workload(r#"{ "metadata": { "toggleRates": { "read": 0.25 } } }"#);
    assert_eq!(w.metadata.toggle_rates.read, 0.25);
    assert_eq!(w.metadata.toggle_rates.write, 0.5);
    assert_eq!(w.metadata.toggle_rates.read_duty_cycle, 0.5);
    assert!(w.commands.is_empty());
}
