//! File Loading Unit Tests.

use std::fs;
use std::path::PathBuf;

use ddrpower_core::common::SpecError;
use ddrpower_core::config::ViolationPolicy;
use ddrpower_core::sim::{loader, simulate};
use ddrpower_core::{CommandKind, SimError};
use tempfile::TempDir;

const SPEC: &str = r#"{
    "mempowerspec": {
        "idd0": 51.0, "idd2n": 35.0, "idd2p": 25.0, "idd3n": 46.0, "idd3p": 30.0,
        "idd4r": 146.0, "idd4w": 120.0, "idd5b": 80.0, "idd6": 12.0,
        "vdd": 1.1, "vddq": 1.1, "vddca": 1.1
    },
    "memtimingspec": {
        "tck": 0.3125, "tras": 32.0, "trp": 13.75, "trcd": 13.75, "trfc": 295.0,
        "trefi": 7812.5
    },
    "architecture": { "nbrOfBanks": 4 }
}"#;

const WORKLOAD: &str = r#"{
    "metadata": { "dataRate": 6400, "temperature": 50.0 },
    "commands": [
        { "timestamp": 0, "command": "ACT", "bank": 0, "row": 512 },
        { "timestamp": 146.4, "command": "PRE", "bank": 0 },
        { "timestamp": 320, "command": "END_OF_SIMULATION" }
    ]
}"#;

fn write(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, contents).unwrap();
    path
}

#[test]
fn test_load_spec_and_workload() {
    let dir = TempDir::new().unwrap();
    let spec = loader::load_spec(write(&dir, "spec.json", SPEC)).unwrap();
    assert_eq!(spec.architecture.nbr_of_banks, 4);
    assert_eq!(spec.timing.trefi, 7812.5);

    let workload = loader::load_workload(write(&dir, "trace.json", WORKLOAD)).unwrap();
    assert_eq!(workload.commands.len(), 3);
    let events = workload.to_events(&spec.timing).unwrap();
    // 146.4 cycles × 0.3125 ns
    assert!((events[1].time_ns - 45.75).abs() < 1e-9);
    assert_eq!(events[2].kind, CommandKind::End);
}

#[test]
fn test_files_replay_end_to_end() {
    let dir = TempDir::new().unwrap();
    let spec = loader::load_spec(write(&dir, "spec.json", SPEC)).unwrap();
    let workload = loader::load_workload(write(&dir, "trace.json", WORKLOAD)).unwrap();
    let config = loader::load_config(write(&dir, "config.json", r#"{ "violation_policy": "Collect" }"#)).unwrap();
    assert_eq!(config.violation_policy, ViolationPolicy::Collect);

    let report = simulate(&spec, &workload, config).unwrap();
    assert_eq!(report.simulation_time_ns, 100.0);
    assert!(report.is_clean());
    assert!(report.energy.act > 0.0);
    assert!(report.energy.pre > 0.0);
}

#[test]
fn test_missing_file() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("absent.json");
    match loader::load_spec(&missing) {
        Err(SimError::Io { path, .. }) => assert_eq!(path, missing),
        other => panic!("expected an I/O error, got {other:?}"),
    }
}

#[test]
fn test_parse_error_names_file() {
    let dir = TempDir::new().unwrap();
    let path = write(&dir, "broken.json", "{ \"commands\": [ ");
    let err = loader::load_workload(&path).unwrap_err();
    assert!(matches!(err, SimError::Parse { .. }));
    assert!(err.to_string().contains(&path.display().to_string()), "{err}");
}

#[test]
fn test_invalid_spec_rejected_on_load() {
    let dir = TempDir::new().unwrap();
    let zero_clock = SPEC.replace("\"tck\": 0.3125", "\"tck\": 0.0");
    assert!(matches!(
        loader::load_spec(write(&dir, "spec.json", &zero_clock)),
        Err(SimError::Spec(SpecError::NonPositive { field: "tck", .. }))
    ));
}

#[test]
fn test_parse_from_strings() {
    assert!(loader::parse_spec(SPEC).is_ok());
    assert!(matches!(
        loader::parse_workload("42"),
        Err(SimError::Parse { what, .. }) if what == "workload"
    ));
}

#[test]
fn test_unknown_command_in_file() {
    let dir = TempDir::new().unwrap();
    let spec = loader::load_spec(write(&dir, "spec.json", SPEC)).unwrap();
    let workload = loader::load_workload(write(
        &dir,
        "trace.json",
        r#"{ "commands": [ { "timestamp": 0, "command": "NOP" } ] }"#,
    ))
    .unwrap();
    assert!(matches!(
        workload.to_events(&spec.timing),
        Err(SimError::UnknownCommand(name)) if name == "NOP"
    ));
}

#[test]
fn test_config_file_defaults() {
    let dir = TempDir::new().unwrap();
    let config = loader::load_config(write(&dir, "config.json", "{}")).unwrap();
    assert_eq!(config.violation_policy, ViolationPolicy::Fatal);
    assert!(!config.record_energy_log);
}
