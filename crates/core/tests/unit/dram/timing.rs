//! Timing Validator Unit Tests.
//!
//! Every constraint is probed on both sides of its boundary; the boundary
//! itself is legal.

use ddrpower_core::dram::{
    BankPhase, ConstraintViolation, RankState, TimingConstraint, TimingValidator, ViolationKind,
};
use ddrpower_core::spec::{RefreshMode, TimingSpec};
use ddrpower_core::{CommandEvent, CommandKind};
use rstest::rstest;

use crate::common::harness::{act, ddr5_timing, pre, rank_cmd, rd, refpb, wr};

fn rank_after(banks: usize, timing: &TimingSpec, history: &[CommandEvent]) -> RankState {
    let mut rank = RankState::new(0, banks);
    let mut closed = Vec::new();
    for event in history {
        rank.apply(event, timing.trfc, &mut closed);
    }
    rank
}

fn check_with(timing: TimingSpec, mode: RefreshMode, history: &[CommandEvent], event: CommandEvent) -> Result<(), ConstraintViolation> {
    let rank = rank_after(8, &timing, history);
    TimingValidator::new(timing, mode).validate(&event, &rank)
}

fn check(history: &[CommandEvent], event: CommandEvent) -> Result<(), ConstraintViolation> {
    check_with(ddr5_timing(), RefreshMode::AllBank, history, event)
}

fn violated(history: &[CommandEvent], event: CommandEvent) -> TimingConstraint {
    match check(history, event) {
        Err(ConstraintViolation {
            kind: ViolationKind::Timing { constraint, .. },
            ..
        }) => constraint,
        other => panic!("expected a timing violation, got {other:?}"),
    }
}

// ══════════════════════════════════════════════════════════
// 1. Row commands
// ══════════════════════════════════════════════════════════

#[rstest]
#[case::early(53.0, false)]
#[case::exact(53.75, true)]
#[case::late(80.0, true)]
fn test_trp_boundary_inclusive(#[case] t: f64, #[case] legal: bool) {
    let history = [act(0.0, 0, 1), pre(40.0, 0)];
    let result = check(&history, act(t, 0, 2));
    assert_eq!(result.is_ok(), legal, "{result:?}");
    if !legal {
        assert_eq!(violated(&history, act(t, 0, 2)), TimingConstraint::Rp);
    }
}

#[test]
fn test_tras_rejects_early_precharge() {
    let history = [act(0.0, 0, 512)];
    match check(&history, pre(20.0, 0)) {
        Err(violation) => {
            assert_eq!(violation.time_ns, 20.0);
            assert_eq!(violation.command, CommandKind::Pre);
            assert_eq!(violation.rank, 0);
            assert_eq!(violation.bank, 0);
            assert_eq!(
                violation.kind,
                ViolationKind::Timing {
                    constraint: TimingConstraint::Ras,
                    required_ns: 32.0,
                    actual_ns: 20.0
                }
            );
            assert!(violation.to_string().contains("tRAS"));
        }
        Ok(()) => panic!("PRE at 20 ns must violate tRAS"),
    }
    assert!(check(&history, pre(32.0, 0)).is_ok());
    assert!(check(&history, pre(45.75, 0)).is_ok());
}

#[test]
fn test_trcd() {
    let history = [act(0.0, 0, 1)];
    assert_eq!(violated(&history, rd(13.0, 0)), TimingConstraint::Rcd);
    assert_eq!(violated(&history, wr(13.0, 0)), TimingConstraint::Rcd);
    assert!(check(&history, rd(13.75, 0)).is_ok());
}

#[test]
fn test_trrd() {
    let history = [act(0.0, 0, 1)];
    assert_eq!(violated(&history, act(4.0, 1, 1)), TimingConstraint::Rrd);
    assert!(check(&history, act(5.0, 1, 1)).is_ok());
}

#[test]
fn test_tfaw_fifth_activation() {
    let timing = TimingSpec {
        tfaw: 60.0,
        ..ddr5_timing()
    };
    let history = [act(0.0, 0, 0), act(5.0, 1, 0), act(10.0, 2, 0), act(15.0, 3, 0)];
    let early = check_with(timing, RefreshMode::AllBank, &history, act(20.0, 4, 0));
    assert!(matches!(
        early,
        Err(ConstraintViolation {
            kind: ViolationKind::Timing {
                constraint: TimingConstraint::Faw,
                ..
            },
            ..
        })
    ));
    assert!(check_with(timing, RefreshMode::AllBank, &history, act(60.0, 4, 0)).is_ok());
}

#[test]
fn test_trc_uses_row_cycle() {
    let history = [act(0.0, 0, 1), pre(32.0, 0)];
    assert!(check(&history, act(45.75, 0, 1)).is_ok());
}

// ══════════════════════════════════════════════════════════
// 2. Column commands
// ══════════════════════════════════════════════════════════

#[test]
fn test_twtr_read_after_write() {
    let history = [act(0.0, 0, 1), wr(14.0, 0)];
    assert_eq!(violated(&history, rd(20.0, 0)), TimingConstraint::Wtr);
    assert!(check(&history, rd(21.5, 0)).is_ok());
}

#[test]
fn test_twtr_write_after_read_on_other_bank() {
    let history = [act(0.0, 0, 1), act(5.0, 1, 1), rd(14.0, 0)];
    assert_eq!(violated(&history, wr(20.0, 1)), TimingConstraint::Wtr);
    assert!(check(&history, wr(21.5, 1)).is_ok());
}

#[test]
fn test_twr_before_precharge() {
    let history = [act(0.0, 0, 1), wr(14.0, 0)];
    assert_eq!(violated(&history, pre(40.0, 0)), TimingConstraint::Wr);
    assert!(check(&history, pre(44.0, 0)).is_ok());
}

#[test]
fn test_precharge_all_checks_open_banks() {
    let history = [act(0.0, 0, 1), act(10.0, 1, 1)];
    assert_eq!(
        violated(&history, rank_cmd(35.0, CommandKind::PreA)),
        TimingConstraint::Ras
    );
    assert!(check(&history, rank_cmd(42.0, CommandKind::PreA)).is_ok());
}

#[test]
fn test_row_mismatch() {
    let history = [act(0.0, 0, 5)];
    let event = rd(20.0, 0).with_row(6);
    assert_eq!(
        check(&history, event).map_err(|v| v.kind),
        Err(ViolationKind::RowMismatch {
            open_row: Some(5),
            requested_row: 6
        })
    );
    assert!(check(&history, rd(20.0, 0).with_row(5)).is_ok());
}

// ══════════════════════════════════════════════════════════
// 3. State legality
// ══════════════════════════════════════════════════════════

#[test]
fn test_read_on_closed_bank() {
    assert_eq!(
        check(&[], rd(10.0, 0)).map_err(|v| v.kind),
        Err(ViolationKind::IllegalState {
            bank: 0,
            phase: BankPhase::Precharged
        })
    );
}

#[test]
fn test_activate_on_open_bank() {
    let history = [act(0.0, 0, 1)];
    assert!(matches!(
        check(&history, act(100.0, 0, 2)).map_err(|v| v.kind),
        Err(ViolationKind::IllegalState {
            phase: BankPhase::Active,
            ..
        })
    ));
}

#[test]
fn test_self_refresh_entry_requires_all_precharged() {
    let history = [act(0.0, 1, 1)];
    assert_eq!(
        check(&history, rank_cmd(100.0, CommandKind::SelfRefreshEntry)).map_err(|v| v.kind),
        Err(ViolationKind::IllegalState {
            bank: 1,
            phase: BankPhase::Active
        })
    );
}

#[test]
fn test_power_down_exit_requires_power_down() {
    assert!(matches!(
        check(&[], rank_cmd(10.0, CommandKind::PowerDownExit)).map_err(|v| v.kind),
        Err(ViolationKind::IllegalState { .. })
    ));
}

#[test]
fn test_end_always_legal() {
    let history = [act(0.0, 0, 1), rank_cmd(40.0, CommandKind::PowerDownEntry)];
    assert!(check(&history, CommandEvent::end(41.0)).is_ok());
}

// ══════════════════════════════════════════════════════════
// 4. Refresh and exit latencies
// ══════════════════════════════════════════════════════════

#[test]
fn test_command_during_refresh_violates_trfc() {
    let history = [rank_cmd(0.0, CommandKind::Ref)];
    match check(&history, act(100.0, 0, 1)).map_err(|v| v.kind) {
        Err(ViolationKind::Timing {
            constraint,
            required_ns,
            actual_ns,
        }) => {
            assert_eq!(constraint, TimingConstraint::Rfc);
            assert_eq!(required_ns, 295.0);
            assert_eq!(actual_ns, 100.0);
        }
        other => panic!("expected tRFC violation, got {other:?}"),
    }
}

#[test]
fn test_refresh_mode_mismatch() {
    assert_eq!(
        check(&[], refpb(0.0, 0)).map_err(|v| v.kind),
        Err(ViolationKind::RefreshModeMismatch {
            mode: RefreshMode::AllBank
        })
    );
    let timing = TimingSpec {
        trfcpb: Some(147.5),
        ..ddr5_timing()
    };
    assert_eq!(
        check_with(timing, RefreshMode::PerBank, &[], rank_cmd(0.0, CommandKind::Ref)).map_err(|v| v.kind),
        Err(ViolationKind::RefreshModeMismatch {
            mode: RefreshMode::PerBank
        })
    );
    assert!(check_with(timing, RefreshMode::PerBank, &[], refpb(0.0, 3)).is_ok());
}

#[test]
fn test_txp_after_power_down_exit() {
    let history = [
        rank_cmd(0.0, CommandKind::PowerDownEntry),
        rank_cmd(10.0, CommandKind::PowerDownExit),
    ];
    assert_eq!(violated(&history, act(15.0, 0, 1)), TimingConstraint::Xp);
    assert!(check(&history, act(17.5, 0, 1)).is_ok());
}

#[test]
fn test_row_mismatch_outranks_exit_delay() {
    let history = [
        act(0.0, 0, 1),
        rank_cmd(50.0, CommandKind::PowerDownEntry),
        rank_cmd(60.0, CommandKind::PowerDownExit),
    ];
    assert_eq!(
        check(&history, rd(61.0, 0).with_row(2)).map_err(|v| v.kind),
        Err(ViolationKind::RowMismatch {
            open_row: Some(1),
            requested_row: 2
        })
    );
    assert_eq!(violated(&history, rd(61.0, 0).with_row(1)), TimingConstraint::Xp);
}

#[test]
fn test_self_refresh_exit_latencies() {
    let history = [
        rank_cmd(0.0, CommandKind::SelfRefreshEntry),
        rank_cmd(1000.0, CommandKind::SelfRefreshExit),
    ];
    assert_eq!(violated(&history, act(1200.0, 0, 1)), TimingConstraint::Xsdr);
    assert!(check(&history, act(1305.0, 0, 1)).is_ok());

    let opened = [history[0], history[1], act(1305.0, 0, 1)];
    assert_eq!(violated(&opened, rd(1320.0, 0)), TimingConstraint::Xsdll);
    assert!(check(&opened, rd(1400.0, 0)).is_ok());
}

#[test]
fn test_timing_only_classification() {
    let ras = ViolationKind::Timing {
        constraint: TimingConstraint::Ras,
        required_ns: 32.0,
        actual_ns: 1.0,
    };
    let rfc = ViolationKind::Timing {
        constraint: TimingConstraint::Rfc,
        required_ns: 295.0,
        actual_ns: 1.0,
    };
    assert!(ras.is_timing_only());
    assert!(!rfc.is_timing_only());
    assert!(
        !ViolationKind::IllegalState {
            bank: 0,
            phase: BankPhase::Active
        }
        .is_timing_only()
    );
}
