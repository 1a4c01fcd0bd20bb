//! Bank/Rank State Machine Unit Tests.
//!
//! Verifies the (phase, command) transition table and the bookkeeping a
//! rank performs when a validated command is applied.

use ddrpower_core::dram::{BankPhase, ClosedDwell, RankPowerStatus, RankState, Transition, transition};
use ddrpower_core::{CommandEvent, CommandKind};
use rstest::rstest;

use crate::common::harness::{act, pre, rank_cmd, rd, refpb, wr};

const TRFC: f64 = 295.0;

fn rank() -> RankState {
    RankState::new(0, 4)
}

fn apply(rank: &mut RankState, event: CommandEvent) -> Vec<ClosedDwell> {
    let mut closed = Vec::new();
    rank.apply(&event, TRFC, &mut closed);
    closed
}

// ══════════════════════════════════════════════════════════
// 1. Transition table
// ══════════════════════════════════════════════════════════

#[rstest]
#[case(BankPhase::Precharged, CommandKind::Act, Transition::To(BankPhase::Active))]
#[case(BankPhase::Precharged, CommandKind::Ref, Transition::To(BankPhase::Refreshing))]
#[case(BankPhase::Precharged, CommandKind::RefPb, Transition::To(BankPhase::Refreshing))]
#[case(BankPhase::Precharged, CommandKind::PowerDownEntry, Transition::To(BankPhase::PrechargedPowerDown))]
#[case(BankPhase::Precharged, CommandKind::SelfRefreshEntry, Transition::To(BankPhase::SelfRefresh))]
#[case(BankPhase::Precharged, CommandKind::PreA, Transition::Stay)]
#[case(BankPhase::Precharged, CommandKind::Rd, Transition::Rejected)]
#[case(BankPhase::Precharged, CommandKind::Pre, Transition::Rejected)]
#[case(BankPhase::Active, CommandKind::Rd, Transition::Stay)]
#[case(BankPhase::Active, CommandKind::Wr, Transition::Stay)]
#[case(BankPhase::Active, CommandKind::Pre, Transition::To(BankPhase::Precharged))]
#[case(BankPhase::Active, CommandKind::PreA, Transition::To(BankPhase::Precharged))]
#[case(BankPhase::Active, CommandKind::PowerDownEntry, Transition::To(BankPhase::ActivePowerDown))]
#[case(BankPhase::Active, CommandKind::Act, Transition::Rejected)]
#[case(BankPhase::Active, CommandKind::Ref, Transition::Rejected)]
#[case(BankPhase::Active, CommandKind::SelfRefreshEntry, Transition::Rejected)]
#[case(BankPhase::ActivePowerDown, CommandKind::PowerDownExit, Transition::To(BankPhase::Active))]
#[case(BankPhase::ActivePowerDown, CommandKind::Rd, Transition::Rejected)]
#[case(BankPhase::PrechargedPowerDown, CommandKind::PowerDownExit, Transition::To(BankPhase::Precharged))]
#[case(BankPhase::PrechargedPowerDown, CommandKind::Act, Transition::Rejected)]
#[case(BankPhase::Refreshing, CommandKind::Act, Transition::Rejected)]
#[case(BankPhase::Refreshing, CommandKind::Ref, Transition::Rejected)]
#[case(BankPhase::SelfRefresh, CommandKind::SelfRefreshExit, Transition::To(BankPhase::Precharged))]
#[case(BankPhase::SelfRefresh, CommandKind::Ref, Transition::Rejected)]
fn test_transition(#[case] phase: BankPhase, #[case] kind: CommandKind, #[case] expected: Transition) {
    assert_eq!(transition(phase, kind), expected);
}

#[test]
fn test_end_is_legal_everywhere() {
    for phase in BankPhase::ALL {
        assert_eq!(transition(phase, CommandKind::End), Transition::Stay);
    }
}

#[test]
fn test_refreshing_only_ends_with_time() {
    for kind in CommandKind::ALL {
        if kind != CommandKind::End {
            assert_eq!(transition(BankPhase::Refreshing, kind), Transition::Rejected, "{kind}");
        }
    }
}

#[test]
fn test_every_phase_is_reachable_from_precharged() {
    let mut reached = vec![BankPhase::Precharged];
    let mut frontier = vec![BankPhase::Precharged];
    while let Some(phase) = frontier.pop() {
        for kind in CommandKind::ALL {
            if let Transition::To(next) = transition(phase, kind) {
                if !reached.contains(&next) {
                    reached.push(next);
                    frontier.push(next);
                }
            }
        }
    }
    for phase in BankPhase::ALL {
        assert!(reached.contains(&phase), "{phase:?} unreachable");
    }
}

// ══════════════════════════════════════════════════════════
// 2. Rank bookkeeping
// ══════════════════════════════════════════════════════════

#[test]
fn test_new_rank_is_precharged() {
    let rank = rank();
    assert_eq!(rank.banks.len(), 4);
    assert!(rank.banks.iter().all(|b| b.phase == BankPhase::Precharged));
    assert_eq!(rank.power_status(), RankPowerStatus::Standby);
    assert_eq!(rank.faw_anchor_ns(), None);
}

#[test]
fn test_activate_opens_row_and_closes_dwell() {
    let mut rank = rank();
    let closed = apply(&mut rank, act(10.0, 2, 512));
    assert_eq!(
        closed,
        vec![ClosedDwell {
            bank: 2,
            phase: BankPhase::Precharged,
            start_ns: 0.0,
            end_ns: 10.0
        }]
    );
    let bank = &rank.banks[2];
    assert_eq!(bank.phase, BankPhase::Active);
    assert_eq!(bank.open_row, Some(512));
    assert_eq!(bank.last_act_ns, Some(10.0));
    assert_eq!(bank.phase_entered_ns, 10.0);
    assert_eq!(rank.last_act_ns, Some(10.0));
}

#[test]
fn test_column_accesses_do_not_close_dwell() {
    let mut rank = rank();
    let _ = apply(&mut rank, act(0.0, 0, 1));
    assert!(apply(&mut rank, rd(20.0, 0)).is_empty());
    assert!(apply(&mut rank, wr(40.0, 0)).is_empty());
    assert_eq!(rank.last_rd_ns, Some(20.0));
    assert_eq!(rank.last_wr_ns, Some(40.0));
    assert_eq!(rank.banks[0].last_wr_ns, Some(40.0));
}

#[test]
fn test_precharge_closes_row() {
    let mut rank = rank();
    let _ = apply(&mut rank, act(0.0, 1, 7));
    let closed = apply(&mut rank, pre(40.0, 1));
    assert_eq!(closed[0].phase, BankPhase::Active);
    assert_eq!(closed[0].duration_ns(), 40.0);
    assert_eq!(rank.banks[1].open_row, None);
    assert_eq!(rank.banks[1].last_pre_ns, Some(40.0));
}

#[test]
fn test_precharge_all_touches_only_open_banks() {
    let mut rank = rank();
    let _ = apply(&mut rank, act(0.0, 0, 1));
    let _ = apply(&mut rank, act(10.0, 3, 1));
    let closed = apply(&mut rank, rank_cmd(50.0, CommandKind::PreA));
    let banks: Vec<usize> = closed.iter().map(|d| d.bank).collect();
    assert_eq!(banks, vec![0, 3]);
    assert!(rank.banks.iter().all(|b| b.phase == BankPhase::Precharged));
    assert_eq!(rank.banks[1].last_pre_ns, None);
    assert_eq!(rank.banks[3].last_pre_ns, Some(50.0));
}

#[test]
fn test_power_down_keeps_open_rows() {
    let mut rank = rank();
    let _ = apply(&mut rank, act(0.0, 0, 9));
    let closed = apply(&mut rank, rank_cmd(50.0, CommandKind::PowerDownEntry));
    assert_eq!(closed.len(), 4);
    assert_eq!(rank.banks[0].phase, BankPhase::ActivePowerDown);
    assert_eq!(rank.banks[1].phase, BankPhase::PrechargedPowerDown);
    assert_eq!(rank.power_status(), RankPowerStatus::PowerDown);

    let _ = apply(&mut rank, rank_cmd(90.0, CommandKind::PowerDownExit));
    assert_eq!(rank.banks[0].phase, BankPhase::Active);
    assert_eq!(rank.banks[0].open_row, Some(9));
    assert_eq!(rank.banks[2].phase, BankPhase::Precharged);
    assert_eq!(rank.last_power_down_exit_ns, Some(90.0));
}

#[test]
fn test_self_refresh_round_trip() {
    let mut rank = rank();
    let _ = apply(&mut rank, rank_cmd(5.0, CommandKind::SelfRefreshEntry));
    assert_eq!(rank.power_status(), RankPowerStatus::SelfRefresh);
    let closed = apply(&mut rank, rank_cmd(500.0, CommandKind::SelfRefreshExit));
    assert!(closed.iter().all(|d| d.phase == BankPhase::SelfRefresh && d.duration_ns() == 495.0));
    assert_eq!(rank.power_status(), RankPowerStatus::Standby);
    assert_eq!(rank.last_self_refresh_exit_ns, Some(500.0));
}

#[test]
fn test_refresh_completes_at_trfc() {
    let mut rank = rank();
    let _ = apply(&mut rank, rank_cmd(100.0, CommandKind::Ref));
    assert!(rank.banks.iter().all(|b| b.phase == BankPhase::Refreshing));
    assert_eq!(rank.banks[0].refresh_until_ns, Some(395.0));

    let mut closed = Vec::new();
    rank.complete_refreshes(300.0, &mut closed);
    assert!(closed.is_empty());

    rank.complete_refreshes(1000.0, &mut closed);
    assert_eq!(closed.len(), 4);
    assert!(closed.iter().all(|d| d.phase == BankPhase::Refreshing && d.end_ns == 395.0));
    assert!(rank.banks.iter().all(|b| b.phase == BankPhase::Precharged && b.phase_entered_ns == 395.0));
}

#[test]
fn test_per_bank_refresh_targets_one_bank() {
    let mut rank = rank();
    let _ = apply(&mut rank, refpb(0.0, 2));
    assert_eq!(rank.banks[2].phase, BankPhase::Refreshing);
    assert_eq!(rank.banks[1].phase, BankPhase::Precharged);
}

#[test]
fn test_faw_window_tracks_last_four() {
    let mut rank = rank();
    for (i, t) in [0.0, 5.0, 10.0].into_iter().enumerate() {
        let _ = apply(&mut rank, act(t, i, 0));
    }
    assert_eq!(rank.faw_anchor_ns(), None);
    let _ = apply(&mut rank, act(15.0, 3, 0));
    assert_eq!(rank.faw_anchor_ns(), Some(0.0));

    let _ = apply(&mut rank, pre(50.0, 0));
    let _ = apply(&mut rank, act(70.0, 0, 1));
    assert_eq!(rank.faw_anchor_ns(), Some(5.0));
}

#[test]
fn test_close_all_restarts_dwell() {
    let mut rank = rank();
    let mut closed = Vec::new();
    rank.close_all(250.0, &mut closed);
    assert_eq!(closed.len(), 4);
    assert!(closed.iter().all(|d| d.start_ns == 0.0 && d.end_ns == 250.0));
    assert!(rank.banks.iter().all(|b| b.phase_entered_ns == 250.0));
}
