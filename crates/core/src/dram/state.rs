//! Bank/rank state machine.
//!
//! Every bank starts `Precharged` at t = 0. Commands move banks through the
//! table in [`transition`]; each move closes the dwell interval of the phase
//! being left so the engine can charge its background energy. Ranks own
//! their banks and the cross-bank history (tRRD, tFAW, tWTR, exit delays).

use std::collections::VecDeque;
use std::ops::Range;

use serde::Serialize;

use crate::common::units::TIMING_EPSILON_NS;
use crate::dram::refresh::RefreshTracker;
use crate::energy::EnergyCategory;
use crate::trace::{CommandEvent, CommandKind};

/// Activations remembered for the tFAW window.
const FAW_ACTIVATIONS: usize = 4;

/// Operating phase of one bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum BankPhase {
    /// Idle with all rows closed.
    Precharged,
    /// A row is open.
    Active,
    /// Powered down with a row open.
    ActivePowerDown,
    /// Powered down with rows closed.
    PrechargedPowerDown,
    /// Executing REF/REFpb until tRFC/tRFCpb elapses.
    Refreshing,
    /// In self-refresh.
    SelfRefresh,
}

impl BankPhase {
    /// Every phase, in declaration order.
    pub const ALL: [Self; 6] = [
        Self::Precharged,
        Self::Active,
        Self::ActivePowerDown,
        Self::PrechargedPowerDown,
        Self::Refreshing,
        Self::SelfRefresh,
    ];

    /// Energy category that dwell time in this phase is credited to.
    pub const fn dwell_category(self) -> EnergyCategory {
        match self {
            Self::Precharged => EnergyCategory::BackgroundPrecharge,
            Self::Active => EnergyCategory::BackgroundActive,
            Self::ActivePowerDown | Self::PrechargedPowerDown => EnergyCategory::PowerDown,
            Self::Refreshing => EnergyCategory::Refresh,
            Self::SelfRefresh => EnergyCategory::SelfRefresh,
        }
    }

    /// True for both power-down phases.
    pub const fn is_power_down(self) -> bool {
        matches!(self, Self::ActivePowerDown | Self::PrechargedPowerDown)
    }
}

/// Outcome of a command on a bank in a given phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The bank moves to a new phase.
    To(BankPhase),
    /// Legal, phase unchanged (RD/WR bookkeeping, PREA on a closed bank, END).
    Stay,
    /// No legal transition.
    Rejected,
}

/// The transition table, total over (phase, command).
///
/// Rank-level commands (PREA, REF, power-down and self-refresh entry/exit)
/// are evaluated against every bank of the rank. `Refreshing` only ends
/// when tRFC elapses, never through a command.
pub const fn transition(phase: BankPhase, kind: CommandKind) -> Transition {
    use BankPhase as P;
    use CommandKind as C;
    use Transition::{Rejected, Stay, To};

    match (phase, kind) {
        (P::Precharged, C::Act) => To(P::Active),
        (P::Precharged, C::Ref | C::RefPb) => To(P::Refreshing),
        (P::Precharged, C::PowerDownEntry) => To(P::PrechargedPowerDown),
        (P::Precharged, C::SelfRefreshEntry) => To(P::SelfRefresh),
        (P::Precharged, C::PreA | C::End) => Stay,
        (P::Precharged, C::Rd | C::Wr | C::Pre | C::PowerDownExit | C::SelfRefreshExit) => Rejected,

        (P::Active, C::Rd | C::Wr | C::End) => Stay,
        (P::Active, C::Pre | C::PreA) => To(P::Precharged),
        (P::Active, C::PowerDownEntry) => To(P::ActivePowerDown),
        (
            P::Active,
            C::Act | C::Ref | C::RefPb | C::PowerDownExit | C::SelfRefreshEntry | C::SelfRefreshExit,
        ) => Rejected,

        (P::ActivePowerDown, C::PowerDownExit) => To(P::Active),
        (P::ActivePowerDown, C::End) => Stay,
        (
            P::ActivePowerDown,
            C::Act
            | C::Rd
            | C::Wr
            | C::Pre
            | C::PreA
            | C::Ref
            | C::RefPb
            | C::PowerDownEntry
            | C::SelfRefreshEntry
            | C::SelfRefreshExit,
        ) => Rejected,

        (P::PrechargedPowerDown, C::PowerDownExit) => To(P::Precharged),
        (P::PrechargedPowerDown, C::End) => Stay,
        (
            P::PrechargedPowerDown,
            C::Act
            | C::Rd
            | C::Wr
            | C::Pre
            | C::PreA
            | C::Ref
            | C::RefPb
            | C::PowerDownEntry
            | C::SelfRefreshEntry
            | C::SelfRefreshExit,
        ) => Rejected,

        (P::Refreshing, C::End) => Stay,
        (
            P::Refreshing,
            C::Act
            | C::Rd
            | C::Wr
            | C::Pre
            | C::PreA
            | C::Ref
            | C::RefPb
            | C::PowerDownEntry
            | C::PowerDownExit
            | C::SelfRefreshEntry
            | C::SelfRefreshExit,
        ) => Rejected,

        (P::SelfRefresh, C::SelfRefreshExit) => To(P::Precharged),
        (P::SelfRefresh, C::End) => Stay,
        (
            P::SelfRefresh,
            C::Act
            | C::Rd
            | C::Wr
            | C::Pre
            | C::PreA
            | C::Ref
            | C::RefPb
            | C::PowerDownEntry
            | C::PowerDownExit
            | C::SelfRefreshEntry,
        ) => Rejected,
    }
}

/// A finished stay of one bank in one phase.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosedDwell {
    /// Bank index within its rank.
    pub bank: usize,
    /// Phase that was left.
    pub phase: BankPhase,
    /// Phase entry time.
    pub start_ns: f64,
    /// Phase exit time.
    pub end_ns: f64,
}

impl ClosedDwell {
    /// Length of the interval.
    pub fn duration_ns(&self) -> f64 {
        self.end_ns - self.start_ns
    }
}

/// State of a single bank.
#[derive(Debug, Clone, PartialEq)]
pub struct BankState {
    /// Owning rank.
    pub rank: usize,
    /// Bank index within the rank.
    pub bank: usize,
    /// Current phase.
    pub phase: BankPhase,
    /// When the current phase was entered.
    pub phase_entered_ns: f64,
    /// Last ACT (tRCD, tRAS, tRC).
    pub last_act_ns: Option<f64>,
    /// Last PRE (tRP).
    pub last_pre_ns: Option<f64>,
    /// Last WR (tWR).
    pub last_wr_ns: Option<f64>,
    /// Open row while `Active` or `ActivePowerDown`.
    pub open_row: Option<u32>,
    /// Completion time of an ongoing refresh.
    pub refresh_until_ns: Option<f64>,
    /// Refresh compliance in per-bank mode.
    pub refresh: RefreshTracker,
}

impl BankState {
    /// Creates a precharged bank at t = 0.
    pub fn new(rank: usize, bank: usize) -> Self {
        Self {
            rank,
            bank,
            phase: BankPhase::Precharged,
            phase_entered_ns: 0.0,
            last_act_ns: None,
            last_pre_ns: None,
            last_wr_ns: None,
            open_row: None,
            refresh_until_ns: None,
            refresh: RefreshTracker::default(),
        }
    }

    /// Moves to `phase` at `now_ns`, returning the interval just closed.
    pub fn enter(&mut self, phase: BankPhase, now_ns: f64) -> ClosedDwell {
        let closed = self.close_dwell(now_ns);
        self.phase = phase;
        closed
    }

    /// Ends the current dwell interval at `now_ns` without changing phase.
    pub fn close_dwell(&mut self, now_ns: f64) -> ClosedDwell {
        let closed = ClosedDwell {
            bank: self.bank,
            phase: self.phase,
            start_ns: self.phase_entered_ns,
            end_ns: now_ns,
        };
        self.phase_entered_ns = now_ns;
        closed
    }
}

/// Aggregate low-power status of a rank.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankPowerStatus {
    /// Clock enabled; banks precharged, active or refreshing.
    Standby,
    /// Every bank is in a power-down phase.
    PowerDown,
    /// Every bank is in self-refresh.
    SelfRefresh,
}

/// State of a rank and its banks.
#[derive(Debug, Clone, PartialEq)]
pub struct RankState {
    /// Rank index.
    pub id: usize,
    /// Banks of this rank.
    pub banks: Vec<BankState>,
    /// Most recent ACT on any bank (tRRD).
    pub last_act_ns: Option<f64>,
    /// Most recent RD on any bank (tWTR).
    pub last_rd_ns: Option<f64>,
    /// Most recent WR on any bank (tWTR).
    pub last_wr_ns: Option<f64>,
    /// Most recent power-down exit (tXP).
    pub last_power_down_exit_ns: Option<f64>,
    /// Most recent self-refresh exit (tXSDR/tXSDLL).
    pub last_self_refresh_exit_ns: Option<f64>,
    /// Refresh compliance in all-bank mode.
    pub refresh: RefreshTracker,
    activations: VecDeque<f64>,
}

impl RankState {
    /// Creates a rank with `banks` precharged banks.
    pub fn new(id: usize, banks: usize) -> Self {
        Self {
            id,
            banks: (0..banks).map(|bank| BankState::new(id, bank)).collect(),
            last_act_ns: None,
            last_rd_ns: None,
            last_wr_ns: None,
            last_power_down_exit_ns: None,
            last_self_refresh_exit_ns: None,
            refresh: RefreshTracker::default(),
            activations: VecDeque::with_capacity(FAW_ACTIVATIONS + 1),
        }
    }

    /// Time of the oldest of the last four ACTs, once four have been issued.
    pub fn faw_anchor_ns(&self) -> Option<f64> {
        if self.activations.len() == FAW_ACTIVATIONS {
            self.activations.front().copied()
        } else {
            None
        }
    }

    /// Aggregate power-down/self-refresh status.
    pub fn power_status(&self) -> RankPowerStatus {
        if self.banks.iter().all(|b| b.phase == BankPhase::SelfRefresh) {
            RankPowerStatus::SelfRefresh
        } else if self.banks.iter().all(|b| b.phase.is_power_down()) {
            RankPowerStatus::PowerDown
        } else {
            RankPowerStatus::Standby
        }
    }

    /// Returns banks whose refresh has completed by `now_ns` to `Precharged`.
    ///
    /// The refreshing interval is closed at its completion time, not at `now_ns`.
    pub fn complete_refreshes(&mut self, now_ns: f64, closed: &mut Vec<ClosedDwell>) {
        for bank in &mut self.banks {
            if bank.phase != BankPhase::Refreshing {
                continue;
            }
            match bank.refresh_until_ns {
                Some(until) if until <= now_ns + TIMING_EPSILON_NS => {
                    let until = until.min(now_ns).max(bank.phase_entered_ns);
                    closed.push(bank.enter(BankPhase::Precharged, until));
                    bank.refresh_until_ns = None;
                }
                _ => {}
            }
        }
    }

    /// Closes every bank's dwell interval at `now_ns` (run end).
    pub fn close_all(&mut self, now_ns: f64, closed: &mut Vec<ClosedDwell>) {
        closed.extend(self.banks.iter_mut().map(|bank| bank.close_dwell(now_ns)));
    }

    /// True when every bank `event` targets has a legal transition for it.
    pub fn admits(&self, event: &CommandEvent) -> bool {
        self.banks[self.targets(event)]
            .iter()
            .all(|bank| !matches!(transition(bank.phase, event.kind), Transition::Rejected))
    }

    fn targets(&self, event: &CommandEvent) -> Range<usize> {
        if event.kind.is_bank_command() {
            event.bank..event.bank + 1
        } else {
            0..self.banks.len()
        }
    }

    /// Applies a validated command.
    ///
    /// Banks affected by the command follow [`transition`]; every phase change
    /// pushes the interval it closed onto `closed`. `refresh_cycle_ns` is the
    /// mode-appropriate tRFC or tRFCpb.
    pub fn apply(&mut self, event: &CommandEvent, refresh_cycle_ns: f64, closed: &mut Vec<ClosedDwell>) {
        let now = event.time_ns;
        let targets = self.targets(event);

        for bank in &mut self.banks[targets] {
            if let Transition::To(next) = transition(bank.phase, event.kind) {
                closed.push(bank.enter(next, now));
            }
            match event.kind {
                CommandKind::Act => {
                    bank.open_row = event.row;
                    bank.last_act_ns = Some(now);
                }
                CommandKind::Wr => bank.last_wr_ns = Some(now),
                CommandKind::Pre => {
                    bank.open_row = None;
                    bank.last_pre_ns = Some(now);
                }
                CommandKind::PreA if bank.phase == BankPhase::Precharged && bank.open_row.is_some() => {
                    bank.open_row = None;
                    bank.last_pre_ns = Some(now);
                }
                CommandKind::Ref | CommandKind::RefPb => {
                    bank.refresh_until_ns = Some(now + refresh_cycle_ns);
                }
                _ => {}
            }
        }

        match event.kind {
            CommandKind::Act => {
                self.last_act_ns = Some(now);
                self.activations.push_back(now);
                if self.activations.len() > FAW_ACTIVATIONS {
                    let _ = self.activations.pop_front();
                }
            }
            CommandKind::Rd => self.last_rd_ns = Some(now),
            CommandKind::Wr => self.last_wr_ns = Some(now),
            CommandKind::PowerDownExit => self.last_power_down_exit_ns = Some(now),
            CommandKind::SelfRefreshExit => self.last_self_refresh_exit_ns = Some(now),
            _ => {}
        }
    }
}
