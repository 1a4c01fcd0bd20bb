//! Timing constraint validator.
//!
//! Decides, for one command against the current rank state, whether it may
//! issue. All comparisons are inclusive: a command exactly `tX` after its
//! reference event is legal (within [`TIMING_EPSILON_NS`]).
//!
//! Checks run in a fixed order and the first failure is reported:
//! 1. **Refresh mode:** REF in per-bank mode or REFpb in all-bank mode.
//! 2. **State:** The transition table of every affected bank; a refreshing bank fails tRFC/tRFCpb.
//! 3. **Row:** RD/WR naming a row must hit the bank's open row.
//! 4. **Exit delays:** tXP after power-down exit, tXSDR/tXSDLL after self-refresh exit.
//! 5. **Intervals:** Command-specific JEDEC intervals (tRP, tRC, tRRD, tFAW, tRCD, tWTR, tRAS, tWR).

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::common::units::TIMING_EPSILON_NS;
use crate::dram::state::{BankPhase, BankState, RankState, Transition, transition};
use crate::spec::{RefreshMode, TimingSpec};
use crate::trace::{CommandEvent, CommandKind};

/// A named JEDEC interval.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TimingConstraint {
    /// PRE to ACT on a bank.
    Rp,
    /// ACT to RD/WR on a bank.
    Rcd,
    /// ACT to PRE on a bank.
    Ras,
    /// ACT to ACT on a bank.
    Rc,
    /// ACT to ACT across banks of a rank.
    Rrd,
    /// Four-activation window of a rank.
    Faw,
    /// Read/write turnaround.
    Wtr,
    /// Write recovery before PRE.
    Wr,
    /// All-bank refresh cycle.
    Rfc,
    /// Per-bank refresh cycle.
    RfcPb,
    /// Power-down exit latency.
    Xp,
    /// Self-refresh exit latency.
    Xsdr,
    /// Self-refresh exit latency for DLL-dependent commands.
    Xsdll,
}

impl fmt::Display for TimingConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Rp => "tRP",
            Self::Rcd => "tRCD",
            Self::Ras => "tRAS",
            Self::Rc => "tRC",
            Self::Rrd => "tRRD",
            Self::Faw => "tFAW",
            Self::Wtr => "tWTR",
            Self::Wr => "tWR",
            Self::Rfc => "tRFC",
            Self::RfcPb => "tRFCpb",
            Self::Xp => "tXP",
            Self::Xsdr => "tXSDR",
            Self::Xsdll => "tXSDLL",
        };
        f.write_str(name)
    }
}

/// Why a command was illegal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ViolationKind {
    /// The command came too early.
    Timing {
        /// Interval that was not respected.
        constraint: TimingConstraint,
        /// Minimum separation.
        required_ns: f64,
        /// Observed separation.
        actual_ns: f64,
    },
    /// No legal transition exists from the bank's phase.
    IllegalState {
        /// Offending bank.
        bank: usize,
        /// Its phase when the command arrived.
        phase: BankPhase,
    },
    /// RD/WR addressed a row that is not open.
    RowMismatch {
        /// Currently open row.
        open_row: Option<u32>,
        /// Row named by the command.
        requested_row: u32,
    },
    /// REF/REFpb does not match the configured refresh mode.
    RefreshModeMismatch {
        /// Mode of the run.
        mode: RefreshMode,
    },
}

impl ViolationKind {
    /// True when only an interval was missed; the state change itself is legal.
    ///
    /// A command hitting a bank that is still refreshing fails tRFC/tRFCpb
    /// but has no transition to apply, so it is not timing-only.
    pub const fn is_timing_only(&self) -> bool {
        match self {
            Self::Timing { constraint, .. } => {
                !matches!(constraint, TimingConstraint::Rfc | TimingConstraint::RfcPb)
            }
            Self::IllegalState { .. } | Self::RowMismatch { .. } | Self::RefreshModeMismatch { .. } => false,
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timing {
                constraint,
                required_ns,
                actual_ns,
            } => write!(f, "{constraint} violated ({actual_ns:.3} ns < {required_ns:.3} ns)"),
            Self::IllegalState { bank, phase } => write!(f, "illegal in bank {bank} state {phase:?}"),
            Self::RowMismatch {
                open_row: Some(open),
                requested_row,
            } => write!(f, "row {requested_row} requested but row {open} is open"),
            Self::RowMismatch {
                open_row: None,
                requested_row,
            } => write!(f, "row {requested_row} requested but no row is open"),
            Self::RefreshModeMismatch { mode } => write!(f, "not allowed in {mode} refresh mode"),
        }
    }
}

/// A command that failed validation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Error)]
#[error("{command} at {time_ns} ns (rank {rank}, bank {bank}): {kind}")]
pub struct ConstraintViolation {
    /// Issue time of the command.
    pub time_ns: f64,
    /// Command kind.
    pub command: CommandKind,
    /// Target rank.
    pub rank: usize,
    /// Target bank (0 for rank-level commands).
    pub bank: usize,
    /// What was violated.
    pub kind: ViolationKind,
}

/// Stateless legality checker for one device.
#[derive(Debug, Clone, Copy)]
pub struct TimingValidator {
    timing: TimingSpec,
    mode: RefreshMode,
}

impl TimingValidator {
    /// Creates a validator for the given timing and refresh mode.
    pub const fn new(timing: TimingSpec, mode: RefreshMode) -> Self {
        Self { timing, mode }
    }

    /// Checks `event` against `rank`, which must be its target rank.
    ///
    /// # Arguments
    ///
    /// * `event` - The command to be issued.
    /// * `rank` - State of the target rank, with completed refreshes already settled.
    ///
    /// # Returns
    ///
    /// `Ok(())` if the command may issue, otherwise the first violated constraint.
    pub fn validate(&self, event: &CommandEvent, rank: &RankState) -> Result<(), ConstraintViolation> {
        if event.kind == CommandKind::End {
            return Ok(());
        }
        let fail = |kind| ConstraintViolation {
            time_ns: event.time_ns,
            command: event.kind,
            rank: event.rank,
            bank: if event.kind.is_bank_command() { event.bank } else { 0 },
            kind,
        };
        let now = event.time_ns;

        match (event.kind, self.mode) {
            (CommandKind::Ref, RefreshMode::PerBank) | (CommandKind::RefPb, RefreshMode::AllBank) => {
                return Err(fail(ViolationKind::RefreshModeMismatch { mode: self.mode }));
            }
            _ => {}
        }

        let targets: &[BankState] = if event.kind.is_bank_command() {
            &rank.banks[event.bank..=event.bank]
        } else {
            &rank.banks
        };
        for bank in targets {
            self.check_phase(event.kind, bank, now).map_err(fail)?;
        }

        let bank = &targets[0];
        if event.kind.is_column_access() {
            match event.row {
                Some(requested_row) if bank.open_row != Some(requested_row) => {
                    return Err(fail(ViolationKind::RowMismatch {
                        open_row: bank.open_row,
                        requested_row,
                    }));
                }
                _ => {}
            }
        }

        if let Some(exit) = rank.last_power_down_exit_ns {
            require(TimingConstraint::Xp, self.timing.txp, now - exit).map_err(fail)?;
        }
        if let Some(exit) = rank.last_self_refresh_exit_ns {
            require(TimingConstraint::Xsdr, self.timing.txsdr, now - exit).map_err(fail)?;
            if event.kind.is_column_access() {
                require(TimingConstraint::Xsdll, self.timing.txsdll_ns(), now - exit).map_err(fail)?;
            }
        }

        match event.kind {
            CommandKind::Act => {
                if let Some(pre) = bank.last_pre_ns {
                    require(TimingConstraint::Rp, self.timing.trp, now - pre).map_err(fail)?;
                }
                if let Some(act) = bank.last_act_ns {
                    require(TimingConstraint::Rc, self.timing.row_cycle(), now - act).map_err(fail)?;
                }
                if let Some(act) = rank.last_act_ns {
                    require(TimingConstraint::Rrd, self.timing.trrd, now - act).map_err(fail)?;
                }
                if let Some(anchor) = rank.faw_anchor_ns() {
                    require(TimingConstraint::Faw, self.timing.tfaw, now - anchor).map_err(fail)?;
                }
            }
            CommandKind::Rd | CommandKind::Wr => {
                if let Some(act) = bank.last_act_ns {
                    require(TimingConstraint::Rcd, self.timing.trcd, now - act).map_err(fail)?;
                }
                let turnaround = if event.kind == CommandKind::Rd {
                    rank.last_wr_ns
                } else {
                    rank.last_rd_ns
                };
                if let Some(previous) = turnaround {
                    require(TimingConstraint::Wtr, self.timing.twtr, now - previous).map_err(fail)?;
                }
            }
            CommandKind::Pre => self.check_precharge(bank, now).map_err(fail)?,
            CommandKind::PreA => {
                for bank in rank.banks.iter().filter(|b| b.phase == BankPhase::Active) {
                    self.check_precharge(bank, now).map_err(fail)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Legality of `kind` against one bank's phase.
    fn check_phase(&self, kind: CommandKind, bank: &BankState, now: f64) -> Result<(), ViolationKind> {
        match transition(bank.phase, kind) {
            Transition::To(_) | Transition::Stay => Ok(()),
            Transition::Rejected if bank.phase == BankPhase::Refreshing => Err(ViolationKind::Timing {
                constraint: match self.mode {
                    RefreshMode::AllBank => TimingConstraint::Rfc,
                    RefreshMode::PerBank => TimingConstraint::RfcPb,
                },
                required_ns: self.timing.refresh_cycle(self.mode),
                actual_ns: now - bank.phase_entered_ns,
            }),
            Transition::Rejected => Err(ViolationKind::IllegalState {
                bank: bank.bank,
                phase: bank.phase,
            }),
        }
    }

    /// tRAS since ACT and tWR since the last write of an open bank.
    fn check_precharge(&self, bank: &BankState, now: f64) -> Result<(), ViolationKind> {
        if let Some(act) = bank.last_act_ns {
            require(TimingConstraint::Ras, self.timing.tras, now - act)?;
        }
        if let Some(write) = bank.last_wr_ns {
            require(TimingConstraint::Wr, self.timing.twr, now - write)?;
        }
        Ok(())
    }
}

/// Inclusive `actual >= required` with [`TIMING_EPSILON_NS`] slack.
fn require(constraint: TimingConstraint, required_ns: f64, actual_ns: f64) -> Result<(), ViolationKind> {
    if actual_ns + TIMING_EPSILON_NS >= required_ns {
        Ok(())
    } else {
        Err(ViolationKind::Timing {
            constraint,
            required_ns,
            actual_ns,
        })
    }
}
