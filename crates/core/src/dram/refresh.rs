//! Refresh scheduling and debt tracking.
//!
//! The trace decides when refreshes happen; this module only checks that
//! they keep up with tREFI. Each refresh scope (a rank in all-bank mode, a
//! bank in per-bank mode) carries a [`RefreshTracker`]:
//! 1. **Credit:** Every refresh covers one tREFI interval; pulling in ahead is capped at the postponement allowance.
//! 2. **Debt:** Whole tREFI intervals elapsed beyond the credited horizon, capped at the allowance.
//! 3. **Deadline:** Exceeding the allowance is reported once per episode as [`RefreshDeadlineMissed`].

use serde::Serialize;

use crate::common::units::TIMING_EPSILON_NS;
use crate::dram::state::{RankPowerStatus, RankState};
use crate::spec::RefreshMode;

/// Refresh compliance of one scope.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RefreshTracker {
    /// Time of the last refresh, if any.
    pub last_refresh_ns: Option<f64>,
    /// End of the interval covered by refreshes issued so far.
    pub credited_until_ns: f64,
    /// Postponed refreshes, capped at the allowance.
    pub debt: u32,
    deadline_reported: bool,
}

/// The most overdue scope of a rank at some instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RefreshObligation {
    /// Rank of the scope.
    pub rank: usize,
    /// Bank of the scope in per-bank mode.
    pub bank: Option<usize>,
    /// Time elapsed past the credited horizon.
    pub overdue_ns: f64,
    /// Whole tREFI intervals postponed (uncapped).
    pub postponed: u32,
    /// True when `postponed` exceeds the allowance.
    pub deadline_missed: bool,
}

/// A scope fell further behind than the postponement allowance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RefreshDeadlineMissed {
    /// When the miss was detected.
    pub time_ns: f64,
    /// Rank of the scope.
    pub rank: usize,
    /// Bank of the scope in per-bank mode.
    pub bank: Option<usize>,
    /// Whole tREFI intervals postponed.
    pub postponed: u32,
    /// Allowance that was exceeded.
    pub allowance: u32,
}

/// Tracks refresh compliance against tREFI.
#[derive(Debug, Clone, Copy)]
pub struct RefreshScheduler {
    mode: RefreshMode,
    trefi_ns: f64,
    max_postponed: u32,
}

impl RefreshScheduler {
    /// Creates a scheduler.
    ///
    /// In per-bank mode each bank must be refreshed once per `trefi_ns`.
    pub const fn new(mode: RefreshMode, trefi_ns: f64, max_postponed: u32) -> Self {
        Self {
            mode,
            trefi_ns,
            max_postponed,
        }
    }

    /// Postponement allowance.
    pub const fn max_postponed(&self) -> u32 {
        self.max_postponed
    }

    /// Re-evaluates every scope of `rank` at `now_ns`.
    ///
    /// # Arguments
    ///
    /// * `rank` - Rank whose trackers are updated.
    /// * `now_ns` - Current simulated time.
    /// * `missed` - Receives one entry per scope that newly exceeded the allowance.
    ///
    /// # Returns
    ///
    /// The most overdue scope, if any scope is overdue. A rank in
    /// self-refresh refreshes itself and is never overdue.
    pub fn on_tick(
        &self,
        rank: &mut RankState,
        now_ns: f64,
        missed: &mut Vec<RefreshDeadlineMissed>,
    ) -> Option<RefreshObligation> {
        if rank.power_status() == RankPowerStatus::SelfRefresh {
            return None;
        }
        let rank_id = rank.id;
        let mut worst: Option<RefreshObligation> = None;
        let mut visit = |tracker: &mut RefreshTracker, bank: Option<usize>| {
            let Some(obligation) = self.tick(tracker, rank_id, bank, now_ns) else {
                return;
            };
            if obligation.deadline_missed {
                missed.push(RefreshDeadlineMissed {
                    time_ns: now_ns,
                    rank: rank_id,
                    bank,
                    postponed: obligation.postponed,
                    allowance: self.max_postponed,
                });
            }
            if worst.is_none_or(|w| obligation.overdue_ns > w.overdue_ns) {
                worst = Some(obligation);
            }
        };

        match self.mode {
            RefreshMode::AllBank => visit(&mut rank.refresh, None),
            RefreshMode::PerBank => {
                for bank in &mut rank.banks {
                    visit(&mut bank.refresh, Some(bank.bank));
                }
            }
        }
        worst
    }

    /// Credits one refresh to `tracker` at `now_ns`.
    ///
    /// Debt beyond the allowance is forgiven first: a device cannot catch up
    /// on more than `max_postponed` missed intervals.
    pub fn on_refresh(&self, tracker: &mut RefreshTracker, now_ns: f64) {
        let allowance = f64::from(self.max_postponed);
        let floor = now_ns - (allowance + 1.0) * self.trefi_ns;
        let ceiling = now_ns + allowance * self.trefi_ns;
        tracker.credited_until_ns = (tracker.credited_until_ns.max(floor) + self.trefi_ns).min(ceiling);
        tracker.last_refresh_ns = Some(now_ns);

        let postponed = self.postponed(tracker, now_ns);
        tracker.debt = postponed.min(self.max_postponed);
        if postponed <= self.max_postponed {
            tracker.deadline_reported = false;
        }
    }

    /// Self-refresh keeps the array refreshed internally; every scope restarts at `now_ns`.
    pub fn on_self_refresh_exit(&self, rank: &mut RankState, now_ns: f64) {
        let restart = |tracker: &mut RefreshTracker| {
            tracker.credited_until_ns = tracker.credited_until_ns.max(now_ns);
            tracker.debt = 0;
            tracker.deadline_reported = false;
        };
        restart(&mut rank.refresh);
        rank.banks.iter_mut().for_each(|bank| restart(&mut bank.refresh));
    }

    fn postponed(&self, tracker: &RefreshTracker, now_ns: f64) -> u32 {
        let elapsed = now_ns - tracker.credited_until_ns;
        if elapsed > self.trefi_ns + TIMING_EPSILON_NS {
            // Saturating float-to-int cast.
            (elapsed / self.trefi_ns).floor() as u32
        } else {
            0
        }
    }

    fn tick(&self, tracker: &mut RefreshTracker, rank: usize, bank: Option<usize>, now_ns: f64) -> Option<RefreshObligation> {
        let postponed = self.postponed(tracker, now_ns);
        tracker.debt = postponed.min(self.max_postponed);
        if postponed == 0 {
            return None;
        }
        let exceeded = postponed > self.max_postponed;
        let deadline_missed = exceeded && !tracker.deadline_reported;
        if deadline_missed {
            tracker.deadline_reported = true;
        }
        Some(RefreshObligation {
            rank,
            bank,
            overdue_ns: now_ns - tracker.credited_until_ns,
            postponed,
            deadline_missed,
        })
    }
}
