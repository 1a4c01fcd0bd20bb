//! Energy accumulation.
//!
//! The accumulator is the only writer of energy totals. Every credit is
//! validated, added to its category and, when enabled, recorded in the
//! energy log and forwarded to an [`EnergyObserver`]. Totals never decrease.

use serde::Serialize;

use crate::common::error::ContractViolation;
use crate::dram::state::{BankPhase, ClosedDwell};
use crate::energy::EnergyCategory;
use crate::energy::command::CoreEnergyModel;
use crate::trace::CommandKind;

/// Per-category energy totals in nJ.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct EnergyTotals {
    /// Row activation.
    pub act: f64,
    /// Read bursts.
    pub rd: f64,
    /// Write bursts.
    pub wr: f64,
    /// Precharge.
    pub pre: f64,
    /// Refresh.
    pub refresh: f64,
    /// Active standby background.
    pub background_active: f64,
    /// Precharged standby background.
    pub background_precharge: f64,
    /// Power-down background.
    pub power_down: f64,
    /// Self-refresh background.
    pub self_refresh: f64,
    /// On-die termination.
    pub termination: f64,
    /// DQ switching.
    pub dynamic_io: f64,
}

impl EnergyTotals {
    /// Total of one category.
    pub const fn get(&self, category: EnergyCategory) -> f64 {
        match category {
            EnergyCategory::Act => self.act,
            EnergyCategory::Rd => self.rd,
            EnergyCategory::Wr => self.wr,
            EnergyCategory::Pre => self.pre,
            EnergyCategory::Refresh => self.refresh,
            EnergyCategory::BackgroundActive => self.background_active,
            EnergyCategory::BackgroundPrecharge => self.background_precharge,
            EnergyCategory::PowerDown => self.power_down,
            EnergyCategory::SelfRefresh => self.self_refresh,
            EnergyCategory::Termination => self.termination,
            EnergyCategory::DynamicIo => self.dynamic_io,
        }
    }

    fn slot(&mut self, category: EnergyCategory) -> &mut f64 {
        match category {
            EnergyCategory::Act => &mut self.act,
            EnergyCategory::Rd => &mut self.rd,
            EnergyCategory::Wr => &mut self.wr,
            EnergyCategory::Pre => &mut self.pre,
            EnergyCategory::Refresh => &mut self.refresh,
            EnergyCategory::BackgroundActive => &mut self.background_active,
            EnergyCategory::BackgroundPrecharge => &mut self.background_precharge,
            EnergyCategory::PowerDown => &mut self.power_down,
            EnergyCategory::SelfRefresh => &mut self.self_refresh,
            EnergyCategory::Termination => &mut self.termination,
            EnergyCategory::DynamicIo => &mut self.dynamic_io,
        }
    }

    /// Background (dwell) energy.
    pub fn background(&self) -> f64 {
        self.background_active + self.background_precharge + self.power_down + self.self_refresh
    }

    /// Core (VDD) energy: commands plus background.
    pub fn core(&self) -> f64 {
        EnergyCategory::ALL
            .iter()
            .filter(|c| !c.is_interface())
            .map(|&c| self.get(c))
            .sum()
    }

    /// Interface (VDDQ) energy.
    pub fn interface(&self) -> f64 {
        self.termination + self.dynamic_io
    }

    /// Core plus interface energy.
    pub fn total(&self) -> f64 {
        self.core() + self.interface()
    }
}

/// What produced an energy credit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergySource {
    /// A command's own energy.
    Command(CommandKind),
    /// Background energy of a bank phase.
    Dwell(BankPhase),
}

/// One energy credit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EnergyLogEntry {
    /// Time the credit applies to (command issue or dwell start).
    pub time_ns: f64,
    /// Rank charged.
    pub rank: usize,
    /// Bank charged; `None` for rank-wide credits.
    pub bank: Option<usize>,
    /// Category credited.
    pub category: EnergyCategory,
    /// Producer of the credit.
    pub source: EnergySource,
    /// Interval the energy covers.
    pub duration_ns: f64,
    /// Energy in nJ.
    pub energy_nj: f64,
}

/// Receives every non-zero energy credit as it is booked.
pub trait EnergyObserver {
    /// Called once per credit, in booking order.
    fn on_energy(&mut self, entry: &EnergyLogEntry);
}

/// Built-in observer that keeps every credit.
#[derive(Debug, Clone, Default)]
pub struct EnergyLog {
    entries: Vec<EnergyLogEntry>,
}

impl EnergyLog {
    /// Recorded credits.
    pub fn entries(&self) -> &[EnergyLogEntry] {
        &self.entries
    }

    /// Consumes the log.
    pub fn into_entries(self) -> Vec<EnergyLogEntry> {
        self.entries
    }

    /// Sum of all recorded credits.
    pub fn total(&self) -> f64 {
        self.entries.iter().map(|e| e.energy_nj).sum()
    }
}

impl EnergyObserver for EnergyLog {
    fn on_energy(&mut self, entry: &EnergyLogEntry) {
        self.entries.push(*entry);
    }
}

/// Running energy totals of a replay.
pub struct EnergyAccumulator {
    totals: EnergyTotals,
    log: Option<EnergyLog>,
    observer: Option<Box<dyn EnergyObserver>>,
}

impl std::fmt::Debug for EnergyAccumulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnergyAccumulator")
            .field("totals", &self.totals)
            .field("log", &self.log.as_ref().map(|log| log.entries.len()))
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

impl Default for EnergyAccumulator {
    fn default() -> Self {
        Self::new(false)
    }
}

impl EnergyAccumulator {
    /// Creates an empty accumulator, optionally keeping an energy log.
    pub fn new(record_log: bool) -> Self {
        Self {
            totals: EnergyTotals::default(),
            log: record_log.then(EnergyLog::default),
            observer: None,
        }
    }

    /// Attaches an external observer.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn EnergyObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current totals.
    pub const fn totals(&self) -> &EnergyTotals {
        &self.totals
    }

    /// Recorded energy log, if enabled.
    pub const fn log(&self) -> Option<&EnergyLog> {
        self.log.as_ref()
    }

    /// Splits into totals and the energy log.
    pub fn into_parts(self) -> (EnergyTotals, Option<EnergyLog>) {
        (self.totals, self.log)
    }

    /// Books one credit.
    ///
    /// # Returns
    ///
    /// The energy added, or a [`ContractViolation`] if the duration is
    /// negative or the energy is negative or non-finite. Rejected credits
    /// leave the totals untouched.
    pub fn credit(&mut self, entry: EnergyLogEntry) -> Result<f64, ContractViolation> {
        let category = entry.category;
        if entry.duration_ns < 0.0 {
            return Err(ContractViolation::NegativeDuration {
                category,
                duration_ns: entry.duration_ns,
            });
        }
        if !entry.energy_nj.is_finite() || !entry.duration_ns.is_finite() {
            return Err(ContractViolation::NonFinite { category });
        }
        if entry.energy_nj < 0.0 {
            return Err(ContractViolation::NegativeEnergy {
                category,
                energy_nj: entry.energy_nj,
            });
        }
        if entry.energy_nj == 0.0 {
            return Ok(0.0);
        }

        *self.totals.slot(category) += entry.energy_nj;
        if let Some(log) = &mut self.log {
            log.on_energy(&entry);
        }
        if let Some(observer) = &mut self.observer {
            observer.on_energy(&entry);
        }
        Ok(entry.energy_nj)
    }

    /// Books the command energy of `kind` issued at `time_ns`.
    ///
    /// # Arguments
    ///
    /// * `model` - Core energy model of the device.
    /// * `kind` - Command being charged.
    /// * `duration_ns` - Occupancy of the command (see [`CoreEnergyModel::command_duration`]).
    /// * `time_ns` - Issue time.
    /// * `rank` - Rank charged.
    /// * `bank` - Bank charged, `None` for rank-wide commands.
    ///
    /// # Returns
    ///
    /// The energy delta; zero for commands without command energy.
    pub fn apply_command_energy(
        &mut self,
        model: &CoreEnergyModel,
        kind: CommandKind,
        duration_ns: f64,
        time_ns: f64,
        rank: usize,
        bank: Option<usize>,
    ) -> Result<f64, ContractViolation> {
        let Some((category, energy_nj)) = model.command_energy(kind, duration_ns) else {
            return Ok(0.0);
        };
        self.credit(EnergyLogEntry {
            time_ns,
            rank,
            bank,
            category,
            source: EnergySource::Command(kind),
            duration_ns,
            energy_nj,
        })
    }

    /// Books the background energy of a closed dwell interval.
    ///
    /// Refreshing intervals add nothing: refresh energy covers them.
    pub fn apply_dwell(
        &mut self,
        model: &CoreEnergyModel,
        rank: usize,
        dwell: &ClosedDwell,
    ) -> Result<f64, ContractViolation> {
        let duration_ns = dwell.duration_ns();
        if dwell.phase == BankPhase::Refreshing && duration_ns >= 0.0 {
            return Ok(0.0);
        }
        self.credit(EnergyLogEntry {
            time_ns: dwell.start_ns,
            rank,
            bank: Some(dwell.bank),
            category: dwell.phase.dwell_category(),
            source: EnergySource::Dwell(dwell.phase),
            duration_ns,
            energy_nj: model.dwell_energy(dwell.phase, duration_ns),
        })
    }
}
