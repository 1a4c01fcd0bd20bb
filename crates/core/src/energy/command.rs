//! Core energy model.
//!
//! Converts commands and bank dwell intervals into energy drawn from VDD.
//! Command energies are incremental over the background current, which is
//! charged separately per dwell interval:
//!
//! | Command | Current above background | Duration |
//! |---------|--------------------------|----------|
//! | ACT     | `IDD0 − IDD3N` (or weighted blend) | tRAS |
//! | PRE     | `IDD0 − IDD3N` (or weighted blend) | tRP |
//! | RD      | `IDD4R − IDD3N` | burst × tCK |
//! | WR      | `IDD4W − IDD3N` | burst × tCK |
//! | REF     | `IDD5B` | tRFC / tRFCpb |
//!
//! Rank background currents are shared evenly between banks, so a rank whose
//! banks all sit in one phase draws exactly that phase's IDD.

use crate::common::units::energy_nj;
use crate::config::ActFormula;
use crate::dram::state::BankPhase;
use crate::energy::EnergyCategory;
use crate::spec::{MemorySpec, PowerSpec, RefreshMode, TimingSpec};
use crate::trace::CommandKind;

/// IDD-based energy model of one device at one temperature.
#[derive(Debug, Clone, Copy)]
pub struct CoreEnergyModel {
    power: PowerSpec,
    timing: TimingSpec,
    formula: ActFormula,
    mode: RefreshMode,
    banks_per_rank: usize,
    burst_length: u32,
}

impl CoreEnergyModel {
    /// Builds the model from a spec and the (possibly derated) power values.
    pub fn new(spec: &MemorySpec, power: PowerSpec, formula: ActFormula) -> Self {
        Self {
            power,
            timing: spec.timing,
            formula,
            mode: spec.refresh_mode(),
            banks_per_rank: spec.architecture.nbr_of_banks.max(1),
            burst_length: spec.architecture.burst_length,
        }
    }

    /// Power values the model charges with.
    pub const fn power(&self) -> &PowerSpec {
        &self.power
    }

    /// Beats of a RD/WR burst, honoring a per-command override.
    pub fn burst_length(&self, override_bl: Option<u32>) -> u32 {
        override_bl.unwrap_or(self.burst_length)
    }

    /// Time a command occupies the device for energy purposes.
    ///
    /// RD/WR occupy `burst_length × tCK`. Commands without
    /// command energy occupy zero.
    pub fn command_duration(&self, kind: CommandKind, override_bl: Option<u32>) -> f64 {
        match kind {
            CommandKind::Act => self.timing.tras,
            CommandKind::Pre | CommandKind::PreA => self.timing.trp,
            CommandKind::Rd | CommandKind::Wr => {
                f64::from(self.burst_length(override_bl)) * self.timing.tck
            }
            CommandKind::Ref => self.timing.trfc,
            CommandKind::RefPb => self.timing.refresh_cycle(RefreshMode::PerBank),
            CommandKind::PowerDownEntry
            | CommandKind::PowerDownExit
            | CommandKind::SelfRefreshEntry
            | CommandKind::SelfRefreshExit
            | CommandKind::End => 0.0,
        }
    }

    /// Energy of one command over `duration_ns`, with its category.
    ///
    /// PREA is charged per precharged bank by the caller, one PRE each.
    /// Returns `None` for commands that carry no command energy.
    pub fn command_energy(&self, kind: CommandKind, duration_ns: f64) -> Option<(EnergyCategory, f64)> {
        let p = &self.power;
        let (category, current) = match kind {
            CommandKind::Act => (EnergyCategory::Act, self.row_current()),
            CommandKind::Pre | CommandKind::PreA => (EnergyCategory::Pre, self.row_current()),
            CommandKind::Rd => (EnergyCategory::Rd, p.idd4r - p.idd3n),
            CommandKind::Wr => (EnergyCategory::Wr, p.idd4w - p.idd3n),
            CommandKind::Ref | CommandKind::RefPb => (EnergyCategory::Refresh, p.idd5b),
            CommandKind::PowerDownEntry
            | CommandKind::PowerDownExit
            | CommandKind::SelfRefreshEntry
            | CommandKind::SelfRefreshExit
            | CommandKind::End => return None,
        };
        Some((category, energy_nj(current, p.vdd, duration_ns)))
    }

    /// Current above background drawn while a row is opened or closed.
    fn row_current(&self) -> f64 {
        let p = &self.power;
        let trc = self.timing.row_cycle();
        match self.formula {
            ActFormula::Weighted if trc > 0.0 => {
                let blend = (p.idd3n * self.timing.tras + p.idd2n * self.timing.trp) / trc;
                (p.idd0 - blend).max(0.0)
            }
            _ => p.idd0 - p.idd3n,
        }
    }

    /// Rank current drawn while every bank is in `phase`.
    ///
    /// `Refreshing` reports zero: refresh is charged at issuance for its
    /// whole tRFC window.
    pub const fn phase_current(&self, phase: BankPhase) -> f64 {
        let p = &self.power;
        match phase {
            BankPhase::Precharged => p.idd2n,
            BankPhase::Active => p.idd3n,
            BankPhase::ActivePowerDown => p.idd3p,
            BankPhase::PrechargedPowerDown => p.idd2p,
            BankPhase::SelfRefresh => p.idd6,
            BankPhase::Refreshing => 0.0,
        }
    }

    /// Background energy of one bank dwelling in `phase` for `duration_ns`.
    pub fn dwell_energy(&self, phase: BankPhase, duration_ns: f64) -> f64 {
        energy_nj(self.phase_current(phase), self.power.vdd, duration_ns) / self.banks_per_rank as f64
    }

    /// Refresh cycle time charged for a refresh of the configured mode.
    pub fn refresh_cycle(&self) -> f64 {
        self.timing.refresh_cycle(self.mode)
    }
}
