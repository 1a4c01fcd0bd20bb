//! Energy models and accounting.
//!
//! 1. **Command:** Per-command and per-phase core energy from IDD currents.
//! 2. **Interface:** Termination and DQ switching energy of data bursts.
//! 3. **Accumulator:** Monotonic per-category totals and the energy log.

/// Running totals, energy log and observers.
pub mod accumulator;
/// Core (IDD-based) energy model.
pub mod command;
/// I/O interface energy model.
pub mod interface;

use std::fmt;

use serde::Serialize;

pub use accumulator::{EnergyAccumulator, EnergyLog, EnergyLogEntry, EnergyObserver, EnergySource, EnergyTotals};
pub use command::CoreEnergyModel;
pub use interface::InterfaceModel;

/// Bucket an energy credit is booked to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EnergyCategory {
    /// Row activation.
    Act,
    /// Read bursts.
    Rd,
    /// Write bursts.
    Wr,
    /// Precharge.
    Pre,
    /// All-bank and per-bank refresh.
    Refresh,
    /// Active standby dwell.
    BackgroundActive,
    /// Precharged standby dwell.
    BackgroundPrecharge,
    /// Active and precharged power-down dwell.
    PowerDown,
    /// Self-refresh dwell.
    SelfRefresh,
    /// On-die termination.
    Termination,
    /// DQ switching.
    DynamicIo,
}

impl EnergyCategory {
    /// Every category, core first.
    pub const ALL: [Self; 11] = [
        Self::Act,
        Self::Rd,
        Self::Wr,
        Self::Pre,
        Self::Refresh,
        Self::BackgroundActive,
        Self::BackgroundPrecharge,
        Self::PowerDown,
        Self::SelfRefresh,
        Self::Termination,
        Self::DynamicIo,
    ];

    /// True for I/O interface categories.
    pub const fn is_interface(self) -> bool {
        matches!(self, Self::Termination | Self::DynamicIo)
    }

    /// Short human-readable name.
    pub const fn label(self) -> &'static str {
        match self {
            Self::Act => "ACT",
            Self::Rd => "RD",
            Self::Wr => "WR",
            Self::Pre => "PRE",
            Self::Refresh => "REF",
            Self::BackgroundActive => "background (active)",
            Self::BackgroundPrecharge => "background (precharged)",
            Self::PowerDown => "power-down",
            Self::SelfRefresh => "self-refresh",
            Self::Termination => "termination",
            Self::DynamicIo => "DQ switching",
        }
    }
}

impl fmt::Display for EnergyCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
