//! Power report and aggregation.
//!
//! This module turns final energy totals into the figures a user reads. It provides:
//! 1. **Aggregation:** A pure function from totals, duration and bytes moved to power, bandwidth and efficiency.
//! 2. **Report:** `PowerReport`, the serializable result of a replay.
//! 3. **Printing:** Sectioned text output selected by name (see [`REPORT_SECTIONS`]).

use std::collections::BTreeMap;

use serde::Serialize;

use crate::common::units::{average_power_mw, format_energy, format_power, format_time};
use crate::dram::refresh::RefreshDeadlineMissed;
use crate::dram::timing::ConstraintViolation;
use crate::energy::EnergyCategory;
use crate::energy::accumulator::{EnergyLogEntry, EnergyTotals};
use crate::trace::CommandKind;

/// Section names accepted by [`PowerReport::print_sections`].
pub const REPORT_SECTIONS: &[&str] = &["summary", "core", "interface", "commands", "diagnostics"];

/// Derived figures of a finished replay.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct PowerSummary {
    /// Core (VDD) energy in nJ.
    pub core_energy_nj: f64,
    /// Interface (VDDQ) energy in nJ.
    pub interface_energy_nj: f64,
    /// Total energy in nJ.
    pub total_energy_nj: f64,
    /// Total energy over simulated time, in mW.
    pub average_power_mw: f64,
    /// Bytes moved over simulated time, in GB/s.
    pub bandwidth_gbps: f64,
    /// GB moved per W of average power.
    pub efficiency_gb_per_w: f64,
}

/// Reduces energy totals to power, bandwidth and efficiency.
///
/// # Arguments
///
/// * `totals` - Final per-category energy.
/// * `simulation_time_ns` - Span from t = 0 to the end of the run.
/// * `bytes_transferred` - Data moved by RD/WR bursts.
///
/// # Returns
///
/// The derived figures; rates are zero for a zero-length run and
/// efficiency is zero when no power was drawn.
pub fn aggregate(totals: &EnergyTotals, simulation_time_ns: f64, bytes_transferred: u64) -> PowerSummary {
    let core_energy_nj = totals.core();
    let interface_energy_nj = totals.interface();
    let total_energy_nj = core_energy_nj + interface_energy_nj;
    let average_power_mw = average_power_mw(total_energy_nj, simulation_time_ns);
    // bytes / ns = GB/s
    let bandwidth_gbps = if simulation_time_ns > 0.0 {
        bytes_transferred as f64 / simulation_time_ns
    } else {
        0.0
    };
    let efficiency_gb_per_w = if average_power_mw > 0.0 {
        bandwidth_gbps / (average_power_mw / 1000.0)
    } else {
        0.0
    };
    PowerSummary {
        core_energy_nj,
        interface_energy_nj,
        total_energy_nj,
        average_power_mw,
        bandwidth_gbps,
        efficiency_gb_per_w,
    }
}

/// Non-fatal conditions observed during a replay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SimWarning {
    /// A refresh scope fell behind by more than the postponement allowance.
    RefreshDeadlineMissed(RefreshDeadlineMissed),
    /// Events followed END_OF_SIMULATION and were ignored.
    EventsAfterEnd {
        /// Number of ignored events.
        count: usize,
        /// Timestamp of the first ignored event.
        first_time_ns: f64,
    },
    /// The trace had no END_OF_SIMULATION; the run ended at its last event.
    MissingEnd {
        /// Time the run was finalized at.
        end_ns: f64,
    },
}

/// Result of a replay.
#[derive(Debug, Clone, Serialize)]
pub struct PowerReport {
    /// Simulated span from t = 0 to END, in ns.
    pub simulation_time_ns: f64,
    /// Per-category energy in nJ.
    pub energy: EnergyTotals,
    /// Derived power, bandwidth and efficiency.
    pub summary: PowerSummary,
    /// Bytes moved by RD/WR bursts.
    pub bytes_transferred: u64,
    /// Commands replayed, by kind.
    pub command_counts: BTreeMap<CommandKind, u64>,
    /// Violations recorded under the collect policy.
    pub violations: Vec<ConstraintViolation>,
    /// Non-fatal warnings.
    pub warnings: Vec<SimWarning>,
    /// Every energy credit, when recording was enabled.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub energy_log: Option<Vec<EnergyLogEntry>>,
}

impl PowerReport {
    /// Count of one command kind.
    pub fn count(&self, kind: CommandKind) -> u64 {
        self.command_counts.get(&kind).copied().unwrap_or(0)
    }

    /// Total energy in nJ.
    pub const fn total_energy_nj(&self) -> f64 {
        self.summary.total_energy_nj
    }

    /// Average power in mW.
    pub const fn average_power_mw(&self) -> f64 {
        self.summary.average_power_mw
    }

    /// True when the replay recorded no violations.
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }

    /// Prints the selected sections; an empty selection prints all of them.
    pub fn print_sections(&self, sections: &[String]) {
        let want = |s: &str| sections.is_empty() || sections.iter().any(|x| x == s);
        let total = if self.summary.total_energy_nj > 0.0 {
            self.summary.total_energy_nj
        } else {
            1.0
        };
        let share = |e: f64| e / total * 100.0;

        if want("summary") {
            println!("\n==========================================================");
            println!("DRAM POWER REPORT");
            println!("==========================================================");
            println!("sim_time                 {}", format_time(self.simulation_time_ns));
            println!("energy.total             {}", format_energy(self.summary.total_energy_nj));
            println!("power.average            {}", format_power(self.summary.average_power_mw));
            println!("bytes                    {}", self.bytes_transferred);
            println!("bandwidth                {:.3} GB/s", self.summary.bandwidth_gbps);
            println!("efficiency               {:.3} GB/W", self.summary.efficiency_gb_per_w);
            println!("----------------------------------------------------------");
        }
        if want("core") {
            println!("CORE ENERGY");
            for category in EnergyCategory::ALL.iter().filter(|c| !c.is_interface()) {
                let e = self.energy.get(*category);
                println!("  {:<23}{} ({:.2}%)", category.label(), format_energy(e), share(e));
            }
            println!(
                "  {:<23}{} ({:.2}%)",
                "total",
                format_energy(self.summary.core_energy_nj),
                share(self.summary.core_energy_nj)
            );
            println!("----------------------------------------------------------");
        }
        if want("interface") {
            println!("INTERFACE ENERGY");
            for category in EnergyCategory::ALL.iter().filter(|c| c.is_interface()) {
                let e = self.energy.get(*category);
                println!("  {:<23}{} ({:.2}%)", category.label(), format_energy(e), share(e));
            }
            println!("----------------------------------------------------------");
        }
        if want("commands") {
            println!("COMMANDS");
            for (kind, count) in &self.command_counts {
                println!("  {:<23}{}", kind.mnemonic(), count);
            }
            println!("----------------------------------------------------------");
        }
        if want("diagnostics") {
            println!("DIAGNOSTICS");
            println!("  violations             {}", self.violations.len());
            for violation in &self.violations {
                println!("    {violation}");
            }
            println!("  warnings               {}", self.warnings.len());
            for warning in &self.warnings {
                match warning {
                    SimWarning::RefreshDeadlineMissed(m) => println!(
                        "    refresh deadline missed at {} (rank {}, bank {:?}, {} postponed > {})",
                        format_time(m.time_ns),
                        m.rank,
                        m.bank,
                        m.postponed,
                        m.allowance
                    ),
                    SimWarning::EventsAfterEnd { count, first_time_ns } => println!(
                        "    {count} event(s) after END_OF_SIMULATION ignored (first at {})",
                        format_time(*first_time_ns)
                    ),
                    SimWarning::MissingEnd { end_ns } => {
                        println!("    no END_OF_SIMULATION; finalized at {}", format_time(*end_ns));
                    }
                }
            }
        }
        println!("==========================================================");
    }

    /// Prints every section.
    pub fn print(&self) {
        self.print_sections(&[]);
    }
}
