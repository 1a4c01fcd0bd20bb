//! I/O interface energy.
//!
//! Two contributions per RD/WR burst, both drawn from VDDQ:
//! 1. **Termination:** `V_term² / R_term × duty × t_burst`, the static ODT current while the bus is driven.
//! 2. **Switching:** `C_DQ × VDDQ² × f × α × N_DQ × t_burst`, with `f` the transfer rate
//!    and `t_burst = BL / f`, so the energy reduces to `C × VDDQ² × α × N_DQ × BL`.

use crate::config::InterfaceConfig;
use crate::spec::MemorySpec;
use crate::trace::{CommandKind, ToggleRates, WorkloadMetadata};

/// Interface energy model of one device and workload.
#[derive(Debug, Clone, Copy)]
pub struct InterfaceModel {
    vddq: f64,
    termination_voltage: f64,
    odt_resistance_ohm: f64,
    dq_capacitance_pf: f64,
    dq_pins: usize,
    data_rate_mts: u32,
    toggle: ToggleRates,
}

impl InterfaceModel {
    /// Builds the model.
    ///
    /// # Arguments
    ///
    /// * `spec` - Device specification (VDDQ, data width).
    /// * `metadata` - Workload data rate and toggle statistics.
    /// * `config` - Termination and capacitance parameters.
    pub fn new(spec: &MemorySpec, metadata: &WorkloadMetadata, config: &InterfaceConfig) -> Self {
        let vddq = spec.power.vddq;
        Self {
            vddq,
            termination_voltage: config.termination_voltage.unwrap_or(vddq / 2.0),
            odt_resistance_ohm: config.odt_resistance_ohm,
            dq_capacitance_pf: config.dq_capacitance_pf,
            dq_pins: spec.architecture.width,
            data_rate_mts: metadata.data_rate,
            toggle: metadata.toggle_rates,
        }
    }

    /// Termination energy in nJ for a burst occupying `duration_ns`.
    ///
    /// Zero for commands that move no data.
    pub fn termination_energy(&self, kind: CommandKind, duration_ns: f64) -> f64 {
        let duty = match kind {
            CommandKind::Rd => self.toggle.read_duty_cycle,
            CommandKind::Wr => self.toggle.write_duty_cycle,
            _ => return 0.0,
        };
        if self.odt_resistance_ohm <= 0.0 {
            return 0.0;
        }
        // V² / Ω = W; W × ns = nJ.
        let power_w = self.termination_voltage * self.termination_voltage / self.odt_resistance_ohm;
        power_w * duty.clamp(0.0, 1.0) * duration_ns
    }

    /// DQ switching energy in nJ for a burst of `burst_length` beats.
    ///
    /// Zero for commands that move no data, or a zero data rate.
    pub fn dynamic_energy(&self, kind: CommandKind, burst_length: u32) -> f64 {
        let alpha = match kind {
            CommandKind::Rd => self.toggle.read,
            CommandKind::Wr => self.toggle.write,
            _ => return 0.0,
        };
        if self.data_rate_mts == 0 {
            return 0.0;
        }
        let transfers_per_ns = f64::from(self.data_rate_mts) / 1000.0;
        let burst_ns = f64::from(burst_length) / transfers_per_ns;
        // pF × V² × GHz = mW; mW × ns = pJ.
        let power_mw = self.dq_capacitance_pf
            * self.vddq
            * self.vddq
            * transfers_per_ns
            * alpha.clamp(0.0, 1.0)
            * self.dq_pins as f64;
        power_mw * burst_ns / 1000.0
    }
}
