//! Configuration system for the estimator.
//!
//! This module defines the knobs a caller can turn without touching the
//! device specification. It provides:
//! 1. **Defaults:** Baseline interface constants and refresh allowances.
//! 2. **Structures:** `SimConfig` and the nested `InterfaceConfig`.
//! 3. **Enums:** Violation policy and ACT/PRE energy formula.
//!
//! Configuration is supplied as JSON (CLI `--config`) or built in code with `SimConfig::default()`.

use serde::Deserialize;

/// Default configuration constants.
mod defaults {
    /// Deferred refreshes JEDEC lets a controller postpone before catching up.
    pub const MAX_POSTPONED_REFRESHES: u32 = 8;

    /// On-die termination resistance in ohms.
    pub const ODT_RESISTANCE_OHM: f64 = 120.0;

    /// Per-pin DQ load capacitance in pF.
    pub const DQ_CAPACITANCE_PF: f64 = 2.0;
}

/// What the engine does when a command breaks a timing or state constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ViolationPolicy {
    /// Stop at the first violation and return it as an error.
    ///
    /// The default for accuracy runs.
    #[default]
    Fatal,
    /// Record the violation and keep replaying.
    ///
    /// Timing-only violations still apply the command; commands with no
    /// legal transition from the current state are skipped.
    #[serde(alias = "collect", alias = "Warn")]
    Collect,
}

/// ACT/PRE energy formula.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ActFormula {
    /// `(IDD0 − IDD3N) × VDD` over tRAS for ACT and over tRP for PRE.
    #[serde(alias = "simple")]
    Simple,
    /// Row-cycle weighted form: `(IDD0 − blend) × VDD × tRC`, with
    /// `blend = (IDD3N × tRAS + IDD2N × tRP) / tRC`, split between ACT and
    /// PRE in the tRAS:tRP ratio. tRC is derived as tRAS + tRP when omitted.
    #[default]
    #[serde(alias = "weighted")]
    Weighted,
}

/// Root configuration of a replay.
///
/// # Examples
///
/// ```
/// use ddrpower_core::config::{ActFormula, SimConfig, ViolationPolicy};
///
/// let config = SimConfig::default();
/// assert_eq!(config.violation_policy, ViolationPolicy::Fatal);
/// assert_eq!(config.max_postponed_refreshes, 8);
///
/// let json = r#"{
///     "violation_policy": "Collect",
///     "act_formula": "Simple",
///     "record_energy_log": true,
///     "interface": { "odt_resistance_ohm": 48.0 }
/// }"#;
/// let config: SimConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.violation_policy, ViolationPolicy::Collect);
/// assert_eq!(config.act_formula, ActFormula::Simple);
/// assert_eq!(config.interface.odt_resistance_ohm, 48.0);
/// assert_eq!(config.interface.dq_capacitance_pf, 2.0);
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct SimConfig {
    /// Fatal-stop or collect-and-continue on constraint violations.
    #[serde(default)]
    pub violation_policy: ViolationPolicy,

    /// ACT/PRE energy formula.
    #[serde(default)]
    pub act_formula: ActFormula,

    /// Refresh debt allowance before a `RefreshDeadlineMissed` warning.
    #[serde(default = "SimConfig::default_max_postponed")]
    pub max_postponed_refreshes: u32,

    /// Keep every energy credit in the report for external verification.
    #[serde(default)]
    pub record_energy_log: bool,

    /// Termination and DQ bus parameters.
    #[serde(default)]
    pub interface: InterfaceConfig,
}

impl SimConfig {
    /// Returns the default refresh postponement allowance.
    fn default_max_postponed() -> u32 {
        defaults::MAX_POSTPONED_REFRESHES
    }

    /// Returns a copy with the given violation policy.
    #[must_use]
    pub fn with_policy(mut self, policy: ViolationPolicy) -> Self {
        self.violation_policy = policy;
        self
    }

    /// Returns a copy with the energy log enabled or disabled.
    #[must_use]
    pub fn with_energy_log(mut self, enabled: bool) -> Self {
        self.record_energy_log = enabled;
        self
    }
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            violation_policy: ViolationPolicy::default(),
            act_formula: ActFormula::default(),
            max_postponed_refreshes: defaults::MAX_POSTPONED_REFRESHES,
            record_energy_log: false,
            interface: InterfaceConfig::default(),
        }
    }
}

/// Electrical parameters of the DQ interface.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct InterfaceConfig {
    /// Effective ODT resistance in ohms.
    #[serde(default = "InterfaceConfig::default_odt_resistance")]
    pub odt_resistance_ohm: f64,

    /// DQ pin load capacitance in pF.
    #[serde(default = "InterfaceConfig::default_dq_capacitance")]
    pub dq_capacitance_pf: f64,

    /// Termination voltage; `None` terminates to VDDQ/2.
    #[serde(default)]
    pub termination_voltage: Option<f64>,
}

impl InterfaceConfig {
    /// Returns the default ODT resistance.
    fn default_odt_resistance() -> f64 {
        defaults::ODT_RESISTANCE_OHM
    }

    /// Returns the default DQ capacitance.
    fn default_dq_capacitance() -> f64 {
        defaults::DQ_CAPACITANCE_PF
    }
}

impl Default for InterfaceConfig {
    fn default() -> Self {
        Self {
            odt_resistance_ohm: defaults::ODT_RESISTANCE_OHM,
            dq_capacitance_pf: defaults::DQ_CAPACITANCE_PF,
            termination_voltage: None,
        }
    }
}
