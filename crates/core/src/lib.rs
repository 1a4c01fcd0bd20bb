//! DDR5/LPDDR5 command-trace power estimator.
//!
//! This crate replays a timestamped DRAM command trace against a datasheet
//! specification and integrates energy. It provides:
//! 1. **Spec:** Currents, voltages, timing and architecture of the device.
//! 2. **Trace:** Command events, workload metadata and toggle rates.
//! 3. **DRAM:** Timing constraint validation, bank/rank state machine and refresh scheduling.
//! 4. **Energy:** Command and dwell-time accounting for the core rails and the I/O interface.
//! 5. **Simulation:** The replay engine, the JSON loader and the final power report.

/// Common types (errors, units).
pub mod common;
/// Engine configuration (violation policy, ACT formula, interface constants).
pub mod config;
/// Bank/rank state, timing validation and refresh scheduling.
pub mod dram;
/// Energy categories, command energy formulas, accumulator and interface model.
pub mod energy;
/// Trace replay engine and file loader.
pub mod sim;
/// Device specification model (power, timing, architecture).
pub mod spec;
/// Aggregated power report and text output.
pub mod stats;
/// Command events and workload metadata.
pub mod trace;

/// Root configuration type; use `SimConfig::default()` or deserialize from JSON.
pub use crate::config::SimConfig;
/// Crate error type.
pub use crate::common::error::{Result, SimError};
/// Replay engine and its per-run context.
pub use crate::sim::engine::{Engine, SimulationContext};
/// Complete device specification.
pub use crate::spec::MemorySpec;
/// Final report handed out by the engine.
pub use crate::stats::PowerReport;
/// A single command of the trace.
pub use crate::trace::{CommandEvent, CommandKind};
