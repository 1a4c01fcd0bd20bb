/// Replay engine and per-run state.
pub mod engine;
/// JSON loading of specifications, workloads and configuration.
pub mod loader;

pub use engine::{Engine, SimulationContext};

use crate::common::error::Result;
use crate::config::SimConfig;
use crate::spec::MemorySpec;
use crate::stats::PowerReport;
use crate::trace::Workload;

/// Replays `workload` on `spec` in one call.
///
/// # Examples
///
/// ```
/// use ddrpower_core::SimConfig;
/// use ddrpower_core::sim::{loader, simulate};
///
/// let spec = loader::parse_spec(r#"{
///     "mempowerspec": {
///         "idd0": 51.0, "idd2n": 35.0, "idd2p": 25.0, "idd3n": 46.0, "idd3p": 15.0,
///         "idd4r": 146.0, "idd4w": 120.0, "idd5b": 80.0, "idd6": 3.0,
///         "vdd": 1.1, "vddq": 1.1, "vddca": 1.1
///     },
///     "memtimingspec": { "tck": 0.3125, "tras": 32.0, "trp": 13.75, "trcd": 13.75, "trfc": 295.0 },
///     "architecture": { "nbrOfBanks": 4 }
/// }"#).unwrap();
/// let workload = loader::parse_workload(r#"{
///     "metadata": { "timeUnit": "ns" },
///     "commands": [
///         { "timestamp": 0, "command": "ACT", "bank": 0, "row": 7 },
///         { "timestamp": 16, "command": "RD", "bank": 0 },
///         { "timestamp": 48, "command": "PRE", "bank": 0 },
///         { "timestamp": 100, "command": "END" }
///     ]
/// }"#).unwrap();
///
/// let report = simulate(&spec, &workload, SimConfig::default()).unwrap();
/// assert_eq!(report.simulation_time_ns, 100.0);
/// assert_eq!(report.bytes_transferred, 128);
/// assert!(report.total_energy_nj() > 0.0);
/// ```
pub fn simulate(spec: &MemorySpec, workload: &Workload, config: SimConfig) -> Result<PowerReport> {
    let events = workload.to_events(&spec.timing)?;
    Engine::new(*spec, &workload.metadata, config)?.run(&events)
}
