//! Common utilities shared by every component of the estimator.
//!
//! 1. **Error Handling:** The crate error type, specification and contract errors.
//! 2. **Units:** Energy/power conversions and human-readable formatting.

/// Error types.
pub mod error;

/// Unit conversions and formatting helpers.
pub mod units;

pub use error::{ContractViolation, Result, SimError, SpecError};
pub use units::{TIMING_EPSILON_NS, energy_nj, format_energy, format_power};
