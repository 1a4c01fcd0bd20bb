//! Error definitions for the estimator.
//!
//! This module defines the error taxonomy of a replay. It provides:
//! 1. **Input Malformation:** Non-monotonic timestamps, unknown commands, missing fields.
//! 2. **Specification Errors:** Datasheet values that break physical or JEDEC invariants.
//! 3. **Constraint Violations:** Timing and state legality failures (see [`crate::dram::timing`]).
//! 4. **Contract Violations:** Accumulator misuse, which indicates an engine bug rather than bad data.

use std::path::PathBuf;

use thiserror::Error;

use crate::dram::timing::ConstraintViolation;
use crate::energy::EnergyCategory;
use crate::trace::CommandKind;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SimError>;

/// Fatal errors that stop a replay or prevent it from starting.
#[derive(Debug, Error)]
pub enum SimError {
    /// An event is timestamped before its predecessor.
    #[error("event {index}: timestamp {time_ns} ns precedes previous event at {previous_ns} ns")]
    NonMonotonicTimestamp {
        /// Position of the offending event in the trace.
        index: usize,
        /// Offending timestamp.
        time_ns: f64,
        /// Timestamp of the previous event.
        previous_ns: f64,
    },

    /// An event carries a negative or non-finite timestamp.
    #[error("event {index}: invalid timestamp {time_ns}")]
    InvalidTimestamp {
        /// Position of the offending event in the trace.
        index: usize,
        /// Offending timestamp.
        time_ns: f64,
    },

    /// A trace record names a command the engine does not know.
    #[error("unknown command kind `{0}`")]
    UnknownCommand(String),

    /// A trace record lacks a field its command requires.
    #[error("event {index} ({command}): missing required field `{field}`")]
    MissingField {
        /// Position of the offending event in the trace.
        index: usize,
        /// Command of the record.
        command: CommandKind,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A trace record overrides the burst length with zero beats.
    #[error("event {index} ({command}): burst length must be at least one beat")]
    ZeroBurstLength {
        /// Position of the offending event in the trace.
        index: usize,
        /// Command of the record.
        command: CommandKind,
    },

    /// The device specification is inconsistent.
    #[error("invalid specification: {0}")]
    Spec(#[from] SpecError),

    /// An event addresses a rank or bank outside the architecture.
    #[error("{command} at {time_ns} ns targets rank {rank} bank {bank} outside a {ranks}x{banks} array")]
    AddressOutOfRange {
        /// Command of the event.
        command: CommandKind,
        /// Timestamp of the event.
        time_ns: f64,
        /// Requested rank.
        rank: usize,
        /// Requested bank.
        bank: usize,
        /// Number of ranks in the architecture.
        ranks: usize,
        /// Number of banks per rank in the architecture.
        banks: usize,
    },

    /// An event names a row beyond the bank's row count.
    #[error("{command} at {time_ns} ns targets row {row} of a {rows}-row bank")]
    RowOutOfRange {
        /// Command of the event.
        command: CommandKind,
        /// Timestamp of the event.
        time_ns: f64,
        /// Requested row.
        row: u32,
        /// Rows per bank in the architecture.
        rows: usize,
    },

    /// A timing or state constraint was violated under the fatal policy.
    #[error(transparent)]
    Violation(#[from] ConstraintViolation),

    /// The accumulator was driven outside its contract (engine bug).
    #[error("accumulator contract violated: {0}")]
    Contract(#[from] ContractViolation),

    /// A spec, workload or config file could not be read.
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A spec, workload or config document is not valid JSON for its schema.
    #[error("cannot parse {what}: {source}")]
    Parse {
        /// Description of the document (file path or "specification"/"workload").
        what: String,
        /// Underlying deserialization error.
        source: serde_json::Error,
    },
}

/// Specification values that cannot describe a real device.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpecError {
    /// A value that must be strictly positive is zero or negative.
    #[error("`{field}` must be positive, got {value}")]
    NonPositive {
        /// Field name as it appears in the spec file.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A current or duration is negative.
    #[error("`{field}` must not be negative, got {value}")]
    Negative {
        /// Field name as it appears in the spec file.
        field: &'static str,
        /// Offending value.
        value: f64,
    },

    /// An operating current is below the standby current it is measured against.
    #[error("`{high}` ({high_value} mA) must not be below `{low}` ({low_value} mA)")]
    CurrentOrder {
        /// Operating current name.
        high: &'static str,
        /// Operating current value.
        high_value: f64,
        /// Reference current name.
        low: &'static str,
        /// Reference current value.
        low_value: f64,
    },

    /// tRC was given but differs from tRAS + tRP.
    #[error("tRC ({trc} ns) must equal tRAS + tRP ({expected} ns)")]
    RowCycleMismatch {
        /// Datasheet tRC.
        trc: f64,
        /// tRAS + tRP.
        expected: f64,
    },

    /// A field required by the selected refresh mode is absent.
    #[error("`{0}` is required in per-bank refresh mode")]
    MissingPerBankTiming(&'static str),

    /// An architecture dimension is zero.
    #[error("architecture `{0}` must be non-zero")]
    ZeroDimension(&'static str),
}

/// Misuse of the energy accumulator.
///
/// These never stem from trace data: the engine only hands the accumulator
/// durations it has already ordered, so a violation is an engine defect.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
pub enum ContractViolation {
    /// A negative duration was charged.
    #[error("negative duration {duration_ns} ns charged to {category}")]
    NegativeDuration {
        /// Category being charged.
        category: EnergyCategory,
        /// Offending duration.
        duration_ns: f64,
    },

    /// A delta would make a running total decrease.
    #[error("energy delta {energy_nj} nJ would decrease the {category} total")]
    NegativeEnergy {
        /// Category being charged.
        category: EnergyCategory,
        /// Offending delta.
        energy_nj: f64,
    },

    /// A delta is NaN or infinite.
    #[error("non-finite energy charged to {category}")]
    NonFinite {
        /// Category being charged.
        category: EnergyCategory,
    },
}
