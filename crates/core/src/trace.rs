//! Command trace model.
//!
//! Defines the closed set of DRAM commands, the normalized events the engine
//! consumes, and the on-disk workload records they are built from.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::common::error::{Result, SimError};
use crate::spec::TimingSpec;

/// DRAM command kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CommandKind {
    /// Activate a row.
    Act,
    /// Read burst.
    Rd,
    /// Write burst.
    Wr,
    /// Precharge one bank.
    Pre,
    /// Precharge every bank of a rank.
    PreA,
    /// All-bank refresh.
    Ref,
    /// Per-bank refresh.
    RefPb,
    /// Power-down entry.
    PowerDownEntry,
    /// Power-down exit.
    PowerDownExit,
    /// Self-refresh entry.
    SelfRefreshEntry,
    /// Self-refresh exit.
    SelfRefreshExit,
    /// End of simulation.
    End,
}

impl CommandKind {
    /// Every command kind, in declaration order.
    pub const ALL: [Self; 12] = [
        Self::Act,
        Self::Rd,
        Self::Wr,
        Self::Pre,
        Self::PreA,
        Self::Ref,
        Self::RefPb,
        Self::PowerDownEntry,
        Self::PowerDownExit,
        Self::SelfRefreshEntry,
        Self::SelfRefreshExit,
        Self::End,
    ];

    /// Trace mnemonic.
    pub const fn mnemonic(self) -> &'static str {
        match self {
            Self::Act => "ACT",
            Self::Rd => "RD",
            Self::Wr => "WR",
            Self::Pre => "PRE",
            Self::PreA => "PREA",
            Self::Ref => "REF",
            Self::RefPb => "REFPB",
            Self::PowerDownEntry => "PDE",
            Self::PowerDownExit => "PDX",
            Self::SelfRefreshEntry => "SRE",
            Self::SelfRefreshExit => "SRX",
            Self::End => "END_OF_SIMULATION",
        }
    }

    /// True for commands addressed to a single bank.
    pub const fn is_bank_command(self) -> bool {
        matches!(self, Self::Act | Self::Rd | Self::Wr | Self::Pre | Self::RefPb)
    }

    /// True for RD and WR.
    pub const fn is_column_access(self) -> bool {
        matches!(self, Self::Rd | Self::Wr)
    }
}

impl fmt::Display for CommandKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

impl Serialize for CommandKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.mnemonic())
    }
}

impl FromStr for CommandKind {
    type Err = SimError;

    fn from_str(s: &str) -> Result<Self> {
        let kind = match s.trim().to_ascii_uppercase().as_str() {
            "ACT" => Self::Act,
            "RD" => Self::Rd,
            "WR" => Self::Wr,
            "PRE" => Self::Pre,
            "PREA" => Self::PreA,
            "REF" | "REFAB" => Self::Ref,
            "REFPB" => Self::RefPb,
            "PDE" | "PDN" => Self::PowerDownEntry,
            "PDX" | "PUP" => Self::PowerDownExit,
            "SRE" | "SR" => Self::SelfRefreshEntry,
            "SRX" => Self::SelfRefreshExit,
            "END" | "END_OF_SIMULATION" => Self::End,
            _ => return Err(SimError::UnknownCommand(s.to_string())),
        };
        Ok(kind)
    }
}

/// A normalized command, timestamped in ns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CommandEvent {
    /// Issue time in ns.
    pub time_ns: f64,
    /// Command kind.
    pub kind: CommandKind,
    /// Target rank.
    pub rank: usize,
    /// Target bank (ignored by rank-level commands).
    pub bank: usize,
    /// Row for ACT, or the row a RD/WR expects to be open.
    pub row: Option<u32>,
    /// Column of a RD/WR.
    pub column: Option<u32>,
    /// Burst length override for RD/WR.
    pub burst_length: Option<u32>,
}

impl CommandEvent {
    /// Creates an event with no row, column or burst override.
    pub const fn new(time_ns: f64, kind: CommandKind, rank: usize, bank: usize) -> Self {
        Self {
            time_ns,
            kind,
            rank,
            bank,
            row: None,
            column: None,
            burst_length: None,
        }
    }

    /// End-of-simulation marker at `time_ns`.
    pub const fn end(time_ns: f64) -> Self {
        Self::new(time_ns, CommandKind::End, 0, 0)
    }

    /// Sets the row.
    #[must_use]
    pub const fn with_row(mut self, row: u32) -> Self {
        self.row = Some(row);
        self
    }

    /// Sets the column.
    #[must_use]
    pub const fn with_column(mut self, column: u32) -> Self {
        self.column = Some(column);
        self
    }

    /// Sets the burst length override.
    #[must_use]
    pub const fn with_burst_length(mut self, burst_length: u32) -> Self {
        self.burst_length = Some(burst_length);
        self
    }
}

/// Unit of workload timestamps on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    /// Clock cycles, scaled by tCK.
    #[default]
    Cycles,
    /// Nanoseconds.
    Ns,
}

/// DQ toggle statistics supplied with the workload.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleRates {
    /// Fraction of DQ bits toggling per beat during reads.
    #[serde(default = "ToggleRates::default_rate")]
    pub read: f64,
    /// Fraction of DQ bits toggling per beat during writes.
    #[serde(default = "ToggleRates::default_rate")]
    pub write: f64,
    /// Fraction of a read burst with ODT engaged.
    #[serde(default = "ToggleRates::default_rate")]
    pub read_duty_cycle: f64,
    /// Fraction of a write burst with ODT engaged.
    #[serde(default = "ToggleRates::default_rate")]
    pub write_duty_cycle: f64,
}

impl ToggleRates {
    fn default_rate() -> f64 {
        0.5
    }
}

impl Default for ToggleRates {
    fn default() -> Self {
        Self {
            read: 0.5,
            write: 0.5,
            read_duty_cycle: 0.5,
            write_duty_cycle: 0.5,
        }
    }
}

/// Run metadata accompanying a trace.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkloadMetadata {
    /// Data rate in MT/s.
    #[serde(default = "WorkloadMetadata::default_data_rate")]
    pub data_rate: u32,
    /// Operating temperature in °C.
    #[serde(default = "WorkloadMetadata::default_temperature")]
    pub temperature: f64,
    /// Timestamp unit of the command records.
    #[serde(default)]
    pub time_unit: TimeUnit,
    /// DQ toggle statistics.
    #[serde(default)]
    pub toggle_rates: ToggleRates,
}

impl WorkloadMetadata {
    fn default_data_rate() -> u32 {
        6400
    }

    fn default_temperature() -> f64 {
        50.0
    }
}

impl Default for WorkloadMetadata {
    fn default() -> Self {
        Self {
            data_rate: Self::default_data_rate(),
            temperature: Self::default_temperature(),
            time_unit: TimeUnit::Cycles,
            toggle_rates: ToggleRates::default(),
        }
    }
}

/// One command as written in a workload file.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceRecord {
    /// Issue time in the workload's [`TimeUnit`].
    pub timestamp: f64,
    /// Command mnemonic.
    pub command: String,
    /// Target rank; rank 0 when omitted.
    #[serde(default)]
    pub rank: Option<usize>,
    /// Target bank.
    #[serde(default)]
    pub bank: Option<usize>,
    /// Row address.
    #[serde(default)]
    pub row: Option<u32>,
    /// Column address.
    #[serde(default)]
    pub column: Option<u32>,
    /// Burst length override.
    #[serde(default)]
    pub burst_length: Option<u32>,
}

/// A workload file: command records plus metadata.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct Workload {
    /// Command records in file order.
    #[serde(default)]
    pub commands: Vec<TraceRecord>,
    /// Run metadata.
    #[serde(default)]
    pub metadata: WorkloadMetadata,
}

impl Workload {
    /// Converts the records into engine events timestamped in ns.
    ///
    /// Records keep their file order; ordering is checked by the engine.
    /// Bank-level commands without a bank, ACT without a row and zero-beat
    /// burst overrides are rejected.
    pub fn to_events(&self, timing: &TimingSpec) -> Result<Vec<CommandEvent>> {
        let scale = match self.metadata.time_unit {
            TimeUnit::Cycles => timing.tck,
            TimeUnit::Ns => 1.0,
        };
        self.commands
            .iter()
            .enumerate()
            .map(|(index, record)| {
                let kind: CommandKind = record.command.parse()?;
                let bank = match (record.bank, kind.is_bank_command()) {
                    (Some(bank), _) => bank,
                    (None, false) => 0,
                    (None, true) => {
                        return Err(SimError::MissingField {
                            index,
                            command: kind,
                            field: "bank",
                        });
                    }
                };
                if kind == CommandKind::Act && record.row.is_none() {
                    return Err(SimError::MissingField {
                        index,
                        command: kind,
                        field: "row",
                    });
                }
                if record.burst_length == Some(0) {
                    return Err(SimError::ZeroBurstLength { index, command: kind });
                }
                Ok(CommandEvent {
                    time_ns: record.timestamp * scale,
                    kind,
                    rank: record.rank.unwrap_or(0),
                    bank,
                    row: record.row,
                    column: record.column,
                    burst_length: record.burst_length,
                })
            })
            .collect()
    }
}
