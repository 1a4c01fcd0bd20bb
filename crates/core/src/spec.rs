//! Device specification model.
//!
//! An immutable description of one DRAM configuration, produced by the
//! loader (or built in code) and read by every other component:
//! 1. **Power:** IDD currents, rail voltages and a temperature coefficient.
//! 2. **Timing:** JEDEC intervals, all in ns.
//! 3. **Architecture:** Rank/bank geometry, data width, burst length and refresh mode.

use serde::Deserialize;

use crate::common::error::SpecError;

/// Default timing values (ns) applied when the datasheet omits them.
mod defaults {
    pub const TREFI: f64 = 7800.0;
    pub const TWR: f64 = 15.0;
    pub const TWTR: f64 = 7.5;
    pub const TRRD: f64 = 4.7;
    pub const TFAW: f64 = 13.75;
    pub const TXP: f64 = 5.0;
    pub const TXSDR: f64 = 70.0;
    /// tXSDLL is a clock count on DDR datasheets.
    pub const TXSDLL_CYCLES: f64 = 512.0;

    pub const REFERENCE_TEMPERATURE: f64 = 50.0;

    pub const RANKS: usize = 1;
    pub const BANKS: usize = 16;
    pub const COLUMNS: usize = 1024;
    pub const ROWS: usize = 65536;
    pub const WIDTH: usize = 64;
    pub const BURST_LENGTH: u32 = 16;
    pub const DENSITY_GBIT: u32 = 16;
}

/// Refresh granularity, fixed for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum RefreshMode {
    /// REF refreshes every bank of a rank for tRFC.
    #[default]
    AllBank,
    /// REFpb refreshes one bank for tRFCpb (LPDDR5).
    PerBank,
}

impl std::fmt::Display for RefreshMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllBank => f.write_str("all-bank"),
            Self::PerBank => f.write_str("per-bank"),
        }
    }
}

/// Datasheet currents (mA) and voltages (V).
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PowerSpec {
    /// Activate-precharge cycle current.
    pub idd0: f64,
    /// Precharged standby current.
    pub idd2n: f64,
    /// Precharged power-down current.
    pub idd2p: f64,
    /// Active standby current.
    pub idd3n: f64,
    /// Active power-down current.
    pub idd3p: f64,
    /// Burst read current.
    pub idd4r: f64,
    /// Burst write current.
    pub idd4w: f64,
    /// Burst refresh current.
    pub idd5b: f64,
    /// Self-refresh current.
    pub idd6: f64,
    /// Core supply.
    pub vdd: f64,
    /// I/O supply.
    pub vddq: f64,
    /// Command/address supply.
    pub vddca: f64,
    /// Temperature (°C) at which the currents were characterized.
    #[serde(default = "PowerSpec::default_temperature")]
    pub temperature: f64,
    /// Relative current change per °C away from `temperature`.
    #[serde(default, rename = "temperatureCoefficient", alias = "tempcoeff")]
    pub temperature_coefficient: f64,
}

impl PowerSpec {
    fn default_temperature() -> f64 {
        defaults::REFERENCE_TEMPERATURE
    }

    /// Returns the currents scaled to the operating `temperature`.
    ///
    /// Every IDD value is multiplied by `1 + coefficient × (temperature − reference)`,
    /// clamped at zero. Voltages are unchanged.
    #[must_use]
    pub fn derated(&self, temperature: f64) -> Self {
        let factor = (1.0 + self.temperature_coefficient * (temperature - self.temperature)).max(0.0);
        Self {
            idd0: self.idd0 * factor,
            idd2n: self.idd2n * factor,
            idd2p: self.idd2p * factor,
            idd3n: self.idd3n * factor,
            idd3p: self.idd3p * factor,
            idd4r: self.idd4r * factor,
            idd4w: self.idd4w * factor,
            idd5b: self.idd5b * factor,
            idd6: self.idd6 * factor,
            temperature,
            ..*self
        }
    }

    fn validate(&self) -> Result<(), SpecError> {
        let currents = [
            ("idd0", self.idd0),
            ("idd2n", self.idd2n),
            ("idd2p", self.idd2p),
            ("idd3n", self.idd3n),
            ("idd3p", self.idd3p),
            ("idd4r", self.idd4r),
            ("idd4w", self.idd4w),
            ("idd5b", self.idd5b),
            ("idd6", self.idd6),
        ];
        for (field, value) in currents {
            if !(value >= 0.0) {
                return Err(SpecError::Negative { field, value });
            }
        }
        for (field, value) in [("vdd", self.vdd), ("vddq", self.vddq), ("vddca", self.vddca)] {
            if !(value > 0.0) {
                return Err(SpecError::NonPositive { field, value });
            }
        }
        for (high, high_value) in [("idd0", self.idd0), ("idd4r", self.idd4r), ("idd4w", self.idd4w)] {
            if high_value < self.idd3n {
                return Err(SpecError::CurrentOrder {
                    high,
                    high_value,
                    low: "idd3n",
                    low_value: self.idd3n,
                });
            }
        }
        Ok(())
    }
}

/// JEDEC timing parameters in ns.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct TimingSpec {
    /// Clock period.
    pub tck: f64,
    /// Minimum ACT to PRE on a bank.
    pub tras: f64,
    /// Precharge period.
    pub trp: f64,
    /// ACT to RD/WR delay.
    pub trcd: f64,
    /// ACT to ACT on the same bank; derived as tRAS + tRP when absent.
    #[serde(default)]
    pub trc: Option<f64>,
    /// All-bank refresh cycle time.
    pub trfc: f64,
    /// Per-bank refresh cycle time.
    #[serde(default)]
    pub trfcpb: Option<f64>,
    /// Average refresh interval.
    #[serde(default = "TimingSpec::default_trefi", alias = "trfi")]
    pub trefi: f64,
    /// Write recovery before PRE.
    #[serde(default = "TimingSpec::default_twr")]
    pub twr: f64,
    /// Read/write turnaround on a rank.
    #[serde(default = "TimingSpec::default_twtr")]
    pub twtr: f64,
    /// ACT to ACT on different banks of a rank.
    #[serde(default = "TimingSpec::default_trrd")]
    pub trrd: f64,
    /// Window holding at most four ACTs per rank.
    #[serde(default = "TimingSpec::default_tfaw")]
    pub tfaw: f64,
    /// Power-down exit to next command.
    #[serde(default = "TimingSpec::default_txp")]
    pub txp: f64,
    /// Self-refresh exit to next non-DLL command.
    #[serde(default = "TimingSpec::default_txsdr")]
    pub txsdr: f64,
    /// Self-refresh exit to next RD/WR; defaults to 512 tCK.
    #[serde(default)]
    pub txsdll: Option<f64>,
}

impl TimingSpec {
    fn default_trefi() -> f64 {
        defaults::TREFI
    }

    fn default_twr() -> f64 {
        defaults::TWR
    }

    fn default_twtr() -> f64 {
        defaults::TWTR
    }

    fn default_trrd() -> f64 {
        defaults::TRRD
    }

    fn default_tfaw() -> f64 {
        defaults::TFAW
    }

    fn default_txp() -> f64 {
        defaults::TXP
    }

    fn default_txsdr() -> f64 {
        defaults::TXSDR
    }

    /// Row cycle time: the datasheet tRC, or tRAS + tRP when absent.
    pub fn row_cycle(&self) -> f64 {
        self.trc.unwrap_or(self.tras + self.trp)
    }

    /// Self-refresh exit delay for DLL-dependent commands.
    pub fn txsdll_ns(&self) -> f64 {
        self.txsdll.unwrap_or(defaults::TXSDLL_CYCLES * self.tck)
    }

    /// Refresh cycle time for the given mode.
    ///
    /// Per-bank mode falls back to tRFC when tRFCpb is unset; validation
    /// rejects that combination before a run starts.
    pub fn refresh_cycle(&self, mode: RefreshMode) -> f64 {
        match mode {
            RefreshMode::AllBank => self.trfc,
            RefreshMode::PerBank => self.trfcpb.unwrap_or(self.trfc),
        }
    }

    fn validate(&self, mode: RefreshMode) -> Result<(), SpecError> {
        for (field, value) in [("tck", self.tck), ("trfc", self.trfc), ("trefi", self.trefi)] {
            if !(value > 0.0) {
                return Err(SpecError::NonPositive { field, value });
            }
        }
        let durations = [
            ("tras", self.tras),
            ("trp", self.trp),
            ("trcd", self.trcd),
            ("twr", self.twr),
            ("twtr", self.twtr),
            ("trrd", self.trrd),
            ("tfaw", self.tfaw),
            ("txp", self.txp),
            ("txsdr", self.txsdr),
        ];
        for (field, value) in durations {
            if !(value >= 0.0) {
                return Err(SpecError::Negative { field, value });
            }
        }
        if let Some(trc) = self.trc {
            let expected = self.tras + self.trp;
            if (trc - expected).abs() > 1e-6 * expected.max(1.0) {
                return Err(SpecError::RowCycleMismatch { trc, expected });
            }
        }
        match (mode, self.trfcpb) {
            (RefreshMode::PerBank, None) => Err(SpecError::MissingPerBankTiming("trfcpb")),
            (_, Some(value)) if !(value > 0.0) => Err(SpecError::NonPositive { field: "trfcpb", value }),
            _ => Ok(()),
        }
    }
}

/// Device geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Architecture {
    /// Number of ranks.
    #[serde(default = "Architecture::default_ranks")]
    pub nbr_of_ranks: usize,
    /// Banks per rank.
    #[serde(default = "Architecture::default_banks")]
    pub nbr_of_banks: usize,
    /// Columns per row.
    #[serde(default = "Architecture::default_columns")]
    pub nbr_of_columns: usize,
    /// Rows per bank.
    #[serde(default = "Architecture::default_rows")]
    pub nbr_of_rows: usize,
    /// Data bus width in bits.
    #[serde(default = "Architecture::default_width")]
    pub width: usize,
    /// Beats per RD/WR burst.
    #[serde(default = "Architecture::default_burst_length")]
    pub burst_length: u32,
    /// Die density in Gbit.
    #[serde(default = "Architecture::default_density")]
    pub density: u32,
    /// All-bank or per-bank refresh.
    #[serde(default)]
    pub refresh_mode: RefreshMode,
}

impl Architecture {
    fn default_ranks() -> usize {
        defaults::RANKS
    }

    fn default_banks() -> usize {
        defaults::BANKS
    }

    fn default_columns() -> usize {
        defaults::COLUMNS
    }

    fn default_rows() -> usize {
        defaults::ROWS
    }

    fn default_width() -> usize {
        defaults::WIDTH
    }

    fn default_burst_length() -> u32 {
        defaults::BURST_LENGTH
    }

    fn default_density() -> u32 {
        defaults::DENSITY_GBIT
    }

    /// Bytes moved by one burst of `burst_length` beats.
    pub fn burst_bytes(&self, burst_length: u32) -> u64 {
        u64::from(burst_length) * self.width as u64 / 8
    }

    fn validate(&self) -> Result<(), SpecError> {
        let dims = [
            ("nbrOfRanks", self.nbr_of_ranks),
            ("nbrOfBanks", self.nbr_of_banks),
            ("nbrOfRows", self.nbr_of_rows),
            ("width", self.width),
            ("burstLength", self.burst_length as usize),
        ];
        for (field, value) in dims {
            if value == 0 {
                return Err(SpecError::ZeroDimension(field));
            }
        }
        Ok(())
    }
}

impl Default for Architecture {
    fn default() -> Self {
        Self {
            nbr_of_ranks: defaults::RANKS,
            nbr_of_banks: defaults::BANKS,
            nbr_of_columns: defaults::COLUMNS,
            nbr_of_rows: defaults::ROWS,
            width: defaults::WIDTH,
            burst_length: defaults::BURST_LENGTH,
            density: defaults::DENSITY_GBIT,
            refresh_mode: RefreshMode::AllBank,
        }
    }
}

/// Complete device specification.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct MemorySpec {
    /// Currents and voltages.
    #[serde(rename = "mempowerspec", alias = "power")]
    pub power: PowerSpec,
    /// Timing parameters.
    #[serde(rename = "memtimingspec", alias = "timing")]
    pub timing: TimingSpec,
    /// Geometry and refresh mode.
    #[serde(default)]
    pub architecture: Architecture,
}

impl MemorySpec {
    /// Checks the physical and JEDEC invariants the engine relies on.
    pub fn validate(&self) -> Result<(), SpecError> {
        self.power.validate()?;
        self.timing.validate(self.architecture.refresh_mode)?;
        self.architecture.validate()
    }

    /// Refresh mode of the run.
    pub fn refresh_mode(&self) -> RefreshMode {
        self.architecture.refresh_mode
    }
}
