//! Unit conventions.
//!
//! Currents are mA, voltages V, times ns. With those inputs `I × V × t`
//! yields pJ, so energies are divided by 1000 and reported in nJ.

/// Tolerance applied to inclusive timing comparisons.
///
/// Timestamps normalized from `cycles × tCK` carry rounding error; a command
/// issued exactly at a boundary must still be accepted.
pub const TIMING_EPSILON_NS: f64 = 1e-9;

/// Energy in nJ drawn by `current_ma` at `voltage_v` for `duration_ns`.
#[inline]
pub fn energy_nj(current_ma: f64, voltage_v: f64, duration_ns: f64) -> f64 {
    current_ma * voltage_v * duration_ns / 1000.0
}

/// Average power in mW for `energy_nj` spent over `duration_ns`.
///
/// Returns zero for an empty window.
#[inline]
pub fn average_power_mw(energy_nj: f64, duration_ns: f64) -> f64 {
    if duration_ns > 0.0 {
        energy_nj / duration_ns * 1000.0
    } else {
        0.0
    }
}

/// Formats an energy given in nJ with the largest fitting unit.
pub fn format_energy(energy_nj: f64) -> String {
    if energy_nj >= 1e6 {
        format!("{:.3} mJ", energy_nj / 1e6)
    } else if energy_nj >= 1e3 {
        format!("{:.3} uJ", energy_nj / 1e3)
    } else {
        format!("{energy_nj:.3} nJ")
    }
}

/// Formats a power given in mW.
pub fn format_power(power_mw: f64) -> String {
    if power_mw >= 1000.0 {
        format!("{:.3} W", power_mw / 1000.0)
    } else {
        format!("{power_mw:.3} mW")
    }
}

/// Formats a duration given in ns.
pub fn format_time(time_ns: f64) -> String {
    if time_ns >= 1e6 {
        format!("{:.3} ms", time_ns / 1e6)
    } else if time_ns >= 1e3 {
        format!("{:.3} us", time_ns / 1e3)
    } else {
        format!("{time_ns:.3} ns")
    }
}
