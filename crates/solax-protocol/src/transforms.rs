//! Register decoding functions.
//!
//! Registers arrive as unsigned 16-bit magnitudes carried in JSON numbers.
//! Every function here is pure so a sensor table can hold plain `fn` pointers.

/// Values at or above this threshold encode negative quantities.
pub const SIGNED_THRESHOLD: f64 = 32_768.0;
const U16_RANGE: f64 = 65_536.0;

/// Rollover of a 16-bit accumulator counting 0.1 kWh.
pub const DECI_KWH_OVERFLOW: f64 = U16_RANGE / 10.0;
/// Rollover of a 16-bit accumulator counting 0.01 kWh.
pub const CENTI_KWH_OVERFLOW: f64 = U16_RANGE / 100.0;

pub fn div10(value: f64) -> f64 {
    value / 10.0
}

pub fn div100(value: f64) -> f64 {
    value / 100.0
}

pub fn to_signed(value: f64) -> f64 {
    if value >= SIGNED_THRESHOLD {
        value - U16_RANGE
    } else {
        value
    }
}

pub fn twoway_div10(value: f64) -> f64 {
    div10(to_signed(value))
}

pub fn twoway_div100(value: f64) -> f64 {
    div100(to_signed(value))
}

fn deci_kwh_with_resets(low: f64, resets: f64) -> f64 {
    div10(low) + resets * DECI_KWH_OVERFLOW
}

pub fn total_energy(low: f64, resets: f64) -> f64 {
    deci_kwh_with_resets(low, resets)
}

pub fn discharge_energy(low: f64, resets: f64) -> f64 {
    deci_kwh_with_resets(low, resets)
}

pub fn charge_energy(low: f64, resets: f64) -> f64 {
    deci_kwh_with_resets(low, resets)
}

pub fn feedin_energy(low: f64, resets: f64) -> f64 {
    div100(low) + resets * CENTI_KWH_OVERFLOW
}

pub fn consumption(low: f64, resets: f64) -> f64 {
    deci_kwh_with_resets(low, resets)
}

pub fn eps_total_energy(low: f64, resets: f64) -> f64 {
    deci_kwh_with_resets(low, resets)
}

pub fn pv_energy(low: f64, resets: f64) -> f64 {
    deci_kwh_with_resets(low, resets)
}
