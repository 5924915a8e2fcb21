//! Significant-figure rounding for derived frequencies.
//!
//! Allele frequencies are rounded from the exact `count / total` ratio in
//! integer arithmetic, ties half-to-even, so `23/40 = 0.575` becomes `0.58`
//! and `9/40 = 0.225` becomes `0.22` regardless of how the quotient would be
//! represented as a float.

/// Significant figures kept on every stored frequency.
pub const FREQUENCY_SIG_FIGS: u32 = 2;

/// Rounds `value` to `figures` significant figures.
///
/// Rounding is applied to the exact binary value of `value`, ties to even,
/// so `0.575_f64` (stored just below the tie) becomes `0.57`. Zero and
/// non-finite inputs are returned unchanged; `figures` below one is treated
/// as one.
pub fn round_sig_figs(value: f64, figures: u32) -> f64 {
    if value == 0.0 || !value.is_finite() {
        return value;
    }

    let figures = figures.max(1) as i32;
    let magnitude = value.abs().log10().floor() as i32;
    let decimals = figures - magnitude - 1;

    if decimals >= 0 {
        // Float formatting rounds the exact stored value correctly.
        let formatted = format!("{:.*}", decimals as usize, value);
        formatted.parse().unwrap_or(value)
    } else {
        let scale = 10f64.powi(-decimals);
        (value / scale).round_ties_even() * scale
    }
}

/// Rounds `count / total` to [`FREQUENCY_SIG_FIGS`], defining a zero total as 0.
pub fn relative_frequency(count: u64, total: u64) -> f64 {
    if count == 0 || total == 0 {
        return 0.0;
    }
    round_ratio(count, total, FREQUENCY_SIG_FIGS)
}

/// Rounds the exact ratio `count / total` half-to-even at `figures`
/// significant figures.
fn round_ratio(count: u64, total: u64, figures: u32) -> f64 {
    let count = u128::from(count);
    let total = u128::from(total);
    let figures = figures.clamp(1, 18) as i32;

    // `magnitude` is floor(log10(count / total)).
    let mut magnitude = 0i32;
    if count >= total {
        while total * 10u128.pow(magnitude as u32 + 1) <= count {
            magnitude += 1;
        }
    } else {
        while count * 10u128.pow((-magnitude) as u32) < total {
            magnitude -= 1;
        }
    }

    let decimals = figures - magnitude - 1;
    let (numerator, denominator) = if decimals >= 0 {
        (count * 10u128.pow(decimals as u32), total)
    } else {
        (count, total * 10u128.pow((-decimals) as u32))
    };

    let mut digits = numerator / denominator;
    let twice_remainder = 2 * (numerator % denominator);
    if twice_remainder > denominator || (twice_remainder == denominator && digits % 2 == 1) {
        digits += 1;
    }

    if decimals >= 0 {
        digits as f64 / 10f64.powi(decimals)
    } else {
        digits as f64 * 10f64.powi(-decimals)
    }
}
