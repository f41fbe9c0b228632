//! Standard audiometric frequencies
//!
//! The one place the frequency set is defined. Every pipeline stage and any
//! consuming layer (display, validation, review forms) reads it from here.

/// Standard audiometric test frequencies in Hz, ascending.
pub const STANDARD_FREQUENCIES: [u32; 9] = [64, 125, 250, 500, 1000, 2000, 4000, 8000, 16000];

/// Number of standard frequencies (expected markers per ear on a complete chart)
pub const STANDARD_FREQUENCY_COUNT: usize = STANDARD_FREQUENCIES.len();

/// Lowest standard frequency (left edge of the chart)
pub const LOWEST_FREQUENCY_HZ: u32 = STANDARD_FREQUENCIES[0];

/// Highest standard frequency (right edge of the chart)
pub const HIGHEST_FREQUENCY_HZ: u32 = STANDARD_FREQUENCIES[STANDARD_FREQUENCY_COUNT - 1];

/// Check whether a value belongs to the standard set
pub fn is_standard_frequency(frequency_hz: u32) -> bool {
    STANDARD_FREQUENCIES.contains(&frequency_hz)
}

/// Snap a noisy frequency estimate to the nearest standard frequency.
///
/// Distance is measured in log10 space because the chart's x-axis is
/// logarithmic. This differs from nearest-in-Hz: 187.5 Hz, the linear
/// midpoint of 125 and 250, snaps to 250 here because the boundary between
/// two neighbors is their geometric mean (about 176.8 Hz for that pair).
/// On an exact tie the lower frequency wins. Non-positive or
/// non-finite estimates snap to the lowest frequency.
pub fn snap_to_standard(frequency_hz: f64) -> u32 {
    if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
        return LOWEST_FREQUENCY_HZ;
    }

    let log_freq = frequency_hz.log10();
    let mut best = LOWEST_FREQUENCY_HZ;
    let mut best_distance = f64::INFINITY;

    for &standard in &STANDARD_FREQUENCIES {
        let distance = (log_freq - f64::from(standard).log10()).abs();
        // Strict comparison keeps the earlier (lower) frequency on ties
        if distance < best_distance {
            best = standard;
            best_distance = distance;
        }
    }

    best
}

/// Snap an estimate, rejecting it when it lies more than `max_octaves`
/// beyond either end of the standard range.
pub fn snap_within_range(frequency_hz: f64, max_octaves: f64) -> Option<u32> {
    if !(frequency_hz.is_finite() && frequency_hz > 0.0) {
        return None;
    }

    let below = (f64::from(LOWEST_FREQUENCY_HZ) / frequency_hz).log2();
    let above = (frequency_hz / f64::from(HIGHEST_FREQUENCY_HZ)).log2();
    if below > max_octaves || above > max_octaves {
        return None;
    }

    Some(snap_to_standard(frequency_hz))
}
