//! Shared numeric helpers for forecast values.
//!
//! Temperatures, wind speed and UV index are shown as whole numbers, while
//! precipitation amounts and probabilities are printed as received:
//!
//! - `round_half_up`: nearest integer, halves rounded toward +∞ (`-2.5 → -2`)
//! - `format_amount`: shortest decimal form (`3.2 → "3.2"`, `40.0 → "40"`)
//!
//! Non-finite inputs (NaN, ±Inf) are treated as 0.

/// Round an f64 to the nearest whole number, rounding halves up.
pub(crate) fn round_half_up(v: f64) -> i64 {
    if !v.is_finite() {
        tracing::warn!("round_half_up received non-finite value {}", v);
        return 0;
    }
    // `(v + 0.5).floor()` misrounds 0.49999999999999994 because the sum is
    // not representable; comparing the fraction avoids the addition.
    let floor = v.floor();
    if v - floor >= 0.5 {
        floor as i64 + 1
    } else {
        floor as i64
    }
}

/// Round an optional f64, returning None if input is None.
pub(crate) fn opt_round_half_up(v: Option<f64>) -> Option<i64> {
    v.map(round_half_up)
}

/// Format a measured amount without trailing zeros.
pub(crate) fn format_amount(v: f64) -> String {
    if !v.is_finite() {
        tracing::warn!("format_amount received non-finite value {}", v);
        return "0".to_string();
    }
    // `{}` on f64 already prints the shortest representation that round-trips.
    format!("{}", v)
}
