//! Numeric formatting helpers shared by report types.
//!
//! Values are rounded to fixed hundredths with integer arithmetic so that
//! `12345 m` renders as `12.35 km` instead of drifting on binary floats.

/// Round `value` to the nearest hundredth, returned as an integer count of hundredths.
///
/// Halves round away from zero.
pub fn round_hundredths(value: f64) -> i64 {
    (value * 100.0).round() as i64
}

/// Convert meters to hundredths of a kilometer (`12345.0` -> `1235`).
pub fn meters_to_km_hundredths(meters: f64) -> i64 {
    // One hundredth of a kilometer is ten meters
    (meters / 10.0).round() as i64
}

/// Format a hundredths count with exactly two decimals (`1235` -> `"12.35"`).
pub fn format_hundredths(hundredths: i64) -> String {
    let sign = if hundredths < 0 { "-" } else { "" };
    let abs = hundredths.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
