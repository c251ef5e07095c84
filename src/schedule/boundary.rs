//! Candle boundary alignment.
//
//  This module is deliberately pure: no async, no IO.

/// Scan intervals the engine will align to, in minutes.
pub const SUPPORTED_INTERVALS_MIN: [u32; 5] = [1, 5, 15, 30, 60];

pub fn is_supported(interval_min: u32) -> bool {
    SUPPORTED_INTERVALS_MIN.contains(&interval_min)
}

/// Milliseconds until the next wall-clock instant aligned to
/// `interval_min` (minute-of-hour multiple, seconds and millis zeroed).
///
/// Unix epoch time is hour-aligned in UTC, so "minute-of-hour multiple"
/// reduces to "multiple of the interval since the epoch" for every
/// supported interval, hour rollover included.
///
/// Returns a value in `(0, interval_min * 60_000]`: exactly on a boundary
/// the *next* boundary is a full interval away. Callers decide due-ness
/// with an epsilon, so the instant just before a boundary still fires.
pub fn time_until_boundary(now_ms: i64, interval_min: u32) -> i64 {
    let interval_ms = i64::from(interval_min) * 60_000;
    let rem = now_ms.rem_euclid(interval_ms);
    interval_ms - rem
}

/// Absolute timestamp (epoch ms) of the next boundary.
///
/// Used as a sweep identity so one boundary triggers at most one sweep.
pub fn next_boundary_ms(now_ms: i64, interval_min: u32) -> i64 {
    now_ms + time_until_boundary(now_ms, interval_min)
}

/// Render a countdown as zero-padded `MM:SS`.
pub fn format_countdown(ms: i64) -> String {
    let ms = ms.max(0);
    let mins = ms / 60_000;
    let secs = (ms % 60_000) / 1_000;
    format!("{mins:02}:{secs:02}")
}
