//! # Mission Time
//!
//! Secondary-header timestamps count whole seconds since the Unix epoch, the
//! same value a GNSS receiver reports as its epoch time, plus a 1/65536-second
//! fraction. The 32-bit seconds field runs out in 2106.

use chrono::{DateTime, TimeZone, Utc};

/// Subsecond ticks per second
const SUBSECOND_TICKS: u64 = 1 << 16;

/// Convert a UTC instant to `(epoch_time, subseconds)`
///
/// Instants before 1970 clamp to zero; instants past the 32-bit range saturate.
pub fn to_mission_time(instant: DateTime<Utc>) -> (u32, u16) {
    let seconds = instant.timestamp();
    if seconds < 0 {
        return (0, 0);
    }

    let nanos = instant.timestamp_subsec_nanos().min(999_999_999) as u64;
    let subseconds = (nanos * SUBSECOND_TICKS / 1_000_000_000) as u16;

    (seconds.min(u32::MAX as i64) as u32, subseconds)
}

/// Current mission time
pub fn now() -> (u32, u16) {
    to_mission_time(Utc::now())
}

/// Convert `(epoch_time, subseconds)` back to a UTC instant
pub fn from_mission_time(epoch_time: u32, subseconds: u16) -> DateTime<Utc> {
    let nanos = (subseconds as u64 * 1_000_000_000 / SUBSECOND_TICKS) as u32;
    Utc.timestamp_opt(epoch_time as i64, nanos)
        .single()
        .unwrap_or_default()
}
