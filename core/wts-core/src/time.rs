//! `SYSTEMTIME` decoding.

use crate::error::{WtsError, WtsResult};
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};

/// `SYSTEMTIME`: year, month, day-of-week, day, hour, minute, second,
/// milliseconds.
pub type SystemTime = [u16; 8];

/// Decodes a `SYSTEMTIME` in the service's local time.
///
/// An all-zero structure means "no time" and decodes as `None`. The
/// day-of-week field is ignored.
pub fn from_system_time(st: &SystemTime) -> WtsResult<Option<NaiveDateTime>> {
    if st.iter().all(|v| *v == 0) {
        return Ok(None);
    }
    let [year, month, _, day, hour, minute, second, millis] = *st;

    let date = NaiveDate::from_ymd_opt(i32::from(year), u32::from(month), u32::from(day))
        .ok_or_else(|| WtsError::InvalidTime(format!("{year:04}-{month:02}-{day:02}")))?;
    let at = date
        .and_hms_milli_opt(
            u32::from(hour),
            u32::from(minute),
            u32::from(second),
            u32::from(millis),
        )
        .ok_or_else(|| {
            WtsError::InvalidTime(format!("{hour:02}:{minute:02}:{second:02}.{millis:03}"))
        })?;
    Ok(Some(at))
}

/// Encodes `at` as a `SYSTEMTIME`. Years outside `0..=65535` saturate.
pub fn to_system_time(at: &NaiveDateTime) -> SystemTime {
    let year = u16::try_from(at.year().max(0)).unwrap_or(u16::MAX);
    [
        year,
        at.month() as u16,
        at.weekday().num_days_from_sunday() as u16,
        at.day() as u16,
        at.hour() as u16,
        at.minute() as u16,
        at.second() as u16,
        (at.nanosecond() / 1_000_000).min(999) as u16,
    ]
}
