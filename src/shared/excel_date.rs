//! Spreadsheet serial dates (1900 date system)
//!
//! Serial 1 is 1900-01-01 in the spreadsheet's own calendar, which counts a
//! non-existent 1900-02-29. Anchoring at 1899-12-30 gives correct dates from
//! serial 61 (1900-03-01) onwards, which covers any real-world data.

use chrono::{Duration, NaiveDate, NaiveDateTime};

/// First serial after year 9999
const MAX_SERIAL: f64 = 2_958_466.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn epoch() -> Option<NaiveDateTime> {
    NaiveDate::from_ymd_opt(1899, 12, 30).and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Convert a serial day number into a date-time
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial >= MAX_SERIAL {
        return None;
    }

    let days = serial.trunc();
    let seconds = ((serial - days) * SECONDS_PER_DAY).round() as i64;

    epoch()?
        .checked_add_signed(Duration::days(days as i64))?
        .checked_add_signed(Duration::seconds(seconds))
}

/// ISO text for a serial: `YYYY-MM-DD`, or `YYYY-MM-DDTHH:MM:SS` when it carries a time
pub fn serial_to_iso(serial: f64) -> Option<String> {
    let datetime = serial_to_datetime(serial)?;
    if serial.fract() == 0.0 {
        Some(datetime.format("%Y-%m-%d").to_string())
    } else {
        Some(datetime.format("%Y-%m-%dT%H:%M:%S").to_string())
    }
}
