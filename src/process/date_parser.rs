use chrono::{Duration, NaiveDate, NaiveDateTime};

/// Serial number of 1970-01-01 in the spreadsheet day count.
pub const UNIX_EPOCH_SERIAL: f64 = 25569.0;

const SECONDS_PER_DAY: f64 = 86_400.0;

fn epoch() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Spreadsheet serial → UTC naive datetime.
/// Whole days are offset from the epoch serial; the fraction is rounded to whole seconds.
pub fn serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() {
        return None;
    }
    let days = serial.floor();
    let secs = ((serial - days) * SECONDS_PER_DAY).round() as i64;
    let day_offset = days as i64 - UNIX_EPOCH_SERIAL as i64;

    epoch()
        .checked_add_signed(Duration::try_days(day_offset)?)?
        .checked_add_signed(Duration::try_seconds(secs)?)
}

/// UTC naive datetime → spreadsheet serial (fractional days).
pub fn datetime_to_serial(dt: NaiveDateTime) -> f64 {
    let secs = (dt - epoch()).num_seconds() as f64;
    secs / SECONDS_PER_DAY + UNIX_EPOCH_SERIAL
}

/// Serial → datetime, but only above the plausibility floor.
pub fn plausible_datetime(serial: f64, min_serial: f64) -> Option<NaiveDateTime> {
    if serial > min_serial {
        serial_to_datetime(serial)
    } else {
        None
    }
}
