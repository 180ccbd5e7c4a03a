//! Date and time normalization for the questionnaire spreadsheets.
//!
//! Dates are entered as separate day, month and year cells and times as a time-of-day cell (or
//! text). They are wall-clock times in the study's time zone, and are stored as epoch seconds.
//! Anything that doesn't make a valid local time is treated as missing rather than an error.
use crate::sheet::Cell;
use chrono::{LocalResult, Month, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use qu::ick_use::*;
use regex::Regex;

/// Text formats accepted for a time of day typed into a cell.
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M", "%I:%M:%S %p", "%I:%M %p"];

static TIME_OF_DAY: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d\d:\d\d:\d\d").unwrap());

/// Parse a time zone name like `America/New_York`.
pub fn parse_tz(name: &str) -> Result<Tz> {
    name.parse::<Tz>()
        .map_err(|e| format_err!("unknown time zone \"{}\": {}", name, e))
}

/// Whether the cell holds a complete `hh:mm:ss` time of day.
///
/// Diary rows are only kept when this is true, which filters out half-filled rows.
pub fn is_time_of_day(cell: &Cell) -> bool {
    match cell.as_text() {
        Some(text) => TIME_OF_DAY.is_match(&text),
        None => false,
    }
}

/// Month from a number (`5`) or an english name (`May`, `may`, `Sep`).
pub fn month_number(cell: &Cell) -> Option<u32> {
    if let Some(month) = cell.as_int() {
        return (1..=12).contains(&month).then(|| month as u32);
    }
    let text = cell.as_text()?;
    let month: Month = text.parse().ok()?;
    Some(month.number_from_month())
}

/// Combine day, month and year cells into a date.
pub fn cell_date(day: &Cell, month: &Cell, year: &Cell) -> Option<NaiveDate> {
    let day = u32::try_from(day.as_int()?).ok()?;
    let month = month_number(month)?;
    let year = i32::try_from(year.as_int()?).ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// A date as `YYYY-MM-DD`, or `None` unless all three parts are present and valid.
pub fn iso_date(day: &Cell, month: &Cell, year: &Cell) -> Option<String> {
    if day.is_missing() || month.is_missing() || year.is_missing() {
        return None;
    }
    Some(cell_date(day, month, year)?.format("%Y-%m-%d").to_string())
}

/// The time of day held by a cell.
pub fn cell_time(cell: &Cell) -> Option<NaiveTime> {
    match cell {
        Cell::Time(t) => Some(*t),
        Cell::DateTime(dt) => Some(dt.time()),
        // an unformatted time cell shows up as the fraction of a day
        Cell::Number(v) if (0. ..1.).contains(v) => {
            NaiveTime::from_num_seconds_from_midnight_opt((v * 86_400.).round() as u32, 0)
        }
        Cell::Text(s) => {
            let s = s.trim();
            TIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveTime::parse_from_str(s, fmt).ok())
        }
        _ => None,
    }
}

/// Epoch seconds for a local wall-clock time.
///
/// Ambiguous times (when clocks go back) resolve to the earlier instant. Times skipped when clocks
/// go forward don't exist and give `None`.
pub fn local_timestamp(tz: Tz, datetime: NaiveDateTime) -> Option<i64> {
    match tz.from_local_datetime(&datetime) {
        LocalResult::Single(dt) => Some(dt.timestamp()),
        LocalResult::Ambiguous(earliest, _) => Some(earliest.timestamp()),
        LocalResult::None => None,
    }
}

/// Epoch seconds for a date that is known and a time-of-day cell.
pub fn anchored_timestamp(tz: Tz, date: Option<NaiveDate>, time: &Cell) -> Option<i64> {
    let time = cell_time(time)?;
    local_timestamp(tz, date?.and_time(time))
}

/// Epoch seconds for a day, month, year and time-of-day group of cells.
pub fn cells_timestamp(tz: Tz, day: &Cell, month: &Cell, year: &Cell, time: &Cell) -> Option<i64> {
    anchored_timestamp(tz, cell_date(day, month, year), time)
}
