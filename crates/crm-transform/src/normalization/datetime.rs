//! Date and datetime parsing.
//!
//! Input layouts are tried in order; the first that consumes the whole
//! value wins. Output is always the API form.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// Accepted date layouts, in priority order. Month-first wins over
/// day-first for ambiguous values such as `03/04/2024`.
pub const DATE_FORMATS: [&str; 4] = ["%Y-%m-%d", "%m/%d/%Y", "%d/%m/%Y", "%m-%d-%Y"];

/// Accepted datetime layouts, in priority order.
pub const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%m/%d/%Y %H:%M:%S"];

const DATE_OUTPUT: &str = "%Y-%m-%d";
const DATETIME_OUTPUT: &str = "%Y-%m-%dT%H:%M:%S.000+0000";

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
}

/// Parse a datetime, falling back to an ISO date at midnight.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, DATE_OUTPUT)
                .ok()
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_OUTPUT).to_string()
}

/// Seconds precision with a literal UTC offset; the source carries no zone.
pub fn format_datetime(value: NaiveDateTime) -> String {
    value.format(DATETIME_OUTPUT).to_string()
}
