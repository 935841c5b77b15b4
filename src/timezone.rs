//! Timezone lookup and parsing of the ISO-8601 timestamps sent by the backend.

use time::{
    Date, OffsetDateTime, PrimitiveDateTime, UtcOffset,
    format_description::{BorrowedFormatItem, well_known::Iso8601},
    macros::format_description,
};
use time_tz::{Offset, TimeZone};

use crate::Error;

/// Date and time as operators expect to read it, e.g. "01/03/2025, 11:15".
pub const LOCAL_DATE_TIME_FORMAT: &[BorrowedFormatItem] =
    format_description!("[day]/[month]/[year], [hour]:[minute]");

pub fn get_local_offset(canonical_timezone: &str) -> Option<UtcOffset> {
    time_tz::timezones::get_by_name(canonical_timezone)
        .map(|tz| tz.get_offset_utc(&OffsetDateTime::now_utc()).to_utc())
}

/// Like [get_local_offset], but logs and returns [Error::InvalidTimezoneError]
/// for an unknown timezone.
pub fn local_offset_or_error(canonical_timezone: &str) -> Result<UtcOffset, Error> {
    get_local_offset(canonical_timezone).ok_or_else(|| {
        tracing::error!("Invalid timezone {canonical_timezone}");
        Error::InvalidTimezoneError(canonical_timezone.to_owned())
    })
}

/// Parse an ISO-8601 timestamp.
///
/// Timestamps without an offset are taken to be in `assumed_offset`, and a
/// bare date is taken to be midnight UTC.
pub fn parse_timestamp(value: &str, assumed_offset: UtcOffset) -> Option<OffsetDateTime> {
    let value = value.trim();

    if let Ok(date_time) = OffsetDateTime::parse(value, &Iso8601::DEFAULT) {
        return Some(date_time);
    }

    if let Ok(date_time) = PrimitiveDateTime::parse(value, &Iso8601::DEFAULT) {
        return Some(date_time.assume_offset(assumed_offset));
    }

    Date::parse(value, &Iso8601::DEFAULT)
        .ok()
        .map(|date| date.midnight().assume_utc())
}

/// Format `value` as a local date and time, or `None` if it is not a valid timestamp.
pub fn format_local_timestamp(value: &str, local_offset: UtcOffset) -> Option<String> {
    parse_timestamp(value, local_offset)?
        .to_offset(local_offset)
        .format(LOCAL_DATE_TIME_FORMAT)
        .ok()
}
