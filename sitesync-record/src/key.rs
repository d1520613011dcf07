//! Record key derivation.
//!
//! Keys are TIDs: 13 characters of sortable base32
//! (`234567abcdefghijklmnopqrstuvwxyz`). The first 11 encode microseconds
//! since the Unix epoch, the last 2 encode the clock id. Both parts are
//! left-padded with `2` (the zero digit), so keys sort by time.
//!
//! Only the calendar date of the publish timestamp is used: every edit to a
//! post maps to the same key, and the remote `put` overwrites instead of
//! appending. Two posts published on the same date share a key.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use sitesync_core::{config::MAX_CLOCK_ID, RecordKey};

use crate::error::RecordError;

const ALPHABET: &[u8; 32] = b"234567abcdefghijklmnopqrstuvwxyz";
const TIMESTAMP_WIDTH: usize = 11;
const CLOCK_ID_WIDTH: usize = 2;
/// Timestamps above 2^53 µs do not round-trip through other TID implementations.
const MAX_TIMESTAMP_MICROS: i64 = (1 << 53) - 1;

/// Offset-less date-times, read as UTC.
const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a frontmatter date.
///
/// Accepts `YYYY-MM-DD` (midnight UTC), RFC 3339, and `YYYY-MM-DD HH:MM[:SS]`
/// with either a space or `T` separator and no offset (UTC).
pub fn parse_publish_date(value: &str) -> Result<DateTime<Utc>, RecordError> {
    let value = value.trim();
    if let Ok(date) = NaiveDate::parse_from_str(value, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::MIN).and_utc());
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .map(|dt| dt.and_utc())
        .ok_or_else(|| RecordError::InvalidDate {
            value: value.to_string(),
        })
}

/// Derive the record key for a post's `date` field.
pub fn derive_key(date: &str, clock_id: u16) -> Result<RecordKey, RecordError> {
    let published = parse_publish_date(date)?;
    let day = published.date_naive().and_time(NaiveTime::MIN).and_utc();
    let micros = day.timestamp_micros();
    if !(0..=MAX_TIMESTAMP_MICROS).contains(&micros) {
        return Err(RecordError::DateOutOfRange {
            value: date.trim().to_string(),
        });
    }
    key_from_micros(micros as u64, clock_id)
}

/// Encode a raw `(timestamp, clock id)` pair.
fn key_from_micros(micros: u64, clock_id: u16) -> Result<RecordKey, RecordError> {
    if clock_id > MAX_CLOCK_ID {
        return Err(RecordError::ClockIdOutOfRange { clock_id });
    }
    let mut key = encode_sortable(micros, TIMESTAMP_WIDTH);
    key.push_str(&encode_sortable(u64::from(clock_id), CLOCK_ID_WIDTH));
    Ok(RecordKey(key))
}

fn encode_sortable(mut value: u64, width: usize) -> String {
    let mut digits = Vec::with_capacity(width);
    while value > 0 {
        digits.push(ALPHABET[(value % 32) as usize]);
        value /= 32;
    }
    while digits.len() < width {
        digits.push(ALPHABET[0]);
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use sitesync_core::config::DEFAULT_CLOCK_ID;

    #[rstest]
    #[case("2024-03-15", "3knoysa7s2225")]
    #[case("2024-03-15T00:00:00Z", "3knoysa7s2225")]
    #[case("2024-03-15T18:45:12.250Z", "3knoysa7s2225")]
    #[case("2025-01-01", "3lenax2ss2225")]
    #[case("1970-01-02", "2224kixis2225")]
    #[case("2024-03-15 10:00:00", "3knoysa7s2225")]
    #[case("2024-03-15T10:00", "3knoysa7s2225")]
    fn known_keys(#[case] date: &str, #[case] expected: &str) {
        let key = derive_key(date, DEFAULT_CLOCK_ID).expect("derive");
        assert_eq!(key.as_str(), expected);
    }

    #[test]
    fn key_is_stable_across_invocations() {
        let first = derive_key("2024-03-15T00:00:00Z", DEFAULT_CLOCK_ID).expect("first");
        let second = derive_key("2024-03-15T00:00:00Z", DEFAULT_CLOCK_ID).expect("second");
        assert_eq!(first, second);
    }

    #[test]
    fn clock_id_changes_only_the_suffix() {
        let a = derive_key("2024-03-15", 0).expect("a");
        let b = derive_key("2024-03-15", DEFAULT_CLOCK_ID).expect("b");
        assert_eq!(a.as_str(), "3knoysa7s2222");
        assert_eq!(a.as_str()[..11], b.as_str()[..11]);
        assert_ne!(a, b);
    }

    #[test]
    fn keys_sort_by_date() {
        let earlier = derive_key("2023-12-31", DEFAULT_CLOCK_ID).expect("earlier");
        let later = derive_key("2024-01-01", DEFAULT_CLOCK_ID).expect("later");
        assert!(earlier < later);
        assert_eq!(earlier.as_str().len(), 13);
    }

    #[test]
    fn offset_timestamps_use_their_utc_date() {
        let key = derive_key("2024-03-15T23:30:00-05:00", DEFAULT_CLOCK_ID).expect("derive");
        let next_day = derive_key("2024-03-16", DEFAULT_CLOCK_ID).expect("derive");
        assert_eq!(key, next_day);
    }

    #[rstest]
    #[case("not a date")]
    #[case("15/03/2024")]
    #[case("")]
    fn unparsable_dates_fail(#[case] date: &str) {
        let err = derive_key(date, DEFAULT_CLOCK_ID).unwrap_err();
        assert!(matches!(err, RecordError::InvalidDate { .. }), "got: {err}");
    }

    #[test]
    fn space_separated_date_time_is_read_as_utc() {
        let parsed = parse_publish_date("2024-03-15 10:30:00").expect("parse");
        assert_eq!(parsed.to_rfc3339(), "2024-03-15T10:30:00+00:00");
    }

    #[test]
    fn pre_epoch_date_fails() {
        let err = derive_key("1969-12-31", DEFAULT_CLOCK_ID).unwrap_err();
        assert!(matches!(err, RecordError::DateOutOfRange { .. }), "got: {err}");
    }

    #[test]
    fn clock_id_must_fit_ten_bits() {
        let err = derive_key("2024-03-15", 1024).unwrap_err();
        assert_eq!(err, RecordError::ClockIdOutOfRange { clock_id: 1024 });
    }
}
