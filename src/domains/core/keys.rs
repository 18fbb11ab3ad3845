use crate::errors::ValidationError;
use crate::validation::ValidationBuilder;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};

/// 100-nanosecond intervals per second
pub const TICKS_PER_SECOND: i64 = 10_000_000;
/// Ticks between 0001-01-01T00:00:00Z and the Unix epoch
pub const EPOCH_TICKS: i64 = 621_355_968_000_000_000;
/// Ticks of 9999-12-31T23:59:59.9999999Z
pub const MAX_TICKS: i64 = 3_155_378_975_999_999_999;
/// Width of a ticks key
pub const TICKS_KEY_WIDTH: usize = 19;

/// Encode arbitrary text into characters every table key accepts.
///
/// Standard base64 of the UTF-8 bytes with `/` swapped for `.`, so the
/// output only ever contains `[A-Za-z0-9+.=]`.
pub fn to_safe_key(value: &str) -> String {
    STANDARD.encode(value.as_bytes()).replace('/', ".")
}

/// Inverse of [`to_safe_key`]
pub fn from_safe_key(key: &str) -> Result<String, ValidationError> {
    let bytes = STANDARD
        .decode(key.replace('.', "/"))
        .map_err(|e| ValidationError::format("safe_key", &e.to_string()))?;
    String::from_utf8(bytes).map_err(|_| ValidationError::format("safe_key", "decoded bytes are not UTF-8"))
}

/// Ticks of a point in time, clamped to `0..=MAX_TICKS`
pub fn datetime_to_ticks(at: DateTime<Utc>) -> i64 {
    let ticks = EPOCH_TICKS as i128
        + at.timestamp() as i128 * TICKS_PER_SECOND as i128
        + (at.timestamp_subsec_nanos() / 100) as i128;
    ticks.clamp(0, MAX_TICKS as i128) as i64
}

/// Point in time of a tick count, `None` outside `0..=MAX_TICKS`
pub fn ticks_to_datetime(ticks: i64) -> Option<DateTime<Utc>> {
    if !(0..=MAX_TICKS).contains(&ticks) {
        return None;
    }
    let since_epoch = ticks - EPOCH_TICKS;
    let seconds = since_epoch.div_euclid(TICKS_PER_SECOND);
    let nanos = (since_epoch.rem_euclid(TICKS_PER_SECOND) * 100) as u32;
    DateTime::from_timestamp(seconds, nanos)
}

/// Descending ticks key for the current instant: newer keys sort first
pub fn ticks_key() -> String {
    ticks_key_at(Utc::now())
}

/// Descending ticks key for `at`
pub fn ticks_key_at(at: DateTime<Utc>) -> String {
    format!("{:0width$}", MAX_TICKS - datetime_to_ticks(at), width = TICKS_KEY_WIDTH)
}

/// Recover the instant a ticks key was generated for
pub fn ticks_key_to_datetime(key: &str) -> Result<DateTime<Utc>, ValidationError> {
    ValidationBuilder::new("ticks_key", Some(key.to_string()))
        .required()
        .ticks_key()
        .finish()?;

    let inverted: i64 = key
        .parse()
        .map_err(|_| ValidationError::format("ticks_key", "not a decimal number"))?;
    inverted
        .checked_neg()
        .and_then(|neg| MAX_TICKS.checked_add(neg))
        .and_then(ticks_to_datetime)
        .ok_or_else(|| ValidationError::range("ticks_key", 0, MAX_TICKS))
}
