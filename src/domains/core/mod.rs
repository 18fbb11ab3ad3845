pub mod keys;

pub use keys::{
    datetime_to_ticks, from_safe_key, ticks_key, ticks_key_at, ticks_key_to_datetime, ticks_to_datetime,
    to_safe_key, MAX_TICKS,
};
