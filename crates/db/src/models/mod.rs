mod project;
mod version;

pub use project::*;
pub use version::*;

use chrono::{DateTime, TimeZone, Utc};

pub fn timestamp_to_datetime(ts: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ts).single().unwrap_or_default()
}

pub fn datetime_to_timestamp(dt: DateTime<Utc>) -> i64 {
    dt.timestamp_millis()
}
