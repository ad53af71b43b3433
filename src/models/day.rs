//! Day-granularity helpers. All day boundaries are local midnight in a fixed offset.
use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

/// Floors `instant` to the most recent local midnight.
pub fn start_of_day(instant: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = local_date(instant, offset).and_time(NaiveTime::MIN);
    let utc_midnight = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    Utc.from_utc_datetime(&utc_midnight)
}

pub fn local_date(instant: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    instant.with_timezone(&offset).date_naive()
}

pub fn same_day(a: DateTime<Utc>, b: DateTime<Utc>, offset: FixedOffset) -> bool {
    local_date(a, offset) == local_date(b, offset)
}
