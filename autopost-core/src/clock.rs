//! Japan Standard Time helpers. Slug dates and notification timestamps are
//! always rendered in JST regardless of the host time zone.

use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};

const JST_OFFSET_SECS: i32 = 9 * 3600;

pub fn jst() -> FixedOffset {
    FixedOffset::east_opt(JST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

pub fn now_jst() -> DateTime<FixedOffset> {
    Utc::now().with_timezone(&jst())
}

pub fn today_jst() -> NaiveDate {
    now_jst().date_naive()
}

/// `YYYYMMDD`, used as the slug collision suffix.
pub fn date_stamp(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

/// `YYYY-MM-DD HH:MM:SS JST`
pub fn format_jst(at: DateTime<FixedOffset>) -> String {
    at.format("%Y-%m-%d %H:%M:%S JST").to_string()
}
