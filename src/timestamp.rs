//! Millisecond-epoch timestamp conversion
//!
//! Event logs carry `ts` as milliseconds since the Unix epoch. The pipeline
//! turns it into a calendar timestamp and a `YYYY-MM-DD HH:MM:SS` display
//! string in the configured time zone, using the UTC offset in effect at each
//! event's own instant. The same conversion exists twice: as plain Rust
//! functions, and as SQL expressions handed to the engine. Both must agree.

use crate::error::{Error, Result};
use chrono::{FixedOffset, Local, NaiveDateTime, Offset, TimeZone, Utc};
use std::fmt;
use std::str::FromStr;

/// Display format of the `start_time` column in the time relation
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Granularity at which a time span is scanned for offset changes
const SCAN_STEP_MS: i64 = 3_600_000;

/// Time zone used to decode event timestamps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeZoneSetting {
    /// Host time zone, including its daylight saving rules
    #[default]
    Local,
    /// Fixed UTC offset
    Fixed(FixedOffset),
}

impl TimeZoneSetting {
    /// UTC
    pub fn utc() -> Self {
        Self::Fixed(Utc.fix())
    }

    /// Offsets this zone uses between two instants (inclusive).
    ///
    /// A fixed offset gives a single entry. `Local` asks the host zone
    /// database, so events on either side of a DST change each get the
    /// offset of their own instant.
    pub fn schedule(&self, first_ms: i64, last_ms: i64) -> Result<OffsetSchedule> {
        match self {
            Self::Local => OffsetSchedule::scan(first_ms, last_ms, local_offset),
            Self::Fixed(offset) => Ok(OffsetSchedule::fixed(*offset)),
        }
    }
}

fn local_offset(ts_ms: i64) -> Result<FixedOffset> {
    Local
        .timestamp_millis_opt(ts_ms)
        .single()
        .map(|dt| dt.offset().fix())
        .ok_or_else(|| Error::timestamp(format!("{ts_ms} is out of range")))
}

impl FromStr for TimeZoneSetting {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let value = s.trim();
        if value.eq_ignore_ascii_case("local") {
            return Ok(Self::Local);
        }
        if value.eq_ignore_ascii_case("utc") || value.eq_ignore_ascii_case("z") {
            return Ok(Self::utc());
        }
        value
            .parse::<FixedOffset>()
            .map(Self::Fixed)
            .map_err(|e| Error::invalid_value("LOCAL.TIMEZONE", format!("'{value}': {e}")))
    }
}

impl fmt::Display for TimeZoneSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Local => write!(f, "local"),
            Self::Fixed(offset) => write!(f, "{offset}"),
        }
    }
}

/// UTC offsets in effect over a span of event timestamps
///
/// Holds `(first millisecond, offset)` pairs in ascending order. The first
/// entry also covers every instant before the span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetSchedule {
    changes: Vec<(i64, FixedOffset)>,
}

impl OffsetSchedule {
    /// A single offset for all instants
    pub fn fixed(offset: FixedOffset) -> Self {
        Self {
            changes: vec![(i64::MIN, offset)],
        }
    }

    /// Find every offset change between `first_ms` and `last_ms`.
    ///
    /// `offset_at` is sampled hourly; each change is then narrowed down to
    /// the exact millisecond.
    pub fn scan<F>(first_ms: i64, last_ms: i64, offset_at: F) -> Result<Self>
    where
        F: Fn(i64) -> Result<FixedOffset>,
    {
        let mut current = offset_at(first_ms)?;
        let mut changes = vec![(i64::MIN, current)];
        let mut at = first_ms;

        while at < last_ms {
            let next = at.saturating_add(SCAN_STEP_MS).min(last_ms);
            if offset_at(next)? == current {
                at = next;
                continue;
            }

            let (mut lo, mut hi) = (at, next);
            while hi - lo > 1 {
                let mid = lo + (hi - lo) / 2;
                if offset_at(mid)? == current {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            current = offset_at(hi)?;
            changes.push((hi, current));
            at = hi;
        }

        Ok(Self { changes })
    }

    /// Offset in effect at an instant
    pub fn offset_at(&self, ts_ms: i64) -> FixedOffset {
        let idx = self.changes.partition_point(|(start, _)| *start <= ts_ms);
        self.changes[idx.saturating_sub(1)].1
    }

    /// Number of distinct offset periods
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    /// Always false: a schedule has at least one offset
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Convert a millisecond epoch value to a calendar timestamp in `tz`
pub fn get_timestamp<Tz: TimeZone>(ts_ms: i64, tz: &Tz) -> Result<NaiveDateTime> {
    tz.timestamp_millis_opt(ts_ms)
        .single()
        .map(|dt| dt.naive_local())
        .ok_or_else(|| Error::timestamp(format!("{ts_ms} is out of range")))
}

/// Convert a millisecond epoch value to its `YYYY-MM-DD HH:MM:SS` display form
pub fn get_datetime<Tz: TimeZone>(ts_ms: i64, tz: &Tz) -> Result<String> {
    Ok(get_timestamp(ts_ms, tz)?.format(DATETIME_FORMAT).to_string())
}

fn offset_ms(offset: FixedOffset) -> i64 {
    i64::from(offset.local_minus_utc()) * 1000
}

/// Engine expression producing the calendar timestamp of a ms-epoch column.
///
/// The cast rejects non-numeric input with a conversion error. With more
/// than one offset period, each value picks its offset with a `CASE`.
pub fn timestamp_sql(column: &str, schedule: &OffsetSchedule) -> String {
    let millis = format!("CAST({column} AS BIGINT)");
    match schedule.changes.as_slice() {
        [(_, offset)] if offset_ms(*offset) == 0 => format!("epoch_ms({millis})"),
        [(_, offset)] => format!("epoch_ms({millis} + ({}))", offset_ms(*offset)),
        changes => {
            let arms: String = changes
                .windows(2)
                .map(|w| format!("WHEN {millis} < {} THEN ({}) ", w[1].0, offset_ms(w[0].1)))
                .collect();
            let last = changes.last().map_or(0, |(_, offset)| offset_ms(*offset));
            format!("epoch_ms({millis} + CASE {arms}ELSE ({last}) END)")
        }
    }
}

/// Engine expression producing the display string of a ms-epoch column
pub fn datetime_sql(column: &str, schedule: &OffsetSchedule) -> String {
    format!(
        "strftime({}, '{DATETIME_FORMAT}')",
        timestamp_sql(column, schedule)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    const TS: i64 = 1_541_121_934_796;

    /// 2018-11-04 06:00:00 UTC, end of daylight time in New York
    const NEW_YORK_FALL_BACK: i64 = 1_541_311_200_000;

    fn offset(s: &str) -> FixedOffset {
        s.parse().unwrap()
    }

    fn new_york(ts_ms: i64) -> Result<FixedOffset> {
        Ok(if ts_ms < NEW_YORK_FALL_BACK {
            offset("-04:00")
        } else {
            offset("-05:00")
        })
    }

    #[test_case("+00:00", "2018-11-02 01:25:34" ; "utc")]
    #[test_case("-04:00", "2018-11-01 21:25:34" ; "new york daylight time")]
    #[test_case("-08:00", "2018-11-01 17:25:34" ; "pacific standard time")]
    #[test_case("+05:30", "2018-11-02 06:55:34" ; "half hour offset")]
    fn test_get_datetime(tz: &str, expected: &str) {
        assert_eq!(get_datetime(TS, &offset(tz)).unwrap(), expected);
    }

    #[test]
    fn test_get_timestamp_keeps_millis() {
        let ts = get_timestamp(TS, &Utc).unwrap();
        assert_eq!(ts.year(), 2018);
        assert_eq!(ts.month(), 11);
        assert_eq!(ts.day(), 2);
        assert_eq!(ts.hour(), 1);
        assert_eq!(ts.nanosecond(), 796_000_000);
    }

    #[test]
    fn test_get_timestamp_out_of_range() {
        let err = get_timestamp(i64::MAX, &offset("+00:00")).unwrap_err();
        assert!(matches!(err, Error::Timestamp { .. }));
    }

    #[test]
    fn test_scan_finds_fall_back() {
        let first = TS;
        let last = 1_542_283_200_000; // 2018-11-15 12:00:00 UTC
        let schedule = OffsetSchedule::scan(first, last, new_york).unwrap();

        assert_eq!(schedule.len(), 2);
        assert_eq!(schedule.offset_at(NEW_YORK_FALL_BACK - 1), offset("-04:00"));
        assert_eq!(schedule.offset_at(NEW_YORK_FALL_BACK), offset("-05:00"));
        assert_eq!(
            get_datetime(first, &schedule.offset_at(first)).unwrap(),
            "2018-11-01 21:25:34"
        );
        assert_eq!(
            get_datetime(last, &schedule.offset_at(last)).unwrap(),
            "2018-11-15 07:00:00"
        );
    }

    #[test]
    fn test_scan_without_change() {
        let schedule = OffsetSchedule::scan(TS, TS + 86_400_000, |_| Ok(offset("+02:00"))).unwrap();
        assert_eq!(schedule, OffsetSchedule::fixed(offset("+02:00")));
    }

    #[test]
    fn test_local_schedule_matches_host_conversion() {
        let first = 1_514_764_800_000; // 2018-01-01
        let last = 1_546_300_799_000; // 2018-12-31
        let schedule = TimeZoneSetting::Local.schedule(first, last).unwrap();

        for ts in (first..=last).step_by(86_400_000 * 7 + 3_600_000) {
            assert_eq!(
                get_datetime(ts, &schedule.offset_at(ts)).unwrap(),
                get_datetime(ts, &Local).unwrap(),
                "at {ts}"
            );
        }
    }

    #[test]
    fn test_fixed_setting_schedule() {
        let schedule = TimeZoneSetting::Fixed(offset("-04:00"))
            .schedule(TS, NEW_YORK_FALL_BACK + 1)
            .unwrap();
        assert_eq!(schedule.len(), 1);
        assert_eq!(schedule.offset_at(NEW_YORK_FALL_BACK + 1), offset("-04:00"));
    }

    #[test]
    fn test_timestamp_sql() {
        assert_eq!(
            timestamp_sql("ts", &OffsetSchedule::fixed(offset("+00:00"))),
            "epoch_ms(CAST(ts AS BIGINT))"
        );
        assert_eq!(
            timestamp_sql("ts", &OffsetSchedule::fixed(offset("-04:00"))),
            "epoch_ms(CAST(ts AS BIGINT) + (-14400000))"
        );
        assert_eq!(
            datetime_sql("ts", &OffsetSchedule::fixed(offset("+01:00"))),
            "strftime(epoch_ms(CAST(ts AS BIGINT) + (3600000)), '%Y-%m-%d %H:%M:%S')"
        );
    }

    #[test]
    fn test_timestamp_sql_with_offset_change() {
        let schedule = OffsetSchedule::scan(TS, NEW_YORK_FALL_BACK + 1, new_york).unwrap();
        assert_eq!(
            timestamp_sql("ts", &schedule),
            "epoch_ms(CAST(ts AS BIGINT) + CASE WHEN CAST(ts AS BIGINT) < 1541311200000 \
             THEN (-14400000) ELSE (-18000000) END)"
        );
    }

    #[test]
    fn test_parse_time_zone_setting() {
        assert_eq!("local".parse::<TimeZoneSetting>().unwrap(), TimeZoneSetting::Local);
        assert_eq!("UTC".parse::<TimeZoneSetting>().unwrap(), TimeZoneSetting::utc());
        assert_eq!(
            " -04:00 ".parse::<TimeZoneSetting>().unwrap(),
            TimeZoneSetting::Fixed(offset("-04:00"))
        );
        assert!("Mars/Olympus".parse::<TimeZoneSetting>().is_err());
    }
}
