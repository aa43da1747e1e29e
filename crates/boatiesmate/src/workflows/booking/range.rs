use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};

/// Inclusive calendar-date interval. `start <= end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawTimeRange", into = "RawTimeRange")]
pub struct TimeRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum RangeError {
    #[error("end date {end} cannot be before start date {start}")]
    Inverted { start: NaiveDate, end: NaiveDate },
}

impl TimeRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if end < start {
            return Err(RangeError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// A single-day range `[day, day]`.
    pub fn day(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// Parse a stored start/end pair. Returns `None` when either side is unreadable or the
    /// pair is inverted, so callers can apply their own fallback.
    pub fn parse(start: &str, end: &str) -> Option<Self> {
        let start = parse_calendar_date(start)?;
        let end = parse_calendar_date(end)?;
        Self::new(start, end).ok()
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Accepts `YYYY-MM-DD` and full RFC 3339 timestamps (the date part is kept).
pub fn parse_calendar_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(trimmed)
                .ok()
                .map(|stamp| stamp.date_naive())
        })
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawTimeRange {
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl TryFrom<RawTimeRange> for TimeRange {
    type Error = RangeError;

    fn try_from(raw: RawTimeRange) -> Result<Self, Self::Error> {
        TimeRange::new(raw.start_date, raw.end_date)
    }
}

impl From<TimeRange> for RawTimeRange {
    fn from(range: TimeRange) -> Self {
        RawTimeRange {
            start_date: range.start,
            end_date: range.end,
        }
    }
}
