//! Conversions between epoch-millisecond timestamps and the local calendar.
//!
//! All period boundaries are computed on the local calendar of a configured
//! canonical timezone (e.g. "Pacific/Auckland"). A calendar without a timezone
//! uses UTC.

use std::fmt;

use time::{Date, Duration, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset, macros::time};
use time_tz::{Offset, OffsetResult, PrimitiveDateTimeExt, TimeZone, Tz};

use crate::Error;

/// Milliseconds since the Unix epoch.
pub type Timestamp = i64;

const NANOS_PER_MILLI: i128 = 1_000_000;

/// The last representable millisecond of a day.
const END_OF_DAY: Time = time!(23:59:59.999);

/// Which instant to pick for a local time that occurs twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Fold {
    Earlier,
    Later,
}

/// The local calendar that timestamps are bucketed against.
#[derive(Clone)]
pub struct LocalCalendar {
    name: String,
    timezone: Option<&'static Tz>,
}

impl LocalCalendar {
    /// A calendar that treats UTC as local time.
    pub fn utc() -> Self {
        Self {
            name: "UTC".to_owned(),
            timezone: None,
        }
    }

    /// Create a calendar from a canonical timezone string.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidTimezone] if `name` is not a known timezone.
    pub fn from_timezone_name(name: &str) -> Result<Self, Error> {
        if name.eq_ignore_ascii_case("UTC") {
            return Ok(Self::utc());
        }

        time_tz::timezones::get_by_name(name)
            .map(|timezone| Self {
                name: name.to_owned(),
                timezone: Some(timezone),
            })
            .ok_or_else(|| Error::InvalidTimezone(name.to_owned()))
    }

    /// The canonical name of the calendar's timezone.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The UTC offset in effect at `instant`.
    pub fn offset_at(&self, instant: OffsetDateTime) -> UtcOffset {
        match self.timezone {
            Some(timezone) => timezone.get_offset_utc(&instant).to_utc(),
            None => UtcOffset::UTC,
        }
    }

    /// Convert `timestamp` to a local date-time.
    ///
    /// Timestamps outside the range supported by [time] are logged and mapped
    /// to the epoch.
    pub fn to_local(&self, timestamp: Timestamp) -> OffsetDateTime {
        let instant =
            match OffsetDateTime::from_unix_timestamp_nanos(timestamp as i128 * NANOS_PER_MILLI) {
                Ok(instant) => instant,
                Err(error) => {
                    tracing::warn!("Timestamp {timestamp} is out of range ({error}), using the epoch.");
                    OffsetDateTime::UNIX_EPOCH
                }
            };

        instant.to_offset(self.offset_at(instant))
    }

    /// The local calendar date that `timestamp` falls on.
    pub fn date_of(&self, timestamp: Timestamp) -> Date {
        self.to_local(timestamp).date()
    }

    /// Today's local date, given the current instant.
    pub fn today(&self, now: OffsetDateTime) -> Date {
        now.to_offset(self.offset_at(now)).date()
    }

    /// Convert a local date-time to a timestamp.
    ///
    /// A local time skipped by a daylight saving gap is moved forward by the
    /// length of the gap. A local time that occurs twice resolves to the
    /// earlier instant.
    pub fn timestamp_of(&self, local: PrimitiveDateTime) -> Timestamp {
        to_timestamp(self.resolve_local(local, Fold::Earlier))
    }

    /// The first millisecond of `date`.
    ///
    /// When midnight falls in a daylight saving gap this is the first instant
    /// after the gap.
    pub fn start_of_day(&self, date: Date) -> Timestamp {
        to_timestamp(self.resolve_local(date.midnight(), Fold::Earlier))
    }

    /// The last millisecond of `date`.
    pub fn end_of_day(&self, date: Date) -> Timestamp {
        to_timestamp(self.resolve_local(date.with_time(END_OF_DAY), Fold::Later))
    }

    fn resolve_local(&self, local: PrimitiveDateTime, fold: Fold) -> OffsetDateTime {
        let Some(timezone) = self.timezone else {
            return local.assume_utc();
        };

        match local.assume_timezone(timezone) {
            OffsetResult::Some(instant) => instant,
            OffsetResult::Ambiguous(first, second) => {
                let (earlier, later) = if first <= second {
                    (first, second)
                } else {
                    (second, first)
                };

                match fold {
                    Fold::Earlier => earlier,
                    Fold::Later => later,
                }
            }
            OffsetResult::None => {
                // Transitions are never less than a day apart.
                let offset_before_gap = self.offset_at(local.assume_utc() - Duration::DAY);
                local.assume_offset(offset_before_gap)
            }
        }
    }
}

impl Default for LocalCalendar {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Debug for LocalCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCalendar")
            .field("name", &self.name)
            .finish()
    }
}

/// Convert an instant to milliseconds since the Unix epoch.
pub fn to_timestamp(instant: OffsetDateTime) -> Timestamp {
    (instant.unix_timestamp_nanos() / NANOS_PER_MILLI) as Timestamp
}
