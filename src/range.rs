//! Calendar-aligned period resolution.
//!
//! A [ResolvedRange] is the inclusive span of milliseconds covering the day,
//! week, month or year that contains an anchor instant. Weeks start on Monday.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use time::{
    Date, Duration, Month,
    format_description::BorrowedFormatItem,
    macros::format_description,
};

use crate::calendar::{LocalCalendar, Timestamp};

const DATE_LABEL_FORMAT: &[BorrowedFormatItem<'_>] =
    format_description!("[day padding:none] [month repr:short] [year]");

/// The unit of the selected viewing window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Granularity {
    /// A single calendar day.
    Day,
    /// Monday to Sunday.
    Week,
    /// A calendar month.
    Month,
    /// January to December.
    Year,
}

impl Granularity {
    /// The value used for this granularity on the command line and in JSON.
    pub fn as_query_value(self) -> &'static str {
        match self {
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_query_value())
    }
}

/// The error returned when a string is not a valid [Granularity].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("\"{0}\" is not a granularity, expected one of day, week, month or year")]
pub struct ParseGranularityError(pub String);

impl FromStr for Granularity {
    type Err = ParseGranularityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Ok(Self::Day),
            "week" => Ok(Self::Week),
            "month" => Ok(Self::Month),
            "year" => Ok(Self::Year),
            _ => Err(ParseGranularityError(s.to_owned())),
        }
    }
}

/// The inclusive bounds of a calendar period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRange {
    /// The unit of the period.
    pub granularity: Granularity,
    /// The first local date in the period.
    pub start_date: Date,
    /// The last local date in the period.
    pub end_date: Date,
    /// The first millisecond of the period.
    pub start: Timestamp,
    /// The last millisecond of the period.
    pub end: Timestamp,
    /// Human readable description of the period, e.g. "March 2024".
    pub label: String,
}

impl ResolvedRange {
    /// Whether `timestamp` lies within the period, bounds included.
    pub fn contains(&self, timestamp: Timestamp) -> bool {
        self.start <= timestamp && timestamp <= self.end
    }

    /// Whether `date` lies within the period, bounds included.
    pub fn contains_date(&self, date: Date) -> bool {
        self.start_date <= date && date <= self.end_date
    }

    /// The period of the same granularity that ends the day before this one starts.
    pub fn previous(&self, calendar: &LocalCalendar) -> Self {
        resolve_date(self.start_date - Duration::days(1), self.granularity, calendar)
    }

    /// The period of the same granularity that starts the day after this one ends.
    pub fn next(&self, calendar: &LocalCalendar) -> Self {
        resolve_date(self.end_date + Duration::days(1), self.granularity, calendar)
    }
}

/// Resolve the period of `granularity` containing the instant `anchor`.
pub fn resolve(
    anchor: Timestamp,
    granularity: Granularity,
    calendar: &LocalCalendar,
) -> ResolvedRange {
    resolve_date(calendar.date_of(anchor), granularity, calendar)
}

/// Resolve the period of `granularity` containing the local date `anchor_date`.
pub fn resolve_date(
    anchor_date: Date,
    granularity: Granularity,
    calendar: &LocalCalendar,
) -> ResolvedRange {
    let (start_date, end_date) = match granularity {
        Granularity::Day => (anchor_date, anchor_date),
        Granularity::Week => week_bounds(anchor_date),
        Granularity::Month => month_bounds(anchor_date),
        Granularity::Year => year_bounds(anchor_date),
    };

    ResolvedRange {
        granularity,
        start_date,
        end_date,
        start: calendar.start_of_day(start_date),
        end: calendar.end_of_day(end_date),
        label: range_label(granularity, start_date, end_date),
    }
}

fn range_label(granularity: Granularity, start: Date, end: Date) -> String {
    match granularity {
        Granularity::Day => format_date_label(start),
        Granularity::Week => format!("{} - {}", format_date_label(start), format_date_label(end)),
        Granularity::Month => format!("{} {}", start.month(), start.year()),
        Granularity::Year => start.year().to_string(),
    }
}

fn week_bounds(anchor_date: Date) -> (Date, Date) {
    let days_since_monday = anchor_date.weekday().number_days_from_monday();
    let start = anchor_date - Duration::days(i64::from(days_since_monday));

    (start, start + Duration::days(6))
}

fn month_bounds(anchor_date: Date) -> (Date, Date) {
    let start = anchor_date - Duration::days(i64::from(anchor_date.day()) - 1);
    let length = anchor_date.month().length(anchor_date.year());

    (start, start + Duration::days(i64::from(length) - 1))
}

fn year_bounds(anchor_date: Date) -> (Date, Date) {
    let start = anchor_date - Duration::days(i64::from(anchor_date.ordinal()) - 1);
    let length = time::util::days_in_year(anchor_date.year());

    (start, start + Duration::days(i64::from(length) - 1))
}

/// Format a date as e.g. "5 Mar 2024".
pub fn format_date_label(date: Date) -> String {
    date.format(DATE_LABEL_FORMAT).unwrap_or_else(|_| date.to_string())
}

/// The three-letter abbreviation of `month`, e.g. "Mar".
pub fn month_abbrev(month: Month) -> String {
    let mut name = month.to_string();
    name.truncate(3);
    name
}

#[cfg(test)]
mod tests {
    use time::{
        Month, Weekday,
        macros::{date, datetime},
    };

    use crate::{
        calendar::{LocalCalendar, to_timestamp},
        range::{
            Granularity, ParseGranularityError, format_date_label, month_abbrev, resolve,
            resolve_date,
        },
    };

    #[test]
    fn day_range_covers_whole_day() {
        let calendar = LocalCalendar::utc();
        let anchor = to_timestamp(datetime!(2024 - 03 - 15 13:45 UTC));

        let range = resolve(anchor, Granularity::Day, &calendar);

        assert_eq!(range.start, to_timestamp(datetime!(2024 - 03 - 15 0:00 UTC)));
        assert_eq!(
            range.end,
            to_timestamp(datetime!(2024 - 03 - 15 23:59:59.999 UTC))
        );
        assert_eq!(range.label, "15 Mar 2024");
    }

    #[test]
    fn month_range_matches_calendar() {
        let calendar = LocalCalendar::utc();
        let anchor = to_timestamp(datetime!(2024 - 03 - 15 12:00 UTC));

        let range = resolve(anchor, Granularity::Month, &calendar);

        assert_eq!(range.start, to_timestamp(datetime!(2024 - 03 - 01 0:00 UTC)));
        assert_eq!(
            range.end,
            to_timestamp(datetime!(2024 - 03 - 31 23:59:59.999 UTC))
        );
        assert_eq!(range.label, "March 2024");
    }

    #[test]
    fn month_range_includes_last_millisecond() {
        let calendar = LocalCalendar::utc();
        let range = resolve_date(date!(2024 - 03 - 15), Granularity::Month, &calendar);

        let last_moment = to_timestamp(datetime!(2024 - 03 - 31 23:59:59.999 UTC));

        assert!(range.contains(last_moment));
        assert!(!range.contains(last_moment + 1));
    }

    #[test]
    fn february_in_leap_year_has_29_days() {
        let calendar = LocalCalendar::utc();

        let leap = resolve_date(date!(2024 - 02 - 10), Granularity::Month, &calendar);
        let common = resolve_date(date!(2023 - 02 - 10), Granularity::Month, &calendar);

        assert_eq!(leap.end_date, date!(2024 - 02 - 29));
        assert_eq!(common.end_date, date!(2023 - 02 - 28));
    }

    #[test]
    fn sunday_anchor_resolves_to_preceding_monday() {
        let calendar = LocalCalendar::utc();
        let sunday = date!(2024 - 03 - 17);
        assert_eq!(sunday.weekday(), Weekday::Sunday);

        let range = resolve_date(sunday, Granularity::Week, &calendar);

        assert_eq!(range.start_date, date!(2024 - 03 - 11));
        assert_eq!(range.start_date.weekday(), Weekday::Monday);
        assert_eq!(range.end_date, sunday);
        assert_eq!(
            range.end,
            to_timestamp(datetime!(2024 - 03 - 17 23:59:59.999 UTC))
        );
        assert_eq!(range.label, "11 Mar 2024 - 17 Mar 2024");
    }

    #[test]
    fn monday_anchor_starts_its_own_week() {
        let calendar = LocalCalendar::utc();

        let range = resolve_date(date!(2024 - 03 - 11), Granularity::Week, &calendar);

        assert_eq!(range.start_date, date!(2024 - 03 - 11));
        assert_eq!(range.end_date, date!(2024 - 03 - 17));
    }

    #[test]
    fn week_can_span_year_boundary() {
        let calendar = LocalCalendar::utc();

        let range = resolve_date(date!(2025 - 01 - 01), Granularity::Week, &calendar);

        assert_eq!(range.start_date, date!(2024 - 12 - 30));
        assert_eq!(range.end_date, date!(2025 - 01 - 05));
    }

    #[test]
    fn year_range_covers_jan_to_dec() {
        let calendar = LocalCalendar::utc();

        let range = resolve_date(date!(2024 - 07 - 04), Granularity::Year, &calendar);

        assert_eq!(range.start, to_timestamp(datetime!(2024 - 01 - 01 0:00 UTC)));
        assert_eq!(
            range.end,
            to_timestamp(datetime!(2024 - 12 - 31 23:59:59.999 UTC))
        );
        assert_eq!(range.label, "2024");
    }

    #[test]
    fn anchor_midnight_is_always_inside_range() {
        let calendar = LocalCalendar::from_timezone_name("Pacific/Auckland").unwrap();
        let granularities = [
            Granularity::Day,
            Granularity::Week,
            Granularity::Month,
            Granularity::Year,
        ];
        let anchors = [
            date!(2024 - 01 - 01),
            date!(2024 - 02 - 29),
            date!(2024 - 09 - 29),
            date!(2024 - 12 - 31),
        ];

        for granularity in granularities {
            for anchor in anchors {
                let range = resolve_date(anchor, granularity, &calendar);
                let anchor_midnight = calendar.start_of_day(anchor);

                assert!(
                    range.start <= anchor_midnight && anchor_midnight <= range.end,
                    "{anchor} not inside {granularity} range {range:?}"
                );
            }
        }
    }

    #[test]
    fn range_respects_local_timezone() {
        let calendar = LocalCalendar::from_timezone_name("Asia/Shanghai").unwrap();
        // 2024-03-31 17:00 UTC is already April 1st in Shanghai.
        let anchor = to_timestamp(datetime!(2024 - 03 - 31 17:00 UTC));

        let range = resolve(anchor, Granularity::Month, &calendar);

        assert_eq!(range.start_date, date!(2024 - 04 - 01));
        assert_eq!(range.start, to_timestamp(datetime!(2024 - 03 - 31 16:00 UTC)));
    }

    #[test]
    fn previous_and_next_are_adjacent() {
        let calendar = LocalCalendar::utc();
        let range = resolve_date(date!(2024 - 03 - 15), Granularity::Month, &calendar);

        let previous = range.previous(&calendar);
        let next = range.next(&calendar);

        assert_eq!(previous.start_date, date!(2024 - 02 - 01));
        assert_eq!(previous.end + 1, range.start);
        assert_eq!(next.start_date, date!(2024 - 04 - 01));
        assert_eq!(range.end + 1, next.start);
    }

    #[test]
    fn adjacent_months_do_not_overlap_when_midnight_is_skipped() {
        let calendar = LocalCalendar::from_timezone_name("America/Asuncion").unwrap();
        let october = resolve_date(date!(2023 - 10 - 15), Granularity::Month, &calendar);

        let september = october.previous(&calendar);
        let last_moment_of_september = to_timestamp(datetime!(2023 - 09 - 30 23:30 -4));

        assert_eq!(september.end + 1, october.start);
        assert!(september.contains(last_moment_of_september));
        assert!(!october.contains(last_moment_of_september));
    }

    #[test]
    fn labels_use_short_month_names() {
        assert_eq!(format_date_label(date!(2024 - 03 - 05)), "5 Mar 2024");
        assert_eq!(month_abbrev(Month::September), "Sep");
    }

    #[test]
    fn parses_granularity() {
        assert_eq!("week".parse(), Ok(Granularity::Week));
        assert_eq!("Month".parse(), Ok(Granularity::Month));
        assert_eq!(
            "fortnight".parse::<Granularity>(),
            Err(ParseGranularityError("fortnight".to_owned()))
        );
    }
}
