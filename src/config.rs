//! Application configuration.

use std::{env, path::PathBuf};

use crate::{Error, calendar::LocalCalendar};

/// The default location of the transaction store, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "tally.json";

/// The environment variable consulted when no timezone is given explicitly.
pub const TIMEZONE_ENV_VAR: &str = "TZ";

/// Settings shared by every command.
#[derive(Debug, Clone)]
pub struct Config {
    /// File path to the JSON transaction store.
    pub data_path: PathBuf,
    /// The calendar used to resolve periods.
    pub calendar: LocalCalendar,
}

impl Config {
    /// Build the configuration.
    ///
    /// When `timezone` is `None` the `TZ` environment variable is used, and
    /// if that is unset or not a canonical timezone name, UTC.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidTimezone] if `timezone` is given but is not a
    /// known canonical timezone.
    pub fn new(data_path: PathBuf, timezone: Option<&str>) -> Result<Self, Error> {
        let calendar = match timezone {
            Some(name) => LocalCalendar::from_timezone_name(name)?,
            None => calendar_from_env(),
        };

        tracing::debug!(
            "Using data path {} and timezone {}",
            data_path.display(),
            calendar.name()
        );

        Ok(Self {
            data_path,
            calendar,
        })
    }
}

fn calendar_from_env() -> LocalCalendar {
    let Some(name) = env::var(TIMEZONE_ENV_VAR)
        .ok()
        .filter(|name| !name.is_empty())
    else {
        return LocalCalendar::utc();
    };

    LocalCalendar::from_timezone_name(&name).unwrap_or_else(|error| {
        tracing::warn!("{error} in ${TIMEZONE_ENV_VAR}, falling back to UTC.");
        LocalCalendar::utc()
    })
}
