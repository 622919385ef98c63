//! Epidemiological week codes (`YYYYWW`) and their calendar anchors.
//!
//! Brazilian surveillance data is keyed by "SE" (semana epidemiológica), an
//! integer such as `202452` for week 52 of 2024. The "data as of" label shown
//! next to the indicators is the Monday that starts the week.
use crate::error::{DashboardError, Result};
use chrono::{Datelike, Duration, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

static WEEK_CODE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\s*([0-9]{4})([0-9]{2})\s*$").unwrap_or_else(|e| panic!("invalid SE pattern: {e}"))
});

/// Display format for "data as of" labels.
pub const AS_OF_FORMAT: &str = "%d/%m/%Y";

/// A validated epidemiological week, stored as its `YYYYWW` code.
///
/// Ordering follows the code, which is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct EpiWeek(u32);

impl EpiWeek {
    pub const MIN_YEAR: u32 = 1900;
    pub const MAX_YEAR: u32 = 9999;

    pub fn new(year: u32, week: u32) -> Result<Self> {
        if !(Self::MIN_YEAR..=Self::MAX_YEAR).contains(&year) {
            return Err(DashboardError::malformed(
                format!("SE {year}{week:02}"),
                format!("year {year} out of range"),
            ));
        }
        if !(1..=53).contains(&week) {
            return Err(DashboardError::malformed(
                format!("SE {year}{week:02}"),
                format!("week {week} outside 1..=53"),
            ));
        }
        Ok(Self(year * 100 + week))
    }

    /// Validates a numeric `YYYYWW` code.
    pub fn from_code(code: u32) -> Result<Self> {
        Self::new(code / 100, code % 100)
    }

    #[must_use]
    pub const fn code(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn year(self) -> u32 {
        self.0 / 100
    }

    #[must_use]
    pub const fn week(self) -> u32 {
        self.0 % 100
    }

    #[must_use]
    pub const fn same_year(self, other: Self) -> bool {
        self.year() == other.year()
    }

    /// Monday that opens this week.
    ///
    /// Week 1 starts on the first Monday falling on or after January 1st;
    /// later weeks follow in 7-day steps. Returns `None` only if the date
    /// would leave chrono's supported range.
    #[must_use]
    pub fn monday(self) -> Option<NaiveDate> {
        let year = i32::try_from(self.year()).ok()?;
        let jan1 = NaiveDate::from_ymd_opt(year, 1, 1)?;
        // Sunday-based weekday shifted so Monday is 0 and Sunday is -1.
        let day_of_week = i64::from(jan1.weekday().num_days_from_sunday()) - 1;
        let offset = match (8 - day_of_week).rem_euclid(7) {
            0 => 7,
            n => n,
        };
        let first_monday = jan1.checked_add_signed(Duration::days(offset - 1))?;
        first_monday.checked_add_signed(Duration::weeks(i64::from(self.week()) - 1))
    }

    /// `dd/mm/yyyy` label of [`EpiWeek::monday`].
    pub fn as_of_label(self) -> Result<String> {
        self.monday()
            .map(|d| d.format(AS_OF_FORMAT).to_string())
            .ok_or_else(|| DashboardError::malformed(format!("SE {self}"), "no calendar date"))
    }
}

impl fmt::Display for EpiWeek {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EpiWeek {
    type Err = DashboardError;

    fn from_str(s: &str) -> Result<Self> {
        let caps = WEEK_CODE
            .captures(s)
            .ok_or_else(|| DashboardError::malformed(format!("SE '{s}'"), "expected YYYYWW"))?;
        // Both groups are ASCII digits by construction.
        let year = caps[1].parse::<u32>().unwrap_or_default();
        let week = caps[2].parse::<u32>().unwrap_or_default();
        Self::new(year, week)
    }
}

impl TryFrom<u32> for EpiWeek {
    type Error = DashboardError;

    fn try_from(code: u32) -> Result<Self> {
        Self::from_code(code)
    }
}

/// Monday of the week encoded as `year * 100 + week`.
pub fn week_to_date(code: u32) -> Result<NaiveDate> {
    let week = EpiWeek::from_code(code)?;
    week.monday()
        .ok_or_else(|| DashboardError::malformed(format!("SE {code}"), "no calendar date"))
}
