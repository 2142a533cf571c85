//! Public holiday calendars.
//!
//! Feature building only needs to ask "is this date a public holiday in this
//! country?". [`HolidayCalendar`] abstracts that lookup so the built-in rule
//! set can be swapped for a precomputed table or for no holidays at all.
//! Unknown country codes always resolve to an empty set.

mod rules;

pub use rules::PublicHolidays;

use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeSet, HashMap};

/// Lookup of public holiday dates per country.
pub trait HolidayCalendar: Send + Sync {
    /// Holidays of `country` falling in `year`; empty for unknown countries.
    fn holidays(&self, country: &str, year: i32) -> BTreeSet<NaiveDate>;

    /// Whether `date` is a public holiday in `country`.
    fn is_holiday(&self, country: &str, date: NaiveDate) -> bool {
        self.holidays(country, date.year()).contains(&date)
    }
}

/// Calendar without any holidays.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHolidays;

impl HolidayCalendar for NoHolidays {
    fn holidays(&self, _country: &str, _year: i32) -> BTreeSet<NaiveDate> {
        BTreeSet::new()
    }
}

/// Precomputed `{country code -> holiday dates}` table.
///
/// Country codes are matched case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct HolidayTable {
    dates: HashMap<String, BTreeSet<NaiveDate>>,
}

impl HolidayTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dates(
        mut self,
        country: &str,
        dates: impl IntoIterator<Item = NaiveDate>,
    ) -> Self {
        self.dates
            .entry(country.to_uppercase())
            .or_default()
            .extend(dates);
        self
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.dates.keys().map(String::as_str)
    }
}

impl HolidayCalendar for HolidayTable {
    fn holidays(&self, country: &str, year: i32) -> BTreeSet<NaiveDate> {
        self.dates
            .get(&country.to_uppercase())
            .map(|dates| dates.iter().filter(|d| d.year() == year).copied().collect())
            .unwrap_or_default()
    }
}
