//! Built-in rule-based public holidays for a handful of retail markets.
//!
//! Only national holidays are covered; regional days and observed-day shifts
//! are not.

use super::HolidayCalendar;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy)]
enum Rule {
    /// Same month/day every year.
    Fixed(u32, u32),
    /// Fixed date observed from the given year on.
    FixedSince(u32, u32, i32),
    /// Offset in days from Easter Sunday.
    Easter(i64),
    /// n-th occurrence (1-based) of a weekday in a month.
    Nth(u32, Weekday, u8),
    /// Last occurrence of a weekday in a month.
    Last(u32, Weekday),
}

impl Rule {
    fn resolve(self, year: i32) -> Option<NaiveDate> {
        match self {
            Rule::Fixed(month, day) => NaiveDate::from_ymd_opt(year, month, day),
            Rule::FixedSince(month, day, since) if year >= since => {
                NaiveDate::from_ymd_opt(year, month, day)
            }
            Rule::FixedSince(..) => None,
            Rule::Easter(offset) => easter_sunday(year).map(|d| d + Duration::days(offset)),
            Rule::Nth(month, weekday, n) => {
                NaiveDate::from_weekday_of_month_opt(year, month, weekday, n)
            }
            Rule::Last(month, weekday) => last_weekday_of_month(year, month, weekday),
        }
    }
}

const GOOD_FRIDAY: Rule = Rule::Easter(-2);
const EASTER_MONDAY: Rule = Rule::Easter(1);
const ASCENSION: Rule = Rule::Easter(39);
const WHIT_MONDAY: Rule = Rule::Easter(50);

const FR: &[Rule] = &[
    Rule::Fixed(1, 1),
    EASTER_MONDAY,
    Rule::Fixed(5, 1),
    Rule::Fixed(5, 8),
    ASCENSION,
    WHIT_MONDAY,
    Rule::Fixed(7, 14),
    Rule::Fixed(8, 15),
    Rule::Fixed(11, 1),
    Rule::Fixed(11, 11),
    Rule::Fixed(12, 25),
];

const DE: &[Rule] = &[
    Rule::Fixed(1, 1),
    GOOD_FRIDAY,
    EASTER_MONDAY,
    Rule::Fixed(5, 1),
    ASCENSION,
    WHIT_MONDAY,
    Rule::FixedSince(10, 3, 1990),
    Rule::Fixed(12, 25),
    Rule::Fixed(12, 26),
];

const GB: &[Rule] = &[
    Rule::Fixed(1, 1),
    GOOD_FRIDAY,
    EASTER_MONDAY,
    Rule::Nth(5, Weekday::Mon, 1),
    Rule::Last(5, Weekday::Mon),
    Rule::Last(8, Weekday::Mon),
    Rule::Fixed(12, 25),
    Rule::Fixed(12, 26),
];

const US: &[Rule] = &[
    Rule::Fixed(1, 1),
    Rule::Nth(1, Weekday::Mon, 3),
    Rule::Nth(2, Weekday::Mon, 3),
    Rule::Last(5, Weekday::Mon),
    Rule::FixedSince(6, 19, 2021),
    Rule::Fixed(7, 4),
    Rule::Nth(9, Weekday::Mon, 1),
    Rule::Nth(10, Weekday::Mon, 2),
    Rule::Fixed(11, 11),
    Rule::Nth(11, Weekday::Thu, 4),
    Rule::Fixed(12, 25),
];

const ES: &[Rule] = &[
    Rule::Fixed(1, 1),
    Rule::Fixed(1, 6),
    GOOD_FRIDAY,
    Rule::Fixed(5, 1),
    Rule::Fixed(8, 15),
    Rule::Fixed(10, 12),
    Rule::Fixed(11, 1),
    Rule::Fixed(12, 6),
    Rule::Fixed(12, 8),
    Rule::Fixed(12, 25),
];

const IT: &[Rule] = &[
    Rule::Fixed(1, 1),
    Rule::Fixed(1, 6),
    EASTER_MONDAY,
    Rule::Fixed(4, 25),
    Rule::Fixed(5, 1),
    Rule::Fixed(6, 2),
    Rule::Fixed(8, 15),
    Rule::Fixed(11, 1),
    Rule::Fixed(12, 8),
    Rule::Fixed(12, 25),
    Rule::Fixed(12, 26),
];

const BE: &[Rule] = &[
    Rule::Fixed(1, 1),
    EASTER_MONDAY,
    Rule::Fixed(5, 1),
    ASCENSION,
    WHIT_MONDAY,
    Rule::Fixed(7, 21),
    Rule::Fixed(8, 15),
    Rule::Fixed(11, 1),
    Rule::Fixed(11, 11),
    Rule::Fixed(12, 25),
];

/// Rule-based national holidays for FR, DE, GB (alias UK), US, ES, IT and BE.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicHolidays;

impl PublicHolidays {
    pub fn new() -> Self {
        Self
    }

    /// Whether the built-in rules know `country`.
    pub fn supports(country: &str) -> bool {
        rules_for(country).is_some()
    }
}

impl HolidayCalendar for PublicHolidays {
    fn holidays(&self, country: &str, year: i32) -> BTreeSet<NaiveDate> {
        rules_for(country)
            .map(|rules| rules.iter().filter_map(|r| r.resolve(year)).collect())
            .unwrap_or_default()
    }
}

fn rules_for(country: &str) -> Option<&'static [Rule]> {
    match country.trim().to_uppercase().as_str() {
        "FR" => Some(FR),
        "DE" => Some(DE),
        "GB" | "UK" => Some(GB),
        "US" => Some(US),
        "ES" => Some(ES),
        "IT" => Some(IT),
        "BE" => Some(BE),
        _ => None,
    }
}

/// Gregorian Easter Sunday (anonymous Gregorian algorithm).
fn easter_sunday(year: i32) -> Option<NaiveDate> {
    let a = year.rem_euclid(19);
    let b = year.div_euclid(100);
    let c = year.rem_euclid(100);
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = (h + l - 7 * m + 114) % 31 + 1;
    NaiveDate::from_ymd_opt(year, month as u32, day as u32)
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let first_of_next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = first_of_next.pred_opt()?;
    let back = (7 + last.weekday().num_days_from_monday() as i64
        - weekday.num_days_from_monday() as i64)
        % 7;
    Some(last - Duration::days(back))
}
