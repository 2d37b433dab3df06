//! Public holidays shown on the calendar grid and the day view.

use crate::domain::models::YearMonth;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const OBSERVED_SUFFIX: &str = " (Observed)";

const PALETTE: [&str; 8] = [
    "#FF6B6B", "#00C2FF", "#34D399", "#F59E0B", "#A78BFA", "#F472B6", "#60A5FA", "#F97316",
];

const NAMED_COLORS: [(&str, &str); 11] = [
    ("New Year's Day", "#00C2FF"),
    ("Martin Luther King Jr. Day", "#7C3AED"),
    ("Presidents\u{2019} Day", "#34D399"),
    ("Memorial Day", "#60A5FA"),
    ("Juneteenth", "#16A34A"),
    ("Independence Day", "#EF4444"),
    ("Labor Day", "#F59E0B"),
    ("Columbus Day", "#A78BFA"),
    ("Veterans Day", "#0EA5E9"),
    ("Thanksgiving Day", "#F97316"),
    ("Christmas Day", "#22C55E"),
];

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum HolidayCountry {
    #[default]
    Us,
    Uk,
    Ca,
    Au,
    De,
    Fr,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Holiday {
    pub date: NaiveDate,
    pub name: String,
    pub observed: bool,
}

/// Holidays of `year` for `country`, observed days included. Only the US
/// calendar carries data; other countries yield an empty list.
pub fn holidays_for_year(year: i32, country: HolidayCountry) -> Vec<Holiday> {
    match country {
        HolidayCountry::Us => with_observed(us_holidays(year)),
        HolidayCountry::Uk
        | HolidayCountry::Ca
        | HolidayCountry::Au
        | HolidayCountry::De
        | HolidayCountry::Fr => Vec::new(),
    }
}

/// Holiday names keyed by day of month.
pub fn holidays_for_month(
    month: YearMonth,
    country: HolidayCountry,
) -> BTreeMap<u32, Vec<String>> {
    let mut by_day: BTreeMap<u32, Vec<String>> = BTreeMap::new();
    // A Saturday 1 January of the next year is observed on 31 December.
    for year in [month.year, month.year.saturating_add(1)] {
        for holiday in holidays_for_year(year, country) {
            if YearMonth::of(holiday.date) == month {
                by_day.entry(holiday.date.day()).or_default().push(holiday.name);
            }
        }
    }
    by_day
}

pub fn holidays_on(date: NaiveDate, country: HolidayCountry) -> Vec<String> {
    holidays_for_month(YearMonth::of(date), country)
        .remove(&date.day())
        .unwrap_or_default()
}

/// Display colour; an observed day shares its holiday's colour.
pub fn holiday_color(name: &str) -> &'static str {
    let base = name.strip_suffix(OBSERVED_SUFFIX).unwrap_or(name);
    NAMED_COLORS
        .iter()
        .find(|(known, _)| *known == base)
        .map(|(_, color)| *color)
        .unwrap_or_else(|| {
            let hash = base
                .encode_utf16()
                .fold(0u32, |hash, unit| hash.wrapping_mul(31).wrapping_add(u32::from(unit)));
            PALETTE[hash as usize % PALETTE.len()]
        })
}

fn us_holidays(year: i32) -> Vec<Holiday> {
    let fixed = [
        (1, 1, "New Year's Day"),
        (6, 19, "Juneteenth"),
        (7, 4, "Independence Day"),
        (11, 11, "Veterans Day"),
        (12, 25, "Christmas Day"),
    ];
    let nth_monday = |month, n| NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Mon, n);
    let floating = [
        (nth_monday(1, 3), "Martin Luther King Jr. Day"),
        (nth_monday(2, 3), "Presidents\u{2019} Day"),
        (last_weekday_of_month(year, 5, Weekday::Mon), "Memorial Day"),
        (nth_monday(9, 1), "Labor Day"),
        (nth_monday(10, 2), "Columbus Day"),
        (
            NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Thu, 4),
            "Thanksgiving Day",
        ),
    ];

    fixed
        .into_iter()
        .map(|(month, day, name)| (NaiveDate::from_ymd_opt(year, month, day), name))
        .chain(floating)
        .filter_map(|(date, name)| {
            date.map(|date| Holiday {
                date,
                name: name.to_string(),
                observed: false,
            })
        })
        .collect()
}

fn last_weekday_of_month(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let month = YearMonth::new(year, month)?;
    let last = month.day(month.day_count())?;
    let back = (last.weekday().num_days_from_monday() + 7 - weekday.num_days_from_monday()) % 7;
    Some(last - Duration::days(i64::from(back)))
}

/// Adds the weekday a weekend holiday is observed on: Friday for Saturday,
/// Monday for Sunday.
fn with_observed(holidays: Vec<Holiday>) -> Vec<Holiday> {
    let observed: Vec<Holiday> = holidays
        .iter()
        .filter_map(|holiday| {
            let shift = match holiday.date.weekday() {
                Weekday::Sat => -1,
                Weekday::Sun => 1,
                _ => return None,
            };
            Some(Holiday {
                date: holiday.date + Duration::days(shift),
                name: format!("{}{OBSERVED_SUFFIX}", holiday.name),
                observed: true,
            })
        })
        .collect();
    let mut all = holidays;
    all.extend(observed);
    all
}
