//! Week numbering under ISO, US and custom-start standards, and the policy
//! that folds a raw 53rd (or, for US/custom, 54th) week into the 52 stack
//! positions.

use crate::domain::models::{Week53Handling, WeekConfig, WeekStandard};
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;

pub const MIN_SUPPORTED_YEAR: i32 = 1;
pub const MAX_SUPPORTED_YEAR: i32 = 9999;
pub const STACK_WEEKS: u32 = 52;
const MAX_RAW_WEEK: u32 = 54;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct WeekRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl WeekRange {
    pub fn starting(start: NaiveDate) -> Self {
        Self {
            start,
            end: start + Duration::days(6),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// A week number after week-53 normalization.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "week", rename_all = "snake_case")]
pub enum WeekIndex {
    Regular(u32),
    /// Raw week above 52 kept distinguishable; maps to the last stack slot.
    Overflow(u32),
}

impl WeekIndex {
    pub fn position(self) -> u32 {
        match self {
            Self::Regular(week) => week.min(STACK_WEEKS),
            Self::Overflow(_) => STACK_WEEKS,
        }
    }

    pub fn is_overflow(self) -> bool {
        matches!(self, Self::Overflow(_))
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    let Some(first) = NaiveDate::from_ymd_opt(year, month, 1) else {
        return 0;
    };
    let next = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    next.map(|next| (next - first).num_days() as u32).unwrap_or(31)
}

fn jan_first(year: i32) -> NaiveDate {
    let year = year.clamp(MIN_SUPPORTED_YEAR, MAX_SUPPORTED_YEAR);
    NaiveDate::from_ymd_opt(year, 1, 1).expect("clamped year is representable")
}

/// Pins dates outside the supported years to the nearest supported day.
fn clamp_supported(date: NaiveDate) -> NaiveDate {
    let last = NaiveDate::from_ymd_opt(MAX_SUPPORTED_YEAR, 12, 31)
        .expect("last supported day is representable");
    date.clamp(jan_first(MIN_SUPPORTED_YEAR), last)
}

fn start_on(date: NaiveDate, first_weekday: Weekday) -> NaiveDate {
    let diff =
        (date.weekday().num_days_from_sunday() + 7 - first_weekday.num_days_from_sunday()) % 7;
    date - Duration::days(i64::from(diff))
}

pub fn start_of_week(date: NaiveDate, standard: WeekStandard) -> NaiveDate {
    start_on(date, standard.first_weekday())
}

pub fn week_number_of(date: NaiveDate, standard: WeekStandard) -> u32 {
    let date = clamp_supported(date);
    match standard {
        WeekStandard::Iso => date.iso_week().week(),
        WeekStandard::Us | WeekStandard::Custom { .. } => {
            let first_weekday = standard.first_weekday();
            let year_start = start_on(jan_first(date.year()), first_weekday);
            let days = (start_on(date, first_weekday) - year_start).num_days();
            (days / 7) as u32 + 1
        }
    }
}

/// The year whose numbering `week_number_of` used: the ISO week-based year
/// under `Iso`, the calendar year otherwise.
pub fn week_year_of(date: NaiveDate, standard: WeekStandard) -> i32 {
    let date = clamp_supported(date);
    match standard {
        WeekStandard::Iso => date.iso_week().year(),
        WeekStandard::Us | WeekStandard::Custom { .. } => date.year(),
    }
}

pub fn week_range_of(year: i32, week: u32, standard: WeekStandard) -> WeekRange {
    let offset = Duration::days(i64::from(week.clamp(1, MAX_RAW_WEEK) - 1) * 7);
    let week_one = match standard {
        WeekStandard::Iso => {
            let year = year.clamp(MIN_SUPPORTED_YEAR, MAX_SUPPORTED_YEAR);
            NaiveDate::from_isoywd_opt(year, 1, Weekday::Mon)
                .expect("clamped ISO year is representable")
        }
        WeekStandard::Us | WeekStandard::Custom { .. } => {
            start_on(jan_first(year), standard.first_weekday())
        }
    };
    WeekRange::starting(week_one + offset)
}

pub fn normalize(raw_week: u32, handling: Week53Handling) -> WeekIndex {
    if raw_week <= STACK_WEEKS {
        return WeekIndex::Regular(raw_week);
    }
    match handling {
        Week53Handling::MergeWithWeek52 => WeekIndex::Regular(STACK_WEEKS),
        Week53Handling::WrapToWeek1 => WeekIndex::Regular(1),
        Week53Handling::AssignToOverflowSlot => WeekIndex::Overflow(raw_week),
    }
}

pub fn week_index_of(date: NaiveDate, config: &WeekConfig) -> WeekIndex {
    normalize(week_number_of(date, config.standard), config.week53_handling)
}
