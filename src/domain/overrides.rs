use crate::domain::mapping::week_card_for_date;
use crate::domain::models::{
    DayOverride, ItemKind, ItemMapping, MonthOverrideSet, StackCard, WeekConfig, YearMonth,
};
use crate::domain::week::WeekIndex;
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Override sets keyed by `YYYY-MM`.
pub type OverrideSets = BTreeMap<String, MonthOverrideSet>;

/// `month` is 1-based.
pub fn resolve(year: i32, month: u32, day: u32, sets: &OverrideSets) -> Option<&DayOverride> {
    let key = YearMonth::new(year, month)?.key();
    sets.get(&key)?.day(day)
}

/// What a day cell shows once override precedence is applied.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DayContent<'a> {
    Override {
        entry: &'a DayOverride,
        item: Option<&'a ItemMapping>,
        week: WeekIndex,
    },
    Card {
        week: WeekIndex,
        card: &'a StackCard,
    },
    Unavailable {
        week: WeekIndex,
    },
}

/// The mapping always runs; an override for the day, when `overrides` is
/// given, replaces its card.
pub fn day_content<'a>(
    date: NaiveDate,
    stack: &'a [StackCard],
    config: &WeekConfig,
    overrides: Option<&'a OverrideSets>,
) -> DayContent<'a> {
    let (week, card) = week_card_for_date(date, stack, config);
    let month = YearMonth::of(date);
    let entry = overrides.and_then(|sets| resolve(month.year, month.month, date.day(), sets));

    match (entry, card) {
        (Some(entry), _) => DayContent::Override {
            entry,
            item: entry.default_item(),
            week,
        },
        (None, Some(card)) => DayContent::Card { week, card },
        (None, None) => DayContent::Unavailable { week },
    }
}

/// Editor starting point: one empty card item per day, default index 1.
pub fn blank_month(month: YearMonth) -> MonthOverrideSet {
    MonthOverrideSet {
        month_year: month.key(),
        days: (1..=month.day_count())
            .map(|day| DayOverride {
                day,
                public_label: String::new(),
                items: vec![ItemMapping::text(ItemKind::Card, "")],
                default_index: 1,
            })
            .collect(),
    }
}
