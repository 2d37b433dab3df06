use crate::domain::week::days_in_month;
use chrono::{Datelike, Months, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FORCE_SNAP_MIN_MS: u32 = 300;
pub const FORCE_SNAP_MAX_MS: u32 = 700;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Suit {
    #[serde(rename = "C")]
    Clubs,
    #[serde(rename = "D")]
    Diamonds,
    #[serde(rename = "H")]
    Hearts,
    #[serde(rename = "S")]
    Spades,
}

impl Suit {
    pub fn from_code(code: char) -> Option<Self> {
        match code.to_ascii_uppercase() {
            'C' => Some(Self::Clubs),
            'D' => Some(Self::Diamonds),
            'H' => Some(Self::Hearts),
            'S' => Some(Self::Spades),
            _ => None,
        }
    }

    pub fn code(self) -> char {
        match self {
            Self::Clubs => 'C',
            Self::Diamonds => 'D',
            Self::Hearts => 'H',
            Self::Spades => 'S',
        }
    }
}

/// One entry of a stack. Built-in stacks are playing cards; custom stacks may
/// carry arbitrary labels, in which case `suit` is `None` (persisted as `""`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StackCard {
    pub position: u32,
    pub label: String,
    pub value: String,
    #[serde(default, with = "suit_code")]
    pub suit: Option<Suit>,
}

impl StackCard {
    pub fn new(position: u32, value: &str, suit: Suit) -> Self {
        Self {
            position,
            label: format!("{value}{}", suit.code()),
            value: value.to_string(),
            suit: Some(suit),
        }
    }

    /// Splits a `"10C"`-style label into value and suit.
    pub fn from_label(position: u32, label: &str) -> Option<Self> {
        let suit_char = label.chars().last()?;
        let suit = Suit::from_code(suit_char)?;
        let value = &label[..label.len() - suit_char.len_utf8()];
        if value.is_empty() {
            return None;
        }
        Some(Self::new(position, value, suit))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.position == 0 {
            return Err("card.position must be >= 1".to_string());
        }
        validate_non_empty(&self.label, "card.label")
    }
}

mod suit_code {
    use super::Suit;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(suit: &Option<Suit>, serializer: S) -> Result<S::Ok, S::Error> {
        let code = suit.map(|suit| suit.code().to_string()).unwrap_or_default();
        serializer.serialize_str(&code)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Suit>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let mut chars = trimmed.chars();
        match (chars.next().and_then(Suit::from_code), chars.next()) {
            (Some(suit), None) => Ok(Some(suit)),
            _ => Err(serde::de::Error::custom(format!("unknown suit code '{raw}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum StackKind {
    #[default]
    Mnemonica,
    Aronson,
    Custom,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum WeekStandard {
    /// Monday start, week 1 holds the year's first Thursday.
    #[default]
    Iso,
    /// Sunday start, week 1 holds January 1st.
    Us,
    /// `start_day` is 0 = Sunday .. 6 = Saturday.
    Custom {
        #[serde(rename = "startDay")]
        start_day: u8,
    },
}

impl WeekStandard {
    pub fn first_weekday(self) -> Weekday {
        match self {
            Self::Iso => Weekday::Mon,
            Self::Us => Weekday::Sun,
            Self::Custom { start_day } => weekday_from_sunday_index(start_day),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum Week53Handling {
    #[default]
    MergeWithWeek52,
    WrapToWeek1,
    AssignToOverflowSlot,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct WeekConfig {
    pub standard: WeekStandard,
    pub week53_handling: Week53Handling,
}

impl WeekConfig {
    pub fn validate(&self) -> Result<(), String> {
        if let WeekStandard::Custom { start_day } = self.standard {
            if start_day > 6 {
                return Err("week_config.standard.start_day must be 0..=6".to_string());
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Card,
    #[serde(rename = "ESP")]
    Esp,
    Color,
    Number,
    Word,
    Zodiac,
    Birthstone,
    Element,
    Planet,
    Pi,
    Rune,
    IChing,
    Constellation,
    Note,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ItemValue {
    Number(i64),
    Text(String),
}

impl fmt::Display for ItemValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Text(value) => f.write_str(value),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ItemMapping {
    #[serde(rename = "type")]
    pub kind: ItemKind,
    pub value: ItemValue,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cues: Option<String>,
}

impl ItemMapping {
    pub fn text(kind: ItemKind, value: &str) -> Self {
        Self {
            kind,
            value: ItemValue::Text(value.to_string()),
            cues: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DayOverride {
    pub day: u32,
    pub public_label: String,
    pub items: Vec<ItemMapping>,
    /// 1-based index into `items`.
    pub default_index: usize,
}

impl DayOverride {
    pub fn default_item(&self) -> Option<&ItemMapping> {
        self.items.get(self.default_index.checked_sub(1)?)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.day == 0 {
            return Err("day_override.day must be >= 1".to_string());
        }
        if self.items.is_empty() {
            return Err(format!("day_override[{}].items must not be empty", self.day));
        }
        if self.default_index == 0 || self.default_index > self.items.len() {
            return Err(format!(
                "day_override[{}].default_index must be 1..={}",
                self.day,
                self.items.len()
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MonthOverrideSet {
    /// `YYYY-MM`
    pub month_year: String,
    pub days: Vec<DayOverride>,
}

impl MonthOverrideSet {
    pub fn day(&self, day: u32) -> Option<&DayOverride> {
        self.days.iter().find(|entry| entry.day == day)
    }

    /// Write-side contract: one entry per calendar day of the month, each with
    /// at least one item and an in-range default.
    pub fn validate(&self) -> Result<(), String> {
        let month = YearMonth::parse_key(&self.month_year)
            .ok_or_else(|| "month_overrides.month_year must be YYYY-MM".to_string())?;
        let day_count = month.day_count();
        if self.days.len() != day_count as usize {
            return Err(format!(
                "month_overrides[{}] must have {} days (found {})",
                self.month_year,
                day_count,
                self.days.len()
            ));
        }
        for expected in 1..=day_count {
            let entry = self.day(expected).ok_or_else(|| {
                format!("month_overrides[{}] is missing day {expected}", self.month_year)
            })?;
            entry.validate()?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum ForceMonthMode {
    /// Current month.
    #[default]
    Off,
    Relative { offset: i32 },
    /// `month` is 1-based.
    Absolute { year: i32, month: u32 },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum FallbackPolicy {
    #[default]
    NearestValidDayInMonth,
    BlockArming,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RemapScope {
    #[default]
    OnlyWhileViewingForcedMonth,
    AnyVisibleMonth,
}

/// `Honest` highlights the forced day's tile while locked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum TapRemapMode {
    #[default]
    Stealth,
    Honest,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct ForceConfig {
    pub enabled: bool,
    pub month_mode: ForceMonthMode,
    pub forced_day: Option<u32>,
    pub fallback_policy: FallbackPolicy,
    pub remap_scope: RemapScope,
    pub tap_remap_mode: TapRemapMode,
    pub snap_duration_ms: u32,
    pub debounce_ms: u32,
    pub panic_window_ms: u32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            month_mode: ForceMonthMode::Off,
            forced_day: None,
            fallback_policy: FallbackPolicy::NearestValidDayInMonth,
            remap_scope: RemapScope::OnlyWhileViewingForcedMonth,
            tap_remap_mode: TapRemapMode::Stealth,
            snap_duration_ms: 500,
            debounce_ms: 2_000,
            panic_window_ms: 10_000,
        }
    }
}

impl ForceConfig {
    pub fn snap_duration_ms(&self) -> u32 {
        self.snap_duration_ms.clamp(FORCE_SNAP_MIN_MS, FORCE_SNAP_MAX_MS)
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(day) = self.forced_day {
            if !(1..=31).contains(&day) {
                return Err("force.forced_day must be 1..=31".to_string());
            }
        }
        if let ForceMonthMode::Absolute { year, month } = self.month_mode {
            if YearMonth::new(year, month).is_none() {
                return Err("force.month_mode.absolute must name a valid year/month".to_string());
            }
        }
        if self.debounce_ms == 0 {
            return Err("force.debounce_ms must be > 0".to_string());
        }
        Ok(())
    }
}

/// A calendar month; `month` is 1-based.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth {
    pub year: i32,
    pub month: u32,
}

impl YearMonth {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn parse_key(value: &str) -> Option<Self> {
        let (year, month) = value.trim().split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        Self::new(year.parse().ok()?, month.parse().ok()?)
    }

    pub fn key(self) -> String {
        format!("{:04}-{:02}", self.year, self.month)
    }

    pub fn first_day(self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, 1)
    }

    pub fn day(self, day: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.year, self.month, day)
    }

    pub fn day_count(self) -> u32 {
        days_in_month(self.year, self.month)
    }

    /// Shifts by whole months, saturating at the representable range.
    pub fn offset(self, months: i32) -> Self {
        let Some(first) = self.first_day() else {
            return self;
        };
        let shifted = if months >= 0 {
            first.checked_add_months(Months::new(months.unsigned_abs()))
        } else {
            first.checked_sub_months(Months::new(months.unsigned_abs()))
        };
        shifted.map(Self::of).unwrap_or(self)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

pub fn weekday_from_sunday_index(index: u8) -> Weekday {
    match index % 7 {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        _ => Weekday::Sat,
    }
}

pub(crate) fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}
