use crate::domain::holidays::HolidayCountry;
use crate::domain::mapping::DEFAULT_SEED;
use crate::domain::models::{
    FallbackPolicy, ForceConfig, ForceMonthMode, MonthOverrideSet, RemapScope, StackCard,
    StackKind, TapRemapMode, Week53Handling, WeekConfig, WeekStandard, YearMonth,
};
use crate::domain::overrides::OverrideSets;
use crate::domain::stacks::{builtin_stack, validate_stack};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

pub const SETTINGS_SCHEMA: u8 = 1;
const SETTINGS_JSON: &str = "settings.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default, deny_unknown_fields)]
pub struct AppSettings {
    pub schema: u8,
    pub stack_kind: StackKind,
    pub custom_stack: Vec<StackCard>,
    pub seed: u32,
    pub week_config: WeekConfig,
    /// IANA name; UTC when unset.
    pub timezone: Option<String>,
    pub peek_enabled: bool,
    /// Exposes the mapped card next to public content.
    pub rehearsal_mode: bool,
    pub holidays_enabled: bool,
    pub holiday_country: HolidayCountry,
    pub force: ForceConfig,
    pub overrides_enabled: bool,
    pub overrides: OverrideSets,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            schema: SETTINGS_SCHEMA,
            stack_kind: StackKind::Mnemonica,
            custom_stack: Vec::new(),
            seed: DEFAULT_SEED,
            week_config: WeekConfig::default(),
            timezone: None,
            peek_enabled: true,
            rehearsal_mode: false,
            holidays_enabled: true,
            holiday_country: HolidayCountry::Us,
            force: ForceConfig::default(),
            overrides_enabled: false,
            overrides: OverrideSets::new(),
        }
    }
}

impl AppSettings {
    pub fn current_stack(&self) -> Cow<'_, [StackCard]> {
        match self.stack_kind {
            StackKind::Custom => Cow::Borrowed(&self.custom_stack),
            kind => Cow::Owned(builtin_stack(kind)),
        }
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .and_then(|value| value.parse::<Tz>().ok())
            .unwrap_or(Tz::UTC)
    }

    /// Calendar date of `now` in the configured timezone.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        now.with_timezone(&self.timezone()).date_naive()
    }

    /// Override sets consulted for display, if overrides are switched on.
    pub fn active_overrides(&self) -> Option<&OverrideSets> {
        self.overrides_enabled.then_some(&self.overrides)
    }

    pub fn set_month_overrides(&mut self, set: MonthOverrideSet) -> Result<(), String> {
        set.validate()?;
        self.overrides.insert(set.month_year.clone(), set);
        Ok(())
    }

    pub fn remove_month_overrides(&mut self, month: YearMonth) -> bool {
        self.overrides.remove(&month.key()).is_some()
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.schema != SETTINGS_SCHEMA {
            return Err(format!("schema must be {SETTINGS_SCHEMA}"));
        }
        self.week_config.validate()?;
        self.force.validate()?;
        if let Some(timezone) = self.timezone.as_deref() {
            if timezone.trim().parse::<Tz>().is_err() {
                return Err(format!("timezone must be an IANA name (found '{timezone}')"));
            }
        }
        if self.stack_kind == StackKind::Custom {
            validate_stack(&self.custom_stack)
                .map_err(|error| format!("custom_stack is invalid: {error}"))?;
        }
        for card in &self.custom_stack {
            card.validate()?;
        }
        for (key, set) in &self.overrides {
            if key != &set.month_year {
                return Err(format!(
                    "overrides key {key} must match month_year {}",
                    set.month_year
                ));
            }
            set.validate()?;
        }
        Ok(())
    }
}

pub fn settings_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SETTINGS_JSON)
}

pub fn ensure_default_settings(config_dir: &Path) -> Result<(), InfraError> {
    let path = settings_path(config_dir);
    if !path.exists() {
        write_settings(&path, &AppSettings::default())?;
    }
    Ok(())
}

/// Reads `settings.json`. A file without a `schema` key is the legacy flat
/// shape; it is migrated and written back at the current schema.
pub fn load_settings(config_dir: &Path) -> Result<AppSettings, InfraError> {
    let path = settings_path(config_dir);
    let raw = fs::read_to_string(&path)?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    if !parsed.is_object() {
        return Err(InfraError::InvalidConfig(format!(
            "invalid object structure in {}",
            path.display()
        )));
    }

    let schema = parsed.get("schema").cloned();
    let settings = match schema {
        None => {
            let legacy: LegacySettings = serde_json::from_value(parsed)?;
            let migrated = migrate_legacy(legacy)?;
            migrated.validate().map_err(InfraError::InvalidConfig)?;
            write_settings(&path, &migrated)?;
            log::info!(target: "settings", "migrated legacy settings in {}", path.display());
            return Ok(migrated);
        }
        Some(schema) if schema.as_u64() == Some(u64::from(SETTINGS_SCHEMA)) => {
            serde_json::from_value::<AppSettings>(parsed)?
        }
        Some(schema) => {
            return Err(InfraError::InvalidConfig(format!(
                "unsupported schema {} in {}",
                schema,
                path.display()
            )));
        }
    };
    settings.validate().map_err(InfraError::InvalidConfig)?;
    Ok(settings)
}

pub fn save_settings(config_dir: &Path, settings: &AppSettings) -> Result<(), InfraError> {
    settings.validate().map_err(InfraError::InvalidConfig)?;
    write_settings(&settings_path(config_dir), settings)
}

fn write_settings(path: &Path, settings: &AppSettings) -> Result<(), InfraError> {
    let formatted = serde_json::to_string_pretty(settings)?;
    fs::write(path, format!("{formatted}\n"))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LegacyWeekStandard {
    Iso,
    Us,
    Custom,
}

#[derive(Debug, Deserialize)]
enum LegacyWeek53 {
    #[serde(rename = "merge52")]
    Merge,
    #[serde(rename = "wrap1")]
    Wrap,
    #[serde(rename = "joker")]
    Joker,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum LegacyMonthMode {
    Off,
    Relative,
    Absolute,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacyForce {
    enabled: bool,
    month_mode: LegacyMonthMode,
    relative_offset: i32,
    absolute_year: Option<i32>,
    /// 0-based.
    absolute_month_index: Option<u32>,
    force_day_enabled: bool,
    force_day: u32,
    fallback_policy: String,
    tap_remap_mode: TapRemapMode,
    remap_scope: String,
    snap_duration_ms: u32,
    overrides_enabled: bool,
    overrides_map: OverrideSets,
}

impl Default for LegacyForce {
    fn default() -> Self {
        Self {
            enabled: false,
            month_mode: LegacyMonthMode::Off,
            relative_offset: 0,
            absolute_year: None,
            absolute_month_index: None,
            force_day_enabled: false,
            force_day: 1,
            fallback_policy: "nearest".to_string(),
            tap_remap_mode: TapRemapMode::Stealth,
            remap_scope: "forcedMonthOnly".to_string(),
            snap_duration_ms: 500,
            overrides_enabled: false,
            overrides_map: OverrideSets::new(),
        }
    }
}

/// Flat settings written before `schema` existed. `cancelLockOnBack` and
/// `selectedCustomStackId` have no counterpart and are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LegacySettings {
    stack_type: StackKind,
    custom_stack: Vec<StackCard>,
    seed: u32,
    peek_enabled: bool,
    rehearsal_mode: bool,
    week_standard: LegacyWeekStandard,
    week_start_day: u8,
    week53_handling: LegacyWeek53,
    holidays_enabled: bool,
    holiday_country: HolidayCountry,
    force: LegacyForce,
}

impl Default for LegacySettings {
    fn default() -> Self {
        Self {
            stack_type: StackKind::Mnemonica,
            custom_stack: Vec::new(),
            seed: DEFAULT_SEED,
            peek_enabled: true,
            rehearsal_mode: false,
            week_standard: LegacyWeekStandard::Iso,
            week_start_day: 1,
            week53_handling: LegacyWeek53::Merge,
            holidays_enabled: true,
            holiday_country: HolidayCountry::Us,
            force: LegacyForce::default(),
        }
    }
}

fn migrate_legacy(legacy: LegacySettings) -> Result<AppSettings, InfraError> {
    let standard = match legacy.week_standard {
        LegacyWeekStandard::Iso => WeekStandard::Iso,
        LegacyWeekStandard::Us => WeekStandard::Us,
        LegacyWeekStandard::Custom => WeekStandard::Custom {
            start_day: legacy.week_start_day,
        },
    };
    let week53_handling = match legacy.week53_handling {
        LegacyWeek53::Merge => Week53Handling::MergeWithWeek52,
        LegacyWeek53::Wrap => Week53Handling::WrapToWeek1,
        LegacyWeek53::Joker => Week53Handling::AssignToOverflowSlot,
    };

    let force = legacy.force;
    let month_mode = match force.month_mode {
        LegacyMonthMode::Off => ForceMonthMode::Off,
        LegacyMonthMode::Relative => ForceMonthMode::Relative {
            offset: force.relative_offset,
        },
        LegacyMonthMode::Absolute => {
            let (Some(year), Some(month_index)) = (force.absolute_year, force.absolute_month_index)
            else {
                return Err(InfraError::InvalidConfig(
                    "legacy absolute month mode needs absoluteYear and absoluteMonthIndex"
                        .to_string(),
                ));
            };
            ForceMonthMode::Absolute {
                year,
                month: month_index + 1,
            }
        }
    };
    let fallback_policy = match force.fallback_policy.as_str() {
        "nearest" => FallbackPolicy::NearestValidDayInMonth,
        "block" => FallbackPolicy::BlockArming,
        other => {
            return Err(InfraError::InvalidConfig(format!(
                "unknown legacy fallbackPolicy '{other}'"
            )));
        }
    };
    let remap_scope = match force.remap_scope.as_str() {
        "forcedMonthOnly" => RemapScope::OnlyWhileViewingForcedMonth,
        "anyVisible" => RemapScope::AnyVisibleMonth,
        other => {
            return Err(InfraError::InvalidConfig(format!(
                "unknown legacy remapScope '{other}'"
            )));
        }
    };

    Ok(AppSettings {
        stack_kind: legacy.stack_type,
        custom_stack: legacy.custom_stack,
        seed: legacy.seed,
        week_config: WeekConfig {
            standard,
            week53_handling,
        },
        peek_enabled: legacy.peek_enabled,
        rehearsal_mode: legacy.rehearsal_mode,
        holidays_enabled: legacy.holidays_enabled,
        holiday_country: legacy.holiday_country,
        force: ForceConfig {
            enabled: force.enabled,
            month_mode,
            forced_day: force.force_day_enabled.then_some(force.force_day),
            fallback_policy,
            remap_scope,
            tap_remap_mode: force.tap_remap_mode,
            snap_duration_ms: force.snap_duration_ms,
            ..ForceConfig::default()
        },
        overrides_enabled: force.overrides_enabled,
        overrides: force.overrides_map,
        ..AppSettings::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::overrides::blank_month;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "axiom-config-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    fn month(year: i32, month: u32) -> YearMonth {
        YearMonth::new(year, month).expect("valid month")
    }

    #[test]
    fn ensure_default_settings_writes_loadable_file() {
        let workspace = TempWorkspace::new();
        ensure_default_settings(&workspace.path).expect("write defaults");

        let raw = fs::read_to_string(settings_path(&workspace.path)).expect("read settings");
        assert!(raw.ends_with("}\n"));
        let loaded = load_settings(&workspace.path).expect("load settings");
        assert_eq!(loaded, AppSettings::default());
        assert_eq!(loaded.seed, 12345);
    }

    #[test]
    fn ensure_default_settings_keeps_existing_file() {
        let workspace = TempWorkspace::new();
        let settings = AppSettings {
            seed: 7,
            ..AppSettings::default()
        };
        save_settings(&workspace.path, &settings).expect("save settings");
        ensure_default_settings(&workspace.path).expect("ensure defaults");
        assert_eq!(load_settings(&workspace.path).expect("load").seed, 7);
    }

    #[test]
    fn missing_fields_default_and_unknown_fields_fail() {
        let workspace = TempWorkspace::new();
        fs::write(
            settings_path(&workspace.path),
            r#"{"schema":1,"stackKind":"aronson"}"#,
        )
        .expect("write settings");
        let loaded = load_settings(&workspace.path).expect("load settings");
        assert_eq!(loaded.stack_kind, StackKind::Aronson);
        assert_eq!(loaded.force, ForceConfig::default());

        fs::write(
            settings_path(&workspace.path),
            r#"{"schema":1,"holidayCountry":"US"}"#,
        )
        .expect("write settings");
        assert!(matches!(load_settings(&workspace.path), Err(InfraError::Json(_))));
    }

    #[test]
    fn unsupported_schema_is_rejected() {
        let workspace = TempWorkspace::new();
        fs::write(settings_path(&workspace.path), r#"{"schema":2}"#).expect("write settings");
        match load_settings(&workspace.path) {
            Err(InfraError::InvalidConfig(message)) => {
                assert!(message.contains("unsupported schema 2"));
            }
            other => panic!("expected invalid config error, got {other:?}"),
        }
    }

    #[test]
    fn legacy_settings_are_migrated_and_rewritten() {
        let workspace = TempWorkspace::new();
        let legacy = serde_json::json!({
            "stackType": "aronson",
            "seed": 999,
            "weekStandard": "custom",
            "weekStartDay": 3,
            "week53Handling": "joker",
            "holidaysEnabled": false,
            "holidayCountry": "UK",
            "force": {
                "enabled": true,
                "monthMode": "absolute",
                "absoluteYear": 2025,
                "absoluteMonthIndex": 1,
                "forceDayEnabled": true,
                "forceDay": 31,
                "fallbackPolicy": "block",
                "tapRemapMode": "honest",
                "remapScope": "anyVisible",
                "cancelLockOnBack": true,
                "snapDurationMs": 650,
                "overridesEnabled": true,
                "overridesMap": {
                    "2025-02": blank_month(month(2025, 2))
                }
            }
        });
        fs::write(
            settings_path(&workspace.path),
            serde_json::to_string(&legacy).expect("serialize legacy"),
        )
        .expect("write legacy");

        let migrated = load_settings(&workspace.path).expect("migrate legacy settings");
        assert_eq!(migrated.schema, SETTINGS_SCHEMA);
        assert_eq!(migrated.stack_kind, StackKind::Aronson);
        assert_eq!(migrated.seed, 999);
        assert_eq!(migrated.week_config.standard, WeekStandard::Custom { start_day: 3 });
        assert_eq!(
            migrated.week_config.week53_handling,
            Week53Handling::AssignToOverflowSlot
        );
        assert_eq!(
            migrated.force.month_mode,
            ForceMonthMode::Absolute { year: 2025, month: 2 }
        );
        assert_eq!(migrated.force.forced_day, Some(31));
        assert_eq!(migrated.force.fallback_policy, FallbackPolicy::BlockArming);
        assert_eq!(migrated.force.remap_scope, RemapScope::AnyVisibleMonth);
        assert_eq!(migrated.force.tap_remap_mode, TapRemapMode::Honest);
        assert_eq!(migrated.force.snap_duration_ms, 650);
        assert!(!migrated.holidays_enabled);
        assert_eq!(migrated.holiday_country, HolidayCountry::Uk);
        assert!(migrated.overrides_enabled);
        assert!(migrated.overrides.contains_key("2025-02"));

        let rewritten: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(settings_path(&workspace.path)).expect("read rewritten"),
        )
        .expect("parse rewritten");
        assert_eq!(rewritten["schema"], 1);
        assert_eq!(load_settings(&workspace.path).expect("reload"), migrated);
    }

    #[test]
    fn legacy_disabled_force_day_becomes_none() {
        let legacy: LegacySettings =
            serde_json::from_str(r#"{"force":{"forceDayEnabled":false,"forceDay":9}}"#)
                .expect("parse legacy");
        let migrated = migrate_legacy(legacy).expect("migrate");
        assert_eq!(migrated.force.forced_day, None);
        assert!(migrated.holidays_enabled);
        assert_eq!(migrated.force.tap_remap_mode, TapRemapMode::Stealth);
        assert_eq!(migrated.week_config, WeekConfig::default());
    }

    #[test]
    fn custom_stack_must_be_well_formed() {
        let mut settings = AppSettings {
            stack_kind: StackKind::Custom,
            ..AppSettings::default()
        };
        assert!(settings.validate().is_err());

        settings.custom_stack = crate::domain::stacks::new_deck_order();
        assert!(settings.validate().is_ok());
        assert_eq!(settings.current_stack()[0].label, "AC");

        settings.custom_stack[3].position = 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn month_override_helpers_enforce_write_contract() {
        let mut settings = AppSettings::default();
        let mut march = blank_month(month(2025, 3));
        settings
            .set_month_overrides(march.clone())
            .expect("store overrides");
        assert!(settings.active_overrides().is_none());
        settings.overrides_enabled = true;
        assert_eq!(settings.active_overrides().map(|sets| sets.len()), Some(1));

        march.days.pop();
        assert!(settings.set_month_overrides(march).is_err());

        assert!(settings.remove_month_overrides(month(2025, 3)));
        assert!(!settings.remove_month_overrides(month(2025, 3)));
    }

    #[test]
    fn timezone_controls_today() {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 14, 23, 30, 0)
            .single()
            .expect("valid timestamp");
        let mut settings = AppSettings::default();
        assert_eq!(settings.today(now).to_string(), "2025-03-14");

        settings.timezone = Some("Asia/Tokyo".to_string());
        assert_eq!(settings.today(now).to_string(), "2025-03-15");
        assert!(settings.validate().is_ok());

        settings.timezone = Some("Mars/Olympus".to_string());
        assert!(settings.validate().is_err());
        assert_eq!(settings.timezone(), Tz::UTC);
    }
}
