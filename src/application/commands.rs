use crate::application::bootstrap::bootstrap_workspace;
use crate::application::glide::glide_path;
use crate::application::search::{SearchOutcome, search};
use crate::domain::force::{
    ForceStateMachine, TriggerOutcome, forced_month, valid_forced_day,
};
use crate::domain::holidays::{holiday_color, holidays_for_month, holidays_on};
use crate::domain::mapping::{focus_word_for, week_card_for_date};
use crate::domain::models::{ItemMapping, MonthOverrideSet, StackCard, YearMonth};
use crate::domain::overrides::{DayContent, blank_month, day_content};
use crate::domain::week::WeekIndex;
use crate::infrastructure::config::{AppSettings, load_settings, save_settings};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

pub type NowProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

pub struct AppState {
    config_dir: PathBuf,
    logs_dir: PathBuf,
    runtime: Mutex<RuntimeState>,
    log_guard: Mutex<()>,
    now_provider: NowProvider,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        bootstrap_workspace(&workspace_root)?;
        let config_dir = workspace_root.join("config");
        let logs_dir = workspace_root.join("logs");
        let settings = load_settings(&config_dir)?;

        Ok(Self {
            config_dir,
            logs_dir,
            runtime: Mutex::new(RuntimeState {
                settings,
                force: ForceStateMachine::new(),
            }),
            log_guard: Mutex::new(()),
            now_provider: Arc::new(Utc::now),
        })
    }

    pub fn with_now_provider(mut self, now_provider: NowProvider) -> Self {
        self.now_provider = now_provider;
        self
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    fn now(&self) -> DateTime<Utc> {
        (self.now_provider)()
    }

    pub fn command_error(&self, command: &str, error: &InfraError) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        log::info!(target: "commands", "{command}: {message}");
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        log::error!(target: "commands", "{command}: {message}");
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": self.now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }
}

#[derive(Debug)]
struct RuntimeState {
    settings: AppSettings,
    force: ForceStateMachine,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ForceTriggerResponse {
    pub ok: bool,
    pub phase: String,
    pub forced_month: String,
    pub forced_day: Option<u32>,
    /// Months to step through toward the forced month; empty unless armed.
    pub glide_path: Vec<String>,
    pub snap_duration_ms: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ForceStatusResponse {
    pub phase: String,
    pub armed: bool,
    pub locked: bool,
    pub last_trigger_at: Option<String>,
    pub panic_until: Option<String>,
    pub forced_month: String,
    pub forced_day: Option<u32>,
    /// Highlighted tile of the forced month under honest remapping.
    pub hint_day: Option<u32>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PeekResponse {
    pub date: String,
    pub week: WeekIndex,
    pub card: StackCard,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TapDayResponse {
    pub date: String,
    pub redirected: bool,
    /// Card of the literally tapped day, when peeking is enabled.
    pub peek: Option<PeekResponse>,
    pub hint_day: Option<u32>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DayContentResponse {
    pub date: String,
    pub week: WeekIndex,
    pub source: String,
    pub public_label: Option<String>,
    pub item: Option<ItemMapping>,
    pub items: Vec<ItemMapping>,
    pub card: Option<StackCard>,
    pub focus_word: String,
    pub holidays: Vec<String>,
    /// Mapped card, shown alongside any override while rehearsing.
    pub rehearsal: Option<PeekResponse>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HolidayMark {
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CalendarDayResponse {
    pub day: u32,
    pub date: String,
    pub holidays: Vec<HolidayMark>,
    pub hinted: bool,
    pub rehearsal_label: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct MonthViewResponse {
    pub month: String,
    pub days: Vec<CalendarDayResponse>,
}

pub fn arm_force_impl(
    state: &AppState,
    viewing: Option<String>,
) -> Result<ForceTriggerResponse, InfraError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    let viewing = parse_optional_month(viewing, "viewing")?;
    let config = runtime.settings.force;
    let outcome = runtime.force.arm(&config, now);
    let response = to_trigger_response(&runtime, outcome, viewing, now, true);
    if outcome.ok {
        state.log_info("arm_force", &format!("armed toward {}", response.forced_month));
    }
    Ok(response)
}

pub fn lock_force_day_impl(state: &AppState) -> Result<ForceTriggerResponse, InfraError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    let config = runtime.settings.force;
    let outcome = runtime.force.lock_day(&config, now);
    let response = to_trigger_response(&runtime, outcome, None, now, false);
    if outcome.ok {
        state.log_info("lock_force_day", "locked forced day");
    }
    Ok(response)
}

pub fn arm_and_lock_force_impl(
    state: &AppState,
    viewing: Option<String>,
) -> Result<ForceTriggerResponse, InfraError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    let viewing = parse_optional_month(viewing, "viewing")?;
    let config = runtime.settings.force;
    let outcome = runtime.force.arm_and_lock(&config, now);
    let response = to_trigger_response(&runtime, outcome, viewing, now, true);
    if outcome.ok {
        state.log_info(
            "arm_and_lock_force",
            &format!("armed toward {} (phase={})", response.forced_month, response.phase),
        );
    }
    Ok(response)
}

pub fn cancel_force_impl(state: &AppState) -> Result<ForceStatusResponse, InfraError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    runtime.force.cancel(now);
    state.log_info("cancel_force", "force mode cancelled");
    Ok(to_status_response(&runtime, now))
}

pub fn panic_force_impl(state: &AppState) -> Result<ForceStatusResponse, InfraError> {
    let now = state.now();
    let mut runtime = lock_runtime(state)?;
    let config = runtime.settings.force;
    runtime.force.panic(&config, now);
    state.log_info("panic_force", "force mode reset with panic window");
    Ok(to_status_response(&runtime, now))
}

pub fn force_status_impl(state: &AppState) -> Result<ForceStatusResponse, InfraError> {
    let now = state.now();
    let runtime = lock_runtime(state)?;
    Ok(to_status_response(&runtime, now))
}

pub fn tap_day_impl(
    state: &AppState,
    month: String,
    day: u32,
) -> Result<TapDayResponse, InfraError> {
    let viewed = parse_month_input(&month, "month")?;
    let now = state.now();
    let runtime = lock_runtime(state)?;
    let settings = &runtime.settings;
    let today = settings.today(now);

    let resolution = runtime
        .force
        .resolve_tap(&settings.force, viewed, day, today)
        .ok_or_else(|| {
            InfraError::InvalidConfig(format!("day {day} does not exist in {viewed}"))
        })?;
    let peek = viewed
        .day(day)
        .and_then(|tapped| peek_for(settings, tapped));

    Ok(TapDayResponse {
        date: resolution.date.to_string(),
        redirected: resolution.redirected,
        peek,
        hint_day: runtime.force.hint_day(&settings.force, viewed, today),
    })
}

/// Grid cells for `month`: holiday marks, the honest hint and rehearsal labels.
pub fn month_view_impl(state: &AppState, month: String) -> Result<MonthViewResponse, InfraError> {
    let month = parse_month_input(&month, "month")?;
    let now = state.now();
    let runtime = lock_runtime(state)?;
    let settings = &runtime.settings;
    let hint_day = runtime.force.hint_day(&settings.force, month, settings.today(now));
    let mut holidays = if settings.holidays_enabled {
        holidays_for_month(month, settings.holiday_country)
    } else {
        Default::default()
    };
    let stack = settings.current_stack();

    let days = (1..=month.day_count())
        .filter_map(|day| month.day(day).map(|date| (day, date)))
        .map(|(day, date)| CalendarDayResponse {
            day,
            date: date.to_string(),
            holidays: holidays
                .remove(&day)
                .unwrap_or_default()
                .into_iter()
                .map(|name| HolidayMark {
                    color: holiday_color(&name).to_string(),
                    name,
                })
                .collect(),
            hinted: hint_day == Some(day),
            rehearsal_label: settings
                .rehearsal_mode
                .then(|| week_card_for_date(date, &stack, &settings.week_config).1)
                .flatten()
                .map(|card| card.label.clone()),
        })
        .collect();

    Ok(MonthViewResponse {
        month: month.key(),
        days,
    })
}

pub fn peek_day_impl(
    state: &AppState,
    date: Option<String>,
) -> Result<Option<PeekResponse>, InfraError> {
    let now = state.now();
    let runtime = lock_runtime(state)?;
    let date = match normalize_optional(date) {
        Some(value) => parse_date_input(&value, "date")?,
        None => runtime.settings.today(now),
    };
    Ok(peek_for(&runtime.settings, date))
}

pub fn search_impl(
    state: &AppState,
    query: String,
    year: Option<i32>,
) -> Result<SearchOutcome, InfraError> {
    let now = state.now();
    let runtime = lock_runtime(state)?;
    let settings = &runtime.settings;
    let year = year.unwrap_or_else(|| settings.today(now).year());
    let stack = settings.current_stack();
    Ok(search(
        &query,
        &stack,
        year,
        &settings.week_config,
        settings.seed,
    ))
}

pub fn day_content_impl(state: &AppState, date: String) -> Result<DayContentResponse, InfraError> {
    let date = parse_date_input(&date, "date")?;
    let runtime = lock_runtime(state)?;
    let settings = &runtime.settings;
    let stack = settings.current_stack();
    let focus_word = focus_word_for(date, settings.seed).to_string();
    let holidays = holidays_for(settings, date);
    let rehearsal = rehearsal_for(settings, date);

    let response = match day_content(
        date,
        &stack,
        &settings.week_config,
        settings.active_overrides(),
    ) {
        DayContent::Override { entry, item, week } => DayContentResponse {
            date: date.to_string(),
            week,
            source: "override".to_string(),
            public_label: Some(entry.public_label.clone()).filter(|label| !label.is_empty()),
            item: item.cloned(),
            items: entry.items.clone(),
            card: None,
            focus_word,
            holidays,
            rehearsal,
        },
        DayContent::Card { week, card } => DayContentResponse {
            date: date.to_string(),
            week,
            source: "card".to_string(),
            public_label: None,
            item: None,
            items: Vec::new(),
            card: Some(card.clone()),
            focus_word,
            holidays,
            rehearsal,
        },
        DayContent::Unavailable { week } => DayContentResponse {
            date: date.to_string(),
            week,
            source: "unavailable".to_string(),
            public_label: None,
            item: None,
            items: Vec::new(),
            card: None,
            focus_word,
            holidays,
            rehearsal,
        },
    };
    Ok(response)
}

/// Stored overrides for the month, or a blank set to start editing from.
pub fn month_overrides_impl(
    state: &AppState,
    month: String,
) -> Result<MonthOverrideSet, InfraError> {
    let month = parse_month_input(&month, "month")?;
    let runtime = lock_runtime(state)?;
    Ok(runtime
        .settings
        .overrides
        .get(&month.key())
        .cloned()
        .unwrap_or_else(|| blank_month(month)))
}

pub fn save_month_overrides_impl(
    state: &AppState,
    overrides: MonthOverrideSet,
) -> Result<MonthOverrideSet, InfraError> {
    let mut runtime = lock_runtime(state)?;
    let mut updated = runtime.settings.clone();
    updated
        .set_month_overrides(overrides.clone())
        .map_err(InfraError::InvalidConfig)?;
    save_settings(&state.config_dir, &updated)?;
    runtime.settings = updated;

    state.log_info(
        "save_month_overrides",
        &format!("saved month_year={}", overrides.month_year),
    );
    Ok(overrides)
}

pub fn remove_month_overrides_impl(state: &AppState, month: String) -> Result<bool, InfraError> {
    let month = parse_month_input(&month, "month")?;
    let mut runtime = lock_runtime(state)?;
    let mut updated = runtime.settings.clone();
    if !updated.remove_month_overrides(month) {
        return Ok(false);
    }
    save_settings(&state.config_dir, &updated)?;
    runtime.settings = updated;

    state.log_info("remove_month_overrides", &format!("removed month_year={month}"));
    Ok(true)
}

pub fn get_settings_impl(state: &AppState) -> Result<AppSettings, InfraError> {
    let runtime = lock_runtime(state)?;
    Ok(runtime.settings.clone())
}

pub fn update_settings_impl(
    state: &AppState,
    settings: AppSettings,
) -> Result<AppSettings, InfraError> {
    let mut runtime = lock_runtime(state)?;
    save_settings(&state.config_dir, &settings)?;
    runtime.settings = settings.clone();

    state.log_info(
        "update_settings",
        &format!(
            "stack={:?} force_enabled={}",
            settings.stack_kind, settings.force.enabled
        ),
    );
    Ok(settings)
}

fn lock_runtime(state: &AppState) -> Result<MutexGuard<'_, RuntimeState>, InfraError> {
    state
        .runtime
        .lock()
        .map_err(|error| InfraError::InvalidConfig(format!("runtime lock poisoned: {error}")))
}

fn peek_for(settings: &AppSettings, date: NaiveDate) -> Option<PeekResponse> {
    if !settings.peek_enabled {
        return None;
    }
    mapped_card(settings, date)
}

fn rehearsal_for(settings: &AppSettings, date: NaiveDate) -> Option<PeekResponse> {
    if !settings.rehearsal_mode {
        return None;
    }
    mapped_card(settings, date)
}

fn holidays_for(settings: &AppSettings, date: NaiveDate) -> Vec<String> {
    if !settings.holidays_enabled {
        return Vec::new();
    }
    holidays_on(date, settings.holiday_country)
}

fn mapped_card(settings: &AppSettings, date: NaiveDate) -> Option<PeekResponse> {
    let stack = settings.current_stack();
    let (week, card) = week_card_for_date(date, &stack, &settings.week_config);
    card.map(|card| PeekResponse {
        date: date.to_string(),
        week,
        card: card.clone(),
    })
}

fn to_trigger_response(
    runtime: &RuntimeState,
    outcome: TriggerOutcome,
    viewing: Option<YearMonth>,
    now: DateTime<Utc>,
    glide: bool,
) -> ForceTriggerResponse {
    let config = &runtime.settings.force;
    let today = runtime.settings.today(now);
    let target = forced_month(config, today);
    let path = if outcome.ok && glide {
        let from = viewing.unwrap_or_else(|| YearMonth::of(today));
        glide_path(from, target, config.snap_duration_ms())
            .into_iter()
            .map(YearMonth::key)
            .collect()
    } else {
        Vec::new()
    };

    ForceTriggerResponse {
        ok: outcome.ok,
        phase: runtime.force.phase(now).as_str().to_string(),
        forced_month: target.key(),
        forced_day: valid_forced_day(config, target),
        glide_path: path,
        snap_duration_ms: config.snap_duration_ms(),
    }
}

fn to_status_response(runtime: &RuntimeState, now: DateTime<Utc>) -> ForceStatusResponse {
    let config = &runtime.settings.force;
    let today = runtime.settings.today(now);
    let target = forced_month(config, today);
    let force = runtime.force.state();
    ForceStatusResponse {
        phase: runtime.force.phase(now).as_str().to_string(),
        armed: force.armed,
        locked: force.locked,
        last_trigger_at: force.last_trigger_at.map(|value| value.to_rfc3339()),
        panic_until: force.panic_until.map(|value| value.to_rfc3339()),
        forced_month: target.key(),
        forced_day: valid_forced_day(config, target),
        hint_day: runtime.force.hint_day(config, target, today),
    }
}

fn normalize_optional(value: Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned)
}

fn parse_date_input(value: &str, field_name: &str) -> Result<NaiveDate, InfraError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|error| {
        InfraError::InvalidConfig(format!("{field_name} must be YYYY-MM-DD: {error}"))
    })
}

fn parse_month_input(value: &str, field_name: &str) -> Result<YearMonth, InfraError> {
    YearMonth::parse_key(value)
        .ok_or_else(|| InfraError::InvalidConfig(format!("{field_name} must be YYYY-MM")))
}

fn parse_optional_month(
    value: Option<String>,
    field_name: &str,
) -> Result<Option<YearMonth>, InfraError> {
    normalize_optional(value)
        .map(|value| parse_month_input(&value, field_name))
        .transpose()
}
