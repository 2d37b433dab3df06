//! Covert force-navigation: arming a target month, locking taps onto a target
//! day, and the debounce and panic gates that every trigger passes through.
//!
//! All transitions take `&mut self`, so the debounce check and the timestamp
//! update happen in one step; callers sharing a machine across trigger
//! sources hold it behind a single lock.

use crate::domain::models::{
    FallbackPolicy, ForceConfig, ForceMonthMode, RemapScope, TapRemapMode, YearMonth,
};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ForcePhase {
    Idle,
    Armed,
    Locked,
    Panic,
}

impl ForcePhase {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Armed => "armed",
            Self::Locked => "locked",
            Self::Panic => "panic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TriggerOutcome {
    pub ok: bool,
}

impl TriggerOutcome {
    const ACCEPTED: Self = Self { ok: true };
    const REJECTED: Self = Self { ok: false };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Rejection {
    Disabled,
    NoForcedDay,
    PanicActive,
    Debounced,
}

impl Rejection {
    fn as_str(self) -> &'static str {
        match self {
            Self::Disabled => "force mode disabled",
            Self::NoForcedDay => "no forced day configured",
            Self::PanicActive => "panic window active",
            Self::Debounced => "inside debounce window",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ForceRuntimeState {
    pub armed: bool,
    pub locked: bool,
    pub last_trigger_at: Option<DateTime<Utc>>,
    pub panic_until: Option<DateTime<Utc>>,
}

/// Where a tap on a day cell actually lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TapResolution {
    pub date: NaiveDate,
    pub redirected: bool,
}

#[derive(Debug, Clone, Default)]
pub struct ForceStateMachine {
    state: ForceRuntimeState,
}

impl ForceStateMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &ForceRuntimeState {
        &self.state
    }

    pub fn is_panic_active(&self, now: DateTime<Utc>) -> bool {
        self.state.panic_until.is_some_and(|until| now <= until)
    }

    pub fn phase(&self, now: DateTime<Utc>) -> ForcePhase {
        if self.is_panic_active(now) {
            ForcePhase::Panic
        } else if self.state.locked {
            ForcePhase::Locked
        } else if self.state.armed {
            ForcePhase::Armed
        } else {
            ForcePhase::Idle
        }
    }

    /// Idle/Locked -> Armed. Re-arming clears the lock.
    pub fn arm(&mut self, config: &ForceConfig, now: DateTime<Utc>) -> TriggerOutcome {
        if let Err(rejection) = self.admit(config, now) {
            return reject("arm", rejection);
        }
        self.state.armed = true;
        self.state.locked = false;
        TriggerOutcome::ACCEPTED
    }

    /// Idle/Armed -> Locked. Gated independently of `arm`.
    pub fn lock_day(&mut self, config: &ForceConfig, now: DateTime<Utc>) -> TriggerOutcome {
        if config.enabled && config.forced_day.is_none() {
            return reject("lock_day", Rejection::NoForcedDay);
        }
        if let Err(rejection) = self.admit(config, now) {
            return reject("lock_day", rejection);
        }
        self.state.locked = true;
        TriggerOutcome::ACCEPTED
    }

    /// One trigger that arms and, when a forced day is configured, locks.
    pub fn arm_and_lock(&mut self, config: &ForceConfig, now: DateTime<Utc>) -> TriggerOutcome {
        if let Err(rejection) = self.admit(config, now) {
            return reject("arm_and_lock", rejection);
        }
        self.state.armed = true;
        self.state.locked = config.forced_day.is_some();
        TriggerOutcome::ACCEPTED
    }

    /// Always succeeds; leaves any panic window in place.
    pub fn cancel(&mut self, now: DateTime<Utc>) {
        self.state.armed = false;
        self.state.locked = false;
        self.state.last_trigger_at = Some(now);
    }

    pub fn panic(&mut self, config: &ForceConfig, now: DateTime<Utc>) {
        self.state.armed = false;
        self.state.locked = false;
        self.state.last_trigger_at = Some(now);
        self.state.panic_until =
            Some(now + Duration::milliseconds(i64::from(config.panic_window_ms)));
    }

    /// Redirects a tap on `tapped_day` of the `viewed` month to the forced day
    /// when locked and in scope. `None` when the tapped day does not exist.
    pub fn resolve_tap(
        &self,
        config: &ForceConfig,
        viewed: YearMonth,
        tapped_day: u32,
        today: NaiveDate,
    ) -> Option<TapResolution> {
        let literal = TapResolution {
            date: viewed.day(tapped_day)?,
            redirected: false,
        };
        if !config.enabled || !self.state.locked || config.forced_day.is_none() {
            return Some(literal);
        }

        let in_scope = match config.remap_scope {
            RemapScope::OnlyWhileViewingForcedMonth => viewed == forced_month(config, today),
            RemapScope::AnyVisibleMonth => true,
        };
        if !in_scope {
            return Some(literal);
        }

        // A blocked fallback lands on the literal tap.
        let redirected = valid_forced_day(config, viewed)
            .and_then(|day| viewed.day(day))
            .map(|date| TapResolution {
                date,
                redirected: true,
            });
        Some(redirected.unwrap_or(literal))
    }

    /// Day of `viewed` whose tile is highlighted under honest remapping: the
    /// forced day, clamped into the month, while locked on the forced month.
    pub fn hint_day(
        &self,
        config: &ForceConfig,
        viewed: YearMonth,
        today: NaiveDate,
    ) -> Option<u32> {
        let honest = config.tap_remap_mode == TapRemapMode::Honest;
        if !(config.enabled && honest && self.state.locked) {
            return None;
        }
        if viewed != forced_month(config, today) {
            return None;
        }
        config.forced_day.map(|day| day.clamp(1, viewed.day_count()))
    }

    /// Every trigger that reaches the panic and debounce gates stamps
    /// `last_trigger_at`, whether or not it is admitted.
    fn admit(&mut self, config: &ForceConfig, now: DateTime<Utc>) -> Result<(), Rejection> {
        if !config.enabled {
            return Err(Rejection::Disabled);
        }
        let previous = self.state.last_trigger_at.replace(now);
        if self.is_panic_active(now) {
            return Err(Rejection::PanicActive);
        }
        if self.panic_cleared_since(previous) {
            return Ok(());
        }
        if let Some(last) = previous {
            if (now - last).num_milliseconds() <= i64::from(config.debounce_ms) {
                return Err(Rejection::Debounced);
            }
        }
        Ok(())
    }

    /// An elapsed panic window clears any debounce stamped before it closed.
    fn panic_cleared_since(&self, last: Option<DateTime<Utc>>) -> bool {
        match (self.state.panic_until, last) {
            (Some(until), Some(last)) => last <= until,
            _ => false,
        }
    }
}

fn reject(trigger: &str, rejection: Rejection) -> TriggerOutcome {
    log::debug!(target: "force", "{trigger} rejected: {}", rejection.as_str());
    TriggerOutcome::REJECTED
}

/// The month force mode targets, relative to `today`.
pub fn forced_month(config: &ForceConfig, today: NaiveDate) -> YearMonth {
    let current = YearMonth::of(today);
    match config.month_mode {
        ForceMonthMode::Off => current,
        ForceMonthMode::Relative { offset } => current.offset(offset),
        ForceMonthMode::Absolute { year, month } => YearMonth::new(year, month).unwrap_or(current),
    }
}

/// Forced day for `month`, after the fallback policy. `None` means the caller
/// falls through to the literally tapped day.
pub fn valid_forced_day(config: &ForceConfig, month: YearMonth) -> Option<u32> {
    let desired = config.forced_day?.max(1);
    let day_count = month.day_count();
    if desired <= day_count {
        return Some(desired);
    }
    match config.fallback_policy {
        FallbackPolicy::NearestValidDayInMonth => Some(day_count),
        FallbackPolicy::BlockArming => None,
    }
}
