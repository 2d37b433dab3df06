use crate::domain::models::YearMonth;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};

pub const GLIDE_STEP_MS: u64 = 80;

/// Months shown on each step of a glide from `from` to `to`. The last entry
/// is always `to`; a long distance is cut short when the step budget
/// (`duration_ms / 80`, at least 1) runs out.
pub fn glide_path(from: YearMonth, to: YearMonth, duration_ms: u32) -> Vec<YearMonth> {
    let steps = (u64::from(duration_ms) / GLIDE_STEP_MS).max(1);
    let direction = if to > from { 1 } else { -1 };
    let mut path = Vec::new();

    for step in 1..=steps {
        let next = from.offset(direction * step as i32);
        let passed = if direction > 0 { next >= to } else { next <= to };
        if passed || step == steps {
            path.push(to);
            break;
        }
        path.push(next);
    }
    path
}

/// Plays a glide path on an 80 ms interval. Starting a new glide stops the
/// previous one first, so at most one run is live per timer.
#[derive(Debug, Default)]
pub struct GlideTimer {
    task: Option<JoinHandle<()>>,
}

impl GlideTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Must be called from within a tokio runtime.
    pub fn start<F>(&mut self, path: Vec<YearMonth>, mut on_step: F)
    where
        F: FnMut(YearMonth) + Send + 'static,
    {
        self.stop();
        self.task = Some(tokio::spawn(async move {
            let mut timer = interval(Duration::from_millis(GLIDE_STEP_MS));
            timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
            timer.tick().await;
            for month in path {
                timer.tick().await;
                on_step(month);
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }

    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl Drop for GlideTimer {
    fn drop(&mut self) {
        self.stop();
    }
}
