//! Progress indicators for the crmform CLI

use colored::Colorize;
use declarative::{ProgressCallback, StepResult};
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

const TICK: Duration = Duration::from_millis(80);

/// Create a spinner with a message
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ "),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(TICK);
    pb
}

/// Create a progress bar
pub fn bar(len: u64, msg: &str) -> ProgressBar {
    let pb = ProgressBar::new(len);
    pb.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓░"),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(TICK);
    pb
}

pub fn finish_success(pb: &ProgressBar, msg: &str) {
    pb.finish_with_message(format!("{} {}", "✓".green(), msg));
}

pub fn finish_error(pb: &ProgressBar, msg: &str) {
    pb.finish_with_message(format!("{} {}", "✗".red(), msg));
}

pub fn finish_warn(pb: &ProgressBar, msg: &str) {
    pb.finish_with_message(format!("{} {}", "⚠".yellow(), msg));
}

/// One spinner per step, finished with the step's result
#[derive(Default)]
pub struct StepSpinners {
    current: Option<ProgressBar>,
    total: usize,
    done: usize,
}

impl StepSpinners {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressCallback for StepSpinners {
    fn on_batch_start(&mut self, count: usize) {
        self.total = count;
        self.done = 0;
    }

    fn on_step_start(&mut self, id: &str, description: &str) {
        let counter = format!("[{}/{}]", self.done + 1, self.total).dimmed();
        self.current = Some(spinner(&format!("{counter} {description} {id}")));
    }

    fn on_step_complete(&mut self, id: &str, result: &StepResult) {
        self.done += 1;
        let pb = self.current.take().unwrap_or_else(ProgressBar::hidden);
        match result {
            StepResult::Failed { error } => finish_error(&pb, &format!("{id}: {error}")),
            StepResult::Skipped { reason } => finish_warn(&pb, &format!("{id} skipped: {reason}")),
            StepResult::Unchanged => pb.finish_and_clear(),
            other => finish_success(&pb, &format!("{id} {}", result_verb(other))),
        }
    }

    fn on_batch_complete(&mut self) {
        if let Some(pb) = self.current.take() {
            pb.finish_and_clear();
        }
    }
}

/// Past-tense verb for a step result
pub fn result_verb(result: &StepResult) -> &'static str {
    match result {
        StepResult::Unchanged => "unchanged",
        StepResult::Created => "created",
        StepResult::Updated => "updated",
        StepResult::Replaced => "replaced",
        StepResult::Deleted => "deleted",
        StepResult::Forgotten => "forgotten (left in the workspace)",
        StepResult::Failed { .. } => "failed",
        StepResult::Skipped { .. } => "skipped",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_spinners_track_progress() {
        let mut spinners = StepSpinners::new();
        spinners.on_batch_start(2);
        spinners.on_step_start("object.deals", "create");
        spinners.on_step_complete("object.deals", &StepResult::Created);
        spinners.on_step_start("attribute.stage", "update");
        spinners.on_step_complete(
            "attribute.stage",
            &StepResult::Failed {
                error: "boom".into(),
            },
        );
        spinners.on_batch_complete();

        assert_eq!(spinners.done, 2);
        assert!(spinners.current.is_none());
    }

    #[test]
    fn test_result_verb() {
        assert_eq!(result_verb(&StepResult::Replaced), "replaced");
        assert!(result_verb(&StepResult::Forgotten).starts_with("forgotten"));
    }
}
