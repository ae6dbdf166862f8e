//! Execution engine - runs a plan step by step, saving state as it goes

use anyhow::{Result, bail};
use colored::Colorize;
use crmkit::Client;
use declarative::{
    Action, ConfirmCallback, ExecuteSummary, NoteBuffer, Notifier, ProgressCallback, StepResult,
};
use std::path::Path;

use crate::resource::ProviderError;
use crate::state::State;
use crate::ui;

use super::differ::display_plan;
use super::planner::{ExecutionPlan, Operation, Step};

/// Options for execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Don't make changes, just show what would happen
    pub dry_run: bool,
    /// Skip confirmation prompts
    pub yes: bool,
    /// Show declaration diffs
    pub verbose: bool,
}

/// The step that stopped a run
#[derive(Debug)]
pub struct Failure {
    pub address: String,
    pub error: ProviderError,
}

/// What a run did
#[derive(Debug, Default)]
pub struct Execution {
    pub summary: ExecuteSummary,
    pub results: Vec<(String, StepResult)>,
    pub failure: Option<Failure>,
}

/// Show the plan, confirm, run it and print a summary
pub fn execute(
    client: &Client,
    plan: &ExecutionPlan,
    state: &mut State,
    state_path: &Path,
    opts: &ExecuteOptions,
    confirm: &mut dyn ConfirmCallback,
    progress: &mut dyn ProgressCallback,
) -> Result<Execution> {
    display_plan(plan, opts.verbose);

    if !plan.has_changes() {
        return Ok(Execution {
            summary: ExecuteSummary {
                unchanged: plan.steps.len(),
                ..Default::default()
            },
            ..Default::default()
        });
    }

    if opts.dry_run {
        println!();
        println!("  {} Dry run - no changes made", "ℹ".blue());
        return Ok(Execution::default());
    }

    if !opts.yes && !confirm.confirm("Proceed with these changes?")? {
        println!();
        println!("  {} Aborted", "✗".red());
        return Ok(Execution {
            summary: ExecuteSummary {
                skipped: plan.changes().count(),
                ..Default::default()
            },
            ..Default::default()
        });
    }

    println!();
    let execution = run_steps(client, plan, state, state_path, progress, &mut PrintNotes)?;

    if let Some(failure) = &execution.failure {
        println!();
        ui::error(&format!("{}: {}", failure.address, failure.error));
        ui::dim(failure.error.advice());
    }
    print_summary(&execution.summary);

    Ok(execution)
}

/// Run every changing step in order
///
/// State is saved after each successful step. The first failure stops the
/// run; the remaining steps are reported as skipped. Errors are only
/// returned for state file I/O.
pub fn run_steps(
    client: &Client,
    plan: &ExecutionPlan,
    state: &mut State,
    state_path: &Path,
    progress: &mut dyn ProgressCallback,
    notes: &mut dyn Notifier,
) -> Result<Execution> {
    let mut execution = Execution::default();
    execution.summary.unchanged = plan.count(Operation::Apply(Action::NoOp));

    let steps: Vec<&Step> = plan.changes().collect();
    progress.on_batch_start(steps.len());

    for step in steps {
        let address = step.address();

        let result = if execution.failure.is_some() {
            StepResult::Skipped {
                reason: "an earlier step failed".to_string(),
            }
        } else {
            progress.on_step_start(&address, step.operation.verb());
            let mut buffer = NoteBuffer::new();
            let result = match run_step(client, step, state, &mut buffer) {
                Ok(result) => {
                    state.save(state_path)?;
                    result
                }
                Err(error) => {
                    log::debug!("{address} failed: {error:?}");
                    let result = StepResult::Failed {
                        error: error.to_string(),
                    };
                    execution.failure = Some(Failure {
                        address: address.clone(),
                        error,
                    });
                    result
                }
            };
            progress.on_step_complete(&address, &result);
            for note in buffer.drain() {
                notes.note(&note);
            }
            result
        };

        execution.summary.add_result(&result);
        execution.results.push((address, result));
    }

    progress.on_batch_complete();
    Ok(execution)
}

fn run_step(
    client: &Client,
    step: &Step,
    state: &mut State,
    notes: &mut dyn Notifier,
) -> Result<StepResult, ProviderError> {
    match step.operation {
        Operation::Delete => {
            let (olds, output) = match &step.prior {
                Some((olds, output)) => (olds, output),
                None => (&step.inputs, &serde_json::Value::Null),
            };
            let removal = step.kind.destroy(client, olds, output, notes)?;
            state.remove(&step.name);
            Ok(removal.into())
        }
        Operation::Apply(_) => {
            let prior = step.prior.as_ref().map(|(i, o)| (i, o));
            let outcome = step.kind.reconcile(client, &step.inputs, prior, notes)?;
            let result = outcome.result();
            state.upsert(&step.name, step.kind, step.inputs.clone(), outcome.into_output());
            Ok(result)
        }
    }
}

/// Notes printed under the finished step and logged at info
pub struct PrintNotes;

impl Notifier for PrintNotes {
    fn note(&mut self, message: &str) {
        log::info!("{message}");
        ui::dim(message);
    }
}

/// Confirmation through a terminal prompt
pub struct TerminalConfirm;

impl ConfirmCallback for TerminalConfirm {
    fn confirm(&mut self, prompt: &str) -> std::io::Result<bool> {
        if !console::Term::stdout().is_term() {
            return Err(std::io::Error::other(
                "not a terminal; pass --yes to proceed without confirmation",
            ));
        }
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .map_err(std::io::Error::other)
    }
}

/// Refuse to continue when the run failed
pub fn ensure_success(execution: &Execution) -> Result<()> {
    if let Some(failure) = &execution.failure {
        bail!("{} failed ({})", failure.address, failure.error.tag());
    }
    Ok(())
}

/// Print final summary
fn print_summary(summary: &ExecuteSummary) {
    println!();
    if summary.is_success() {
        println!("  {} Workspace converged", "✓".green().bold());
    } else {
        println!("  {} Run stopped at a failed step", "⚠".yellow().bold());
    }

    let lines = [
        (summary.created, "created"),
        (summary.updated, "updated"),
        (summary.replaced, "replaced"),
        (summary.deleted, "deleted"),
        (summary.forgotten, "forgotten (remote object kept)"),
        (summary.skipped, "skipped"),
    ];
    for (count, label) in lines {
        if count > 0 {
            println!("    • {count} {label}");
        }
    }
    if summary.failed > 0 {
        println!("    • {} {}", summary.failed, "failed".red());
    }
}
