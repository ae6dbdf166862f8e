use anyhow::Result;
use declarative::Target;

use crate::Context;
use crate::engine::{ExecuteOptions, ExecutionPlan, TerminalConfirm, ensure_success, execute};
use crate::progress::StepSpinners;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>, yes: bool) -> Result<()> {
    let mut state = super::load_state(ctx)?;
    if state.is_empty() {
        ui::info("Nothing recorded in the state file, nothing to destroy");
        return Ok(());
    }
    let client = super::client(ctx)?;
    let target = Target::from_option(target);

    let plan = ExecutionPlan::for_destroy(&state, &target);

    if !ctx.quiet {
        ui::header("crmform destroy");
        ui::kv("State", &ctx.state.display().to_string());
        ui::warn("Objects, attributes and lists cannot be deleted; they are only forgotten");
    }

    let opts = ExecuteOptions {
        dry_run: false,
        yes,
        verbose: ctx.verbose > 0,
    };
    let execution = execute(
        &client,
        &plan,
        &mut state,
        &ctx.state,
        &opts,
        &mut TerminalConfirm,
        &mut StepSpinners::new(),
    )?;
    ensure_success(&execution)
}
