use anyhow::Result;
use declarative::Target;

use crate::Context;
use crate::engine::{ExecuteOptions, ExecutionPlan, TerminalConfirm, ensure_success, execute};
use crate::progress::StepSpinners;
use crate::ui;

pub fn run(ctx: &Context, target: Option<&str>, yes: bool, dry_run: bool) -> Result<()> {
    let stack = super::load_stack(ctx)?;
    let mut state = super::load_state(ctx)?;
    let client = super::client(ctx)?;
    let target = Target::from_option(target);

    let plan = ExecutionPlan::for_apply(&client, &stack, &state, &target)?;

    if !ctx.quiet {
        ui::header("crmform apply");
        ui::kv("Stack", &ctx.stack.display().to_string());
        ui::kv("Resources", &stack.resources.len().to_string());
    }

    let opts = ExecuteOptions {
        dry_run,
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
