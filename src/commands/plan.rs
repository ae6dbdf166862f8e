use anyhow::Result;
use declarative::Target;

use crate::Context;
use crate::engine::ExecutionPlan;
use crate::engine::differ::display_plan;
use crate::ui;

pub fn run(ctx: &Context, raw_target: Option<&str>) -> Result<()> {
    let stack = super::load_stack(ctx)?;
    let state = super::load_state(ctx)?;
    let client = super::client(ctx)?;

    let target = Target::from_option(raw_target);
    let plan = ExecutionPlan::for_apply(&client, &stack, &state, &target)?;

    if !ctx.quiet {
        ui::header("crmform plan");
        ui::kv("Stack", &ctx.stack.display().to_string());
        ui::kv("State", &ctx.state.display().to_string());
        if let Some(target) = raw_target {
            ui::kv("Target", target);
        }
    }

    display_plan(&plan, true);
    Ok(())
}
