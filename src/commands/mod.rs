//! Command implementations
//!
//! - `plan` - Show what apply would change
//! - `apply` - Converge the workspace to the stack file
//! - `refresh` - Re-read recorded resources
//! - `destroy` - Remove recorded resources
//! - `kinds` - Describe the resource kinds

pub mod apply;
pub mod destroy;
pub mod kinds;
pub mod plan;
pub mod refresh;

use anyhow::Result;
use crmkit::Client;

use crate::Context;
use crate::config::Config;
use crate::stack::Stack;
use crate::state::State;

/// Build the API client from the config file and overrides
fn client(ctx: &Context) -> Result<Client> {
    Config::load(ctx.config.as_deref())?
        .with_overrides(ctx.overrides.clone())
        .client()
}

fn load_stack(ctx: &Context) -> Result<Stack> {
    Stack::load(&ctx.stack)
}

fn load_state(ctx: &Context) -> Result<State> {
    State::load(&ctx.state)
}
