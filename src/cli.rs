use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use crate::paths::{DEFAULT_STACK_FILE, DEFAULT_STATE_FILE};

#[derive(Parser)]
#[command(name = "crmform")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Declarative configuration for CRM workspaces", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Stack file with the declared resources
    #[arg(long, global = true, default_value = DEFAULT_STACK_FILE)]
    pub stack: PathBuf,

    /// State file recording what was applied
    #[arg(long, global = true, default_value = DEFAULT_STATE_FILE)]
    pub state: String,

    /// Config file (default: ~/.config/crmform/config.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// API token
    #[arg(long, global = true, env = "CRMFORM_API_TOKEN", hide_env_values = true)]
    pub api_token: Option<String>,

    /// API base URL
    #[arg(long, global = true, env = "CRMFORM_BASE_URL")]
    pub base_url: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Show what apply would change
    Plan(PlanArgs),

    /// Converge the workspace to the stack file
    Apply(ApplyArgs),

    /// Re-read recorded resources and update the state file
    Refresh(RefreshArgs),

    /// Remove recorded resources from the workspace
    Destroy(DestroyArgs),

    /// List resource kinds and how they change
    Kinds,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

// ============================================================================
// Command Arguments
// ============================================================================

#[derive(Args)]
pub struct PlanArgs {
    /// Only plan `kind` or `kind.name`
    #[arg(short, long)]
    pub target: Option<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Only apply `kind` or `kind.name`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    /// Show the plan without making changes
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

#[derive(Args)]
pub struct RefreshArgs {
    /// Number of resources read in parallel
    #[arg(short, long, default_value = "4")]
    pub jobs: usize,
}

#[derive(Args)]
pub struct DestroyArgs {
    /// Only destroy `kind` or `kind.name`
    #[arg(short, long)]
    pub target: Option<String>,

    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}
