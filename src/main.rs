mod cli;
mod commands;
mod config;
mod engine;
mod paths;
mod progress;
mod resource;
mod stack;
mod state;
mod ui;

use anyhow::Result;
use clap::{CommandFactory, Parser};
use clap_complete::generate;
use cli::{Cli, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use crate::config::Overrides;
use crate::resource::ProviderError;
use crate::state::State;

/// Global context for the application
pub struct Context {
    pub verbose: u8,
    pub quiet: bool,
    pub stack: PathBuf,
    pub state: PathBuf,
    pub config: Option<PathBuf>,
    pub overrides: Overrides,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    let log_level = match cli.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };

    env_logger::Builder::new()
        .filter_level(if cli.quiet {
            log::LevelFilter::Error
        } else {
            log_level
        })
        .format_timestamp(None)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            report(&err);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let ctx = Context {
        verbose: cli.verbose,
        quiet: cli.quiet,
        stack: paths::expand(&cli.stack.to_string_lossy()),
        state: State::resolve_path(&cli.state),
        config: cli.config.map(|p| paths::expand(&p.to_string_lossy())),
        overrides: Overrides {
            api_token: cli.api_token,
            base_url: cli.base_url,
        },
    };

    match cli.command {
        Command::Plan(args) => commands::plan::run(&ctx, args.target.as_deref()),
        Command::Apply(args) => {
            commands::apply::run(&ctx, args.target.as_deref(), args.yes, args.dry_run)
        }
        Command::Refresh(args) => commands::refresh::run(&ctx, args.jobs),
        Command::Destroy(args) => commands::destroy::run(&ctx, args.target.as_deref(), args.yes),
        Command::Kinds => commands::kinds::run(),
        Command::Completions { shell } => {
            let mut cmd = Cli::command();
            generate(shell, &mut cmd, "crmform", &mut io::stdout());
            Ok(())
        }
    }
}

/// Print the error chain, then advice for the underlying provider error
fn report(err: &anyhow::Error) {
    ui::error(&err.to_string());
    for cause in err.chain().skip(1) {
        ui::dim(&format!("caused by: {cause}"));
    }
    if let Some(provider) = err.chain().find_map(|e| e.downcast_ref::<ProviderError>()) {
        ui::dim(provider.advice());
    }
}
