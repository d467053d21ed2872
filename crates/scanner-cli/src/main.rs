//! Scanner CLI
//!
//! Dry-runs scanner extension selection and ordering from a plan manifest.

mod cli;
mod commands;
mod context;
mod error;
mod logging;

use clap::Parser;
use colored::Colorize;

use cli::{Cli, Commands};
use context::PlanContext;
use error::Result;

fn main() {
    if let Err(e) = run() {
        eprintln!("{}: {}", "error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose)?;

    let Some(command) = cli.command else {
        // No command provided - show help hint
        println!("{} Scanner extension dry runs", "scanner".green().bold());
        println!();
        println!("Run {} for available commands.", "scanner --help".cyan());
        return Ok(());
    };

    let ctx = PlanContext::load(&cli.root, cli.plan.as_deref(), cli.global_config_dir)?;
    execute_command(&ctx, command)
}

fn execute_command(ctx: &PlanContext, cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Order {
            capability,
            container,
            unit,
            no_eligibility,
            json,
        } => commands::run_order(
            ctx,
            capability,
            container.as_deref(),
            unit.as_deref(),
            !no_eligibility,
            json,
        ),
        Commands::Sensors {
            container,
            global,
            json,
        } => commands::run_sensors(ctx, container.as_deref(), global, json),
        Commands::PostJobs { container, json } => {
            commands::run_post_jobs(ctx, container.as_deref(), json)
        }
        Commands::Inspect { json } => commands::run_inspect(ctx, json),
    }
}
