//! CLI argument parsing using clap derive

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use scanner_extensions::Capability;

/// Scanner - dry-run extension selection and ordering from a plan
#[derive(Parser, Debug)]
#[command(name = "scanner")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (debug logs on stderr)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Analysed project root; settings layers are read from here
    #[arg(long, global = true, default_value = ".")]
    pub root: PathBuf,

    /// Plan manifest [default: <root>/scanner-plan.toml]
    #[arg(long, global = true)]
    pub plan: Option<PathBuf>,

    /// Directory holding global settings.toml [default: platform config dir]
    #[arg(long, global = true, env = "SCANNER_GLOBAL_CONFIG_DIR")]
    pub global_config_dir: Option<PathBuf>,

    /// The command to run
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the execution order of every extension of a capability
    ///
    /// Examples:
    ///   scanner order sensor
    ///   scanner order post-job --container project
    ///   scanner order extension --unit core --json
    Order {
        /// Capability to select (extension, sensor, decorator, post-job, build-breaker)
        capability: Capability,

        /// Container to query [default: last declared]
        #[arg(short, long)]
        container: Option<String>,

        /// Unit handed to eligibility checks [default: plan's analysis.unit]
        #[arg(short, long)]
        unit: Option<String>,

        /// Skip eligibility checks
        #[arg(long)]
        no_eligibility: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print the sensors that would run, after optimizer filtering
    Sensors {
        /// Container to query [default: last declared]
        #[arg(short, long)]
        container: Option<String>,

        /// Select the global sensor pass instead of the per-unit one
        #[arg(long)]
        global: bool,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Print the post-jobs that would run, build breakers last
    PostJobs {
        /// Container to query [default: last declared]
        #[arg(short, long)]
        container: Option<String>,

        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },

    /// Describe containers and the resolved declarations of every extension
    Inspect {
        /// Output as JSON for scripting
        #[arg(long)]
        json: bool,
    },
}
