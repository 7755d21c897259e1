// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "caravel")]
#[command(about = "Build, verify, and ship container services to managed cloud compute")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new caravel.yml configuration file
    Init {
        /// Service name to write into the config
        #[arg(short, long)]
        service: Option<String>,

        /// Image name to write into the config
        #[arg(short, long)]
        image: Option<String>,

        /// Overwrite an existing config file
        #[arg(short, long)]
        force: bool,
    },

    /// Run the deployment pipeline
    Deploy {
        /// How far to take the pipeline
        #[arg(short, long, value_enum, default_value = "cloud")]
        mode: DeployMode,

        /// Minimal output for CI
        #[arg(short, long, conflicts_with = "json")]
        quiet: bool,

        /// JSON lines output for scripting
        #[arg(long)]
        json: bool,
    },

    /// Show the configured service and its deployed state
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DeployMode {
    /// Build and verify locally only
    Local,
    /// Build, verify, publish, deploy, and validate
    Cloud,
}
