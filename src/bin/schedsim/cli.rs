use std::path::PathBuf;

use structopt::StructOpt;

use schedsim::utils::prelude::*;

use crate::commands::{self, Cmd};

#[derive(StructOpt)]
#[structopt(name = "schedsim", about = "Classic CPU scheduling over sandboxed execution units")]
pub struct Cli {
    /// Set a custom config file
    #[structopt(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[structopt(subcommand)]
    cmd: Command,
}

#[derive(StructOpt)]
pub enum Command {
    /// Interactively enter a new batch of jobs and save it
    Submit(commands::Submit),
    /// List saved batches
    Batches(commands::Batches),
    /// Run a saved batch under a policy
    Run(commands::Run),
    /// List past run summaries
    Runs(commands::Runs),
    /// Show the effective configuration
    Config(commands::ShowConfig),
    /// Drop all saved batches and run history
    Clear(commands::Clear),
}

/// Parse arguments, merge an optional config file, dispatch
pub fn execute() -> Result<()> {
    let cli = Cli::from_args();

    if let Some(path) = &cli.config {
        config_mut().use_file(path)?;
    }

    match cli.cmd {
        Command::Submit(c) => c.run(),
        Command::Batches(c) => c.run(),
        Command::Run(c) => c.run(),
        Command::Runs(c) => c.run(),
        Command::Config(c) => c.run(),
        Command::Clear(c) => c.run(),
    }
}
