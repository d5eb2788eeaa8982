use schedsim::utils::prelude::*;
use schedsim::utils::{app_config, logging, panic};

mod cli;
mod commands;

fn main() -> Result<()> {
    // panic setup should be done early
    panic::setup();

    // initialize Configuration
    app_config::setup()?;

    // logging reads the config, so it comes after
    let _guard = logging::setup()?;

    trace!("Start cli execution");

    // Match Commands
    cli::execute()
}
