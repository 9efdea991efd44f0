use std::error::Error;

use clap::Parser;
use seed_cli::{dispatch, load_context, logging, Cli};

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let context = load_context(&cli)?;
    logging::init(&context.config.log_level);
    tracing::debug!(environment = %context.environment, "starting seedctl");
    dispatch(&cli.command, &context)
}
