// Fire risk service - main.rs
// Parses the command line and hands off to the CLI dispatcher.

use clap::Parser;
use fire_risk::cli::{dispatch, Cli};

fn main() -> anyhow::Result<()> {
    dispatch(Cli::parse())
}
