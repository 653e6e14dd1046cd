mod application;

use std::io;

use anyhow::Result;
use clap::Parser;

use crate::application::{SimOptions, parse_seed, run};

#[derive(Parser, Debug)]
#[command(author, version, about = "NexusClaw protocol simulator over stdin/stdout")]
pub struct Cli {
    /// RNG seed as 64 hex characters. Runs are reproducible under a fixed seed.
    #[arg(long, value_name = "HEX")]
    pub seed: Option<String>,

    /// Require this exact PIN instead of the element's well-formedness rule.
    #[arg(long, value_name = "PIN")]
    pub pin: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let seed = match &cli.seed {
        Some(seed) => parse_seed(seed)?,
        None => [0u8; 32],
    };

    let stdin = io::stdin();
    let stdout = io::stdout();
    run(
        SimOptions { seed, pin: cli.pin },
        stdin.lock(),
        stdout.lock(),
    )?;

    Ok(())
}
