//! # Prices Predictor Command-Line Entry Point
//!
//! ```text
//! main()
//!   │
//!   ├─> Parse CLI arguments (clap)
//!   ├─> Install logging (console + rotating files)
//!   └─> Execute the subcommand
//! ```
//!
//! ```bash
//! prices-predictor init-config
//! prices-predictor inspect data/archive.zip
//! prices-predictor run --config pipeline.json --train
//! prices-predictor predict --model artifacts/model.json --input new_houses.csv
//! ```

#![warn(clippy::all, rust_2018_idioms)]
#![expect(clippy::print_stdout)] // Allow println! in main binary

mod cli;

use clap::Parser as _;

/// # Errors
///
/// Returns error if logging cannot be installed or the command fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = cli::Cli::parse();

    // Set RUST_LOG=debug to see stage transitions
    prices_predictor::logging::init(cli.log_dir)?;

    cli::run_command(cli.command)?;
    Ok(())
}
