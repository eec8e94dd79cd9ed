use std::error::Error;

use clap::{Parser, Subcommand};
use commands::{
    rates::{self, RatesArgs},
    run::{self, RunArgs},
    version::{self, VersionArgs},
};

mod commands;
mod manifest;
mod model;

#[derive(Parser, Debug)]
#[command(name = "myo-sim", about = "Half-sarcomere muscle simulator CLI")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a loading protocol and write the trace and run manifest.
    Run(RunArgs),
    /// Tabulate every transition rate of a scheme over a distortion grid.
    Rates(RatesArgs),
    /// Print the tool and schema versions.
    Version(VersionArgs),
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.command {
        Command::Run(args) => run::run(&args),
        Command::Rates(args) => rates::run(&args),
        Command::Version(args) => version::run(&args),
    }
}
