use std::error::Error;

use clap::Args;
use myo_core::SchemaVersion;
use myo_kinetics::serde::SCHEME_SCHEMA_MAJOR;
use serde::Serialize;

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Emit JSON with schema versions.
    #[arg(long)]
    pub long: bool,
}

#[derive(Debug, Serialize)]
struct VersionInfo {
    version: String,
    scheme_schema_major: u32,
    default_schema: SchemaVersion,
}

pub fn run(args: &VersionArgs) -> Result<(), Box<dyn Error>> {
    if !args.long {
        println!("{}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    let info = VersionInfo {
        version: env!("CARGO_PKG_VERSION").into(),
        scheme_schema_major: SCHEME_SCHEMA_MAJOR,
        default_schema: SchemaVersion::default(),
    };
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}
