use std::error::Error;
use std::path::PathBuf;

use clap::Args;
use myo_kinetics::{from_json, rate_table};

use crate::model::read;

#[derive(Args, Debug)]
pub struct RatesArgs {
    /// JSON kinetic scheme.
    #[arg(long)]
    pub scheme: PathBuf,
    /// Smallest distortion (nm).
    #[arg(long, default_value_t = -10.0, allow_hyphen_values = true)]
    pub min: f64,
    /// Largest distortion (nm).
    #[arg(long, default_value_t = 10.0, allow_hyphen_values = true)]
    pub max: f64,
    /// Grid points including both ends.
    #[arg(long, default_value_t = 41)]
    pub points: usize,
    /// Output CSV path.
    #[arg(long)]
    pub out: PathBuf,
}

pub fn run(args: &RatesArgs) -> Result<(), Box<dyn Error>> {
    if args.points < 2 || !(args.max > args.min) {
        return Err("need at least two points and --max greater than --min".into());
    }
    let scheme = from_json(&read(&args.scheme)?)?;
    let step = (args.max - args.min) / (args.points - 1) as f64;
    let xs: Vec<f64> = (0..args.points)
        .map(|i| args.min + i as f64 * step)
        .collect();
    let table = rate_table(&scheme, &xs)?;

    let mut file = csv::Writer::from_path(&args.out)?;
    let mut header = vec!["distortion".to_string()];
    header.extend(table.columns.iter().map(|c| c.label.clone()));
    file.write_record(&header)?;
    for (row, x) in table.distortions.iter().enumerate() {
        let mut record = vec![x.to_string()];
        record.extend(table.columns.iter().map(|c| c.rates[row].to_string()));
        file.write_record(&record)?;
    }
    file.flush()?;
    Ok(())
}
