use std::collections::BTreeMap;
use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use myo_core::{MyoError, RunProvenance};
use myo_hs::{Isotypes, Snapshot};
use myo_kinetics::{from_json, KineticScheme};
use myo_muscle::{Muscle, MuscleSnapshot};
use serde::Serialize;

use crate::manifest::{RunManifest, RunStatus};
use crate::model::{read, Protocol, SimModel};

#[derive(Args, Debug)]
pub struct RunArgs {
    /// YAML model: geometry, mechanics, regulation, run options and muscle.
    #[arg(long)]
    pub model: PathBuf,
    /// JSON kinetic scheme; repeat once per myosin isotype.
    #[arg(long, required = true)]
    pub scheme: Vec<PathBuf>,
    /// YAML protocol of loading segments.
    #[arg(long)]
    pub protocol: PathBuf,
    /// Output directory for the trace and manifest.
    #[arg(long)]
    pub out: PathBuf,
    /// Overrides the model's master seed.
    #[arg(long)]
    pub seed: Option<u64>,
    /// Evaluate units and half-sarcomeres on the rayon pool.
    #[arg(long)]
    pub parallel: bool,
}

#[derive(Debug, Serialize)]
struct TraceRow {
    step: u64,
    time: f64,
    length: f64,
    tension: f64,
    passive_tension: f64,
    extracellular_tension: f64,
    series_extension: f64,
    attached_fraction: f64,
    active_fraction: f64,
}

impl TraceRow {
    fn new(step: u64, snapshot: &MuscleSnapshot) -> Self {
        let members = &snapshot.half_sarcomeres;
        Self {
            step,
            time: snapshot.time,
            length: snapshot.length,
            tension: snapshot.tension,
            passive_tension: mean(members, |s| s.passive_tension),
            extracellular_tension: mean(members, |s| s.extracellular_tension),
            series_extension: snapshot.series_extension,
            attached_fraction: mean(members, Snapshot::attached_fraction),
            active_fraction: mean(members, Snapshot::active_fraction),
        }
    }
}

fn mean(members: &[Snapshot], value: impl Fn(&Snapshot) -> f64) -> f64 {
    members.iter().map(value).sum::<f64>() / members.len().max(1) as f64
}

pub fn run(args: &RunArgs) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(&args.out)?;
    let mut model = SimModel::load(&args.model)?;
    if let Some(seed) = args.seed {
        model.config.options.run.seed = seed;
    }
    if args.parallel {
        model.config.options.run.parallel = true;
    }
    let schemes = args
        .scheme
        .iter()
        .map(|path| Ok(Arc::new(from_json(&read(path)?)?)))
        .collect::<Result<Vec<Arc<KineticScheme>>, MyoError>>()?;
    let proportions = model.isotype_proportions(schemes.len());
    let isotypes = Isotypes::new(schemes.clone(), proportions)?;
    let protocol = Protocol::load(&args.protocol)?;

    let mut muscle = Muscle::new(
        isotypes,
        model.config.geometry.clone(),
        model.config.options.clone(),
        &model.muscle,
    )?;

    let trace_file = PathBuf::from("trace.csv");
    let mut trace = csv::Writer::from_path(args.out.join(&trace_file))?;
    trace.serialize(TraceRow::new(0, muscle.last_snapshot()))?;

    let mut steps = 0u64;
    let mut failure = None;
    'segments: for (index, segment) in protocol.segments.iter().enumerate() {
        log::info!(
            "segment {index}: {} steps, dt {}, pCa {:?}, {:?}",
            segment.steps,
            segment.dt,
            segment.p_ca,
            segment.control
        );
        let bc = segment.boundary();
        for _ in 0..segment.steps {
            match muscle.advance(&bc, segment.dt) {
                Ok(snapshot) => {
                    steps += 1;
                    trace.serialize(TraceRow::new(steps, &snapshot))?;
                }
                Err(err) => {
                    log::error!("run aborted after {steps} steps: {err}");
                    failure = Some(err);
                    break 'segments;
                }
            }
        }
    }
    trace.flush()?;

    let last = muscle.last_snapshot();
    fs::write(
        args.out.join("final_snapshot.json"),
        serde_json::to_string_pretty(last)?,
    )?;

    let mut tool_versions = BTreeMap::new();
    tool_versions.insert("myo-sim".to_string(), env!("CARGO_PKG_VERSION").to_string());
    let manifest = RunManifest {
        provenance: RunProvenance {
            scheme_hash: schemes
                .iter()
                .map(|scheme| scheme.canonical_hash())
                .collect::<Vec<_>>()
                .join(","),
            model_hash: model.canonical_hash()?,
            seed: model.config.options.run.seed,
            tool_versions,
        },
        schema_version: schemes[0].schema_version(),
        half_sarcomeres: muscle.half_sarcomeres().len(),
        steps,
        planned_steps: protocol.total_steps(),
        status: if failure.is_some() {
            RunStatus::Aborted
        } else {
            RunStatus::Completed
        },
        error: failure.as_ref().map(|err| err.info().clone()),
        trace_file,
        snapshot_hashes: last
            .half_sarcomeres
            .iter()
            .map(|s| s.canonical_hash())
            .collect(),
    };
    manifest.write(&args.out.join("manifest.json"))?;

    match failure {
        Some(err) => Err(Box::new(err)),
        None => Ok(()),
    }
}
