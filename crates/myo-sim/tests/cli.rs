use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use myo_kinetics::{
    three_state_scheme, to_json, KineticScheme, RateLaw, SchemeParams, State, StateKind,
    TransitionSpec,
};
use serde_json::Value;
use tempfile::tempdir;

const GEOMETRY: &str = "geometry:
  thick_filaments: 2
  thin_filaments: 3
  nodes_per_thick: 6
  regulatory_units_per_thin: 4
  sites_per_unit: 3
  thick_node_spacing: 10.0
  thin_site_spacing: 5.0
  bare_zone: 20.0
  thin_per_thick: 2
  initial_length: 100.0
";

const TITIN_MODEL: &str = "mechanics:
  titin:
    stiffness: 0.5
    slack_length: 60.0
regulation:
  initially_active: true
run:
  seed: 11
muscle:
  half_sarcomeres: 2
  series:
    stiffness: 5.0
";

const ISOTYPE_MODEL: &str = "mechanics:
  titin:
    stiffness: 0.5
    slack_length: 60.0
  extracellular:
    stiffness: 0.2
    slack_length: 90.0
    passive:
      mode: exponential
      sigma: 0.5
      length_scale: 20.0
regulation:
  initially_active: true
run:
  seed: 11
muscle:
  half_sarcomeres: 2
  series:
    stiffness: 5.0
isotypes: [0.7, 0.3]
";

const SLACK_MODEL: &str = "regulation:
  initially_active: true
run:
  seed: 3
muscle:
  half_sarcomeres: 2
";

const PROTOCOL: &str = "segments:
  - steps: 5
    dt: 0.001
    p_ca: 9.0
  - steps: 10
    dt: 0.001
    p_ca: 4.5
    control:
      type: ramp
      delta: 4.0
  - steps: 5
    p_ca: 4.5
    control:
      type: force
      force: 20.0
";

fn write(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path
}

fn idle_scheme() -> KineticScheme {
    KineticScheme::new(
        vec![
            State::new(0, "D", StateKind::Detached),
            State::new(1, "A", StateKind::Attached),
        ],
        vec![
            TransitionSpec::new(0, 1, RateLaw::Constant { rate: 0.0 }),
            TransitionSpec::new(1, 0, RateLaw::Constant { rate: 0.0 }),
        ],
        SchemeParams::default(),
    )
    .unwrap()
}

fn run_sim(dir: &Path, model: &str, scheme: &KineticScheme, protocol: &str, out: &str) -> Output {
    let model = write(dir, "model.yaml", &format!("{GEOMETRY}{model}"));
    let scheme = write(dir, "scheme.json", &to_json(scheme).unwrap());
    let protocol = write(dir, "protocol.yaml", protocol);
    Command::new(env!("CARGO_BIN_EXE_myo-sim"))
        .arg("run")
        .arg("--model")
        .arg(&model)
        .arg("--scheme")
        .arg(&scheme)
        .arg("--protocol")
        .arg(&protocol)
        .arg("--out")
        .arg(dir.join(out))
        .output()
        .expect("run myo-sim")
}

fn manifest(dir: &Path) -> Value {
    serde_json::from_str(&fs::read_to_string(dir.join("manifest.json")).unwrap()).unwrap()
}

#[test]
fn run_writes_trace_and_manifest() {
    let temp = tempdir().unwrap();
    let scheme = three_state_scheme().unwrap();
    let output = run_sim(temp.path(), TITIN_MODEL, &scheme, PROTOCOL, "out");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let out = temp.path().join("out");
    let trace = fs::read_to_string(out.join("trace.csv")).unwrap();
    let mut lines = trace.lines();
    assert_eq!(
        lines.next().unwrap(),
        "step,time,length,tension,passive_tension,extracellular_tension,series_extension,attached_fraction,active_fraction"
    );
    assert_eq!(lines.count(), 21);

    let manifest = manifest(&out);
    assert_eq!(manifest["status"], "completed");
    assert_eq!(manifest["steps"], 20);
    assert_eq!(manifest["planned_steps"], 20);
    assert_eq!(manifest["half_sarcomeres"], 2);
    assert_eq!(manifest["provenance"]["seed"], 11);
    assert_eq!(
        manifest["provenance"]["scheme_hash"].as_str().unwrap(),
        scheme.canonical_hash()
    );
    assert_eq!(manifest["snapshot_hashes"].as_array().unwrap().len(), 2);
    assert!(out.join("final_snapshot.json").exists());
}

#[test]
fn same_seed_gives_identical_traces() {
    let temp = tempdir().unwrap();
    let scheme = three_state_scheme().unwrap();
    assert!(run_sim(temp.path(), TITIN_MODEL, &scheme, PROTOCOL, "a").status.success());
    assert!(run_sim(temp.path(), TITIN_MODEL, &scheme, PROTOCOL, "b").status.success());
    let a = fs::read(temp.path().join("a/trace.csv")).unwrap();
    let b = fs::read(temp.path().join("b/trace.csv")).unwrap();
    assert_eq!(a, b);
    assert_eq!(
        manifest(&temp.path().join("a"))["snapshot_hashes"],
        manifest(&temp.path().join("b"))["snapshot_hashes"]
    );
}

#[test]
fn aborted_run_records_the_error() {
    let temp = tempdir().unwrap();
    let protocol = "segments:
  - steps: 3
    control:
      type: ramp
      delta: 3.0
";
    let output = run_sim(temp.path(), SLACK_MODEL, &idle_scheme(), protocol, "out");
    assert!(!output.status.success());

    let out = temp.path().join("out");
    let manifest = manifest(&out);
    assert_eq!(manifest["status"], "aborted");
    assert_eq!(manifest["steps"], 0);
    assert_eq!(manifest["error"]["code"], "zero-stiffness");
    let trace = fs::read_to_string(out.join("trace.csv")).unwrap();
    assert_eq!(trace.lines().count(), 2);
}

#[test]
fn isotype_mix_and_extracellular_element_run_together() {
    let temp = tempdir().unwrap();
    let model = write(temp.path(), "model.yaml", &format!("{GEOMETRY}{ISOTYPE_MODEL}"));
    let fast = write(temp.path(), "fast.json", &to_json(&three_state_scheme().unwrap()).unwrap());
    let idle = write(temp.path(), "idle.json", &to_json(&idle_scheme()).unwrap());
    let protocol = write(temp.path(), "protocol.yaml", PROTOCOL);
    let out = temp.path().join("out");
    let output = Command::new(env!("CARGO_BIN_EXE_myo-sim"))
        .arg("run")
        .arg("--model")
        .arg(&model)
        .arg("--scheme")
        .arg(&fast)
        .arg("--scheme")
        .arg(&idle)
        .arg("--protocol")
        .arg(&protocol)
        .arg("--out")
        .arg(&out)
        .output()
        .expect("run myo-sim");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let manifest = manifest(&out);
    assert_eq!(manifest["status"], "completed");
    let hashes = manifest["provenance"]["scheme_hash"].as_str().unwrap();
    assert_eq!(hashes.split(',').count(), 2);

    let trace = fs::read_to_string(out.join("trace.csv")).unwrap();
    let first_row: Vec<&str> = trace.lines().nth(1).unwrap().split(',').collect();
    let extracellular: f64 = first_row[5].parse().unwrap();
    // Each half-sarcomere starts 10 nm past the element's slack length.
    let expected = 0.2 * 10.0 + 0.5 * (10.0f64 / 20.0).exp_m1();
    assert!((extracellular - expected).abs() < 1e-9);
}

#[test]
fn invalid_protocol_is_rejected_before_running() {
    let temp = tempdir().unwrap();
    let protocol = "segments:
  - steps: 3
    dt: 0.0
";
    let scheme = three_state_scheme().unwrap();
    let output = run_sim(temp.path(), TITIN_MODEL, &scheme, protocol, "out");
    assert!(!output.status.success());
    assert!(!temp.path().join("out/manifest.json").exists());
}

#[test]
fn rates_tabulates_every_transition() {
    let temp = tempdir().unwrap();
    let scheme = three_state_scheme().unwrap();
    let scheme_path = write(temp.path(), "scheme.json", &to_json(&scheme).unwrap());
    let out = temp.path().join("rates.csv");
    let output = Command::new(env!("CARGO_BIN_EXE_myo-sim"))
        .args(["rates", "--min", "-4", "--max", "4", "--points", "9"])
        .arg("--scheme")
        .arg(&scheme_path)
        .arg("--out")
        .arg(&out)
        .output()
        .expect("run myo-sim rates");
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let table = fs::read_to_string(&out).unwrap();
    let mut lines = table.lines();
    assert_eq!(lines.next().unwrap(), "distortion,D->A1,A1->D,A1->A2,A2->D");
    let rows: Vec<&str> = lines.collect();
    assert_eq!(rows.len(), 9);
    assert!(rows[0].starts_with("-4,"));
    assert!(rows[4].starts_with("0,"));
}
