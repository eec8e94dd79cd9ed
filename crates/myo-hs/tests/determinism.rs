mod common;

use myo_hs::{BoundaryCondition, HalfSarcomere, Snapshot};
use myo_kinetics::three_state_scheme;
use std::sync::Arc;

fn run(seed: u64, parallel: bool, steps: usize) -> Vec<Snapshot> {
    let scheme = Arc::new(three_state_scheme().unwrap());
    let mut options = common::options(seed);
    options.regulation.initially_active = false;
    options.run.parallel = parallel;
    let mut hs = HalfSarcomere::new(scheme, common::small_geometry(), options).unwrap();
    let bc = BoundaryCondition::hold().with_pca(5.8);
    (0..steps)
        .map(|_| hs.advance(&bc, 1e-3).unwrap())
        .collect()
}

#[test]
fn identical_inputs_give_identical_snapshots() {
    let first = run(42, false, 1000);
    let second = run(42, false, 1000);
    assert_eq!(first.len(), 1000);
    assert_eq!(first, second);
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.canonical_hash(), b.canonical_hash());
    }
    assert!(first.iter().any(|s| s.attached_fraction() > 0.0));
}

#[test]
fn parallel_scheduling_does_not_change_results() {
    let sequential = run(7, false, 300);
    let parallel = run(7, true, 300);
    for (a, b) in sequential.iter().zip(&parallel) {
        assert_eq!(a.canonical_hash(), b.canonical_hash());
    }
}

#[test]
fn different_seeds_diverge() {
    let a = run(1, false, 200);
    let b = run(2, false, 200);
    assert_ne!(
        a.last().unwrap().canonical_hash(),
        b.last().unwrap().canonical_hash()
    );
}
