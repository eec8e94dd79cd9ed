use myo_core::StateId;
use myo_lattice::{calcium_from_pca, BindingSiteLattice, Geometry, Regulation};

fn lattice(active: bool) -> BindingSiteLattice {
    let geometry = Geometry {
        thick_filaments: 1,
        thin_filaments: 2,
        nodes_per_thick: 4,
        regulatory_units_per_thin: 5,
        sites_per_unit: 3,
        ..Geometry::default()
    };
    BindingSiteLattice::new(geometry, StateId::from_raw(0), active).unwrap()
}

#[test]
fn no_calcium_means_no_activation() {
    let mut lattice = lattice(false);
    let params = Regulation::default();
    for step in 0..100 {
        let report = lattice.update_regulation(&params, 0.0, 1e-3, 7, step);
        assert_eq!(report.activated, 0);
    }
    assert_eq!(lattice.active_fraction(), 0.0);
}

#[test]
fn saturating_calcium_activates_every_unit() {
    let mut lattice = lattice(false);
    let params = Regulation::default();
    let report = lattice.update_regulation(&params, calcium_from_pca(0.0), 1e-3, 7, 0);
    assert_eq!(report.activated, 10);
    assert_eq!(lattice.active_fraction(), 1.0);
    assert!(lattice.sites().iter().all(|s| s.active));
}

#[test]
fn occupied_units_cannot_switch_off() {
    let mut lattice = lattice(true);
    lattice.bind(0, 4).unwrap();
    let params = Regulation {
        k_off: 1e9,
        ..Regulation::default()
    };
    let report = lattice.update_regulation(&params, 0.0, 1e-3, 3, 0);
    assert_eq!(report.deactivated, 9);
    let holder = lattice.sites()[4].regulatory_unit;
    assert!(lattice.regulatory_units()[holder].active);
    assert!(lattice.sites()[3].active && lattice.sites()[5].active);
    lattice.check_consistency().unwrap();
}

#[test]
fn regulation_is_reproducible() {
    let params = Regulation::default();
    let run = || {
        let mut lattice = lattice(false);
        for step in 0..50 {
            lattice.update_regulation(&params, calcium_from_pca(6.0), 1e-4, 11, step);
        }
        lattice
            .regulatory_units()
            .iter()
            .map(|u| u.active)
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}

#[test]
fn negative_rates_are_rejected() {
    let params = Regulation {
        k_coop: -1.0,
        ..Regulation::default()
    };
    assert_eq!(params.validate().unwrap_err().info().code, "invalid-regulation");
}

#[test]
fn pca_conversion() {
    assert!((calcium_from_pca(6.0) - 1e-6).abs() < 1e-18);
}
