use myo_core::{MyoError, StateId};
use myo_lattice::{BindingSiteLattice, Geometry};

fn small_geometry() -> Geometry {
    Geometry {
        thick_filaments: 2,
        thin_filaments: 3,
        nodes_per_thick: 4,
        regulatory_units_per_thin: 3,
        sites_per_unit: 2,
        thick_node_spacing: 10.0,
        thin_site_spacing: 5.0,
        bare_zone: 20.0,
        thin_per_thick: 2,
        initial_length: 100.0,
    }
}

#[test]
fn arenas_follow_geometry() {
    let lattice = BindingSiteLattice::new(small_geometry(), StateId::from_raw(0), true).unwrap();
    assert_eq!(lattice.units().len(), 8);
    assert_eq!(lattice.sites().len(), 18);
    assert_eq!(lattice.regulatory_units().len(), 9);
    assert_eq!(lattice.thick_filaments()[1].faced_thin, vec![1, 2]);
    assert_eq!(lattice.thin_filaments()[2].sites, 12..18);
    assert_eq!(lattice.node_position(0), 80.0);
    assert_eq!(lattice.node_position(3), 50.0);
    assert_eq!(lattice.sites()[6].position, 5.0);
    assert_eq!(lattice.sites()[7].position, 10.0);
    assert_eq!(lattice.sites()[9].regulatory_unit, 4);
}

#[test]
fn faced_thin_wraps_around() {
    let mut geometry = small_geometry();
    geometry.thick_filaments = 3;
    let lattice = BindingSiteLattice::new(geometry, StateId::from_raw(0), true).unwrap();
    assert_eq!(lattice.thick_filaments()[2].faced_thin, vec![2, 0]);
}

#[test]
fn malformed_geometry_is_rejected() {
    let mut geometry = small_geometry();
    geometry.thin_per_thick = 5;
    let err = BindingSiteLattice::new(geometry, StateId::from_raw(0), true).unwrap_err();
    assert!(matches!(err, MyoError::Configuration(_)));
    assert_eq!(err.info().code, "malformed-geometry");

    let mut geometry = small_geometry();
    geometry.thin_site_spacing = -1.0;
    assert!(BindingSiteLattice::new(geometry, StateId::from_raw(0), true).is_err());
}

#[test]
fn bind_and_release_keep_references_consistent() {
    let mut lattice = BindingSiteLattice::new(small_geometry(), StateId::from_raw(0), true).unwrap();
    lattice.bind(2, 5).unwrap();
    assert_eq!(lattice.units()[2].bound_site, Some(5));
    assert_eq!(lattice.sites()[5].occupant, Some(2));
    lattice.check_consistency().unwrap();
    assert_eq!(lattice.attached_count(), 1);

    assert_eq!(lattice.release(2).unwrap(), Some(5));
    assert_eq!(lattice.sites()[5].occupant, None);
    assert_eq!(lattice.release(2).unwrap(), None);
    lattice.check_consistency().unwrap();
}

#[test]
fn double_binding_is_a_consistency_error() {
    let mut lattice = BindingSiteLattice::new(small_geometry(), StateId::from_raw(0), true).unwrap();
    lattice.bind(0, 3).unwrap();
    let err = lattice.bind(1, 3).unwrap_err();
    assert!(err.is_fatal());
    assert_eq!(err.info().code, "site-double-bound");
}

#[test]
fn inactive_sites_cannot_be_bound() {
    let mut lattice = BindingSiteLattice::new(small_geometry(), StateId::from_raw(0), false).unwrap();
    assert_eq!(lattice.active_fraction(), 0.0);
    let err = lattice.bind(0, 0).unwrap_err();
    assert_eq!(err.info().code, "site-inactive");
    lattice.set_all_active(true);
    assert_eq!(lattice.active_fraction(), 1.0);
    lattice.bind(0, 0).unwrap();
}
