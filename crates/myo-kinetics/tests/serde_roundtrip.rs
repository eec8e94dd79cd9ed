use myo_core::MyoError;
use myo_kinetics::{from_json, three_state_scheme, to_json, RateContext};

#[test]
fn json_round_trip_preserves_rates() {
    let scheme = three_state_scheme().unwrap();
    let restored = from_json(&to_json(&scheme).unwrap()).unwrap();
    assert_eq!(scheme.canonical_hash(), restored.canonical_hash());
    for x in [-6.0, -1.5, 0.0, 2.5, 7.0] {
        let ctx = RateContext {
            distortion: x,
            site_distance: Some(x),
            node_force: 1.0,
        };
        for state in scheme.states() {
            let a = scheme.evaluate(state.id, &ctx).unwrap();
            let b = restored.evaluate(state.id, &ctx).unwrap();
            assert_eq!(a.len(), b.len());
            for ((ta, ra), (tb, rb)) in a.iter().zip(&b) {
                assert_eq!(ta, tb);
                assert!((ra - rb).abs() <= 1e-9);
            }
        }
    }
}

#[test]
fn loading_validates_references() {
    let json = r#"{
        "states": [
            {"label": "D", "kind": "detached", "transitions": [
                {"to": 3, "law": {"type": "constant", "rate": 5.0}}
            ]},
            {"label": "A", "kind": "attached"}
        ]
    }"#;
    let err = from_json(json).unwrap_err();
    assert!(matches!(err, MyoError::Configuration(_)));
}

#[test]
fn unsupported_major_version_is_a_serde_error() {
    let json = r#"{
        "schema_version": {"major": 9, "minor": 0, "patch": 0},
        "states": [{"label": "D", "kind": "detached"}]
    }"#;
    let err = from_json(json).unwrap_err();
    assert_eq!(err.info().code, "unsupported-schema");
}

#[test]
fn malformed_json_is_a_serde_error() {
    let err = from_json("{ not json").unwrap_err();
    assert!(matches!(err, MyoError::Serde(_)));
}

#[test]
fn labels_do_not_affect_hash() {
    let scheme = three_state_scheme().unwrap();
    let json = to_json(&scheme).unwrap().replace("\"A2\"", "\"post-stroke\"");
    let relabelled = from_json(&json).unwrap();
    assert_eq!(scheme.canonical_hash(), relabelled.canonical_hash());
}
