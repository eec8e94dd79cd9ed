use myo_core::errors::{ErrorInfo, MyoError};

fn sample_info(code: &str, message: &str) -> ErrorInfo {
    ErrorInfo::new(code, message)
        .with_context("unit", 3)
        .with_context("state", "s1")
}

#[test]
fn configuration_error_surface() {
    let err = MyoError::Configuration(sample_info("unknown-state", "dangling transition"));
    assert_eq!(err.info().code, "unknown-state");
    assert_eq!(err.info().context.get("unit").map(String::as_str), Some("3"));
    assert!(!err.is_fatal());
}

#[test]
fn consistency_error_is_fatal() {
    let err = MyoError::Consistency(sample_info("site-double-bound", "two occupants"));
    assert!(err.is_fatal());
    assert!(err.to_string().contains("site-double-bound"));
}

#[test]
fn display_includes_context_and_hint() {
    let err = MyoError::Convergence(
        sample_info("solver-iteration-cap", "no convergence").with_hint("raise the cap"),
    );
    let text = err.to_string();
    assert!(text.starts_with("convergence error"));
    assert!(text.contains("unit=3"));
    assert!(text.contains("hint: raise the cap"));
}

#[test]
fn errors_round_trip_through_json() {
    let err = MyoError::Numeric(sample_info("non-finite-rate", "rate is NaN"));
    let json = serde_json::to_string(&err).expect("serialize");
    assert!(json.contains("\"family\":\"Numeric\""));
    let decoded: MyoError = serde_json::from_str(&json).expect("deserialize");
    assert_eq!(decoded, err);
}
