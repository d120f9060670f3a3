//! Loading normalization statistics from JSON.

#![cfg(feature = "serde")]

use motion_matching::{MatcherConfig, MatchingError, NormalizationStats};

fn json(dim: usize, std: f64) -> String {
    serde_json::json!({
        "means": vec![0.5; dim],
        "stdDevs": vec![std; dim],
        "maxPlanarVelocity": [4.92, 6.02],
    })
    .to_string()
}

#[test]
fn test_json_matches_text_format() {
    let dim = 3;
    let from_json = NormalizationStats::from_json(&json(dim, 2.0), dim).unwrap();
    let text = "Means:\n0.5,0.5,0.5\nStd_Devs:\n2.0,2.0,2.0\nMax X and Z velocity:\n4.92,6.02\n";
    let from_text = NormalizationStats::parse(text, dim).unwrap();
    assert_eq!(from_json, from_text);
}

#[test]
fn test_json_is_validated() {
    assert!(matches!(
        NormalizationStats::from_json(&json(24, 0.0), 24),
        Err(MatchingError::ZeroVariance { index: 0 })
    ));
    assert!(matches!(
        NormalizationStats::from_json(&json(24, 1.0), 30),
        Err(MatchingError::DimensionMismatch { .. })
    ));
    assert!(matches!(
        NormalizationStats::from_json("{ \"means\": [] }", 0),
        Err(MatchingError::Json(_))
    ));
}

#[test]
fn test_config_round_trips_through_json() {
    let config = MatcherConfig::cinematic();
    let text = serde_json::to_string(&config).unwrap();
    let back: MatcherConfig = serde_json::from_str(&text).unwrap();
    assert_eq!(back, config);
}
