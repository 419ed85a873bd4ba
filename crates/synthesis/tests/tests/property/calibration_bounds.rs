use proptest::prelude::*;
use synthesis_calibrator::{CalibrationConfig, ConfidenceCalibrator};
use synthesis_types::CalibrationFactors;

// ---- Strategies ----

fn arb_factor() -> impl Strategy<Value = f64> {
    prop_oneof![
        -1.0f64..2.0,
        Just(0.0),
        Just(1.0),
        Just(f64::NAN),
        Just(f64::INFINITY),
    ]
}

fn arb_factors() -> impl Strategy<Value = CalibrationFactors> {
    (arb_factor(), arb_factor(), arb_factor(), arb_factor(), arb_factor())
        .prop_map(|(a, b, c, d, e)| CalibrationFactors::new(a, b, c, d, e))
}

// ---- Properties ----

proptest! {
    #[test]
    fn factors_are_clamped_to_unit(factors in arb_factors()) {
        for v in factors.as_array() {
            prop_assert!((0.0..=1.0).contains(&v));
        }
    }

    #[test]
    fn score_stays_within_bounds(factors in arb_factors()) {
        let outcome = ConfidenceCalibrator::default().calibrate(&factors);
        prop_assert!(outcome.score <= 100);
        prop_assert!((0.0..=100.0).contains(&outcome.confidence()));
        prop_assert!(!outcome.rationale.is_empty());
    }

    #[test]
    fn calibration_is_deterministic(factors in arb_factors()) {
        let calibrator = ConfidenceCalibrator::new(CalibrationConfig::default());
        prop_assert_eq!(calibrator.calibrate(&factors), calibrator.calibrate(&factors));
    }

    #[test]
    fn large_multipliers_still_cap_at_100(factors in arb_factors(), boost in 1.0f64..50.0) {
        let calibrator = ConfidenceCalibrator::new(
            CalibrationConfig::default().with_multipliers(boost, boost),
        );
        prop_assert!(calibrator.calibrate(&factors).score <= 100);
    }
}
