use proptest::prelude::*;
use synthesis_explorer::acceptance_probability;
use synthesis_types::Hypothesis;

proptest! {
    #[test]
    fn energy_strictly_decreases_with_confidence(
        low in 0.0f64..99.0,
        step in 0.01f64..50.0,
        bridges in 0usize..6,
    ) {
        let high = (low + step).min(100.0);
        prop_assume!(high > low);
        prop_assert!(Hypothesis::energy_of(high, bridges) < Hypothesis::energy_of(low, bridges));
    }

    #[test]
    fn energy_tracks_confidence_updates(confidence in -50.0f64..150.0) {
        let h = Hypothesis::new("thesis", "description", "mechanism").with_confidence(confidence);
        prop_assert!((0.0..=100.0).contains(&h.confidence));
        prop_assert_eq!(h.energy, h.compute_energy());
    }

    #[test]
    fn acceptance_is_a_probability(delta in -1000.0f64..1000.0, temperature in 0.0f64..10.0) {
        let p = acceptance_probability(delta, temperature);
        prop_assert!((0.0..=1.0).contains(&p));
    }

    #[test]
    fn downhill_moves_always_accepted(delta in -1000.0f64..=0.0, temperature in 0.0f64..10.0) {
        prop_assert_eq!(acceptance_probability(delta, temperature), 1.0);
    }

    #[test]
    fn acceptance_non_increasing_in_delta(
        delta in 0.0f64..100.0,
        extra in 0.0f64..100.0,
        temperature in 0.01f64..5.0,
    ) {
        prop_assert!(
            acceptance_probability(delta, temperature)
                >= acceptance_probability(delta + extra, temperature)
        );
    }
}
