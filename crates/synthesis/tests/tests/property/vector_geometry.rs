use proptest::collection::vec;
use proptest::prelude::*;
use synthesis_basis_trap::{covariance_eigen_range, fold_embedding};
use synthesis_types::{cosine_distance, cosine_similarity, l2_norm};

proptest! {
    #[test]
    fn cosine_similarity_is_bounded(
        a in vec(-100.0f64..100.0, 1..16),
        b in vec(-100.0f64..100.0, 1..16),
    ) {
        let s = cosine_similarity(&a, &b);
        prop_assert!((-1.0..=1.0).contains(&s));
        prop_assert!((0.0..=2.0).contains(&cosine_distance(&a, &b)));
    }

    #[test]
    fn self_distance_is_zero(a in vec(-100.0f64..100.0, 1..16)) {
        prop_assume!(l2_norm(&a) > 1e-6);
        prop_assert!(cosine_distance(&a, &a).abs() < 1e-9);
    }

    #[test]
    fn folding_preserves_the_sum(v in vec(-10.0f64..10.0, 0..64), dimension in 1usize..16) {
        let folded = fold_embedding(&v, dimension);
        prop_assert_eq!(folded.len(), dimension);
        let before: f64 = v.iter().sum();
        let after: f64 = folded.iter().sum();
        prop_assert!((before - after).abs() < 1e-6);
    }

    #[test]
    fn covariance_eigenvalues_are_ordered_and_non_negative(
        samples in vec(vec(-5.0f64..5.0, 4), 2..12),
    ) {
        let (min, max) = covariance_eigen_range(&samples).unwrap();
        prop_assert!(min >= 0.0);
        prop_assert!(max >= min);
    }
}
