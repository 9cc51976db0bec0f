use blobvec_core::distance::{distance_vec, distance_vec_scalar};
use proptest::prelude::*;

fn arb_pair() -> impl Strategy<Value = (Vec<f32>, Vec<f32>)> {
    (1usize..600).prop_flat_map(|dim| {
        (
            proptest::collection::vec(-100.0f32..100.0, dim),
            proptest::collection::vec(-100.0f32..100.0, dim),
        )
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn symmetric_and_non_negative((a, b) in arb_pair()) {
        let d_ab = distance_vec(&a, &b);
        let d_ba = distance_vec(&b, &a);
        prop_assert!(d_ab >= 0.0);
        prop_assert!((d_ab - d_ba).abs() < 1e-3, "{d_ab} vs {d_ba}");
    }

    #[test]
    fn identity_is_zero(a in proptest::collection::vec(-100.0f32..100.0, 1..600)) {
        prop_assert_eq!(distance_vec(&a, &a), 0.0);
    }

    #[test]
    fn blocked_tracks_scalar((a, b) in arb_pair()) {
        let blocked = distance_vec(&a, &b);
        let scalar = distance_vec_scalar(&a, &b);
        prop_assert!((blocked - scalar).abs() < 1e-3, "{} vs {}", blocked, scalar);
    }
}
