use blobvec_store::{keys, BlobAdapter, PageStore};
use proptest::prelude::*;

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn key_folding_preserves_order(a in any::<i32>(), b in any::<i32>()) {
        let fa = keys::fold_key(a);
        let fb = keys::fold_key(b);
        prop_assert_eq!(a.cmp(&b), fa.cmp(&fb));
        prop_assert_eq!(keys::unfold_key(fa), a);
    }

    // Plain asserts inside the transaction closures: proptest treats the
    // panic as a failing case and shrinks as usual.
    #[test]
    fn blob_round_trips_arbitrary_payloads(
        payload in proptest::collection::vec(any::<u8>(), 1..20_000),
    ) {
        let store = PageStore::new();
        let blob = BlobAdapter::new(store.clone());
        store.transaction(|| {
            let state = blob.register(&payload)?;
            assert_eq!(state.byte_len(), payload.len());
            assert!(state.page_count() >= 1);
            blob.load(&state, |span| {
                assert_eq!(span, &payload[..]);
                Ok(())
            })
        }).unwrap();
    }

    #[test]
    fn update_always_supersedes(
        first in proptest::collection::vec(any::<u8>(), 1..5_000),
        second in proptest::collection::vec(any::<u8>(), 1..5_000),
    ) {
        let store = PageStore::new();
        let blob = BlobAdapter::new(store.clone());
        store.transaction(|| {
            let old = blob.register(&first)?;
            let new = blob.update(&second, &old)?;
            blob.load(&new, |span| {
                assert_eq!(span, &second[..]);
                Ok(())
            })?;
            assert!(blob.load(&old, |_| Ok(())).is_err());
            Ok(())
        }).unwrap();
    }
}
