use blobvec_index::distance::{distance_blob, distance_vec_blob, mean_distance_vec_blob};
use blobvec_store::{BlobAdapter, PageStore};

fn payload(vals: &[f32]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[test]
fn blob_pair_distance() {
    let store = PageStore::new();
    let blob = BlobAdapter::new(store.clone());
    store
        .transaction(|| {
            let a = blob.register(&payload(&vec![1.0f32; 1000]))?;
            let b = blob.register(&payload(&vec![2.0f32; 1000]))?;

            let d = distance_blob(&blob, &a, &b)?;
            assert!((d - 1000f32.sqrt()).abs() < 1e-3, "got {d}");
            // Symmetric.
            assert_eq!(distance_blob(&blob, &b, &a)?, d);
            Ok(())
        })
        .unwrap();
}

#[test]
fn shared_identity_short_circuits_to_zero() {
    let store = PageStore::new();
    let blob = BlobAdapter::new(store.clone());
    store
        .transaction(|| {
            let a = blob.register(&payload(&vec![3.0f32; 100]))?;
            let alias = a.clone();
            assert_eq!(distance_blob(&blob, &a, &alias)?, 0.0);
            Ok(())
        })
        .unwrap();
}

#[test]
fn query_against_blob() {
    let store = PageStore::new();
    let blob = BlobAdapter::new(store.clone());
    store
        .transaction(|| {
            let state = blob.register(&payload(&vec![2.0f32; 1000]))?;
            let query = vec![1.0f32; 1000];
            let d = distance_vec_blob(&blob, &query, &state)?;
            assert!((d - 1000f32.sqrt()).abs() < 1e-3, "got {d}");
            Ok(())
        })
        .unwrap();
}

#[test]
fn mean_distance_over_result_set() {
    let store = PageStore::new();
    let blob = BlobAdapter::new(store.clone());
    store
        .transaction(|| {
            let states = vec![
                blob.register(&payload(&vec![1.0f32; 4]))?,
                blob.register(&payload(&vec![3.0f32; 4]))?,
            ];
            let query = vec![0.0f32; 4];
            // Distances are 2 and 6; mean is 4.
            let mean = mean_distance_vec_blob(&blob, &query, &states)?;
            assert!((mean - 4.0).abs() < 1e-4, "got {mean}");
            assert_eq!(mean_distance_vec_blob(&blob, &query, &[])?, 0.0);
            Ok(())
        })
        .unwrap();
}
