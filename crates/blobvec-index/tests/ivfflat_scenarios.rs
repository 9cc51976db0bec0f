use blobvec_core::config::{calculate_num_centroids, calculate_num_probe_centroids};
use blobvec_core::IvfFlatConfig;
use blobvec_index::ivfflat::{
    find_bucket, find_k_closest_centroids, initialize_centroids, update_one_centroid,
};
use blobvec_index::{IvfFlatIndex, KnnIndex, VectorIndex};
use blobvec_store::{BlobAdapter, Centroids, MainVectors, PageStore, VectorAdapter};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use std::sync::Arc;

fn payload(vals: &[f32]) -> Vec<u8> {
    vals.iter().flat_map(|v| v.to_le_bytes()).collect()
}

struct Fixture {
    store: Arc<PageStore>,
    main: VectorAdapter,
    centroids: VectorAdapter,
    blob: BlobAdapter,
}

fn setup(vectors: &[Vec<f32>]) -> Fixture {
    let store = PageStore::new();
    let main = VectorAdapter::create::<MainVectors>(&store);
    let centroids = VectorAdapter::create::<Centroids>(&store);
    let blob = BlobAdapter::new(store.clone());
    store
        .transaction(|| {
            for (i, v) in vectors.iter().enumerate() {
                let state = blob.register(&payload(v))?;
                main.insert(i as i32, &state)?;
            }
            Ok(())
        })
        .unwrap();
    Fixture {
        store,
        main,
        centroids,
        blob,
    }
}

fn insert_centroids(fx: &Fixture, values: &[Vec<f32>]) {
    fx.store
        .transaction(|| {
            for (i, v) in values.iter().enumerate() {
                let state = fx.blob.register(&payload(v))?;
                fx.centroids.insert(i as i32, &state)?;
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn find_bucket_picks_nearest_centroid() {
    let fx = setup(&[vec![1.5f32; 1000]]);
    insert_centroids(&fx, &[vec![1.0f32; 1000], vec![3.0f32; 1000]]);

    fx.store
        .transaction(|| {
            let input = fx.main.lookup(0, |s| Ok(s.clone()))?.unwrap();
            assert_eq!(find_bucket(&fx.centroids, &fx.blob, &input)?, 0);
            Ok(())
        })
        .unwrap();
}

#[test]
fn k_closest_centroids_ordered_by_distance() {
    let fx = setup(&[]);
    let values: Vec<Vec<f32>> = [1.0f32, 3.2, 2.1, 4.0, 0.5, 1.7, 2.5]
        .iter()
        .map(|&v| vec![v; 1000])
        .collect();
    insert_centroids(&fx, &values);

    fx.store
        .transaction(|| {
            let query = vec![1.5f32; 1000];
            let keys = find_k_closest_centroids(&fx.centroids, &fx.blob, &query, 3)?;
            assert_eq!(keys, vec![5, 0, 2]);
            Ok(())
        })
        .unwrap();
}

#[test]
fn centroid_update_writes_bucket_mean() {
    let vectors: Vec<Vec<f32>> = (1..=10).map(|i| vec![i as f32; 1000]).collect();
    let fx = setup(&vectors);
    insert_centroids(&fx, &[vec![1.0f32; 1000]]);

    fx.store
        .transaction(|| {
            let mut bucket = Vec::new();
            fx.main.scan(i32::MIN, |_, state| {
                bucket.push(state.clone());
                Ok(true)
            })?;

            let moved = update_one_centroid(&fx.centroids, &fx.blob, &bucket, 0, 1000)?;
            assert!(moved > 0.0);
            let mean = fx.centroids.materialize_floats(0)?;
            assert_eq!(mean.len(), 1000);
            assert!(mean.iter().all(|&x| (x - 5.5).abs() < 1e-4));
            Ok(())
        })
        .unwrap();
}

#[test]
fn empty_bucket_leaves_centroid_unchanged() {
    let fx = setup(&[]);
    insert_centroids(&fx, &[vec![2.0f32; 100]]);
    fx.store
        .transaction(|| {
            let moved = update_one_centroid(&fx.centroids, &fx.blob, &[], 0, 100)?;
            assert_eq!(moved, 0.0);
            assert_eq!(fx.centroids.materialize_floats(0)?, vec![2.0; 100]);
            Ok(())
        })
        .unwrap();
}

#[test]
fn initialization_copies_sampled_payloads() {
    let vectors: Vec<Vec<f32>> = (0..50).map(|i| vec![i as f32; 64]).collect();
    let fx = setup(&vectors);

    fx.store
        .transaction(|| {
            let mut rng = StdRng::seed_from_u64(3);
            let assigned =
                initialize_centroids(&fx.centroids, &fx.main, &fx.blob, 10, &mut rng)?;
            assert_eq!(assigned, 10);
            assert_eq!(fx.centroids.count()?, 10);

            // Fresh blobs, keys 0..10, payloads copied from the relation.
            let mut main_ids = HashSet::new();
            fx.main.scan(i32::MIN, |_, s| {
                main_ids.insert(s.blob_id());
                Ok(true)
            })?;
            let mut seen_keys = Vec::new();
            fx.centroids.scan(i32::MIN, |key, s| {
                assert!(!main_ids.contains(&s.blob_id()));
                seen_keys.push(key);
                Ok(true)
            })?;
            assert_eq!(seen_keys, (0..10).collect::<Vec<i32>>());
            Ok(())
        })
        .unwrap();
}

#[test]
fn centroid_count_clamps_to_relation_size() {
    let fx = setup(&[vec![1.5f32; 16], vec![2.5f32; 16]]);
    fx.store
        .transaction(|| {
            let mut rng = StdRng::seed_from_u64(1);
            let assigned =
                initialize_centroids(&fx.centroids, &fx.main, &fx.blob, 8, &mut rng)?;
            assert_eq!(assigned, 2);
            let first = fx.centroids.materialize_floats(0)?;
            let second = fx.centroids.materialize_floats(1)?;
            assert_eq!(first[0], 1.5);
            assert_eq!(second[0], 2.5);
            Ok(())
        })
        .unwrap();
}

#[test]
fn build_and_lookup_on_linear_data() {
    let num_vec = 1000usize;
    let dim = 3070usize;
    let vectors: Vec<Vec<f32>> = (0..num_vec).map(|i| vec![i as f32; dim]).collect();
    let fx = setup(&vectors);

    let num_centroids = calculate_num_centroids(num_vec);
    let num_probe = calculate_num_probe_centroids(num_centroids);
    let mut config = IvfFlatConfig::new(num_centroids, num_probe, dim);
    config.seed = Some(42);

    let mut index = IvfFlatIndex::new(
        fx.main.clone(),
        fx.centroids.clone(),
        fx.blob.clone(),
        config,
    )
    .unwrap();
    fx.store.transaction(|| index.build()).unwrap();

    fx.store
        .transaction(|| {
            let query = vec![30.6f32; dim];
            let states = index.find_n_closest(&query, 8)?;
            let expected = [31.0f32, 30.0, 32.0, 29.0, 33.0, 28.0, 34.0, 27.0];
            assert_eq!(states.len(), expected.len());
            for (state, &want) in states.iter().zip(&expected) {
                let vec = fx.blob.materialize_floats(state)?;
                assert_eq!(vec[0], want);
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn every_vector_lands_in_exactly_one_bucket() {
    let vectors: Vec<Vec<f32>> = (0..200).map(|i| vec![(i % 17) as f32, i as f32]).collect();
    let fx = setup(&vectors);

    let mut config = IvfFlatConfig::new(8, 3, 2);
    config.seed = Some(9);
    let mut index = IvfFlatIndex::new(
        fx.main.clone(),
        fx.centroids.clone(),
        fx.blob.clone(),
        config,
    )
    .unwrap();
    fx.store.transaction(|| index.build()).unwrap();

    let mut assigned = Vec::new();
    for centroid in index.centroids() {
        assigned.extend(centroid.bucket.iter().map(blobvec_store::BlobState::blob_id));
    }
    assert_eq!(assigned.len(), vectors.len());
    let distinct: HashSet<u64> = assigned.into_iter().collect();
    assert_eq!(distinct.len(), vectors.len());
}

#[test]
fn full_probe_matches_knn_as_multiset() {
    let mut rng = StdRng::seed_from_u64(11);
    let vectors: Vec<Vec<f32>> = (0..120)
        .map(|_| (0..8).map(|_| rng.gen_range(-5.0f32..5.0)).collect())
        .collect();
    let fx = setup(&vectors);

    let mut config = IvfFlatConfig::new(10, 10, 8);
    config.seed = Some(5);
    let mut ivf = IvfFlatIndex::new(
        fx.main.clone(),
        fx.centroids.clone(),
        fx.blob.clone(),
        config,
    )
    .unwrap();
    let mut knn = KnnIndex::new(fx.main.clone(), fx.blob.clone());
    fx.store.transaction(|| ivf.build()).unwrap();
    fx.store.transaction(|| knn.build()).unwrap();

    fx.store
        .transaction(|| {
            for _ in 0..10 {
                let query: Vec<f32> = (0..8).map(|_| rng.gen_range(-5.0f32..5.0)).collect();
                let a: HashSet<u64> = ivf
                    .find_n_closest(&query, 7)?
                    .iter()
                    .map(blobvec_store::BlobState::blob_id)
                    .collect();
                let b: HashSet<u64> = knn
                    .find_n_closest(&query, 7)?
                    .iter()
                    .map(blobvec_store::BlobState::blob_id)
                    .collect();
                assert_eq!(a, b);
            }
            Ok(())
        })
        .unwrap();
}

#[test]
fn empty_relation_builds_and_answers_empty() {
    let fx = setup(&[]);
    let mut config = IvfFlatConfig::new(4, 2, 8);
    config.seed = Some(1);
    let mut index = IvfFlatIndex::new(
        fx.main.clone(),
        fx.centroids.clone(),
        fx.blob.clone(),
        config,
    )
    .unwrap();
    fx.store.transaction(|| index.build()).unwrap();
    fx.store
        .transaction(|| {
            assert!(index.find_n_closest(&[0.0; 8], 3)?.is_empty());
            Ok(())
        })
        .unwrap();
}
