//! Inverted-file engine: Lloyd's k-means over blob-resident centroids
//! persisted in their own relation, probe-limited lookup at query time.
//!
//! Centroid keys are the dense range `0..C`, so a centroid's key doubles
//! as its bucket index.

use crate::distance::{distance_blob, distance_vec_blob};
use crate::VectorIndex;
use blobvec_core::distance::distance_vec;
use blobvec_core::{Error, IvfFlatConfig, Result};
use blobvec_store::{float_slice, BlobAdapter, BlobState, VectorAdapter};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;
use tracing::{debug, info};

/// One cluster: the handles currently assigned to its centroid.
#[derive(Debug, Default, Clone)]
pub struct Centroid {
    pub bucket: Vec<BlobState>,
}

/// Key of the centroid nearest to a blob-resident vector. Ties keep the
/// lowest key because only a strictly smaller distance wins.
pub fn find_bucket(
    centroid_rel: &VectorAdapter,
    blob: &BlobAdapter,
    input: &BlobState,
) -> Result<usize> {
    let mut min_dist = f32::INFINITY;
    let mut min_key = None;
    centroid_rel.scan(i32::MIN, |key, state| {
        let dist = distance_blob(blob, input, state)?;
        if dist < min_dist {
            min_dist = dist;
            min_key = Some(key);
        }
        Ok(true)
    })?;
    let key = min_key.ok_or_else(|| Error::Precondition("find_bucket with no centroids".into()))?;
    usize::try_from(key).map_err(|_| Error::Precondition(format!("negative centroid key {key}")))
}

/// Keys of the `k` centroids nearest to an in-memory query, ascending by
/// distance (ties by key).
pub fn find_k_closest_centroids(
    centroid_rel: &VectorAdapter,
    blob: &BlobAdapter,
    input: &[f32],
    k: usize,
) -> Result<Vec<i32>> {
    let mut distances = Vec::new();
    centroid_rel.scan(i32::MIN, |key, state| {
        distances.push((OrderedFloat(distance_vec_blob(blob, input, state)?), key));
        Ok(true)
    })?;
    distances.sort_unstable();
    Ok(distances.into_iter().take(k).map(|(_, key)| key).collect())
}

/// Seed the centroid relation with `min(num_centroids, N)` distinct
/// uniformly sampled main-relation vectors. Each centroid gets a freshly
/// registered copy of the source payload so its blob has an independent
/// lifetime; keys are assigned sequentially from zero.
pub fn initialize_centroids(
    centroid_rel: &VectorAdapter,
    main_rel: &VectorAdapter,
    blob: &BlobAdapter,
    num_centroids: usize,
    rng: &mut StdRng,
) -> Result<usize> {
    let num_vectors = main_rel.count()? as usize;
    let num_to_assign = num_centroids.min(num_vectors);
    if num_to_assign == 0 {
        return Ok(0);
    }

    let mut sampled = HashSet::with_capacity(num_to_assign);
    while sampled.len() < num_to_assign {
        sampled.insert(rng.gen_range(0..num_vectors));
    }

    let mut centroid_key = 0i32;
    let mut position = 0usize;
    main_rel.scan(i32::MIN, |_, record| {
        if sampled.contains(&position) {
            let copy = blob.load(record, |span| blob.register(span))?;
            centroid_rel.insert(centroid_key, &copy)?;
            centroid_key += 1;
        }
        position += 1;
        Ok(true)
    })?;

    debug!(assigned = num_to_assign, "centroid initialization complete");
    Ok(num_to_assign)
}

/// Recompute one centroid as the mean of its bucket and rewrite its
/// record. Returns how far the centroid moved (zero for an empty bucket,
/// which leaves the record untouched this round).
pub fn update_one_centroid(
    centroid_rel: &VectorAdapter,
    blob: &BlobAdapter,
    bucket: &[BlobState],
    key: i32,
    vector_dim: usize,
) -> Result<f32> {
    if bucket.is_empty() {
        return Ok(0.0);
    }

    let mut mean = vec![0.0f32; vector_dim];
    for state in bucket {
        blob.load(state, |bytes| {
            let span = float_slice(bytes)?;
            debug_assert_eq!(span.len(), vector_dim);
            for (acc, x) in mean.iter_mut().zip(span) {
                *acc += x;
            }
            Ok(())
        })?;
    }
    let inv = 1.0 / bucket.len() as f32;
    for x in &mut mean {
        *x *= inv;
    }

    // Movement is measured against the old payload, before the rewrite.
    let moved = centroid_rel
        .lookup(key, |state| {
            blob.load(state, |bytes| Ok(distance_vec(&mean, float_slice(bytes)?)))
        })?
        .ok_or_else(|| Error::Precondition(format!("update of absent centroid {key}")))?;

    centroid_rel.update(key, bytemuck::cast_slice(&mean))?;
    Ok(moved)
}

pub struct IvfFlatIndex {
    main_rel: VectorAdapter,
    centroid_rel: VectorAdapter,
    blob: BlobAdapter,
    config: IvfFlatConfig,
    vectors: Vec<BlobState>,
    centroids: Vec<Centroid>,
    rng: StdRng,
}

impl IvfFlatIndex {
    pub fn new(
        main_rel: VectorAdapter,
        centroid_rel: VectorAdapter,
        blob: BlobAdapter,
        config: IvfFlatConfig,
    ) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            main_rel,
            centroid_rel,
            blob,
            config,
            vectors: Vec::new(),
            centroids: Vec::new(),
            rng,
        })
    }

    pub fn centroids(&self) -> &[Centroid] {
        &self.centroids
    }

    fn assign_vectors_to_centroids(&mut self) -> Result<()> {
        for iteration in 0..self.config.num_iterations {
            for centroid in &mut self.centroids {
                centroid.bucket.clear();
            }
            for state in &self.vectors {
                let bucket = find_bucket(&self.centroid_rel, &self.blob, state)?;
                let centroid = self.centroids.get_mut(bucket).ok_or_else(|| {
                    Error::Precondition(format!("centroid key {bucket} out of range"))
                })?;
                centroid.bucket.push(state.clone());
            }
            let converged = self.update_centroids()?;
            debug!(iteration, converged, "lloyd iteration");
            if converged {
                break;
            }
        }
        Ok(())
    }

    fn update_centroids(&self) -> Result<bool> {
        let threshold = self.config.convergence_threshold();
        let mut converged = true;
        for (i, centroid) in self.centroids.iter().enumerate() {
            let moved = update_one_centroid(
                &self.centroid_rel,
                &self.blob,
                &centroid.bucket,
                i as i32,
                self.config.vector_dim,
            )?;
            if moved > threshold {
                converged = false;
            }
        }
        Ok(converged)
    }
}

impl VectorIndex for IvfFlatIndex {
    fn build(&mut self) -> Result<()> {
        let count = self.main_rel.count()? as usize;
        info!(
            num_vectors = count,
            num_centroids = self.config.num_centroids,
            num_probe_centroids = self.config.num_probe_centroids,
            vector_dim = self.config.vector_dim,
            "building ivfflat index"
        );

        self.vectors = Vec::with_capacity(count);
        self.main_rel.scan(i32::MIN, |_, state| {
            self.vectors.push(state.clone());
            Ok(true)
        })?;

        let assigned = initialize_centroids(
            &self.centroid_rel,
            &self.main_rel,
            &self.blob,
            self.config.num_centroids,
            &mut self.rng,
        )?;
        self.centroids = vec![Centroid::default(); assigned];
        self.assign_vectors_to_centroids()
    }

    fn find_n_closest(&self, query: &[f32], n: usize) -> Result<Vec<BlobState>> {
        let probes = self.config.num_probe_centroids.min(self.centroids.len());
        let probe_keys = find_k_closest_centroids(&self.centroid_rel, &self.blob, query, probes)?;

        let mut candidates = Vec::new();
        for &key in &probe_keys {
            let index = usize::try_from(key)
                .map_err(|_| Error::Precondition(format!("negative centroid key {key}")))?;
            let centroid = self.centroids.get(index).ok_or_else(|| {
                Error::Precondition(format!("centroid key {key} out of range"))
            })?;
            candidates.extend_from_slice(&centroid.bucket);
        }

        let mut scored = Vec::with_capacity(candidates.len());
        for state in candidates {
            scored.push((distance_vec_blob(&self.blob, query, &state)?, state));
        }
        scored.sort_by_key(|(d, _)| OrderedFloat(*d));
        Ok(scored.into_iter().take(n).map(|(_, state)| state).collect())
    }
}
