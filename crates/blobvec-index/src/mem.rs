//! In-memory baseline family.
//!
//! Same engines, no blob store: vectors are held directly as float arrays
//! and results are borrowed slices. Used as the distance-only baseline in
//! correctness checks and benchmarks. The HNSW variant drives the same
//! graph code as the blob engine through in-memory distance closures.

use crate::hnsw::{insert_into_graph, query_graph, sample_level, NswLayer};
use blobvec_core::distance::distance_vec;
use blobvec_core::{HnswConfig, IvfFlatConfig, Result};
use ordered_float::OrderedFloat;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

pub trait MemVectorIndex {
    fn build(&mut self) -> Result<()>;

    /// The `min(n, N)` stored vectors closest to `query`, ascending.
    fn find_n_closest(&self, query: &[f32], n: usize) -> Result<Vec<&[f32]>>;
}

/// Exhaustive scan over a float table; the ids of the `n` closest rows,
/// ties broken by insertion order.
pub fn knn_ids(query: &[f32], data: &[Vec<f32>], n: usize) -> Vec<usize> {
    let mut dist_idx: Vec<(f32, usize)> = data
        .iter()
        .enumerate()
        .map(|(i, v)| (distance_vec(query, v), i))
        .collect();
    dist_idx.sort_by_key(|&(d, _)| OrderedFloat(d));
    dist_idx.into_iter().take(n).map(|(_, i)| i).collect()
}

pub struct MemKnnIndex {
    vectors: Vec<Vec<f32>>,
}

impl MemKnnIndex {
    pub fn new(vectors: Vec<Vec<f32>>) -> Self {
        Self { vectors }
    }
}

impl MemVectorIndex for MemKnnIndex {
    fn build(&mut self) -> Result<()> {
        Ok(())
    }

    fn find_n_closest(&self, query: &[f32], n: usize) -> Result<Vec<&[f32]>> {
        Ok(knn_ids(query, &self.vectors, n)
            .into_iter()
            .map(|i| self.vectors[i].as_slice())
            .collect())
    }
}

pub struct MemIvfFlatIndex {
    config: IvfFlatConfig,
    vectors: Vec<Vec<f32>>,
    centroids: Vec<Vec<f32>>,
    buckets: Vec<Vec<usize>>,
    rng: StdRng,
}

impl MemIvfFlatIndex {
    pub fn new(vectors: Vec<Vec<f32>>, config: IvfFlatConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            config,
            vectors,
            centroids: Vec::new(),
            buckets: Vec::new(),
            rng,
        })
    }

    pub fn buckets(&self) -> &[Vec<usize>] {
        &self.buckets
    }
}

impl MemVectorIndex for MemIvfFlatIndex {
    fn build(&mut self) -> Result<()> {
        let num_to_assign = self.config.num_centroids.min(self.vectors.len());
        if num_to_assign == 0 {
            return Ok(());
        }

        let mut sampled = HashSet::with_capacity(num_to_assign);
        while sampled.len() < num_to_assign {
            sampled.insert(self.rng.gen_range(0..self.vectors.len()));
        }
        // Seed centroids in ascending source order, matching the scan
        // order the blob engine sees.
        let mut picks: Vec<usize> = sampled.into_iter().collect();
        picks.sort_unstable();
        self.centroids = picks.iter().map(|&i| self.vectors[i].clone()).collect();
        self.buckets = vec![Vec::new(); num_to_assign];

        let threshold = self.config.convergence_threshold();
        for _ in 0..self.config.num_iterations {
            for bucket in &mut self.buckets {
                bucket.clear();
            }
            for (i, vector) in self.vectors.iter().enumerate() {
                let mut min_dist = f32::INFINITY;
                let mut min_index = 0;
                for (c, centroid) in self.centroids.iter().enumerate() {
                    let dist = distance_vec(vector, centroid);
                    if dist < min_dist {
                        min_dist = dist;
                        min_index = c;
                    }
                }
                self.buckets[min_index].push(i);
            }

            let mut converged = true;
            for (c, bucket) in self.buckets.iter().enumerate() {
                if bucket.is_empty() {
                    continue;
                }
                let mut mean = vec![0.0f32; self.config.vector_dim];
                for &i in bucket {
                    for (acc, x) in mean.iter_mut().zip(&self.vectors[i]) {
                        *acc += x;
                    }
                }
                let inv = 1.0 / bucket.len() as f32;
                for x in &mut mean {
                    *x *= inv;
                }
                if distance_vec(&mean, &self.centroids[c]) > threshold {
                    converged = false;
                }
                self.centroids[c] = mean;
            }
            if converged {
                break;
            }
        }
        Ok(())
    }

    fn find_n_closest(&self, query: &[f32], n: usize) -> Result<Vec<&[f32]>> {
        let probes = self.config.num_probe_centroids.min(self.centroids.len());
        let mut centroid_dists: Vec<(OrderedFloat<f32>, usize)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(i, c)| (OrderedFloat(distance_vec(query, c)), i))
            .collect();
        centroid_dists.sort_unstable();

        let mut candidates = Vec::new();
        for &(_, c) in centroid_dists.iter().take(probes) {
            candidates.extend_from_slice(&self.buckets[c]);
        }

        let mut scored: Vec<(f32, usize)> = candidates
            .into_iter()
            .map(|i| (distance_vec(query, &self.vectors[i]), i))
            .collect();
        scored.sort_by_key(|&(d, _)| OrderedFloat(d));
        Ok(scored
            .into_iter()
            .take(n)
            .map(|(_, i)| self.vectors[i].as_slice())
            .collect())
    }
}

pub struct MemHnswIndex {
    config: HnswConfig,
    level_norm: f64,
    vectors: Vec<Vec<f32>>,
    layers: Vec<NswLayer>,
    rng: StdRng,
}

impl MemHnswIndex {
    pub fn new(vectors: Vec<Vec<f32>>, config: HnswConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            level_norm: config.level_norm(),
            config,
            vectors,
            layers: vec![NswLayer::default()],
            rng,
        })
    }

    pub fn layers(&self) -> &[NswLayer] {
        &self.layers
    }
}

impl MemVectorIndex for MemHnswIndex {
    fn build(&mut self) -> Result<()> {
        for vertex in 0..self.vectors.len() {
            let target_level = sample_level(&mut self.rng, self.level_norm);
            insert_into_graph(
                &mut self.layers,
                vertex,
                self.vectors.len(),
                target_level,
                &self.config,
                &mut |v| Ok(distance_vec(&self.vectors[vertex], &self.vectors[v])),
                &mut |a, b| Ok(distance_vec(&self.vectors[a], &self.vectors[b])),
            )?;
        }
        Ok(())
    }

    fn find_n_closest(&self, query: &[f32], n: usize) -> Result<Vec<&[f32]>> {
        if self.vectors.is_empty() || n == 0 {
            return Ok(Vec::new());
        }
        let chosen = query_graph(&self.layers, &self.config, n, &mut |v| {
            Ok(distance_vec(query, &self.vectors[v]))
        })?;
        Ok(chosen
            .into_iter()
            .map(|v| self.vectors[v].as_slice())
            .collect())
    }
}
