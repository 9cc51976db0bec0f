//! Engine configuration.
//!
//! Knobs are validated once at engine construction; a rejected knob is
//! `Error::Config` and the engine is never built.

use crate::error::{Error, Result};

/// Inverted-file index knobs.
#[derive(Debug, Clone)]
pub struct IvfFlatConfig {
    /// Number of k-means centroids (clamped to the relation size at build).
    pub num_centroids: usize,
    /// Nearest centroids examined per query (clamped to `num_centroids`).
    pub num_probe_centroids: usize,
    /// Upper bound on Lloyd iterations.
    pub num_iterations: usize,
    /// Model-wide vector dimensionality.
    pub vector_dim: usize,
    /// Convergence heuristic: the build stops early once every centroid
    /// moves at most `convergence_factor * sqrt(vector_dim)` in one round.
    pub convergence_factor: f32,
    /// Fixed seed for centroid sampling; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl IvfFlatConfig {
    pub fn new(num_centroids: usize, num_probe_centroids: usize, vector_dim: usize) -> Self {
        Self {
            num_centroids,
            num_probe_centroids,
            num_iterations: 10,
            vector_dim,
            convergence_factor: 5.0,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.vector_dim == 0 {
            return Err(Error::Config("vector_dim must be nonzero".into()));
        }
        if self.num_centroids == 0 {
            return Err(Error::Config("num_centroids must be nonzero".into()));
        }
        if self.num_probe_centroids == 0 {
            return Err(Error::Config("num_probe_centroids must be nonzero".into()));
        }
        if self.num_iterations == 0 {
            return Err(Error::Config("num_iterations must be nonzero".into()));
        }
        if !(self.convergence_factor > 0.0) {
            return Err(Error::Config("convergence_factor must be positive".into()));
        }
        Ok(())
    }

    /// Per-centroid movement below which a Lloyd round counts as converged.
    pub fn convergence_threshold(&self) -> f32 {
        self.convergence_factor * (self.vector_dim as f32).sqrt()
    }
}

/// Hierarchical small-world graph knobs.
#[derive(Debug, Clone)]
pub struct HnswConfig {
    /// Exploration budget while inserting.
    pub ef_construction: usize,
    /// Exploration budget while querying.
    pub ef_search: usize,
    /// Degree cap per vertex per layer.
    pub m_max: usize,
    /// Model-wide vector dimensionality.
    pub vector_dim: usize,
    /// Fixed seed for level sampling; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl HnswConfig {
    pub fn new(ef_construction: usize, ef_search: usize, m_max: usize, vector_dim: usize) -> Self {
        Self {
            ef_construction,
            ef_search,
            m_max,
            vector_dim,
            seed: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.vector_dim == 0 {
            return Err(Error::Config("vector_dim must be nonzero".into()));
        }
        // m_max = 1 would make the level normalization 1/ln(1) blow up.
        if self.m_max < 2 {
            return Err(Error::Config("m_max must be at least 2".into()));
        }
        if self.ef_construction == 0 {
            return Err(Error::Config("ef_construction must be nonzero".into()));
        }
        if self.ef_search == 0 {
            return Err(Error::Config("ef_search must be nonzero".into()));
        }
        Ok(())
    }

    /// Level normalization constant `1 / ln(m_max)`.
    pub fn level_norm(&self) -> f64 {
        1.0 / (self.m_max as f64).ln()
    }
}

/// Default centroid count for a relation of `num_vectors` entries.
pub fn calculate_num_centroids(num_vectors: usize) -> usize {
    if num_vectors < 3 {
        return num_vectors;
    }
    std::cmp::max(3, (num_vectors as f64).sqrt() as usize)
}

/// Default probe count for `num_centroids` centroids.
pub fn calculate_num_probe_centroids(num_centroids: usize) -> usize {
    if num_centroids < 3 {
        return num_centroids;
    }
    std::cmp::max(3, num_centroids / 10)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn centroid_defaults() {
        assert_eq!(calculate_num_centroids(0), 0);
        assert_eq!(calculate_num_centroids(2), 2);
        assert_eq!(calculate_num_centroids(9), 3);
        assert_eq!(calculate_num_centroids(1000), 31);
        assert_eq!(calculate_num_probe_centroids(2), 2);
        assert_eq!(calculate_num_probe_centroids(31), 3);
        assert_eq!(calculate_num_probe_centroids(200), 20);
    }

    #[test]
    fn rejects_zero_knobs() {
        assert!(IvfFlatConfig::new(0, 1, 8).validate().is_err());
        assert!(IvfFlatConfig::new(4, 0, 8).validate().is_err());
        assert!(IvfFlatConfig::new(4, 1, 0).validate().is_err());
        assert!(HnswConfig::new(10, 10, 0, 8).validate().is_err());
        assert!(HnswConfig::new(10, 10, 1, 8).validate().is_err());
        assert!(HnswConfig::new(0, 10, 4, 8).validate().is_err());
        assert!(HnswConfig::new(10, 10, 4, 8).validate().is_ok());
    }

    #[test]
    fn convergence_threshold_scales_with_dim() {
        let cfg = IvfFlatConfig::new(4, 2, 100);
        assert!((cfg.convergence_threshold() - 50.0).abs() < 1e-4);
    }
}
