//! Exhaustive-scan engine: the correctness oracle and baseline.

use crate::distance::distance_vec_blob;
use crate::VectorIndex;
use blobvec_core::Result;
use blobvec_store::{BlobAdapter, BlobState, VectorAdapter};
use ordered_float::OrderedFloat;
use tracing::info;

pub struct KnnIndex {
    main_rel: VectorAdapter,
    blob: BlobAdapter,
    vectors: Vec<BlobState>,
}

impl KnnIndex {
    pub fn new(main_rel: VectorAdapter, blob: BlobAdapter) -> Self {
        Self {
            main_rel,
            blob,
            vectors: Vec::new(),
        }
    }
}

impl VectorIndex for KnnIndex {
    fn build(&mut self) -> Result<()> {
        let count = self.main_rel.count()? as usize;
        self.vectors = Vec::with_capacity(count);
        self.main_rel.scan(i32::MIN, |_, state| {
            self.vectors.push(state.clone());
            Ok(true)
        })?;
        info!(num_vectors = self.vectors.len(), "knn snapshot complete");
        Ok(())
    }

    fn find_n_closest(&self, query: &[f32], n: usize) -> Result<Vec<BlobState>> {
        let mut dist_idx = Vec::with_capacity(self.vectors.len());
        for (i, state) in self.vectors.iter().enumerate() {
            dist_idx.push((distance_vec_blob(&self.blob, query, state)?, i));
        }
        // Stable sort: ties keep insertion-key order.
        dist_idx.sort_by_key(|&(d, _)| OrderedFloat(d));
        Ok(dist_idx
            .into_iter()
            .take(n)
            .map(|(_, i)| self.vectors[i].clone())
            .collect())
    }
}
