#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod distance;
pub mod hnsw;
pub mod ivfflat;
pub mod knn;
pub mod mem;

use blobvec_core::Result;
use blobvec_store::BlobState;

pub use hnsw::HnswIndex;
pub use ivfflat::IvfFlatIndex;
pub use knn::KnnIndex;
pub use mem::{MemHnswIndex, MemIvfFlatIndex, MemKnnIndex, MemVectorIndex};

/// Uniform contract of the blob-backed engines: build once, then answer
/// nearest-neighbor queries with an ordered list of blob handles. After an
/// error the in-memory index state is unspecified; discard the engine.
pub trait VectorIndex {
    fn build(&mut self) -> Result<()>;

    /// The `min(n, N)` handles closest to `query`, ascending by distance.
    fn find_n_closest(&self, query: &[f32], n: usize) -> Result<Vec<BlobState>>;
}
