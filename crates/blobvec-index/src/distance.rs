//! Blob-resident realizations of the distance kernel.
//!
//! The outer operand is loaded once and its span stays alive while the
//! inner operand is loaded inside the callback, so a pairwise distance
//! costs exactly two loads and zero copies.

use blobvec_core::distance::distance_vec;
use blobvec_core::Result;
use blobvec_store::{float_slice, BlobAdapter, BlobState};

/// Distance between two blob-resident vectors. Handles sharing an identity
/// alias the same payload, so the distance short-circuits to zero.
pub fn distance_blob(blob: &BlobAdapter, a: &BlobState, b: &BlobState) -> Result<f32> {
    debug_assert_eq!(a.byte_len(), b.byte_len());
    if a.blob_id() == b.blob_id() {
        return Ok(0.0);
    }
    blob.load(a, |bytes_a| {
        let span_a = float_slice(bytes_a)?;
        blob.load(b, |bytes_b| Ok(distance_vec(span_a, float_slice(bytes_b)?)))
    })
}

/// Distance between an in-memory query and a blob-resident vector.
pub fn distance_vec_blob(blob: &BlobAdapter, query: &[f32], state: &BlobState) -> Result<f32> {
    blob.load(state, |bytes| Ok(distance_vec(query, float_slice(bytes)?)))
}

/// Mean distance from `query` to a result set; the recall metric used by
/// the correctness driver.
pub fn mean_distance_vec_blob(
    blob: &BlobAdapter,
    query: &[f32],
    states: &[BlobState],
) -> Result<f32> {
    if states.is_empty() {
        return Ok(0.0);
    }
    let mut sum = 0.0f32;
    for state in states {
        sum += distance_vec_blob(blob, query, state)?;
    }
    Ok(sum / states.len() as f32)
}
