//! Euclidean distance kernel.
//!
//! The hottest function in the entire project: every engine cost is
//! dominated by distance evaluations, so the kernel reduces in eight
//! independent lanes with a scalar tail. Lane-blocked reduction reorders
//! the summation, so callers comparing against a scalar reference must
//! allow a small tolerance.

#[cfg(feature = "nightly-simd")]
use std::simd::prelude::*;

const LANES: usize = 8;

/// `‖a − b‖₂` over two equal-length float slices.
#[inline]
pub fn distance_vec(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(feature = "nightly-simd")]
    {
        let simd_end = a.len() - (a.len() % LANES);
        let mut sum = f32x8::splat(0.0);
        for i in (0..simd_end).step_by(LANES) {
            let va = f32x8::from_slice(&a[i..i + LANES]);
            let vb = f32x8::from_slice(&b[i..i + LANES]);
            let diff = va - vb;
            sum += diff * diff;
        }
        let mut total = sum.reduce_sum();
        for i in simd_end..a.len() {
            let diff = a[i] - b[i];
            total += diff * diff;
        }
        total.sqrt()
    }

    #[cfg(not(feature = "nightly-simd"))]
    {
        // Stable path: eight explicit accumulators so the loop
        // auto-vectorizes to the same shape as the portable-simd build.
        let mut lanes = [0.0f32; LANES];
        let mut chunks_a = a.chunks_exact(LANES);
        let mut chunks_b = b.chunks_exact(LANES);
        for (ca, cb) in chunks_a.by_ref().zip(chunks_b.by_ref()) {
            for l in 0..LANES {
                let diff = ca[l] - cb[l];
                lanes[l] += diff * diff;
            }
        }
        let mut total: f32 = lanes.iter().sum();
        for (x, y) in chunks_a.remainder().iter().zip(chunks_b.remainder()) {
            let diff = x - y;
            total += diff * diff;
        }
        total.sqrt()
    }
}

/// Straight-line scalar reference, kept for tests and benches to compare
/// the blocked reduction against.
pub fn distance_vec_scalar(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let mut sum = 0.0f32;
    for (x, y) in a.iter().zip(b) {
        let diff = x - y;
        sum += diff * diff;
    }
    sum.sqrt()
}
