//! Block-level sample helpers shared by the exchange and the render side.
//!
//! Design goals:
//! - Allocation-free, branch-light helpers that are safe on the audio thread
//! - Optional `simd` path for per-block gain
//! - Clean, side-effect free helpers that are easy to test
//!
//! Features used by this file:
//! - `simd` : enables the `wide::f32x8` gain loop

use cfg_if::cfg_if;

// --------------------------------- Constants -------------------------------------

/// A very small epsilon used in denormal handling.
pub const EPS_SMALL: f32 = 1.0e-20;

// --------------------------------- Utilities -------------------------------------

/// Map NaN/inf to silence; finite values pass through untouched.
#[inline]
pub fn sanitize(x: f32) -> f32 {
    if x.is_finite() { x } else { 0.0 }
}

/// Kill denormal/subnormal values. Returns 0.0 if |x| < EPS_SMALL.
#[inline]
pub fn kill_denormals(x: f32) -> f32 {
    if x.abs() < EPS_SMALL { 0.0 } else { x }
}

// --------------------------------- Block ops -------------------------------------

#[inline]
pub fn fill_silence(out: &mut [f32]) {
    out.fill(0.0);
}

/// Copy as much of `src` as fits into `dst` and zero the rest.
/// Returns the number of samples taken from `src`.
#[inline]
pub fn copy_padded(dst: &mut [f32], src: &[f32]) -> usize {
    let n = dst.len().min(src.len());
    dst[..n].copy_from_slice(&src[..n]);
    fill_silence(&mut dst[n..]);
    n
}

/// Largest absolute value in the block (0.0 for an empty block).
#[inline]
pub fn peak_abs(block: &[f32]) -> f32 {
    block.iter().fold(0.0_f32, |m, &s| m.max(s.abs()))
}

/// Duplicate a mono block into an interleaved buffer with `channels` channels.
///
/// Writes `min(mono.len(), out.len() / channels)` frames and returns that count.
#[inline]
pub fn interleave_mono(out: &mut [f32], mono: &[f32], channels: usize) -> usize {
    if channels == 0 {
        return 0;
    }
    let mut frames = 0;
    for (frame, &s) in out.chunks_exact_mut(channels).zip(mono.iter()) {
        frame.fill(s);
        frames += 1;
    }
    frames
}

/// In-place gain: `block[i] *= gain`.
#[inline]
pub fn apply_gain(block: &mut [f32], gain: f32) {
    cfg_if! {
        if #[cfg(feature = "simd")] {
            use wide::f32x8;
            let g = f32x8::splat(gain);
            let mut chunks = block.chunks_exact_mut(8);
            for chunk in &mut chunks {
                let mut lanes = [0.0_f32; 8];
                lanes.copy_from_slice(chunk);
                let y = f32x8::from(lanes) * g;
                chunk.copy_from_slice(&y.to_array());
            }
            for s in chunks.into_remainder() {
                *s *= gain;
            }
        } else {
            for s in block.iter_mut() {
                *s *= gain;
            }
        }
    }
}

// --------------------------------- Tests -----------------------------------------
