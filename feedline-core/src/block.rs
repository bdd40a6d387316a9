//! Immutable blocks of samples handed from a synthesizer to the render side.
//!
//! A [`SampleBlock`] is built (and validated) on the producer thread. Once it
//! has been handed to the exchange its storage never changes again, so the
//! reader can copy out of it without any coordination.

use core::fmt;

use crate::dsp::sanitize;

/// Reasons a block is refused at the boundary.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlockError {
    /// Zero-length delivery.
    Empty,
}

impl fmt::Display for BlockError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BlockError::Empty => f.write_str("sample block must contain at least one sample"),
        }
    }
}

impl std::error::Error for BlockError {}

/// A validated, immutable run of mono samples.
///
/// Non-finite input values are replaced with silence while building; finite
/// values outside [-1, 1] are kept as they are.
#[derive(Clone, Debug, PartialEq)]
pub struct SampleBlock {
    samples: Box<[f32]>,
    sanitized: usize,
}

impl SampleBlock {
    /// Take ownership of `samples`, replacing NaN/inf with `0.0`.
    pub fn new(mut samples: Vec<f32>) -> Result<Self, BlockError> {
        if samples.is_empty() {
            return Err(BlockError::Empty);
        }
        let mut sanitized = 0;
        for s in &mut samples {
            if !s.is_finite() {
                sanitized += 1;
            }
            *s = sanitize(*s);
        }
        Ok(Self { samples: samples.into_boxed_slice(), sanitized })
    }

    /// Copy-on-send: the caller keeps its buffer and may reuse it immediately.
    pub fn from_slice(samples: &[f32]) -> Result<Self, BlockError> {
        Self::new(samples.to_vec())
    }

    #[inline]
    pub fn len(&self) -> usize { self.samples.len() }

    /// Always `false` for a constructed block; kept for clippy's `len_without_is_empty`.
    #[inline]
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    #[inline]
    pub fn as_slice(&self) -> &[f32] { &self.samples }

    /// How many non-finite values were zeroed while building.
    #[inline]
    pub fn sanitized(&self) -> usize { self.sanitized }
}

impl TryFrom<Vec<f32>> for SampleBlock {
    type Error = BlockError;

    fn try_from(samples: Vec<f32>) -> Result<Self, Self::Error> {
        Self::new(samples)
    }
}
