//! Feedline Core — the lock-free hand-off between a synthesizer and a
//! real-time render callback.
//!
//! Features
//! - `simd` : portable SIMD gain loop (wide)
//!
//! Modules
//! - [`block`]    : validated, immutable `SampleBlock`
//! - [`exchange`] : `BlockWriter` / `BlockReader` halves of the exchange
//! - [`dsp`]      : allocation-free block helpers (silence, padding, fan-out, gain)
//!
//! Design
//! - The reader half never locks, allocates or frees
//! - A new delivery fully replaces the previous block; unconsumed samples are discarded
//! - Starvation is not an error: missing samples read as silence

pub mod block;
pub mod dsp;
pub mod exchange;

pub use block::{BlockError, SampleBlock};
pub use exchange::{exchange, BlockReader, BlockWriter};

/// Commonly used types/functions for convenience:
pub mod prelude {
    pub use crate::block::{BlockError, SampleBlock};
    pub use crate::dsp::{
        apply_gain, copy_padded, fill_silence, interleave_mono, kill_denormals, peak_abs,
        sanitize,
    };
    pub use crate::exchange::{exchange, BlockReader, BlockWriter};
}

#[cfg(test)]
mod smoke {

    #[test]
    fn prelude_exists() {
        use crate::prelude::*;
        let (mut w, mut r) = exchange();
        assert!(w.deliver(SampleBlock::from_slice(&[0.5; 4]).unwrap()));
        let mut q = [0.0; 4];
        assert_eq!(r.take_quantum(&mut q), 4);
        assert_eq!(peak_abs(&q), 0.5);
    }
}
