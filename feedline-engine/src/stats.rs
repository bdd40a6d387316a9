//! Counters the render callback publishes for non-real-time observers.
//!
//! Writes are relaxed atomic stores/adds only, so updating them is as cheap as
//! touching a plain field and never blocks the audio thread.

use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

#[derive(Debug, Default)]
pub struct RenderStats {
    quanta: AtomicU64,
    starved: AtomicU64,
    peak_bits: AtomicU32,
    stopped: AtomicBool,
}

/// A plain copy of [`RenderStats`] taken off the audio thread.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct StatsSnapshot {
    /// Render invocations so far.
    pub quanta: u64,
    /// Invocations that had to pad with silence.
    pub starved: u64,
    /// Peak |sample| of the most recent quantum.
    pub peak: f32,
    /// The processor has returned "stop".
    pub stopped: bool,
}

impl RenderStats {
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub(crate) fn record(&self, starved: bool, peak: f32) {
        self.quanta.fetch_add(1, Ordering::Relaxed);
        if starved {
            self.starved.fetch_add(1, Ordering::Relaxed);
        }
        self.peak_bits.store(peak.to_bits(), Ordering::Relaxed);
    }

    #[inline]
    pub(crate) fn mark_stopped(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            quanta: self.quanta.load(Ordering::Relaxed),
            starved: self.starved.load(Ordering::Relaxed),
            peak: f32::from_bits(self.peak_bits.load(Ordering::Relaxed)),
            stopped: self.stopped.load(Ordering::Relaxed),
        }
    }
}
