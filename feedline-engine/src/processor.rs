//! The render callback: one call per fixed-size quantum, driven by the host.
//!
//! Each call takes exactly `quantum_size` samples from the exchange (padded
//! with silence when the synthesizer has fallen behind) and duplicates that
//! mono quantum into every output channel.
//!
//! Nothing in here allocates, locks, logs or panics after construction.

use std::sync::Arc;

use feedline_core::dsp::{apply_gain, copy_padded, fill_silence, interleave_mono, peak_abs};
use feedline_core::BlockReader;

use crate::config::RenderConfig;
use crate::stats::RenderStats;

/// Host-facing render callback.
///
/// Returns `true` ("keep me in the graph") on every call until a shutdown
/// message has been observed; from then on it renders silence and returns
/// `false`.
pub struct AudioProcessor {
    reader: BlockReader,
    config: RenderConfig,
    scratch: Vec<f32>,
    gain: f32,
    alive: bool,
    stats: Arc<RenderStats>,
}

impl AudioProcessor {
    /// `config` must already be validated (see [`RenderConfig::validate`]).
    pub fn new(config: RenderConfig, reader: BlockReader, stats: Arc<RenderStats>) -> Self {
        Self {
            reader,
            config,
            scratch: vec![0.0; config.quantum_size.max(1)],
            gain: 1.0,
            alive: true,
            stats,
        }
    }

    /// Output gain applied to every quantum. Non-finite values reset to unity.
    pub fn set_gain(&mut self, gain: f32) {
        self.gain = if gain.is_finite() { gain.max(0.0) } else { 1.0 };
    }

    #[inline] pub fn config(&self) -> &RenderConfig { &self.config }
    #[inline] pub fn quantum_size(&self) -> usize { self.scratch.len() }
    #[inline] pub fn is_alive(&self) -> bool { self.alive }
    #[inline] pub fn stats(&self) -> &Arc<RenderStats> { &self.stats }

    /// Planar render: every slice in `outputs` is one channel.
    ///
    /// Channels are filled up to their own length; anything past the quantum
    /// is silence.
    pub fn process(&mut self, outputs: &mut [&mut [f32]]) -> bool {
        if !self.render_quantum() {
            for ch in outputs.iter_mut() {
                fill_silence(ch);
            }
            return false;
        }
        for ch in outputs.iter_mut() {
            copy_padded(ch, &self.scratch);
        }
        true
    }

    /// Interleaved render of one quantum into `out` (`quantum_size * channels` samples).
    ///
    /// A zero channel count has nowhere to put a quantum, so none is taken.
    pub fn process_interleaved(&mut self, out: &mut [f32], channels: usize) -> bool {
        if channels == 0 {
            fill_silence(out);
            return self.alive;
        }
        if !self.render_quantum() {
            fill_silence(out);
            return false;
        }
        let frames = interleave_mono(out, &self.scratch, channels);
        fill_silence(&mut out[frames * channels..]);
        true
    }

    /// Pull the next mono quantum into `scratch`. `false` once shut down.
    #[inline]
    fn render_quantum(&mut self) -> bool {
        if self.alive && self.reader.is_shutdown() {
            self.alive = false;
            self.stats.mark_stopped();
        }
        if !self.alive {
            fill_silence(&mut self.scratch);
            return false;
        }
        let n = self.reader.take_quantum(&mut self.scratch);
        if self.gain != 1.0 {
            apply_gain(&mut self.scratch, self.gain);
        }
        self.stats.record(n < self.scratch.len(), peak_abs(&self.scratch));
        true
    }
}
