//! Glue between hosts with variable callback sizes and the fixed-quantum processor.
//!
//! Device backends (cpal, a C host, ...) ask for however many frames they
//! like. The adapter renders whole quanta into a preallocated interleaved
//! carry buffer and hands out frames from it, so the processor is always
//! invoked with exactly `quantum_size` frames.

use crate::processor::AudioProcessor;

pub struct FixedQuantumAdapter {
    processor: AudioProcessor,
    channels: usize,
    carry: Vec<f32>,
    carry_pos: usize,
    alive: bool,
}

impl FixedQuantumAdapter {
    /// `channels` is the interleave width the host will hand us.
    pub fn new(processor: AudioProcessor, channels: usize) -> Self {
        let channels = channels.max(1);
        let len = processor.quantum_size() * channels;
        Self {
            processor,
            channels,
            carry: vec![0.0; len],
            // Empty carry: the first render pulls a fresh quantum.
            carry_pos: len,
            alive: true,
        }
    }

    #[inline] pub fn channels(&self) -> usize { self.channels }
    #[inline] pub fn processor(&self) -> &AudioProcessor { &self.processor }
    #[inline] pub fn processor_mut(&mut self) -> &mut AudioProcessor { &mut self.processor }

    /// Fill an interleaved buffer of any length. Returns the processor's
    /// keep-alive flag from the most recent quantum.
    pub fn render(&mut self, out: &mut [f32]) -> bool {
        let mut written = 0;
        while written < out.len() {
            if self.carry_pos == self.carry.len() {
                self.alive = self.processor.process_interleaved(&mut self.carry, self.channels);
                self.carry_pos = 0;
            }
            let n = (self.carry.len() - self.carry_pos).min(out.len() - written);
            out[written..written + n]
                .copy_from_slice(&self.carry[self.carry_pos..self.carry_pos + n]);
            self.carry_pos += n;
            written += n;
        }
        self.alive
    }
}
