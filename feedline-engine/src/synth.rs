//! Sample sources that feed the exchange from off the audio thread.
//!
//! A [`Synthesizer`] is free to be as slow or allocation-happy as it likes:
//! it only ever runs inside a [`SynthWorker`](crate::worker::SynthWorker) or
//! some other non-real-time caller, and its output reaches the render
//! callback as whole blocks.

/// Anything that can produce mono samples at a given rate.
pub trait Synthesizer: Send {
    /// Called before the first block and whenever the sample rate changes.
    fn reset(&mut self, sr: f32);

    /// Generate the next mono sample. Implementations should assume the sample
    /// rate has been communicated via `reset`.
    fn next(&mut self) -> f32;

    /// Fill a whole block. Override when a block loop is cheaper.
    fn render(&mut self, out: &mut [f32]) {
        for s in out.iter_mut() {
            *s = self.next();
        }
    }
}

impl<S: Synthesizer + ?Sized> Synthesizer for Box<S> {
    fn reset(&mut self, sr: f32) { (**self).reset(sr) }
    fn next(&mut self) -> f32 { (**self).next() }
    fn render(&mut self, out: &mut [f32]) { (**self).render(out) }
}

/// Plays a fixed slice over and over. Handy for tests and test tones.
#[derive(Clone, Debug)]
pub struct Looper {
    samples: Vec<f32>,
    pos: usize,
}

impl Looper {
    pub fn new(samples: Vec<f32>) -> Self {
        Self { samples, pos: 0 }
    }
}

impl Synthesizer for Looper {
    fn reset(&mut self, _sr: f32) {
        self.pos = 0;
    }

    #[inline]
    fn next(&mut self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let s = self.samples[self.pos];
        self.pos = (self.pos + 1) % self.samples.len();
        s
    }
}
