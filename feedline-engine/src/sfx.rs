//! A small bank of retro sound effects for [`ToneSynth`](crate::instrument::ToneSynth).
//!
//! Three instruments (noise, 60% pulse, triangle) with a hard-on envelope
//! and a one second release; each effect is one note on one of them.

use crate::instrument::{AmpEnvelope, Instrument, Note, Waveform};

pub const NOISE: usize = 0;
pub const PULSE: usize = 1;
pub const TRIANGLE: usize = 2;

/// Gate length used for every effect.
pub const EFFECT_GATE_SECS: f32 = 0.12;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Sfx {
    JumpA,
    JumpB,
    Fire,
    Ski,
    Select,
    Switch,
}

impl Sfx {
    pub const ALL: [Sfx; 6] = [Sfx::JumpA, Sfx::JumpB, Sfx::Fire, Sfx::Ski, Sfx::Select, Sfx::Switch];

    pub fn note(self) -> Note {
        let (freq, instrument) = match self {
            Sfx::JumpA => (200.0, TRIANGLE),
            Sfx::JumpB => (110.0, PULSE),
            Sfx::Ski => (20.0, NOISE),
            Sfx::Fire => (10.0, PULSE),
            Sfx::Select => (300.0, TRIANGLE),
            Sfx::Switch => (500.0, TRIANGLE),
        };
        Note { freq, instrument, duration: EFFECT_GATE_SECS }
    }
}

/// Instruments indexed by [`NOISE`], [`PULSE`] and [`TRIANGLE`].
pub fn sfx_bank() -> Vec<Instrument> {
    let env = AmpEnvelope { attack: 0.0, decay: 0.0, sustain_level: 1.0, release: 1.0 };
    let inst = |waveform, duty| Instrument { volume: 0.4, waveform, duty, envelope: env };
    vec![
        inst(Waveform::Noise, 0.75),
        inst(Waveform::Pulse, 0.6),
        inst(Waveform::Triangle, 0.5),
    ]
}
