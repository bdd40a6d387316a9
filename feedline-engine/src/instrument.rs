//! Chip-style tone sources: oscillators, a linear amp envelope, instruments,
//! and two ready-made synthesizers.
//!
//! Contents:
//! - `Waveform`, `Osc`  : pulse (variable duty) / triangle / saw / sine / noise
//! - `AmpEnvelope`      : linear ADSR with times in **seconds**
//! - `Instrument`       : waveform + duty + volume + envelope
//! - `ToneSynth`        : instrument bank playing a queue of timed notes
//! - `Drone`            : one endless tone, the CLI default
//!
//! Notes:
//! - Frequency is **Hz**; the sample rate comes from `Synthesizer::reset`.
//! - These run on the synth worker thread, not the audio thread.

use std::collections::VecDeque;

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use feedline_core::dsp::kill_denormals;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::synth::Synthesizer;

/// Oscillator waveform.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Waveform { Pulse, Triangle, Saw, Sine, Noise }

impl std::str::FromStr for Waveform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pulse" | "square" => Ok(Waveform::Pulse),
            "triangle" | "tri" => Ok(Waveform::Triangle),
            "saw" => Ok(Waveform::Saw),
            "sine" => Ok(Waveform::Sine),
            "noise" => Ok(Waveform::Noise),
            other => Err(format!("unknown waveform: {other}")),
        }
    }
}

/// Noise is re-sampled this many times per oscillator period.
const NOISE_STEPS_PER_CYCLE: f32 = 16.0;

/// Noise seed for oscillators built with [`Osc::new`].
const DEFAULT_NOISE_SEED: u64 = 0x5EED_F00D;

/// Free-running oscillator with a sample-and-hold noise source.
#[derive(Clone, Debug)]
pub struct Osc {
    phase: f32, // [0,1)
    freq: f32,  // Hz
    wave: Waveform,
    duty: f32,  // pulse high fraction
    noise_phase: f32,
    noise_hold: f32,
    rng: StdRng,
}

impl Osc {
    pub fn new(freq_hz: f32, wave: Waveform) -> Self {
        Self::with_seed(freq_hz, wave, DEFAULT_NOISE_SEED)
    }

    /// Like [`Osc::new`], with its own noise sequence.
    pub fn with_seed(freq_hz: f32, wave: Waveform, seed: u64) -> Self {
        Self {
            phase: 0.0,
            freq: freq_hz.max(0.0),
            wave,
            duty: 0.5,
            noise_phase: 0.0,
            noise_hold: 0.0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    #[inline] pub fn set_freq(&mut self, hz: f32) { self.freq = hz.max(0.0); }
    #[inline] pub fn set_duty(&mut self, d: f32) { self.duty = d.clamp(0.01, 0.99); }
    #[inline] pub fn set_wave(&mut self, w: Waveform) { self.wave = w; }
    #[inline] pub fn reset_phase(&mut self) { self.phase = 0.0; self.noise_phase = 0.0; }

    /// Advance one sample and return the oscillator sample in [-1, 1].
    #[inline]
    pub fn next(&mut self, sr: f32) -> f32 {
        let inc = self.freq / sr;
        let p = self.phase;
        self.phase = (self.phase + inc) % 1.0;
        match self.wave {
            Waveform::Pulse => if p < self.duty { 1.0 } else { -1.0 },
            Waveform::Triangle => 4.0 * (p - 0.5).abs() - 1.0,
            Waveform::Saw => 2.0 * p - 1.0,
            Waveform::Sine => (core::f32::consts::TAU * p).sin(),
            Waveform::Noise => {
                self.noise_phase += inc * NOISE_STEPS_PER_CYCLE;
                if self.noise_phase >= 1.0 {
                    self.noise_phase %= 1.0;
                    self.noise_hold = self.rng.gen_range(-1.0..=1.0);
                }
                self.noise_hold
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Stage { Idle, Attack, Decay, Sustain, Release }

/// Linear ADSR. Times in seconds, sustain level in [0, 1].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct AmpEnvelope {
    pub attack: f32,
    pub decay: f32,
    pub sustain_level: f32,
    pub release: f32,
}

impl Default for AmpEnvelope {
    fn default() -> Self {
        Self { attack: 0.005, decay: 0.05, sustain_level: 0.8, release: 0.1 }
    }
}

/// Running state for one [`AmpEnvelope`].
#[derive(Copy, Clone, Debug)]
pub struct EnvelopeState {
    shape: AmpEnvelope,
    stage: Stage,
    level: f32,
    release_step: f32,
}

impl EnvelopeState {
    pub fn new(shape: AmpEnvelope) -> Self {
        Self { shape, stage: Stage::Idle, level: 0.0, release_step: 0.0 }
    }

    pub fn gate_on(&mut self) { self.stage = Stage::Attack; }

    pub fn gate_off(&mut self, sr: f32) {
        if self.stage == Stage::Idle {
            return;
        }
        // Ramp from wherever we are, so release time is independent of level.
        self.release_step = step(self.level, self.shape.release, sr);
        self.stage = Stage::Release;
    }

    #[inline] pub fn is_idle(&self) -> bool { self.stage == Stage::Idle }
    #[inline] pub fn value(&self) -> f32 { self.level }

    /// Advance by one sample.
    pub fn next(&mut self, sr: f32) -> f32 {
        let sus = self.shape.sustain_level.clamp(0.0, 1.0);
        match self.stage {
            Stage::Idle => self.level = 0.0,
            Stage::Attack => {
                self.level += step(1.0, self.shape.attack, sr);
                if self.level >= 1.0 {
                    self.level = 1.0;
                    self.stage = Stage::Decay;
                }
            }
            Stage::Decay => {
                self.level -= step(1.0 - sus, self.shape.decay, sr);
                if self.level <= sus {
                    self.level = sus;
                    self.stage = Stage::Sustain;
                }
            }
            Stage::Sustain => self.level = sus,
            Stage::Release => {
                self.level = kill_denormals(self.level - self.release_step);
                if self.level <= 0.0 {
                    self.level = 0.0;
                    self.stage = Stage::Idle;
                }
            }
        }
        self.level
    }
}

/// Per-sample increment covering `span` in `secs`; instant when `secs` is 0.
#[inline]
fn step(span: f32, secs: f32, sr: f32) -> f32 {
    if secs <= 0.0 { f32::INFINITY } else { span / (secs * sr.max(1.0)) }
}

/// A playable patch.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Instrument {
    pub volume: f32,
    pub waveform: Waveform,
    pub duty: f32,
    pub envelope: AmpEnvelope,
}

impl Default for Instrument {
    fn default() -> Self {
        Self { volume: 0.5, waveform: Waveform::Pulse, duty: 0.5, envelope: AmpEnvelope::default() }
    }
}

/// One queued tone.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Note {
    pub freq: f32,
    /// Index into the synth's instrument bank.
    pub instrument: usize,
    /// Gate length in seconds; the release tail comes on top.
    pub duration: f32,
}

struct Voice {
    osc: Osc,
    env: EnvelopeState,
    volume: f32,
    gate_left: usize,
}

/// Cloneable handle used to queue notes from any thread.
#[derive(Clone, Debug)]
pub struct NoteSender(Sender<Note>);

impl NoteSender {
    /// Returns `false` once the synth has been dropped.
    pub fn play(&self, note: Note) -> bool {
        self.0.send(note).is_ok()
    }
}

/// Instrument bank plus a queue of pending notes; mixes every sounding voice.
pub struct ToneSynth {
    instruments: Vec<Instrument>,
    inbox: Receiver<Note>,
    queue: VecDeque<Note>,
    voices: Vec<Voice>,
    /// Seeds each new voice's noise source.
    seeds: StdRng,
    sr: f32,
}

/// Hard cap on simultaneous voices; the oldest is stolen.
const MAX_VOICES: usize = 8;

impl ToneSynth {
    pub fn new(instruments: Vec<Instrument>) -> (Self, NoteSender) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let synth = Self {
            instruments,
            inbox: rx,
            queue: VecDeque::new(),
            voices: Vec::with_capacity(MAX_VOICES),
            seeds: StdRng::seed_from_u64(DEFAULT_NOISE_SEED),
            sr: 44_100.0,
        };
        (synth, NoteSender(tx))
    }

    /// Queue a note directly (same thread as the synth).
    pub fn play(&mut self, note: Note) {
        self.queue.push_back(note);
    }

    pub fn active_voices(&self) -> usize { self.voices.len() }

    fn drain_inbox(&mut self) {
        loop {
            match self.inbox.try_recv() {
                Ok(note) => self.queue.push_back(note),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    fn start_queued(&mut self) {
        while let Some(note) = self.queue.pop_front() {
            let Some(inst) = self.instruments.get(note.instrument).copied() else {
                tracing::warn!(instrument = note.instrument, "note for unknown instrument ignored");
                continue;
            };
            if self.voices.len() == MAX_VOICES {
                self.voices.remove(0);
            }
            let mut osc = Osc::with_seed(note.freq, inst.waveform, self.seeds.gen());
            osc.set_duty(inst.duty);
            let mut env = EnvelopeState::new(inst.envelope);
            env.gate_on();
            self.voices.push(Voice {
                osc,
                env,
                volume: inst.volume,
                gate_left: (note.duration.max(0.0) * self.sr) as usize,
            });
        }
    }
}

impl Synthesizer for ToneSynth {
    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.voices.clear();
    }

    fn next(&mut self) -> f32 {
        let sr = self.sr;
        let mut mix = 0.0;
        for v in &mut self.voices {
            if v.gate_left == 0 {
                v.env.gate_off(sr);
                // Keep gate_left at a sentinel so gate_off runs once.
                v.gate_left = usize::MAX;
            } else if v.gate_left != usize::MAX {
                v.gate_left -= 1;
            }
            mix += v.osc.next(sr) * v.env.next(sr) * v.volume;
        }
        self.voices.retain(|v| !v.env.is_idle());
        kill_denormals(mix.clamp(-1.0, 1.0))
    }

    fn render(&mut self, out: &mut [f32]) {
        self.drain_inbox();
        self.start_queued();
        for s in out.iter_mut() {
            *s = self.next();
        }
    }
}

/// Endless single tone.
#[derive(Clone, Debug)]
pub struct Drone {
    osc: Osc,
    volume: f32,
    sr: f32,
}

impl Drone {
    pub fn new(freq_hz: f32, wave: Waveform, volume: f32) -> Self {
        Self { osc: Osc::new(freq_hz, wave), volume: volume.clamp(0.0, 1.0), sr: 44_100.0 }
    }
}

impl Synthesizer for Drone {
    fn reset(&mut self, sr: f32) {
        self.sr = sr.max(1.0);
        self.osc.reset_phase();
    }

    #[inline]
    fn next(&mut self) -> f32 {
        self.osc.next(self.sr) * self.volume
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: f32 = 44_100.0;

    #[test]
    fn waveforms_stay_in_range() {
        for w in [Waveform::Pulse, Waveform::Triangle, Waveform::Saw, Waveform::Sine, Waveform::Noise] {
            let mut o = Osc::new(440.0, w);
            for _ in 0..SR as usize / 10 {
                let s = o.next(SR);
                assert!((-1.0..=1.0).contains(&s), "{w:?} produced {s}");
            }
        }
    }

    #[test]
    fn pulse_duty_sets_high_fraction() {
        let mut o = Osc::new(100.0, Waveform::Pulse);
        o.set_duty(0.25);
        let n = SR as usize;
        let high = (0..n).filter(|_| o.next(SR) > 0.0).count();
        let frac = high as f32 / n as f32;
        assert!((frac - 0.25).abs() < 0.01, "frac={frac}");
    }

    #[test]
    fn waveform_names_parse() {
        assert_eq!("Triangle".parse::<Waveform>(), Ok(Waveform::Triangle));
        assert_eq!("square".parse::<Waveform>(), Ok(Waveform::Pulse));
        assert!("wobble".parse::<Waveform>().is_err());
    }

    #[test]
    fn envelope_reaches_sustain_then_dies() {
        let shape = AmpEnvelope { attack: 0.01, decay: 0.05, sustain_level: 0.5, release: 0.2 };
        let mut env = EnvelopeState::new(shape);
        env.gate_on();
        for _ in 0..(SR as usize / 2) { env.next(SR); }
        assert!((env.value() - 0.5).abs() < 1e-3, "v={}", env.value());
        env.gate_off(SR);
        for _ in 0..(SR as usize / 2) { env.next(SR); }
        assert!(env.is_idle());
        assert_eq!(env.value(), 0.0);
    }

    #[test]
    fn zero_times_are_instant() {
        let shape = AmpEnvelope { attack: 0.0, decay: 0.0, sustain_level: 1.0, release: 0.0 };
        let mut env = EnvelopeState::new(shape);
        env.gate_on();
        assert_eq!(env.next(SR), 1.0);
        env.gate_off(SR);
        assert_eq!(env.next(SR), 0.0);
        assert!(env.is_idle());
    }

    #[test]
    fn release_tail_below_epsilon_goes_idle() {
        let mut env = EnvelopeState::new(AmpEnvelope::default());
        env.stage = Stage::Release;
        env.level = 1.0e-25;
        env.release_step = 1.0e-30;
        assert_eq!(env.next(SR), 0.0);
        assert!(env.is_idle());
    }

    #[test]
    fn seeded_noise_oscillators_differ() {
        let mut a = Osc::with_seed(440.0, Waveform::Noise, 1);
        let mut b = Osc::with_seed(440.0, Waveform::Noise, 2);
        let sa: Vec<f32> = (0..1024).map(|_| a.next(SR)).collect();
        let sb: Vec<f32> = (0..1024).map(|_| b.next(SR)).collect();
        assert_ne!(sa, sb);
    }

    #[test]
    fn noise_voices_do_not_share_a_sequence() {
        let noise = Instrument { waveform: Waveform::Noise, ..Instrument::default() };
        let (mut synth, _sender) = ToneSynth::new(vec![noise]);
        synth.reset(SR);
        synth.play(Note { freq: 440.0, instrument: 0, duration: 1.0 });
        synth.play(Note { freq: 440.0, instrument: 0, duration: 1.0 });
        synth.start_queued();
        assert_eq!(synth.active_voices(), 2);

        let (first, second) = synth.voices.split_at_mut(1);
        let a: Vec<f32> = (0..1024).map(|_| first[0].osc.next(SR)).collect();
        let b: Vec<f32> = (0..1024).map(|_| second[0].osc.next(SR)).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn tone_synth_plays_and_falls_silent() {
        let (mut synth, sender) = ToneSynth::new(vec![Instrument::default()]);
        synth.reset(SR);

        let mut block = vec![0.0; 512];
        synth.render(&mut block);
        assert!(block.iter().all(|&s| s == 0.0), "idle synth must be silent");

        assert!(sender.play(Note { freq: 220.0, instrument: 0, duration: 0.05 }));
        synth.render(&mut block);
        assert!(block.iter().any(|&s| s != 0.0));
        assert_eq!(synth.active_voices(), 1);

        // 0.05 s gate + 0.1 s release, well under a second.
        let mut tail = vec![0.0; SR as usize];
        synth.render(&mut tail);
        assert_eq!(synth.active_voices(), 0);
        assert!(tail[tail.len() - 64..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn unknown_instrument_is_skipped() {
        let (mut synth, _tx) = ToneSynth::new(vec![]);
        synth.reset(SR);
        synth.play(Note { freq: 100.0, instrument: 3, duration: 1.0 });
        let mut block = vec![0.0; 64];
        synth.render(&mut block);
        assert_eq!(synth.active_voices(), 0);
    }

    #[test]
    fn voices_are_capped() {
        let (mut synth, _tx) = ToneSynth::new(vec![Instrument::default()]);
        synth.reset(SR);
        for i in 0..(MAX_VOICES + 4) {
            synth.play(Note { freq: 100.0 + i as f32, instrument: 0, duration: 1.0 });
        }
        let mut block = vec![0.0; 16];
        synth.render(&mut block);
        assert_eq!(synth.active_voices(), MAX_VOICES);
    }

    #[test]
    fn drone_is_continuous() {
        let mut d = Drone::new(110.0, Waveform::Saw, 0.5);
        d.reset(SR);
        let mut block = vec![0.0; 1024];
        d.render(&mut block);
        assert!(block.iter().all(|s| s.abs() <= 0.5));
        assert!(block.iter().any(|&s| s != 0.0));
    }
}
