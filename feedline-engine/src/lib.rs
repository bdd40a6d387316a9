//! Feedline Engine — render callback, control messages and host glue.
//!
//! Crate layout:
//! - [`config`]     : `RenderConfig` (quantum size, sample rate, channels)
//! - [`message`]    : fixed-shape `ControlMessage` / `SampleMessage`
//! - [`port`]       : `MessagePort` (synthesizer side) and `session()`
//! - [`processor`]  : `AudioProcessor`, the real-time render callback
//! - [`host`]       : `FixedQuantumAdapter` for hosts with variable buffer sizes
//! - [`stats`]      : atomic render counters for off-thread meters
//! - [`synth`]      : `Synthesizer` trait and a looping test source
//! - [`instrument`] : chip-style oscillators, envelope, `ToneSynth`, `Drone`
//! - [`sfx`]        : retro sound-effect bank for `ToneSynth`
//! - [`worker`]     : `SynthWorker`, a paced background producer
//! - `output`       : cpal stream builder (feature `realtime`)
//!
//! Only `AudioProcessor` and `FixedQuantumAdapter` run on the audio thread,
//! and neither allocates, locks or logs there.

pub mod config;
pub mod error;
pub mod host;
pub mod instrument;
pub mod message;
#[cfg(feature = "realtime")]
pub mod output;
pub mod port;
pub mod processor;
pub mod sfx;
pub mod stats;
pub mod synth;
pub mod worker;

// Re-export some commonly used items to make downstream imports ergonomic.
pub use config::RenderConfig;
pub use error::{Error, Result};
pub use host::FixedQuantumAdapter;
pub use instrument::{AmpEnvelope, Drone, Instrument, Note, NoteSender, ToneSynth, Waveform};
pub use message::{ControlMessage, SampleMessage};
pub use port::{session, MessagePort, Posted};
pub use processor::AudioProcessor;
pub use stats::{RenderStats, StatsSnapshot};
pub use synth::Synthesizer;
pub use worker::SynthWorker;
