//! Session configuration handed to the render callback at construction.
//!
//! Fixed for the lifetime of an [`AudioProcessor`](crate::processor::AudioProcessor).

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Web-audio style render quantum.
pub const DEFAULT_QUANTUM: usize = 128;
pub const DEFAULT_SAMPLE_RATE: u32 = 44_100;
pub const DEFAULT_CHANNELS: u16 = 2;

const MIN_SAMPLE_RATE: u32 = 8_000;
const MAX_SAMPLE_RATE: u32 = 384_000;

/// Quantum size, sample rate and output channel count for one session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RenderConfig {
    /// Frames produced per render invocation (N).
    pub quantum_size: usize,
    /// Hz (R).
    pub sample_rate: u32,
    /// Output channels; the mono quantum is duplicated into each.
    pub channels: u16,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            quantum_size: DEFAULT_QUANTUM,
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
        }
    }
}

impl RenderConfig {
    pub fn new(quantum_size: usize, sample_rate: u32, channels: u16) -> Result<Self> {
        let cfg = Self { quantum_size, sample_rate, channels };
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if self.quantum_size == 0 {
            return Err(Error::Config("quantum_size must be at least 1 frame".into()));
        }
        if self.channels == 0 {
            return Err(Error::Config("channels must be at least 1".into()));
        }
        if !(MIN_SAMPLE_RATE..=MAX_SAMPLE_RATE).contains(&self.sample_rate) {
            return Err(Error::Config(format!(
                "sample_rate {} Hz outside {MIN_SAMPLE_RATE}..={MAX_SAMPLE_RATE}",
                self.sample_rate
            )));
        }
        Ok(())
    }

    /// Wall-clock length of one quantum (≈2.9 ms for 128 frames at 44.1 kHz).
    pub fn quantum_period(&self) -> Duration {
        self.frames_to_duration(self.quantum_size)
    }

    pub fn frames_to_duration(&self, frames: usize) -> Duration {
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate.max(1)))
    }

    #[inline]
    pub fn sample_rate_f32(&self) -> f32 {
        self.sample_rate as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_web_audio_conventions() {
        let cfg = RenderConfig::default();
        assert_eq!(cfg.quantum_size, 128);
        assert_eq!(cfg.sample_rate, 44_100);
        assert!(cfg.validate().is_ok());
        let ms = cfg.quantum_period().as_secs_f64() * 1000.0;
        assert!((ms - 2.902).abs() < 0.01, "period {ms} ms");
    }

    #[test]
    fn rejects_degenerate_values() {
        assert!(RenderConfig::new(0, 44_100, 2).is_err());
        assert!(RenderConfig::new(128, 44_100, 0).is_err());
        assert!(RenderConfig::new(128, 100, 2).is_err());
        assert!(RenderConfig::new(64, 48_000, 1).is_ok());
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let cfg: RenderConfig = serde_json::from_str(r#"{"sample_rate": 48000}"#).unwrap();
        assert_eq!(cfg, RenderConfig { sample_rate: 48_000, ..RenderConfig::default() });
        assert!(serde_json::from_str::<RenderConfig>(r#"{"quantum": 64}"#).is_err());
    }
}
