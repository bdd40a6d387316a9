//! The fixed-shape control messages the synthesizer side sends.
//!
//! Wire shape (JSON shown; any serde format works):
//!
//! ```text
//! {"type": "samples", "samples": [0.1, 0.2, ...]}
//! {"type": "shutdown"}
//! ```
//!
//! `samples` must be non-empty. That is checked while deserializing, so a
//! malformed payload never becomes a `SampleMessage`.

use serde::{Deserialize, Serialize};

use feedline_core::{BlockError, SampleBlock};

/// One block of mono samples, length ≥ 1.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawSampleMessage")]
pub struct SampleMessage {
    samples: Vec<f32>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSampleMessage {
    samples: Vec<f32>,
}

impl TryFrom<RawSampleMessage> for SampleMessage {
    type Error = BlockError;

    fn try_from(raw: RawSampleMessage) -> Result<Self, Self::Error> {
        Self::new(raw.samples)
    }
}

impl SampleMessage {
    pub fn new(samples: Vec<f32>) -> Result<Self, BlockError> {
        if samples.is_empty() {
            return Err(BlockError::Empty);
        }
        Ok(Self { samples })
    }

    #[inline]
    pub fn samples(&self) -> &[f32] { &self.samples }

    #[inline]
    pub fn len(&self) -> usize { self.samples.len() }

    #[inline]
    pub fn is_empty(&self) -> bool { self.samples.is_empty() }

    /// Hand the payload over; sanitizes non-finite values.
    pub fn into_block(self) -> Result<SampleBlock, BlockError> {
        SampleBlock::new(self.samples)
    }
}

/// Everything that travels from the synthesizer side to the render side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ControlMessage {
    /// Replace the current block.
    Samples(SampleMessage),
    /// Make the render callback return "stop" from now on.
    Shutdown,
}

impl From<SampleMessage> for ControlMessage {
    fn from(m: SampleMessage) -> Self {
        ControlMessage::Samples(m)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_samples_rejected() {
        assert_eq!(SampleMessage::new(vec![]), Err(BlockError::Empty));
        let bad = serde_json::from_str::<ControlMessage>(r#"{"type":"samples","samples":[]}"#);
        assert!(bad.is_err());
    }

    #[test]
    fn parses_both_kinds() {
        let m: ControlMessage =
            serde_json::from_str(r#"{"type":"samples","samples":[0.1,0.2]}"#).unwrap();
        assert_eq!(m, ControlMessage::Samples(SampleMessage::new(vec![0.1, 0.2]).unwrap()));

        let s: ControlMessage = serde_json::from_str(r#"{"type":"shutdown"}"#).unwrap();
        assert_eq!(s, ControlMessage::Shutdown);
    }

    #[test]
    fn unknown_fields_and_wrong_types_rejected() {
        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"samples","samples":[0.1],"gain":2}"#).is_err());
        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"samples","samples":"loud"}"#).is_err());
        assert!(serde_json::from_str::<ControlMessage>(r#"{"type":"pause"}"#).is_err());
    }

    #[test]
    fn into_block_sanitizes() {
        let m = SampleMessage::new(vec![0.5, f32::NAN]).unwrap();
        let b = m.into_block().unwrap();
        assert_eq!(b.as_slice(), &[0.5, 0.0]);
        assert_eq!(b.sanitized(), 1);
    }
}
