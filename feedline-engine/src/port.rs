//! Synthesizer-side message handler.
//!
//! A [`MessagePort`] owns the writer half of the exchange. It validates each
//! [`ControlMessage`], logs anything odd, and turns it into a delivery or a
//! shutdown request. It is allowed to allocate and log; it never runs on the
//! audio thread.

use std::sync::Arc;

use feedline_core::{exchange, BlockWriter, SampleBlock};

use crate::config::RenderConfig;
use crate::error::Result;
use crate::message::{ControlMessage, SampleMessage};
use crate::processor::AudioProcessor;
use crate::stats::RenderStats;

/// What happened to a posted message.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Posted {
    /// The block is now the one the render callback will read next.
    Delivered,
    /// The render side is gone; the message was dropped.
    Dropped,
    /// The render callback will return "stop" from its next invocation.
    ShutdownRequested,
}

pub struct MessagePort {
    writer: BlockWriter,
    stats: Arc<RenderStats>,
    delivered: u64,
}

/// Build a connected port / render callback pair for one session.
pub fn session(config: RenderConfig) -> Result<(MessagePort, AudioProcessor)> {
    config.validate()?;
    let (writer, reader) = exchange();
    let stats = Arc::new(RenderStats::new());
    let port = MessagePort { writer, stats: Arc::clone(&stats), delivered: 0 };
    let processor = AudioProcessor::new(config, reader, stats);
    tracing::debug!(
        quantum = config.quantum_size,
        sample_rate = config.sample_rate,
        channels = config.channels,
        "session created"
    );
    Ok((port, processor))
}

impl MessagePort {
    pub fn post(&mut self, msg: ControlMessage) -> Result<Posted> {
        match msg {
            ControlMessage::Samples(m) => self.deliver_message(m),
            ControlMessage::Shutdown => {
                tracing::debug!("shutdown requested");
                self.writer.shutdown();
                Ok(Posted::ShutdownRequested)
            }
        }
    }

    /// Copy-on-send convenience for callers holding a reusable buffer.
    pub fn deliver_slice(&mut self, samples: &[f32]) -> Result<Posted> {
        let block = SampleBlock::from_slice(samples).map_err(|e| {
            tracing::warn!(error = %e, "dropping malformed delivery");
            e
        })?;
        Ok(self.deliver_block(block))
    }

    fn deliver_message(&mut self, msg: SampleMessage) -> Result<Posted> {
        let block = msg.into_block().map_err(|e| {
            tracing::warn!(error = %e, "dropping malformed delivery");
            e
        })?;
        Ok(self.deliver_block(block))
    }

    fn deliver_block(&mut self, block: SampleBlock) -> Posted {
        if block.sanitized() > 0 {
            tracing::warn!(
                replaced = block.sanitized(),
                len = block.len(),
                "non-finite samples replaced with silence"
            );
        }
        let len = block.len();
        if self.writer.deliver(block) {
            self.delivered += 1;
            tracing::trace!(len, seq = self.delivered, "block delivered");
            Posted::Delivered
        } else {
            tracing::debug!(len, "render side gone; delivery dropped");
            Posted::Dropped
        }
    }

    /// Free blocks the render side has finished with.
    pub fn collect_garbage(&mut self) -> usize {
        self.writer.collect_garbage()
    }

    #[inline] pub fn is_connected(&self) -> bool { self.writer.is_connected() }
    #[inline] pub fn delivered(&self) -> u64 { self.delivered }
    #[inline] pub fn stats(&self) -> &Arc<RenderStats> { &self.stats }
}
