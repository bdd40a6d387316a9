//! Background thread that keeps the exchange supplied.
//!
//! The worker renders `block_quanta × quantum_size` samples at a time from a
//! [`Synthesizer`] and posts them through its [`MessagePort`], pacing itself
//! to the wall-clock length of a block. The first block is posted
//! immediately. There is no feedback from the render side: if the worker
//! falls behind, the render callback pads with silence.

use std::thread::{self, JoinHandle};
use std::time::Instant;

use crossbeam_channel::{bounded, RecvTimeoutError, Sender};

use crate::config::RenderConfig;
use crate::error::{Error, Result};
use crate::message::ControlMessage;
use crate::port::{MessagePort, Posted};
use crate::synth::Synthesizer;

pub struct SynthWorker {
    stop_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<MessagePort>>,
}

impl SynthWorker {
    pub fn spawn<S>(
        mut synth: S,
        mut port: MessagePort,
        config: RenderConfig,
        block_quanta: usize,
    ) -> Result<Self>
    where
        S: Synthesizer + 'static,
    {
        config.validate()?;
        let block_len = config.quantum_size * block_quanta.max(1);
        let period = config.frames_to_duration(block_len);
        let (stop_tx, stop_rx) = bounded::<()>(1);

        let handle = thread::Builder::new()
            .name("feedline-synth".into())
            .spawn(move || {
                tracing::info!(block_len, period_ms = period.as_secs_f64() * 1e3, "synth worker started");
                synth.reset(config.sample_rate_f32());
                let mut buf = vec![0.0_f32; block_len];
                let mut next_at = Instant::now();
                loop {
                    synth.render(&mut buf);
                    match port.deliver_slice(&buf) {
                        Ok(Posted::Dropped) => {
                            tracing::info!("render side gone; synth worker exiting");
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => tracing::warn!(error = %e, "synth produced an unusable block"),
                    }

                    next_at += period;
                    let now = Instant::now();
                    let wait = if next_at > now {
                        next_at - now
                    } else {
                        tracing::debug!(late_us = (now - next_at).as_micros() as u64, "synth worker behind schedule");
                        next_at = now;
                        core::time::Duration::ZERO
                    };
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                port.collect_garbage();
                tracing::info!(delivered = port.delivered(), "synth worker stopped");
                port
            })
            .map_err(|e| Error::Worker(e.to_string()))?;

        Ok(Self { stop_tx: Some(stop_tx), handle: Some(handle) })
    }

    /// Stop the worker and get the port back, e.g. to post a shutdown.
    pub fn stop(mut self) -> Option<MessagePort> {
        self.join()
    }

    /// Stop the worker and tell the render callback to stop as well.
    pub fn shutdown(self) -> Result<()> {
        if let Some(mut port) = self.stop() {
            port.post(ControlMessage::Shutdown)?;
        }
        Ok(())
    }

    fn join(&mut self) -> Option<MessagePort> {
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.try_send(());
        }
        let handle = self.handle.take()?;
        match handle.join() {
            Ok(port) => Some(port),
            Err(_) => {
                tracing::error!("synth worker panicked");
                None
            }
        }
    }
}

impl Drop for SynthWorker {
    fn drop(&mut self) {
        self.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::port::session;
    use crate::synth::Looper;
    use std::time::Duration;

    #[test]
    fn worker_feeds_processor() {
        let cfg = RenderConfig::new(32, 8_000, 1).unwrap();
        let (port, mut proc_) = session(cfg).unwrap();
        let worker = SynthWorker::spawn(Looper::new(vec![0.25]), port, cfg, 4).unwrap();

        let mut ch = [0.0; 32];
        let mut heard = false;
        for _ in 0..200 {
            proc_.process(&mut [&mut ch[..]]);
            if ch.iter().all(|&s| s == 0.25) {
                heard = true;
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }
        assert!(heard, "worker never delivered");

        worker.shutdown().unwrap();
        assert!(!proc_.process(&mut [&mut ch[..]]));
    }

    #[test]
    fn worker_exits_when_render_side_is_gone() {
        let cfg = RenderConfig::new(16, 8_000, 1).unwrap();
        let (port, proc_) = session(cfg).unwrap();
        drop(proc_);
        let worker = SynthWorker::spawn(Looper::new(vec![0.1]), port, cfg, 1).unwrap();
        let port = worker.stop().expect("worker returns its port");
        assert!(!port.is_connected());
        assert_eq!(port.delivered(), 0);
    }
}
