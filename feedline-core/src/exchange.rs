//! Single-writer / single-reader hand-off of the latest [`SampleBlock`].
//!
//! ```text
//!   writer thread                           audio thread
//!   ─────────────                           ────────────
//!   deliver(block) ──► pending (AtomicPtr) ──► take_quantum(out)
//!        ▲                                        │
//!        └──── collect_garbage() ◄── retired (rtrb SPSC) ◄┘
//! ```
//!
//! - `deliver` swaps a freshly boxed block into the `pending` slot. A block
//!   still sitting there was never seen by the reader, so the writer frees it.
//! - `take_quantum` swaps `pending` out (if any), makes it current with the
//!   cursor at 0, and pushes the previous current block onto the retired
//!   queue. The reader never allocates or frees.
//! - A quantum is always copied from exactly one block; a new block only
//!   becomes visible between two `take_quantum` calls.

use core::ptr;
use core::sync::atomic::{AtomicBool, AtomicPtr, Ordering};
use std::sync::Arc;

use rtrb::{Consumer, Producer, RingBuffer};

use crate::block::SampleBlock;
use crate::dsp::{copy_padded, fill_silence};

/// Retired blocks in flight back to the writer. The reader retires at most one
/// block per pickup and the writer drains on every delivery, so a handful of
/// slots is plenty.
const RETIRED_CAPACITY: usize = 8;

struct Shared {
    pending: AtomicPtr<SampleBlock>,
    shutdown: AtomicBool,
    reader_alive: AtomicBool,
}

impl Drop for Shared {
    fn drop(&mut self) {
        let p = self.pending.swap(ptr::null_mut(), Ordering::AcqRel);
        if !p.is_null() {
            // SAFETY: non-null pending pointers always come from `Box::into_raw`
            // in `deliver`, and we are the last owner of the slot.
            drop(unsafe { Box::from_raw(p) });
        }
    }
}

/// Create a connected writer/reader pair with an empty exchange.
pub fn exchange() -> (BlockWriter, BlockReader) {
    let shared = Arc::new(Shared {
        pending: AtomicPtr::new(ptr::null_mut()),
        shutdown: AtomicBool::new(false),
        reader_alive: AtomicBool::new(true),
    });
    let (retire_tx, retire_rx) = RingBuffer::new(RETIRED_CAPACITY);
    (
        BlockWriter { shared: Arc::clone(&shared), retired: retire_rx },
        BlockReader { shared, retired: retire_tx, current: None, cursor: 0 },
    )
}

/// Producer half. Lives wherever blocks are synthesized; may allocate and block.
pub struct BlockWriter {
    shared: Arc<Shared>,
    retired: Consumer<Box<SampleBlock>>,
}

impl BlockWriter {
    /// Replace whatever the reader will see next with `block`.
    ///
    /// Returns `false` if the reader has been torn down; the block is then
    /// dropped and nothing else happens.
    pub fn deliver(&mut self, block: SampleBlock) -> bool {
        self.collect_garbage();
        if !self.shared.reader_alive.load(Ordering::Acquire) {
            return false;
        }
        let new = Box::into_raw(Box::new(block));
        let old = self.shared.pending.swap(new, Ordering::AcqRel);
        if !old.is_null() {
            // SAFETY: the reader takes `pending` with a swap as well, so a
            // pointer we swapped out was never observed by it.
            drop(unsafe { Box::from_raw(old) });
        }
        true
    }

    /// Ask the render side to stop. Sticky.
    pub fn shutdown(&self) {
        self.shared.shutdown.store(true, Ordering::Release);
    }

    /// Free blocks the reader has finished with. Returns how many were freed.
    pub fn collect_garbage(&mut self) -> usize {
        let mut freed = 0;
        while let Ok(block) = self.retired.pop() {
            drop(block);
            freed += 1;
        }
        freed
    }

    /// `true` while the reader half still exists.
    pub fn is_connected(&self) -> bool {
        self.shared.reader_alive.load(Ordering::Acquire)
    }
}

/// Consumer half. Lives on the audio thread; every method is wait-free.
pub struct BlockReader {
    shared: Arc<Shared>,
    retired: Producer<Box<SampleBlock>>,
    current: Option<Box<SampleBlock>>,
    cursor: usize,
}

impl BlockReader {
    /// Fill `out` with the next `out.len()` samples of the current block and
    /// advance the cursor. Missing samples are zero. Returns how many samples
    /// came from the block.
    pub fn take_quantum(&mut self, out: &mut [f32]) -> usize {
        self.pick_up();
        let Some(block) = self.current.as_deref() else {
            fill_silence(out);
            return 0;
        };
        let rest = &block.as_slice()[self.cursor..];
        let n = copy_padded(out, rest);
        self.cursor += n;
        n
    }

    /// Unconsumed samples in the current block (a pending block is not counted).
    #[inline]
    pub fn available(&self) -> usize {
        self.current.as_deref().map_or(0, |b| b.len() - self.cursor)
    }

    #[inline]
    pub fn is_shutdown(&self) -> bool {
        self.shared.shutdown.load(Ordering::Acquire)
    }

    fn pick_up(&mut self) {
        let p = self.shared.pending.swap(ptr::null_mut(), Ordering::AcqRel);
        if p.is_null() {
            return;
        }
        // SAFETY: produced by `Box::into_raw` in `deliver`; the swap made us
        // the only owner.
        let fresh = unsafe { Box::from_raw(p) };
        if let Some(old) = self.current.replace(fresh) {
            if let Err(rtrb::PushError::Full(old)) = self.retired.push(old) {
                // Only reachable if the writer stopped draining; never free here.
                core::mem::forget(old);
            }
        }
        self.cursor = 0;
    }
}

impl Drop for BlockReader {
    fn drop(&mut self) {
        self.shared.reader_alive.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn block(v: &[f32]) -> SampleBlock {
        SampleBlock::from_slice(v).unwrap()
    }

    #[test]
    fn never_delivered_yields_silence() {
        let (_w, mut r) = exchange();
        let mut q = [1.0; 128];
        assert_eq!(r.take_quantum(&mut q), 0);
        assert!(q.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn consecutive_quanta_walk_the_block_then_pad() {
        let (mut w, mut r) = exchange();
        let src: Vec<f32> = (1..=10).map(|i| i as f32 / 10.0).collect();
        assert!(w.deliver(block(&src)));

        let mut q = [0.0; 4];
        assert_eq!(r.take_quantum(&mut q), 4);
        assert_eq!(q, [0.1, 0.2, 0.3, 0.4]);
        assert_eq!(r.take_quantum(&mut q), 4);
        assert_eq!(q, [0.5, 0.6, 0.7, 0.8]);
        assert_eq!(r.take_quantum(&mut q), 2);
        assert_eq!(q, [0.9, 1.0, 0.0, 0.0]);
        assert_eq!(r.take_quantum(&mut q), 0);
        assert_eq!(q, [0.0; 4]);
    }

    #[test]
    fn block_longer_than_quantum_is_reproduced_in_order() {
        let (mut w, mut r) = exchange();
        let n = 16;
        let src: Vec<f32> = (0..100).map(|i| (i as f32) * 0.01).collect();
        w.deliver(block(&src));

        let mut got = Vec::new();
        let mut q = vec![0.0; n];
        for _ in 0..n {
            r.take_quantum(&mut q);
            got.extend_from_slice(&q);
        }
        assert_eq!(&got[..src.len()], &src[..]);
        assert!(got[src.len()..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn second_delivery_supersedes_first() {
        let (mut w, mut r) = exchange();
        w.deliver(block(&[1.0; 8]));
        w.deliver(block(&[2.0; 3]));
        let mut q = [0.0; 4];
        r.take_quantum(&mut q);
        assert_eq!(q, [2.0, 2.0, 2.0, 0.0]);
        r.take_quantum(&mut q);
        assert_eq!(q, [0.0; 4]);
    }

    #[test]
    fn delivery_discards_unconsumed_tail() {
        let (mut w, mut r) = exchange();
        w.deliver(block(&[1.0; 8]));
        let mut q = [0.0; 4];
        r.take_quantum(&mut q);
        assert_eq!(r.available(), 4);
        w.deliver(block(&[3.0; 4]));
        r.take_quantum(&mut q);
        assert_eq!(q, [3.0; 4]);
        assert_eq!(r.available(), 0);
    }

    #[test]
    fn quantum_length_never_changes() {
        let (mut w, mut r) = exchange();
        for n in [1usize, 3, 128, 1000] {
            let mut q = vec![7.0; n];
            assert!(r.take_quantum(&mut q) <= n);
            assert_eq!(q.len(), n);
        }
        w.deliver(block(&[0.5; 5]));
        let mut q = vec![7.0; 128];
        assert_eq!(r.take_quantum(&mut q), 5);
        assert_eq!(q.len(), 128);
        assert!(q[5..].iter().all(|&s| s == 0.0));
    }

    #[test]
    fn retired_blocks_return_to_writer() {
        let (mut w, mut r) = exchange();
        let mut q = [0.0; 2];
        w.deliver(block(&[1.0]));
        r.take_quantum(&mut q);
        w.deliver(block(&[2.0]));
        r.take_quantum(&mut q);
        assert_eq!(w.collect_garbage(), 1);
        assert_eq!(w.collect_garbage(), 0);
    }

    #[test]
    fn delivery_after_reader_teardown_is_a_no_op() {
        let (mut w, r) = exchange();
        assert!(w.is_connected());
        drop(r);
        assert!(!w.is_connected());
        assert!(!w.deliver(block(&[1.0, 2.0])));
    }

    #[test]
    fn writer_teardown_with_pending_block_is_safe() {
        let (mut w, mut r) = exchange();
        w.deliver(block(&[0.25; 4]));
        drop(w);
        let mut q = [0.0; 4];
        assert_eq!(r.take_quantum(&mut q), 4);
        assert_eq!(q, [0.25; 4]);
    }

    #[test]
    fn pending_block_is_freed_whichever_half_drops_last() {
        let (mut w, r) = exchange();
        assert!(w.deliver(block(&[0.5; 64])));
        drop(r);
        drop(w);

        let (mut w, r) = exchange();
        assert!(w.deliver(block(&[0.5; 64])));
        drop(w);
        drop(r);
    }

    #[test]
    fn reader_teardown_while_writer_is_delivering() {
        const ROUNDS: usize = 200;
        const QUANTA: usize = 50;
        for _ in 0..ROUNDS {
            let (mut w, mut r) = exchange();
            let writer = thread::spawn(move || {
                let mut delivered = 0_usize;
                let mut len = 1;
                while w.deliver(SampleBlock::new(vec![0.5; len]).unwrap()) {
                    delivered += 1;
                    len = len % 40 + 1;
                }
                assert!(!w.is_connected());
                (w, delivered)
            });

            let mut q = [0.0_f32; 16];
            for _ in 0..QUANTA {
                let n = r.take_quantum(&mut q);
                assert!(q[..n].iter().all(|&s| s == 0.5));
                assert!(q[n..].iter().all(|&s| s == 0.0));
            }
            drop(r);

            let (mut w, _delivered) = writer.join().unwrap();
            assert!(!w.deliver(block(&[1.0])));
            w.collect_garbage();
        }
    }

    #[test]
    fn shutdown_flag_is_visible_to_reader() {
        let (w, r) = exchange();
        assert!(!r.is_shutdown());
        w.shutdown();
        assert!(r.is_shutdown());
    }

    #[test]
    fn concurrent_stress_never_tears_a_block() {
        const ITERATIONS: usize = 10_000;
        const N: usize = 32;
        let (mut w, mut r) = exchange();

        let writer = thread::spawn(move || {
            for id in 1..=ITERATIONS {
                // Every sample carries the block id; lengths vary so quanta
                // regularly run off the end into padding.
                let len = 1 + (id * 7) % (3 * N);
                w.deliver(SampleBlock::new(vec![id as f32; len]).unwrap());
                if id % 64 == 0 {
                    thread::yield_now();
                }
            }
            w
        });

        let mut q = [0.0_f32; N];
        let mut last_id = 0.0_f32;
        for _ in 0..ITERATIONS {
            let n = r.take_quantum(&mut q);
            let (head, tail) = q.split_at(n);
            assert!(tail.iter().all(|&s| s == 0.0), "padding must be silence");
            if let Some(&id) = head.first() {
                assert!(head.iter().all(|&s| s == id), "torn quantum: {head:?}");
                assert!(id >= last_id, "blocks observed out of order");
                last_id = id;
            }
        }

        let mut w = writer.join().unwrap();
        w.collect_garbage();
    }
}
