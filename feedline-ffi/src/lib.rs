//! C ABI wrapper for the Feedline sample-delivery stage.
//!
//! Exposes a session as two opaque handles:
//! - `FeedlinePort`      : the synthesizer side (deliver blocks, request shutdown)
//! - `FeedlineProcessor` : the render side (fill interleaved output buffers)
//!
//! ABI notes
//! - All functions are `extern "C"` and `#[no_mangle]`.
//! - Both handles are heap-allocated; you own them and free each with its destroy function.
//! - Render path produces **mono** internally and duplicates to N channels.
//!
//! Threading
//! - Each handle is single-threaded, but the two may live on different threads:
//!   deliver from a worker thread, render from the audio thread.
//! - `feedline_render_interleaved_f32` never locks, allocates or logs.
//! - Destroying either handle while the other is still in use is safe; deliveries
//!   to a session whose processor is gone are dropped.

use feedline_engine::{session, ControlMessage, FixedQuantumAdapter, MessagePort, Posted, RenderConfig};

pub const FEEDLINE_OK: i32 = 0;
pub const FEEDLINE_ERR_NULL: i32 = -1;
pub const FEEDLINE_ERR_CONFIG: i32 = -2;
pub const FEEDLINE_ERR_BLOCK: i32 = -3;

/// Opaque synthesizer-side handle.
pub struct FeedlinePort {
    inner: MessagePort,
}

/// Opaque render-side handle.
pub struct FeedlineProcessor {
    inner: FixedQuantumAdapter,
}

// --- Creation / destruction -------------------------------------------------------

/// Create a session. On success writes both handles and returns `FEEDLINE_OK`.
///
/// `quantum_size` is the fixed number of frames per internal render call
/// (128 is conventional); `channels` is the interleave width `render` expects.
#[no_mangle]
pub extern "C" fn feedline_create(
    quantum_size: u32,
    sample_rate: u32,
    channels: u32,
    out_port: *mut *mut FeedlinePort,
    out_processor: *mut *mut FeedlineProcessor,
) -> i32 {
    if out_port.is_null() || out_processor.is_null() {
        return FEEDLINE_ERR_NULL;
    }
    let Ok(channels) = u16::try_from(channels) else { return FEEDLINE_ERR_CONFIG };
    let cfg = RenderConfig { quantum_size: quantum_size as usize, sample_rate, channels };
    let (port, processor) = match session(cfg) {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "feedline_create refused config");
            return FEEDLINE_ERR_CONFIG;
        }
    };
    let adapter = FixedQuantumAdapter::new(processor, usize::from(channels));
    unsafe {
        *out_port = Box::into_raw(Box::new(FeedlinePort { inner: port }));
        *out_processor = Box::into_raw(Box::new(FeedlineProcessor { inner: adapter }));
    }
    FEEDLINE_OK
}

/// Destroy a port returned by `feedline_create`.
#[no_mangle]
pub extern "C" fn feedline_port_destroy(port: *mut FeedlinePort) {
    if !port.is_null() {
        unsafe { drop(Box::from_raw(port)); }
    }
}

/// Destroy a processor returned by `feedline_create`.
#[no_mangle]
pub extern "C" fn feedline_processor_destroy(processor: *mut FeedlineProcessor) {
    if !processor.is_null() {
        unsafe { drop(Box::from_raw(processor)); }
    }
}

// --- Synthesizer side -------------------------------------------------------------

/// Copy `len` samples and make them the block the processor reads next.
///
/// Returns 1 if delivered, 0 if the processor is gone (dropped silently),
/// `FEEDLINE_ERR_BLOCK` for an empty block, `FEEDLINE_ERR_NULL` for null pointers.
/// NaN/inf samples are replaced with silence.
#[no_mangle]
pub extern "C" fn feedline_deliver(port: *mut FeedlinePort, samples: *const f32, len: usize) -> i32 {
    if port.is_null() || samples.is_null() {
        return FEEDLINE_ERR_NULL;
    }
    let p = unsafe { &mut *port };
    let src = unsafe { std::slice::from_raw_parts(samples, len) };
    match p.inner.deliver_slice(src) {
        Ok(Posted::Delivered) => 1,
        Ok(_) => 0,
        Err(_) => FEEDLINE_ERR_BLOCK,
    }
}

/// Make the processor render silence and report "stop" from now on.
#[no_mangle]
pub extern "C" fn feedline_shutdown(port: *mut FeedlinePort) -> i32 {
    if port.is_null() {
        return FEEDLINE_ERR_NULL;
    }
    let p = unsafe { &mut *port };
    match p.inner.post(ControlMessage::Shutdown) {
        Ok(_) => FEEDLINE_OK,
        Err(_) => FEEDLINE_ERR_BLOCK,
    }
}

// --- Render side ------------------------------------------------------------------

/// Render `frames` of audio into an interleaved f32 buffer with `channels` channels.
/// The internal quantum is mono; the sample is duplicated to all channels.
///
/// Returns 1 ("keep alive"), 0 once shut down (buffer is silence),
/// `FEEDLINE_ERR_CONFIG` if `channels` differs from the session's.
#[no_mangle]
pub extern "C" fn feedline_render_interleaved_f32(
    processor: *mut FeedlineProcessor,
    out_interleaved: *mut f32,
    frames: u32,
    channels: u32,
) -> i32 {
    if processor.is_null() || out_interleaved.is_null() {
        return FEEDLINE_ERR_NULL;
    }
    let p = unsafe { &mut *processor };
    if channels as usize != p.inner.channels() {
        return FEEDLINE_ERR_CONFIG;
    }
    let out = unsafe { std::slice::from_raw_parts_mut(out_interleaved, (frames as usize) * (channels as usize)) };
    i32::from(p.inner.render(out))
}

/// Frames per internal render quantum (0 for a null handle).
#[no_mangle]
pub extern "C" fn feedline_quantum_size(processor: *const FeedlineProcessor) -> u32 {
    if processor.is_null() {
        return 0;
    }
    let p = unsafe { &*processor };
    u32::try_from(p.inner.processor().quantum_size()).unwrap_or(u32::MAX)
}
