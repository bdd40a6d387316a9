//! cpal output stream around a [`FixedQuantumAdapter`].
//!
//! The stream callback renders f32 into a scratch buffer allocated when the
//! stream is built, a chunk at a time, then converts to the device sample
//! format. Backend requests larger than the scratch are served in several
//! chunks; the callback never allocates.

use cpal::traits::DeviceTrait;

use crate::host::FixedQuantumAdapter;

/// Minimum scratch size in frames. A fixed backend buffer size larger than
/// this sizes the scratch instead.
const SCRATCH_FRAMES: usize = 4096;

/// Build (but don't start) an output stream that pulls from `adapter`.
///
/// `cfg.channels` must match the adapter's interleave width.
pub fn build_output_stream<T>(
    device: &cpal::Device,
    cfg: &cpal::StreamConfig,
    mut adapter: FixedQuantumAdapter,
    err_fn: impl FnMut(cpal::StreamError) + Send + 'static,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample + cpal::FromSample<f32> + Send + 'static,
{
    let channels = usize::from(cfg.channels).max(1);
    let frames = match cfg.buffer_size {
        cpal::BufferSize::Fixed(n) => SCRATCH_FRAMES.max(n as usize),
        cpal::BufferSize::Default => SCRATCH_FRAMES,
    };
    let mut scratch = vec![0.0_f32; frames * channels];

    device.build_output_stream(
        cfg,
        move |output: &mut [T], _| {
            // The "stop" flag has no meaning for a device stream; the owner
            // tears the stream down.
            let _alive = fill_from_adapter(&mut adapter, &mut scratch, output);
        },
        err_fn,
        None,
    )
}

/// Render `output.len()` interleaved samples through `scratch`, converting
/// each chunk to `T`. Returns the adapter's keep-alive flag.
///
/// `scratch` should hold a whole number of frames.
pub(crate) fn fill_from_adapter<T>(
    adapter: &mut FixedQuantumAdapter,
    scratch: &mut [f32],
    output: &mut [T],
) -> bool
where
    T: cpal::Sample + cpal::FromSample<f32>,
{
    let mut alive = true;
    if scratch.is_empty() {
        return alive;
    }
    for chunk in output.chunks_mut(scratch.len()) {
        let buf = &mut scratch[..chunk.len()];
        alive = adapter.render(buf);
        for (dst, &src) in chunk.iter_mut().zip(buf.iter()) {
            *dst = T::from_sample(src);
        }
    }
    alive
}
