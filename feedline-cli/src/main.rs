//! Feedline CLI — plays a synthesizer through the lock-free sample exchange.
//!
//! A background worker renders blocks and posts them to the exchange; the
//! cpal callback drives the fixed-quantum render callback. A once-per-second
//! meter reports peak level and starved quanta.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use feedline_engine::output::build_output_stream;
use feedline_engine::sfx::{sfx_bank, Sfx};
use feedline_engine::{
    session, ControlMessage, Drone, FixedQuantumAdapter, MessagePort, NoteSender, RenderConfig,
    RenderStats, SynthWorker, ToneSynth, Waveform,
};
use tracing_subscriber::EnvFilter;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// One endless tone.
    Drone,
    /// Cycle through the sound-effect bank.
    Sfx,
}

#[derive(Debug, Parser)]
#[command(name = "feedline", version, about = "Real-time sample-delivery player")]
struct Args {
    /// List output devices and exit.
    #[arg(long)]
    list_devices: bool,
    /// Output device name (default device otherwise).
    #[arg(long)]
    device: Option<String>,
    /// JSON RenderConfig file; flags below override its fields.
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    sample_rate: Option<u32>,
    #[arg(long)]
    channels: Option<u16>,
    /// Frames per render quantum.
    #[arg(long)]
    quantum: Option<usize>,
    /// Quanta per delivered block.
    #[arg(long, default_value_t = 8)]
    block_quanta: usize,
    #[arg(long, value_enum, default_value_t = Mode::Drone)]
    mode: Mode,
    #[arg(long, default_value = "triangle")]
    waveform: Waveform,
    #[arg(long, default_value_t = 220.0)]
    freq: f32,
    #[arg(long, default_value_t = 0.35)]
    gain: f32,
    /// Stop after this many seconds.
    #[arg(long)]
    duration: Option<u64>,
    /// Post the ControlMessage in this JSON file once instead of running a synth.
    #[arg(long)]
    message: Option<PathBuf>,
}

fn list_output_devices() -> Result<()> {
    let host = cpal::default_host();
    println!("Available output devices:");
    for dev in host.output_devices()? {
        println!("- {}", dev.name()?);
    }
    Ok(())
}

fn pick_device(name: Option<&str>) -> Result<cpal::Device> {
    let host = cpal::default_host();
    if let Some(name) = name {
        for d in host.output_devices()? {
            if d.name()? == name {
                return Ok(d);
            }
        }
        bail!("requested device not found: {name}");
    }
    host.default_output_device().context("no default output device")
}

fn choose_config(
    device: &cpal::Device,
    req_sr: Option<u32>,
    req_ch: Option<u16>,
) -> Result<cpal::SupportedStreamConfig> {
    if req_sr.is_none() && req_ch.is_none() {
        return Ok(device.default_output_config()?);
    }

    // Closest range: sample rate mismatch dominates channel mismatch.
    let mut best: Option<(u64, cpal::SupportedStreamConfigRange)> = None;
    for range in device.supported_output_configs()? {
        let ch = range.channels();
        let sr_min = range.min_sample_rate().0;
        let sr_max = range.max_sample_rate().0;

        let ch_pen = req_ch.map_or(0, |c| u64::from(ch.abs_diff(c)));
        let sr_pen = req_sr.map_or(0, |sr| {
            if (sr_min..=sr_max).contains(&sr) { 0 } else { u64::from(sr_min.abs_diff(sr).min(sr_max.abs_diff(sr))) }
        });

        let score = sr_pen.saturating_mul(1000) + ch_pen;
        if best.as_ref().map_or(true, |(s, _)| score < *s) {
            best = Some((score, range));
        }
    }

    let (_, range) = best.context("no supported output configs")?;
    let pick_sr = match req_sr {
        Some(sr) => cpal::SampleRate(sr.clamp(range.min_sample_rate().0, range.max_sample_rate().0)),
        None => range.max_sample_rate(),
    };
    Ok(range.with_sample_rate(pick_sr))
}

fn load_render_config(path: Option<&Path>) -> Result<RenderConfig> {
    let Some(path) = path else { return Ok(RenderConfig::default()) };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
}

fn load_message(path: &Path) -> Result<ControlMessage> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading message {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing message {}", path.display()))
}

/// Whatever keeps the exchange supplied for the lifetime of the stream.
enum Producer {
    Worker(SynthWorker, Option<NoteSender>),
    OneShot(MessagePort),
}

impl Producer {
    fn shutdown(self) -> Result<()> {
        match self {
            Producer::Worker(worker, _) => worker.shutdown()?,
            Producer::OneShot(mut port) => {
                port.post(ControlMessage::Shutdown)?;
            }
        }
        Ok(())
    }
}

fn start_producer(args: &Args, port: MessagePort, cfg: RenderConfig) -> Result<Producer> {
    if let Some(path) = &args.message {
        let mut port = port;
        let posted = port.post(load_message(path)?)?;
        tracing::info!(?posted, file = %path.display(), "posted one-shot message");
        return Ok(Producer::OneShot(port));
    }
    match args.mode {
        Mode::Drone => {
            let synth = Drone::new(args.freq, args.waveform, 0.8);
            Ok(Producer::Worker(SynthWorker::spawn(synth, port, cfg, args.block_quanta)?, None))
        }
        Mode::Sfx => {
            let (synth, notes) = ToneSynth::new(sfx_bank());
            Ok(Producer::Worker(SynthWorker::spawn(synth, port, cfg, args.block_quanta)?, Some(notes)))
        }
    }
}

fn meter(stats: &Arc<RenderStats>, last_starved: &mut u64) {
    let snap = stats.snapshot();
    let starved = snap.starved - *last_starved;
    *last_starved = snap.starved;
    if starved > 0 {
        tracing::warn!(peak = format_args!("{:.3}", snap.peak), quanta = snap.quanta, starved, "meter");
    } else {
        tracing::info!(peak = format_args!("{:.3}", snap.peak), quanta = snap.quanta, "meter");
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    if args.list_devices {
        return list_output_devices();
    }

    let mut render_cfg = load_render_config(args.config.as_deref())?;
    if let Some(q) = args.quantum { render_cfg.quantum_size = q; }
    let req_sr = args.sample_rate.or(args.config.as_ref().map(|_| render_cfg.sample_rate));
    let req_ch = args.channels.or(args.config.as_ref().map(|_| render_cfg.channels));

    let device = pick_device(args.device.as_deref())?;
    let sup_cfg = choose_config(&device, req_sr, req_ch)?;
    let sample_format = sup_cfg.sample_format();
    let stream_cfg = sup_cfg.config();

    // The device has the final word on rate and channel count.
    render_cfg.sample_rate = stream_cfg.sample_rate.0;
    render_cfg.channels = stream_cfg.channels;
    render_cfg.validate()?;

    let (port, mut processor) = session(render_cfg)?;
    processor.set_gain(args.gain);
    let stats = Arc::clone(processor.stats());
    let adapter = FixedQuantumAdapter::new(processor, usize::from(render_cfg.channels));

    tracing::info!(device = %device.name()?, ?sample_format, ?render_cfg, "output configured");

    let producer = start_producer(&args, port, render_cfg)?;

    let err_fn = |e: cpal::StreamError| tracing::error!(error = %e, "stream error");
    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_output_stream::<f32>(&device, &stream_cfg, adapter, err_fn)?,
        cpal::SampleFormat::I16 => build_output_stream::<i16>(&device, &stream_cfg, adapter, err_fn)?,
        cpal::SampleFormat::U16 => build_output_stream::<u16>(&device, &stream_cfg, adapter, err_fn)?,
        other => bail!("unsupported device sample format: {other:?}"),
    };
    stream.play()?;

    match args.duration {
        Some(d) => tracing::info!("auto-stop after {d} seconds"),
        None => tracing::info!("press Ctrl+C to stop"),
    }

    let started = Instant::now();
    let deadline = args.duration.map(Duration::from_secs);
    let mut last_starved = 0;
    let mut next_fx = Sfx::ALL.iter().copied().cycle();
    loop {
        std::thread::sleep(Duration::from_secs(1));
        meter(&stats, &mut last_starved);

        if let Producer::Worker(_, Some(notes)) = &producer {
            if let Some(fx) = next_fx.next() {
                tracing::debug!(?fx, "trigger");
                notes.play(fx.note());
            }
        }
        if stats.snapshot().stopped {
            tracing::info!("render callback stopped");
            break;
        }
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
    }

    producer.shutdown()?;
    // Let the callback observe the shutdown before the stream goes away.
    std::thread::sleep(render_cfg.quantum_period() * 4);
    drop(stream);
    Ok(())
}
