//! frametrace: replay a Chrome trace file through the frame engine and report what it found.

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use frametrace::trace_file::load_trace_events;
use frametrace::{FrameConfig, FrameProcessor};

#[derive(Debug, Parser)]
#[command(name = "frametrace")]
#[command(about = "Reconstruct UI/raster frames from a Chrome trace file")]
#[command(version)]
struct Command {
    /// Chrome trace JSON file (event array or traceEvents object)
    trace: PathBuf,
    /// JSON config file; command line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Thread id of the UI thread
    #[arg(long)]
    cpu_tid: Option<i64>,
    /// Thread id of the raster thread
    #[arg(long)]
    gpu_tid: Option<i64>,
    /// Frame budget in milliseconds
    #[arg(long)]
    target_frame_ms: Option<f64>,
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Default)]
struct Summary {
    frames: usize,
    slow_cpu: usize,
    slow_gpu: usize,
    cpu_ms: f64,
    gpu_ms: f64,
}

impl Summary {
    fn average(total: f64, count: usize) -> f64 {
        if count == 0 {
            0.0
        } else {
            total / count as f64
        }
    }
}

fn build_config(opts: &Command) -> Result<FrameConfig> {
    let mut config = match &opts.config {
        Some(path) => FrameConfig::load(path)?,
        None => FrameConfig::default(),
    };
    if opts.cpu_tid.is_some() {
        config.cpu_thread_id = opts.cpu_tid;
    }
    if opts.gpu_tid.is_some() {
        config.gpu_thread_id = opts.gpu_tid;
    }
    if let Some(ms) = opts.target_frame_ms {
        if ms <= 0.0 {
            bail!("--target-frame-ms must be positive, got {ms}");
        }
        config.target_frame_time_ms = ms;
    }
    config.debug |= opts.verbose;
    Ok(config)
}

fn main() -> Result<()> {
    let opts = Command::parse();

    let filter = if opts.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = build_config(&opts)?;
    let trace = load_trace_events(&opts.trace)?;
    if trace.skipped > 0 {
        tracing::warn!("skipped {} undecodable events", trace.skipped);
    }

    let mut processor = FrameProcessor::new(config);
    let frames = processor.subscribe();
    processor.process_events(&trace.events)?;

    let mut summary = Summary::default();
    for frame in frames.try_iter() {
        summary.frames += 1;
        summary.cpu_ms += frame.cpu_duration_ms().unwrap_or_default();
        summary.gpu_ms += frame.gpu_duration_ms().unwrap_or_default();
        if frame.is_cpu_slow() {
            summary.slow_cpu += 1;
        }
        if frame.is_gpu_slow() {
            summary.slow_gpu += 1;
        }
    }

    tracing::info!(
        "{} events, {} frames ({} slow ui, {} slow raster)",
        trace.events.len(),
        summary.frames,
        summary.slow_cpu,
        summary.slow_gpu
    );
    tracing::info!(
        "average ui {:.3}ms, average raster {:.3}ms",
        Summary::average(summary.cpu_ms, summary.frames),
        Summary::average(summary.gpu_ms, summary.frames)
    );
    if processor.pending_frame_count() > 0 || processor.unmatched_flow_count() > 0 {
        tracing::warn!(
            "{} frame(s) never completed, {} flow root(s) never matched",
            processor.pending_frame_count(),
            processor.unmatched_flow_count()
        );
    }

    Ok(())
}
