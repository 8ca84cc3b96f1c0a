//! `sapf` command line: play, render, check, and list built-ins.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use ringbuf::traits::Consumer;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sapf::audio::{AudioSink, CpalSink, OfflineSink};
use sapf::dsl::{Compiler, BUILTINS};
use sapf::{EngineConfig, Renderer};

#[derive(Parser)]
#[command(name = "sapf")]
#[command(about = "Play SAPF audio expressions", long_about = None)]
struct Cli {
    /// Config file (default: ~/.sapf/config.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Seed for noise and random nodes (overrides config)
    #[arg(long, global = true)]
    seed: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play an expression on the default output device
    Play {
        /// Expression source (omit when using --file)
        expr: Option<String>,

        /// Read the expression from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Stop after this many seconds (default: until Ctrl-C)
        #[arg(short, long)]
        seconds: Option<f64>,

        /// Master volume 0.0-1.0 (overrides config)
        #[arg(short, long)]
        volume: Option<f32>,

        /// Print the output peak level while playing
        #[arg(long)]
        meter: bool,
    },

    /// Render an expression to a 16-bit WAV file
    Render {
        expr: String,

        #[arg(short, long)]
        out: PathBuf,

        #[arg(short, long, default_value = "5.0")]
        seconds: f64,

        #[arg(short = 'r', long)]
        sample_rate: Option<u32>,
    },

    /// Compile an expression and print its signal graph
    Check { expr: String },

    /// List the built-in functions
    Builtins,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => EngineConfig::load_from(path)?,
        None => EngineConfig::load().unwrap_or_default(),
    };
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    match cli.command {
        Commands::Play {
            expr,
            file,
            seconds,
            volume,
            meter,
        } => {
            let source = match (expr, file) {
                (_, Some(path)) => std::fs::read_to_string(path)?,
                (Some(expr), None) => expr,
                (None, None) => return Err("provide an expression or --file".into()),
            };
            if let Some(v) = volume {
                config.master_volume = v;
            }
            play(&source, &config, seconds, meter)
        }
        Commands::Render {
            expr,
            out,
            seconds,
            sample_rate,
        } => render(&expr, &config, &out, seconds, sample_rate.or(config.sample_rate).unwrap_or(44100)),
        Commands::Check { expr } => {
            let sample_rate = config.sample_rate.unwrap_or(44100) as f64;
            let compiler = Compiler::new(sample_rate)
                .with_seed(config.seed)
                .with_max_delay(config.max_delay_seconds);
            match compiler.compile(&expr) {
                Ok(graph) => {
                    print!("{graph}");
                    println!("{} nodes, {} evaluated per tick", graph.len(), graph.plan().len());
                    Ok(())
                }
                Err(e) => Err(e.describe(&expr).into()),
            }
        }
        Commands::Builtins => {
            for b in BUILTINS {
                println!("{:<12} {:<7} {:<28} {}", b.name, b.category.name(), b.usage, b.doc);
            }
            Ok(())
        }
    }
}

fn play(
    source: &str,
    config: &EngineConfig,
    seconds: Option<f64>,
    meter: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sink = CpalSink::with_config(config.sample_rate, config.channels)?;
    println!("audio: {} Hz, {} ch", sink.sample_rate(), sink.channels());

    let mut renderer = Renderer::with_sink(&mut sink, config)?;
    let mut scope = renderer.scope();

    if let Err(e) = renderer.run(source) {
        return Err(match e {
            sapf::RunError::Pipeline(p) => p.describe(source).into(),
            other => other.into(),
        });
    }

    let running = Arc::new(AtomicBool::new(true));
    let r = running.clone();
    ctrlc::set_handler(move || r.store(false, Ordering::SeqCst))?;

    let started = Instant::now();
    let deadline = seconds.map(Duration::from_secs_f64);
    while running.load(Ordering::SeqCst) {
        if deadline.is_some_and(|d| started.elapsed() >= d) {
            break;
        }
        thread::sleep(Duration::from_millis(100));
        renderer.reclaim();

        if meter {
            if let Some(scope) = scope.as_mut() {
                let peak = scope.pop_iter().fold(0.0f32, |m, s| m.max(s.abs()));
                println!("peak {:>6.3} {}", peak, "#".repeat((peak * 40.0) as usize));
            }
        } else if let Some(scope) = scope.as_mut() {
            scope.clear();
        }
    }

    renderer.stop()?;
    // Let the stop reach the audio thread before the stream is paused.
    thread::sleep(Duration::from_millis(50));
    sink.pause()?;
    renderer.reclaim();
    info!("done");
    Ok(())
}

fn render(
    source: &str,
    config: &EngineConfig,
    out: &Path,
    seconds: f64,
    sample_rate: u32,
) -> Result<(), Box<dyn std::error::Error>> {
    let channels = config.channels.unwrap_or(1);
    let mut sink = OfflineSink::new(sample_rate, channels);
    let mut renderer = Renderer::with_sink(&mut sink, config)?;
    if let Err(e) = renderer.run(source) {
        return Err(match e {
            sapf::RunError::Pipeline(p) => p.describe(source).into(),
            other => other.into(),
        });
    }

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = hound::WavWriter::create(out, spec)?;

    let total_frames = (seconds.max(0.0) * sample_rate as f64) as usize;
    let block = config.block_size.max(1);
    let mut written = 0;
    while written < total_frames {
        let frames = block.min(total_frames - written);
        for s in sink.request_block(frames) {
            writer.write_sample((s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)?;
        }
        written += frames;
    }
    writer.finalize()?;

    renderer.stop()?;
    info!(frames = written, path = %out.display(), "rendered");
    Ok(())
}
