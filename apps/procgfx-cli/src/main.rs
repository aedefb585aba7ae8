use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use procgfx_content::{Generator, GeneratorConfig, ProceduralParameters};
use procgfx_frame::AcquireError;
use procgfx_render::{FaultPlan, HeadlessBackend, LoopExit, RendererConfig, RendererCore};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "procgfx-cli", about = "CLI tool for the procedural renderer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Generate procedural content and print its digest
    Generate {
        #[arg(short, long, default_value = "42")]
        seed: u64,
        /// Grid points per side
        #[arg(short, long, default_value = "128")]
        resolution: u32,
        #[arg(short, long, default_value = "4")]
        octaves: u32,
        /// Animation time to generate at
        #[arg(short, long, default_value = "0.0")]
        time: f32,
        /// Evolve this many extra steps of 1/60 s after the first buffer
        #[arg(long, default_value = "0")]
        steps: u32,
        /// Reuse the previous buffer's topology when regenerating
        #[arg(long)]
        incremental: bool,
    },
    /// Run the renderer on the headless backend
    Run {
        /// YAML renderer configuration
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Frames to present (overrides the config)
        #[arg(short, long)]
        frames: Option<u64>,
        /// Override the content seed
        #[arg(short, long)]
        seed: Option<u64>,
        /// Inject this many timed-out acquisitions
        #[arg(long, default_value = "0")]
        fail_acquire: usize,
        /// Print frame statistics as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the default configuration as YAML
    Config {
        /// Write to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("procgfx-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("common: {}", procgfx_common::crate_info());
            println!("content: {}", procgfx_content::crate_info());
            println!("device: {}", procgfx_device::crate_info());
            println!("resources: {}", procgfx_resources::crate_info());
            println!("frame: {}", procgfx_frame::crate_info());
            println!("render: {}", procgfx_render::crate_info());

            let backend = HeadlessBackend::new();
            let caps = backend.capabilities();
            println!(
                "headless: adapter={}, max_texture={}, max_buffer={}, formats={:?}",
                caps.adapter_name, caps.max_texture_dimension, caps.max_buffer_size, caps.formats
            );
        }
        Commands::Generate {
            seed,
            resolution,
            octaves,
            time,
            steps,
            incremental,
        } => {
            let mut params = ProceduralParameters::new(seed, resolution)
                .with_octaves(octaves)
                .with_time(time);
            let generator = Generator::new(GeneratorConfig { incremental });
            let mut content = generator
                .generate(&params, None)
                .context("generating content")?;
            for _ in 0..steps {
                params.evolve(1.0 / 60.0);
                content = generator
                    .generate(&params, Some(&content))
                    .context("regenerating content")?;
            }

            println!(
                "Generated: seed={seed}, resolution={}, vertices={}, indices={}, bytes={}",
                content.resolution(),
                content.vertices().len(),
                content.index_count(),
                content.byte_len()
            );
            println!(
                "Time: {:.4}, incremental={incremental}, shared indices={}",
                params.time(),
                !content.dirty().indices
            );
            println!("Digest: {}", content.digest());
        }
        Commands::Run {
            config,
            frames,
            seed,
            fail_acquire,
            json,
        } => {
            let mut config = match config {
                Some(path) => RendererConfig::from_yaml_file(&path)
                    .with_context(|| format!("loading {}", path.display()))?,
                None => RendererConfig::default(),
            };
            config.max_frames = frames.or(config.max_frames).or(Some(60));
            if let Some(seed) = seed {
                config.params.set_seed(seed);
            }

            let faults = FaultPlan::none().failing_acquires(AcquireError::Timeout, fail_acquire);
            let mut core = RendererCore::new(HeadlessBackend::with_faults(faults), config);

            let exit = if core.init_renderer() {
                core.render_loop()
            } else {
                LoopExit::NotRunning
            };
            let digest = core.content().map(|c| c.digest());
            let stats = core.stats();
            let error = core.last_error().map(|e| e.to_string());
            core.terminate_and_clean_up();

            if json {
                println!("{}", serde_json::to_string_pretty(&stats)?);
            } else {
                println!("Exit: {exit:?}");
                println!(
                    "Frames: presented={}, retries={}, reconfigures={}",
                    stats.presented, stats.acquire_retries, stats.surface_reconfigures
                );
                println!(
                    "Timing: avg={:.3}ms, min={:.3}ms, max={:.3}ms",
                    stats.avg_frame_ms, stats.min_frame_ms, stats.max_frame_ms
                );
                if let Some(digest) = digest {
                    println!("Digest: {digest}");
                }
            }

            if let Some(error) = error {
                anyhow::bail!("renderer stopped with an error: {error}");
            }
        }
        Commands::Config { output } => {
            let yaml = RendererConfig::default().to_yaml()?;
            match output {
                Some(path) => {
                    std::fs::write(&path, yaml)
                        .with_context(|| format!("writing {}", path.display()))?;
                    println!("Wrote {}", path.display());
                }
                None => print!("{yaml}"),
            }
        }
    }

    Ok(())
}
