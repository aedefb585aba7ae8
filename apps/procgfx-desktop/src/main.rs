use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use procgfx_common::Extent2d;
use procgfx_content::MAX_RESOLUTION;
use procgfx_frame::FrameOutcome;
use procgfx_render::{RendererConfig, RendererCore};
use procgfx_render_wgpu::WgpuBackend;
use tracing_subscriber::EnvFilter;
use winit::application::ApplicationHandler;
use winit::dpi::PhysicalSize;
use winit::event::{ElementState, KeyEvent, WindowEvent};
use winit::event_loop::{ActiveEventLoop, ControlFlow, EventLoop};
use winit::keyboard::{KeyCode, PhysicalKey};
use winit::window::{Window, WindowId};

#[derive(Parser)]
#[command(name = "procgfx-desktop", about = "Procedural heightfield viewer")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// YAML renderer configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the content seed
    #[arg(short, long)]
    seed: Option<u64>,
}

struct ViewerApp {
    config: RendererConfig,
    window: Option<Arc<Window>>,
    core: Option<RendererCore<WgpuBackend>>,
    paused_speed: Option<f32>,
}

impl ViewerApp {
    fn new(config: RendererConfig) -> Self {
        Self {
            config,
            window: None,
            core: None,
            paused_speed: None,
        }
    }

    fn start(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let extent = self.config.device.surface.extent;
        let attrs = Window::default_attributes()
            .with_title("procgfx")
            .with_inner_size(PhysicalSize::new(extent.width, extent.height));
        let window = Arc::new(event_loop.create_window(attrs)?);

        let size = window.inner_size();
        let mut config = self.config.clone();
        config.device.surface.extent = Extent2d::new(size.width, size.height);

        let backend = WgpuBackend::new(window.clone())?;
        let mut core = RendererCore::new(backend, config);
        let initialized = core.init_renderer();
        let error = core.last_error().map(|e| e.to_string());
        self.window = Some(window);
        self.core = Some(core);
        if !initialized {
            anyhow::bail!(
                "renderer initialization failed: {}",
                error.unwrap_or_default()
            );
        }
        Ok(())
    }

    fn handle_key(&mut self, event_loop: &ActiveEventLoop, key: KeyCode) {
        if key == KeyCode::Escape {
            event_loop.exit();
            return;
        }
        let Some(params) = self.core.as_mut().and_then(|core| core.params_mut()) else {
            return;
        };
        match key {
            KeyCode::Space => match self.paused_speed.take() {
                Some(speed) => params.set_speed(speed),
                None => {
                    self.paused_speed = Some(params.speed());
                    params.set_speed(0.0);
                }
            },
            KeyCode::KeyR => {
                let seed = params.seed().wrapping_add(1);
                params.set_seed(seed);
                tracing::info!(seed, "reseeded");
            }
            KeyCode::ArrowUp => {
                let resolution = (params.resolution() * 2).min(MAX_RESOLUTION);
                params.set_resolution(resolution);
                tracing::info!(resolution, "resolution changed");
            }
            KeyCode::ArrowDown => {
                let resolution = (params.resolution() / 2).max(2);
                params.set_resolution(resolution);
                tracing::info!(resolution, "resolution changed");
            }
            _ => {}
        }
    }
}

impl ApplicationHandler for ViewerApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.window.is_some() {
            return;
        }
        if let Err(e) = self.start(event_loop) {
            tracing::error!("{e:#}");
            event_loop.exit();
            return;
        }
        tracing::info!("viewer ready: Space pause, R reseed, Up/Down resolution, Esc quit");
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: WindowId,
        event: WindowEvent,
    ) {
        match event {
            WindowEvent::CloseRequested => {
                if let Some(core) = &self.core {
                    core.stop_handle().request_stop();
                }
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(core) = &mut self.core {
                    if let Err(e) = core.resize(Extent2d::new(size.width, size.height)) {
                        tracing::error!("resize failed: {e}");
                        event_loop.exit();
                    }
                }
            }
            WindowEvent::KeyboardInput {
                event:
                    KeyEvent {
                        physical_key: PhysicalKey::Code(key),
                        state: ElementState::Pressed,
                        ..
                    },
                ..
            } => self.handle_key(event_loop, key),
            WindowEvent::RedrawRequested => {
                let Some(core) = &mut self.core else {
                    return;
                };
                match core.render_frame() {
                    Ok(FrameOutcome::Stopped) => event_loop.exit(),
                    Ok(_) => {}
                    Err(e) => {
                        tracing::error!("frame failed: {e}");
                        event_loop.exit();
                    }
                }
            }
            _ => {}
        }
    }

    fn about_to_wait(&mut self, _event_loop: &ActiveEventLoop) {
        if let Some(window) = &self.window {
            window.request_redraw();
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let mut config = match &cli.config {
        Some(path) => RendererConfig::from_yaml_file(path)?,
        None => RendererConfig::default(),
    };
    if let Some(seed) = cli.seed {
        config.params.set_seed(seed);
    }

    tracing::info!("procgfx-desktop starting");

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = ViewerApp::new(config);
    let result = event_loop.run_app(&mut app);

    if let Some(core) = &mut app.core {
        let stats = core.stats();
        tracing::info!(
            presented = stats.presented,
            avg_frame_ms = stats.avg_frame_ms,
            "viewer closing"
        );
        core.terminate_and_clean_up();
    }
    result?;
    Ok(())
}
