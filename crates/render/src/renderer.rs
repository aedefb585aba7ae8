use procgfx_common::Extent2d;
use procgfx_content::{ContentBuffer, GenerationError, ProceduralParameters};
use procgfx_device::{DeviceContext, DeviceError, DeviceState, InitError};
use procgfx_frame::{FrameError, FrameOutcome, FrameScheduler, FrameStats, StopHandle};
use procgfx_resources::{ResourceError, ResourceManager};

use crate::scene::{Scene, SceneFrame};
use crate::{Backend, RendererConfig};

/// Errors surfaced by the renderer core.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error(transparent)]
    Init(#[from] InitError),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error(transparent)]
    Resource(#[from] ResourceError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("renderer already initialized")]
    AlreadyInitialized,
    #[error("renderer not running")]
    NotRunning,
}

/// Why `render_loop` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopExit {
    /// A stop was requested.
    Stopped,
    /// `max_frames` frames were presented.
    FrameLimit,
    /// A fatal error ended the loop; see [`RendererCore::last_error`].
    Fatal,
    /// The renderer was not successfully initialized.
    NotRunning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Created,
    Running,
    Failed,
    Terminated,
}

/// Facade over device, resources, content and scheduling.
///
/// Call `init_renderer`, then `render_loop` only if it returned true, then
/// `terminate_and_clean_up` unconditionally.
pub struct RendererCore<B: Backend> {
    config: RendererConfig,
    device: DeviceContext<B>,
    resources: Option<ResourceManager>,
    scene: Option<Scene>,
    scheduler: FrameScheduler,
    phase: Phase,
    last_error: Option<CoreError>,
}

impl<B: Backend> RendererCore<B> {
    pub fn new(backend: B, config: RendererConfig) -> Self {
        let scheduler = FrameScheduler::new(config.scheduler.clone());
        Self {
            device: DeviceContext::new(backend),
            config,
            resources: None,
            scene: None,
            scheduler,
            phase: Phase::Created,
            last_error: None,
        }
    }

    /// Bring up device, resources and initial content.
    ///
    /// Returns false on any failure, after releasing whatever had been set up;
    /// the cause is kept in [`RendererCore::last_error`].
    pub fn init_renderer(&mut self) -> bool {
        if self.phase != Phase::Created {
            tracing::warn!(phase = ?self.phase, "init_renderer called twice");
            self.last_error = Some(CoreError::AlreadyInitialized);
            return false;
        }
        let _span = tracing::info_span!("init_renderer").entered();

        match self.try_init() {
            Ok(()) => {
                self.phase = Phase::Running;
                tracing::info!(backend = self.device.backend().name(), "renderer initialized");
                true
            }
            Err(e) => {
                tracing::error!(error = %e, "renderer initialization failed, rolling back");
                self.rollback();
                self.phase = Phase::Failed;
                self.last_error = Some(e);
                false
            }
        }
    }

    fn try_init(&mut self) -> Result<(), CoreError> {
        self.device.init(&self.config.device)?;
        let rm = self.resources.insert(ResourceManager::new());
        let scene = Scene::build(&mut self.device, rm, &self.config)?;
        self.scene = Some(scene);
        Ok(())
    }

    fn rollback(&mut self) {
        self.scene = None;
        if let Some(mut rm) = self.resources.take() {
            if self.device.is_ready() {
                match rm.release_all(&mut self.device) {
                    Ok(freed) => tracing::debug!(freed, "partial init resources released"),
                    Err(e) => tracing::error!(error = %e, "rollback failed to release resources"),
                }
            }
        }
        if self.device.is_ready() {
            if let Err(e) = self.device.destroy() {
                tracing::error!(error = %e, "rollback failed to destroy device");
            }
        }
    }

    /// Run frames until stopped, `max_frames` is reached, or a fatal error.
    pub fn render_loop(&mut self) -> LoopExit {
        if self.phase != Phase::Running {
            tracing::warn!(phase = ?self.phase, "render_loop called on a renderer that is not running");
            return LoopExit::NotRunning;
        }
        let _span = tracing::info_span!("render_loop").entered();
        let backoff = self.scheduler.config().retry_backoff();

        let exit = loop {
            if self
                .config
                .max_frames
                .is_some_and(|max| self.scheduler.frame_index() >= max)
            {
                break LoopExit::FrameLimit;
            }
            match self.render_frame() {
                Ok(FrameOutcome::Presented) => {}
                Ok(FrameOutcome::Skipped) => std::thread::sleep(backoff),
                Ok(FrameOutcome::Stopped) => break LoopExit::Stopped,
                Err(e) => {
                    self.last_error = Some(e);
                    break LoopExit::Fatal;
                }
            }
        };

        let stats = self.scheduler.stats();
        tracing::info!(
            ?exit,
            presented = stats.presented,
            retries = stats.acquire_retries,
            avg_frame_ms = stats.avg_frame_ms,
            "render loop finished"
        );
        exit
    }

    /// One scheduler iteration, for callers that own the event loop.
    pub fn render_frame(&mut self) -> Result<FrameOutcome, CoreError> {
        if self.phase != Phase::Running {
            return Err(CoreError::NotRunning);
        }
        let (Some(resources), Some(scene)) = (self.resources.as_mut(), self.scene.as_mut()) else {
            return Err(CoreError::NotRunning);
        };
        let mut work = SceneFrame { resources, scene };
        Ok(self.scheduler.run_once(&mut self.device, &mut work)?)
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.scheduler.stop_handle()
    }

    pub fn resize(&mut self, extent: Extent2d) -> Result<(), CoreError> {
        Ok(self.device.resize(extent)?)
    }

    /// Release everything in order: fence, resources, device.
    ///
    /// Safe in every state and idempotent; only the first call does work.
    pub fn terminate_and_clean_up(&mut self) {
        if self.phase == Phase::Terminated {
            tracing::debug!("renderer already terminated");
            return;
        }
        let _span = tracing::info_span!("terminate_and_clean_up").entered();

        if self.device.is_ready() {
            if let Err(e) = self.device.wait_idle() {
                tracing::error!(error = %e, "fence wait failed");
            }
        }
        self.scene = None;
        if let Some(mut rm) = self.resources.take() {
            if self.device.is_ready() {
                match rm.release_all(&mut self.device) {
                    Ok(freed) => tracing::debug!(freed, "resources released"),
                    Err(e) => tracing::error!(error = %e, "resource release failed"),
                }
            }
        }
        if self.device.state() != DeviceState::Destroyed {
            if let Err(e) = self.device.destroy() {
                tracing::error!(error = %e, "device destroy failed");
            }
        }
        self.phase = Phase::Terminated;
        tracing::info!("renderer terminated");
    }

    pub fn is_running(&self) -> bool {
        self.phase == Phase::Running
    }

    pub fn last_error(&self) -> Option<&CoreError> {
        self.last_error.as_ref()
    }

    pub fn config(&self) -> &RendererConfig {
        &self.config
    }

    pub fn stats(&self) -> FrameStats {
        self.scheduler.stats()
    }

    pub fn device(&self) -> &DeviceContext<B> {
        &self.device
    }

    /// Resources tracked by the manager, zero when none exists.
    pub fn live_resources(&self) -> usize {
        self.resources.as_ref().map_or(0, |rm| rm.live_count())
    }

    pub fn params(&self) -> &ProceduralParameters {
        self.scene
            .as_ref()
            .map_or(&self.config.params, |scene| scene.params())
    }

    /// Parameters of the running scene; `None` before init or after teardown.
    pub fn params_mut(&mut self) -> Option<&mut ProceduralParameters> {
        self.scene.as_mut().map(|scene| scene.params_mut())
    }

    pub fn content(&self) -> Option<&ContentBuffer> {
        self.scene.as_ref().map(|scene| scene.content())
    }

    pub fn scene_mut(&mut self) -> Option<&mut Scene> {
        self.scene.as_mut()
    }
}

impl<B: Backend> Drop for RendererCore<B> {
    fn drop(&mut self) {
        if self.phase != Phase::Terminated {
            tracing::warn!("renderer dropped without terminate_and_clean_up");
            self.terminate_and_clean_up();
        }
    }
}
