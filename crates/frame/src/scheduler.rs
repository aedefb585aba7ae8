use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use procgfx_common::{CommandList, Extent2d, SubmissionId};
use procgfx_device::{DeviceBackend, DeviceContext};
use serde::{Deserialize, Serialize};

use crate::timing::{FrameClock, FrameTimer};
use crate::{FatalCause, FrameBackend, FrameError, TargetImage};

/// Retry and timing policy of the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SchedulerConfig {
    /// Transient acquisition failures tolerated per frame before giving up.
    pub max_retries_per_frame: u32,
    pub retry_backoff_ms: u64,
    /// Upper clamp on the delta time handed to content updates.
    pub max_frame_dt_ms: u64,
    /// Frames kept in the rolling timing window.
    pub timing_window: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_retries_per_frame: 3,
            retry_backoff_ms: 2,
            max_frame_dt_ms: 250,
            timing_window: 120,
        }
    }
}

impl SchedulerConfig {
    pub fn retry_backoff(&self) -> Duration {
        Duration::from_millis(self.retry_backoff_ms)
    }
}

/// Cross-thread stop request. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the loop to exit once the current iteration has presented.
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Per-iteration state, created and dropped within one frame.
#[derive(Debug, Clone, Copy)]
pub struct FrameState {
    pub index: u64,
    pub timestamp: Instant,
    /// Clamped seconds since the previous frame.
    pub dt: f32,
    pub image_index: u32,
    pub extent: Extent2d,
    /// Newest submission queued before this frame.
    pub last_submitted: SubmissionId,
    /// Newest submission known to have retired.
    pub completed: SubmissionId,
}

/// Result of a successful iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    Presented,
    /// Surface is zero-sized (minimized); nothing was acquired.
    Skipped,
    /// Stop was requested, or the scheduler halted after a fatal error.
    Stopped,
}

/// The stages a frame's content contributes.
pub trait FrameWork<B: DeviceBackend> {
    /// UpdateContent: evolve parameters, regenerate and upload as needed.
    fn update(
        &mut self,
        device: &mut DeviceContext<B>,
        frame: &FrameState,
    ) -> Result<(), FrameError>;

    /// RecordCommands: describe the frame's draws.
    fn record(&mut self, frame: &FrameState, commands: &mut CommandList) -> Result<(), FrameError>;
}

/// Scheduler counters, as reported to callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FrameStats {
    pub presented: u64,
    pub skipped: u64,
    pub acquire_retries: u64,
    pub surface_reconfigures: u64,
    pub fatal_errors: u32,
    pub last_submission: u64,
    pub frames_in_flight: u64,
    pub avg_frame_ms: f64,
    pub min_frame_ms: f64,
    pub max_frame_ms: f64,
}

/// Drives `AcquireTarget -> UpdateContent -> RecordCommands -> Submit -> Present`.
pub struct FrameScheduler {
    config: SchedulerConfig,
    stop: StopHandle,
    clock: FrameClock,
    timer: FrameTimer,
    stats: FrameStats,
    frame_index: u64,
    last_submission: SubmissionId,
    halted: bool,
}

impl FrameScheduler {
    pub fn new(config: SchedulerConfig) -> Self {
        let clock = FrameClock::new(
            Duration::from_micros(100),
            Duration::from_millis(config.max_frame_dt_ms.max(1)),
        );
        let timer = FrameTimer::new(config.timing_window);
        Self {
            config,
            stop: StopHandle::new(),
            clock,
            timer,
            stats: FrameStats::default(),
            frame_index: 0,
            last_submission: SubmissionId::NONE,
            halted: false,
        }
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn stop(&self) {
        self.stop.request_stop();
    }

    pub fn is_halted(&self) -> bool {
        self.halted
    }

    /// Frames presented so far; also the index of the next frame.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn last_submission(&self) -> SubmissionId {
        self.last_submission
    }

    pub fn stats(&self) -> FrameStats {
        let ms = |d: Duration| d.as_secs_f64() * 1000.0;
        FrameStats {
            avg_frame_ms: ms(self.timer.average()),
            min_frame_ms: ms(self.timer.min()),
            max_frame_ms: ms(self.timer.max()),
            ..self.stats.clone()
        }
    }

    /// Run one full iteration.
    ///
    /// Stop is checked only here, before acquisition: an iteration that has
    /// started always reaches Present unless it fails fatally. A fatal error is
    /// returned once; afterwards the scheduler is halted and reports
    /// `Stopped` without touching the device.
    pub fn run_once<B, W>(
        &mut self,
        device: &mut DeviceContext<B>,
        work: &mut W,
    ) -> Result<FrameOutcome, FrameError>
    where
        B: DeviceBackend + FrameBackend,
        W: FrameWork<B>,
    {
        if self.halted || self.stop.is_stop_requested() {
            return Ok(FrameOutcome::Stopped);
        }
        if let Err(e) = device.backend_mut() {
            return Err(self.halt(e.into()));
        }
        if !device.is_presentable() {
            self.stats.skipped += 1;
            self.clock.reset();
            return Ok(FrameOutcome::Skipped);
        }

        let _span = tracing::info_span!("frame", index = self.frame_index).entered();
        let started = Instant::now();

        let target = match self.acquire_with_retry(device) {
            Ok(target) => target,
            Err(e) => return Err(self.halt(e)),
        };

        let time = self.clock.tick();
        let completed = match device.backend_mut() {
            Ok(backend) => backend.completed_submission(),
            Err(e) => return Err(self.halt(e.into())),
        };
        let frame = FrameState {
            index: self.frame_index,
            timestamp: time.now,
            dt: time.dt,
            image_index: target.image_index,
            extent: target.extent,
            last_submitted: self.last_submission,
            completed,
        };

        if let Err(e) = work.update(device, &frame) {
            return Err(self.halt(e));
        }

        let mut commands = CommandList::default();
        if let Err(e) = work.record(&frame, &mut commands) {
            return Err(self.halt(e));
        }

        if let Err(e) = self.submit_and_present(device, target, &commands) {
            return Err(self.halt(e));
        }

        let completed = device
            .backend()
            .completed_submission()
            .min(self.last_submission);
        self.frame_index += 1;
        self.stats.presented += 1;
        self.stats.last_submission = self.last_submission.0;
        self.stats.frames_in_flight = self.last_submission.0 - completed.0;
        self.timer.record(started.elapsed());
        tracing::trace!(
            index = frame.index,
            dt = frame.dt,
            draws = commands.draws.len(),
            submission = self.last_submission.0,
            "frame presented"
        );
        Ok(FrameOutcome::Presented)
    }

    /// One acquisition attempt.
    ///
    /// Transient failures come back as `TargetUnavailable`; a lost or outdated
    /// surface is reconfigured first so the next attempt can succeed.
    pub fn try_acquire<B>(
        &mut self,
        device: &mut DeviceContext<B>,
    ) -> Result<TargetImage, FrameError>
    where
        B: DeviceBackend + FrameBackend,
    {
        match device.backend_mut()?.acquire_target() {
            Ok(target) => Ok(target),
            Err(e) if e.is_transient() => {
                if e.needs_reconfigure() {
                    device.recreate_surface()?;
                    self.stats.surface_reconfigures += 1;
                }
                Err(FrameError::TargetUnavailable(e))
            }
            Err(e) => Err(FrameError::Fatal(FatalCause::Acquire(e))),
        }
    }

    fn acquire_with_retry<B>(
        &mut self,
        device: &mut DeviceContext<B>,
    ) -> Result<TargetImage, FrameError>
    where
        B: DeviceBackend + FrameBackend,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.try_acquire(device) {
                Ok(target) => return Ok(target),
                Err(FrameError::TargetUnavailable(e)) => {
                    if attempts > self.config.max_retries_per_frame {
                        return Err(FrameError::Fatal(FatalCause::RetriesExhausted {
                            attempts,
                            last: e,
                        }));
                    }
                    self.stats.acquire_retries += 1;
                    tracing::debug!(
                        attempt = attempts,
                        error = %e,
                        "render target unavailable, retrying"
                    );
                    std::thread::sleep(self.config.retry_backoff());
                }
                Err(fatal) => return Err(fatal),
            }
        }
    }

    fn submit_and_present<B>(
        &mut self,
        device: &mut DeviceContext<B>,
        target: TargetImage,
        commands: &CommandList,
    ) -> Result<(), FrameError>
    where
        B: DeviceBackend + FrameBackend,
    {
        let backend = device.backend_mut()?;
        let submission = backend
            .submit(&target, commands)
            .map_err(|e| FrameError::Fatal(FatalCause::Device(format!("submit: {e}"))))?;
        self.last_submission = submission;
        backend
            .present(target)
            .map_err(|e| FrameError::Fatal(FatalCause::Device(format!("present: {e}"))))
    }

    fn halt(&mut self, err: FrameError) -> FrameError {
        if err.is_fatal() {
            self.halted = true;
            self.stats.fatal_errors += 1;
            tracing::error!(error = %err, frame = self.frame_index, "frame scheduler halted");
        }
        err
    }
}
