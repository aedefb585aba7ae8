use procgfx_device::DeviceError;

use crate::AcquireError;

/// Why the scheduler stopped for good.
#[derive(Debug, thiserror::Error)]
pub enum FatalCause {
    #[error("target unavailable after {attempts} attempts (last: {last})")]
    RetriesExhausted { attempts: u32, last: AcquireError },
    #[error("target acquisition failed: {0}")]
    Acquire(AcquireError),
    #[error("content update failed: {0}")]
    Content(Box<dyn std::error::Error + Send + Sync>),
    #[error("device failure: {0}")]
    Device(String),
}

/// Errors from one scheduler iteration.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Recoverable; retried inside the scheduler.
    #[error("render target unavailable: {0}")]
    TargetUnavailable(AcquireError),
    /// Terminal; the loop must exit to shutdown.
    #[error("fatal frame error: {0}")]
    Fatal(FatalCause),
}

impl FrameError {
    /// Wrap a content-stage failure (generation, resource sync) as fatal.
    pub fn content(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Fatal(FatalCause::Content(Box::new(err)))
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}

impl From<DeviceError> for FrameError {
    fn from(err: DeviceError) -> Self {
        Self::Fatal(FatalCause::Device(err.to_string()))
    }
}
