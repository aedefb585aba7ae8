use procgfx_common::{BackendError, CommandList, Extent2d, SubmissionId};

/// Swapchain image acquired for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetImage {
    pub image_index: u32,
    pub extent: Extent2d,
}

/// Why a render target could not be acquired.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AcquireError {
    #[error("surface lost")]
    Lost,
    #[error("surface out of date")]
    Outdated,
    #[error("timed out waiting for a surface image")]
    Timeout,
    #[error("surface error: {0}")]
    Other(String),
    #[error("out of memory acquiring surface image")]
    OutOfMemory,
    #[error("device lost")]
    DeviceLost,
}

impl AcquireError {
    /// Worth retrying within the same frame.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Lost | Self::Outdated | Self::Timeout | Self::Other(_)
        )
    }

    /// The surface must be reconfigured before the next attempt.
    pub fn needs_reconfigure(&self) -> bool {
        matches!(self, Self::Lost | Self::Outdated)
    }
}

/// Per-frame operations a graphics backend provides.
///
/// `submit` is asynchronous: it returns as soon as the work is queued.
/// `completed_submission` reports the newest submission known to have retired.
pub trait FrameBackend {
    fn acquire_target(&mut self) -> Result<TargetImage, AcquireError>;

    fn submit(
        &mut self,
        target: &TargetImage,
        commands: &CommandList,
    ) -> Result<SubmissionId, BackendError>;

    fn present(&mut self, target: TargetImage) -> Result<(), BackendError>;

    fn completed_submission(&self) -> SubmissionId;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_error_classification() {
        assert!(AcquireError::Lost.is_transient());
        assert!(AcquireError::Lost.needs_reconfigure());
        assert!(AcquireError::Timeout.is_transient());
        assert!(!AcquireError::Timeout.needs_reconfigure());
        assert!(!AcquireError::OutOfMemory.is_transient());
        assert!(!AcquireError::DeviceLost.is_transient());
    }
}
