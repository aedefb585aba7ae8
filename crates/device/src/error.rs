use crate::DeviceState;

/// Failures while bringing a device context up.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InitError {
    #[error("no suitable device: {0}")]
    NoSuitableDevice(String),
    #[error("surface creation failed: {0}")]
    SurfaceCreationFailed(String),
    #[error("device context cannot be initialized from state {0}")]
    InvalidState(DeviceState),
}

/// Failures of a device context that is not (or no longer) usable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeviceError {
    #[error("device context not ready (state: {0})")]
    NotReady(DeviceState),
    #[error("device context already destroyed")]
    AlreadyDestroyed,
    #[error("surface reconfiguration failed: {0}")]
    SurfaceReconfigureFailed(String),
}
