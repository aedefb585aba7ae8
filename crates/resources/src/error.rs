use procgfx_common::{ResourceId, TextureFormat};
use procgfx_device::DeviceError;

/// Errors from resource allocation, update and release.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResourceError {
    /// `requested` and `limit` are in the unit of the exceeded limit: bytes
    /// for buffers and memory budgets, texels per side for texture extents.
    #[error("out of memory: requested {requested}, limit {limit}")]
    OutOfMemory { requested: u64, limit: u64 },
    #[error("texture format {0:?} not supported by device")]
    UnsupportedFormat(TextureFormat),
    #[error("data of {requested} bytes does not fit capacity {capacity}")]
    SizeMismatch { capacity: u64, requested: u64 },
    #[error("resource {0} not found")]
    NotFound(ResourceId),
    #[error("resources already released")]
    AlreadyReleased,
    #[error("resource {id} holds generation {generation}, expected {expected}")]
    Stale {
        id: ResourceId,
        generation: u64,
        expected: u64,
    },
    #[error("device error: {0}")]
    Device(#[from] DeviceError),
    #[error("backend error: {0}")]
    Backend(String),
}
