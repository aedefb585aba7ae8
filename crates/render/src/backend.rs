use procgfx_device::DeviceBackend;
use procgfx_frame::FrameBackend;
use procgfx_resources::ResourceBackend;

/// Everything the renderer core needs from a graphics backend.
pub trait Backend: DeviceBackend + ResourceBackend + FrameBackend {}

impl<T: DeviceBackend + ResourceBackend + FrameBackend> Backend for T {}
