use std::fmt;
use std::marker::PhantomData;

use procgfx_common::Extent2d;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::backend::{
    DeviceBackend, DeviceCapabilities, DeviceRequirements, SurfaceConfig, SurfaceRequest,
};
use crate::error::{DeviceError, InitError};

/// Opaque identifier of an initialized device/surface pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceHandle(pub Uuid);

impl DeviceHandle {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for DeviceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lifecycle of a [`DeviceContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceState {
    Uninitialized,
    Ready,
    Destroyed,
}

impl fmt::Display for DeviceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Ready => "ready",
            Self::Destroyed => "destroyed",
        };
        f.write_str(s)
    }
}

/// Everything needed to bring a device context up.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceConfig {
    pub requirements: DeviceRequirements,
    pub surface: SurfaceRequest,
}

/// Owns the graphics backend and the device/surface it opened.
///
/// Not `Send`: the device and every component borrowing it stay on the thread
/// that created the context.
pub struct DeviceContext<B: DeviceBackend> {
    backend: B,
    state: DeviceState,
    handle: Option<DeviceHandle>,
    capabilities: Option<DeviceCapabilities>,
    surface: Option<SurfaceConfig>,
    /// Latest extent requested while the surface could not take it (minimized).
    deferred_extent: Option<Extent2d>,
    _thread: PhantomData<*const ()>,
}

impl<B: DeviceBackend> DeviceContext<B> {
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            state: DeviceState::Uninitialized,
            handle: None,
            capabilities: None,
            surface: None,
            deferred_extent: None,
            _thread: PhantomData,
        }
    }

    pub fn state(&self) -> DeviceState {
        self.state
    }

    pub fn is_ready(&self) -> bool {
        self.state == DeviceState::Ready
    }

    /// Open the device, check it against the requirements, create the surface.
    ///
    /// On failure nothing stays open and the context remains `Uninitialized`.
    pub fn init(&mut self, config: &DeviceConfig) -> Result<DeviceHandle, InitError> {
        if self.state != DeviceState::Uninitialized {
            return Err(InitError::InvalidState(self.state));
        }
        let _span = tracing::info_span!("device_init", backend = self.backend.name()).entered();

        let caps = self
            .backend
            .open_device(&config.requirements)
            .map_err(|e| InitError::NoSuitableDevice(e.to_string()))?;

        if let Err(reason) = config.requirements.check(&caps) {
            tracing::warn!(%reason, "device rejected");
            self.backend.close_device();
            return Err(InitError::NoSuitableDevice(reason));
        }

        if config.surface.extent.is_empty() {
            self.backend.close_device();
            return Err(InitError::SurfaceCreationFailed(format!(
                "zero-sized surface {}",
                config.surface.extent
            )));
        }

        let surface = match self.backend.create_surface(&config.surface) {
            Ok(surface) => surface,
            Err(e) => {
                tracing::warn!(error = %e, "surface creation failed, closing device");
                self.backend.close_device();
                return Err(InitError::SurfaceCreationFailed(e.to_string()));
            }
        };

        let handle = DeviceHandle::new();
        tracing::info!(
            %handle,
            adapter = %caps.adapter_name,
            extent = %surface.extent,
            format = ?surface.format,
            "device ready"
        );
        self.handle = Some(handle);
        self.capabilities = Some(caps);
        self.surface = Some(surface);
        self.state = DeviceState::Ready;
        Ok(handle)
    }

    pub fn handle(&self) -> Result<DeviceHandle, DeviceError> {
        self.handle.ok_or(DeviceError::NotReady(self.state))
    }

    pub fn capabilities(&self) -> Result<&DeviceCapabilities, DeviceError> {
        self.ready()?;
        self.capabilities
            .as_ref()
            .ok_or(DeviceError::NotReady(self.state))
    }

    pub fn surface(&self) -> Result<&SurfaceConfig, DeviceError> {
        self.ready()?;
        self.surface.as_ref().ok_or(DeviceError::NotReady(self.state))
    }

    /// True while the surface can be rendered to (not minimized).
    pub fn is_presentable(&self) -> bool {
        self.is_ready() && self.deferred_extent.is_none()
    }

    /// The backend, for components that issue their own backend calls.
    pub fn backend_mut(&mut self) -> Result<&mut B, DeviceError> {
        self.ready()?;
        Ok(&mut self.backend)
    }

    /// Read-only backend access in any state, for diagnostics.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Resize the surface. Zero extents are recorded and applied on the next
    /// non-zero resize.
    pub fn resize(&mut self, extent: Extent2d) -> Result<(), DeviceError> {
        self.ready()?;
        if extent.is_empty() {
            tracing::debug!(%extent, "surface minimized, deferring reconfigure");
            self.deferred_extent = Some(extent);
            return Ok(());
        }
        self.deferred_extent = None;
        if self.surface.map(|s| s.extent) == Some(extent) {
            return Ok(());
        }
        self.reconfigure(extent)
    }

    /// Reconfigure the surface at its current extent (after it went lost or
    /// out of date).
    pub fn recreate_surface(&mut self) -> Result<(), DeviceError> {
        let extent = self.surface()?.extent;
        self.reconfigure(extent)
    }

    fn reconfigure(&mut self, extent: Extent2d) -> Result<(), DeviceError> {
        let surface = self
            .backend
            .resize_surface(extent)
            .map_err(|e| DeviceError::SurfaceReconfigureFailed(e.to_string()))?;
        tracing::debug!(extent = %surface.extent, "surface reconfigured");
        self.surface = Some(surface);
        Ok(())
    }

    /// Block until all submitted GPU work has retired.
    pub fn wait_idle(&mut self) -> Result<(), DeviceError> {
        self.ready()?;
        self.backend.wait_idle();
        Ok(())
    }

    /// Release the surface and then the device.
    ///
    /// Destroying an uninitialized context only marks it destroyed. Destroying
    /// twice is a caller bug and is reported, not ignored.
    pub fn destroy(&mut self) -> Result<(), DeviceError> {
        match self.state {
            DeviceState::Destroyed => {
                tracing::error!("device context destroyed twice");
                Err(DeviceError::AlreadyDestroyed)
            }
            DeviceState::Uninitialized => {
                self.state = DeviceState::Destroyed;
                tracing::debug!("uninitialized device context marked destroyed");
                Ok(())
            }
            DeviceState::Ready => {
                self.backend.wait_idle();
                self.backend.destroy_surface();
                self.backend.close_device();
                let handle = self.handle.take();
                self.surface = None;
                self.capabilities = None;
                self.deferred_extent = None;
                self.state = DeviceState::Destroyed;
                tracing::info!(handle = ?handle.map(|h| h.to_string()), "device context destroyed");
                Ok(())
            }
        }
    }

    fn ready(&self) -> Result<(), DeviceError> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(DeviceError::NotReady(self.state))
        }
    }
}

impl<B: DeviceBackend> Drop for DeviceContext<B> {
    fn drop(&mut self) {
        if self.is_ready() {
            tracing::warn!("device context dropped while ready, destroying");
            let _ = self.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use procgfx_common::{BackendError, TextureFormat};

    #[derive(Default)]
    struct Mock {
        fail_open: bool,
        fail_surface: bool,
        tiny_textures: bool,
        device_open: bool,
        surface_open: bool,
        waits: u32,
        resizes: Vec<Extent2d>,
    }

    impl DeviceBackend for Mock {
        fn name(&self) -> &str {
            "mock"
        }

        fn open_device(
            &mut self,
            _requirements: &DeviceRequirements,
        ) -> Result<DeviceCapabilities, BackendError> {
            if self.fail_open {
                return Err("no adapter".into());
            }
            self.device_open = true;
            Ok(DeviceCapabilities {
                adapter_name: "mock adapter".into(),
                formats: vec![TextureFormat::Rgba8Unorm, TextureFormat::Bgra8UnormSrgb],
                max_texture_dimension: if self.tiny_textures { 256 } else { 8192 },
                max_buffer_size: 1 << 30,
            })
        }

        fn create_surface(
            &mut self,
            request: &SurfaceRequest,
        ) -> Result<SurfaceConfig, BackendError> {
            assert!(self.device_open);
            if self.fail_surface {
                return Err("window gone".into());
            }
            self.surface_open = true;
            Ok(SurfaceConfig {
                extent: request.extent,
                format: request.format,
                image_count: 3,
            })
        }

        fn resize_surface(&mut self, extent: Extent2d) -> Result<SurfaceConfig, BackendError> {
            self.resizes.push(extent);
            Ok(SurfaceConfig {
                extent,
                format: TextureFormat::Bgra8UnormSrgb,
                image_count: 3,
            })
        }

        fn destroy_surface(&mut self) {
            self.surface_open = false;
        }

        fn close_device(&mut self) {
            assert!(!self.surface_open, "device closed before surface");
            self.device_open = false;
        }

        fn wait_idle(&mut self) {
            self.waits += 1;
        }
    }

    fn ready() -> DeviceContext<Mock> {
        let mut ctx = DeviceContext::new(Mock::default());
        ctx.init(&DeviceConfig::default()).unwrap();
        ctx
    }

    #[test]
    fn init_reaches_ready() {
        let ctx = ready();
        assert_eq!(ctx.state(), DeviceState::Ready);
        assert!(ctx.handle().is_ok());
        assert_eq!(ctx.capabilities().unwrap().adapter_name, "mock adapter");
        assert_eq!(ctx.surface().unwrap().extent, Extent2d::new(1280, 720));
    }

    #[test]
    fn handles_are_unique() {
        assert_ne!(ready().handle().unwrap(), ready().handle().unwrap());
    }

    #[test]
    fn accessors_fail_before_init() {
        let mut ctx = DeviceContext::new(Mock::default());
        assert_eq!(
            ctx.handle(),
            Err(DeviceError::NotReady(DeviceState::Uninitialized))
        );
        assert!(ctx.backend_mut().is_err());
        assert!(ctx.wait_idle().is_err());
    }

    #[test]
    fn missing_device_fails() {
        let mut ctx = DeviceContext::new(Mock {
            fail_open: true,
            ..Default::default()
        });
        let err = ctx.init(&DeviceConfig::default()).unwrap_err();
        assert!(matches!(err, InitError::NoSuitableDevice(_)));
        assert_eq!(ctx.state(), DeviceState::Uninitialized);
    }

    #[test]
    fn unmet_requirements_close_device() {
        let mut ctx = DeviceContext::new(Mock {
            tiny_textures: true,
            ..Default::default()
        });
        let err = ctx.init(&DeviceConfig::default()).unwrap_err();
        assert!(matches!(err, InitError::NoSuitableDevice(_)));
        assert!(!ctx.backend().device_open);
    }

    #[test]
    fn surface_failure_rolls_back_device() {
        let mut ctx = DeviceContext::new(Mock {
            fail_surface: true,
            ..Default::default()
        });
        let err = ctx.init(&DeviceConfig::default()).unwrap_err();
        assert!(matches!(err, InitError::SurfaceCreationFailed(_)));
        assert!(!ctx.backend().device_open);
        assert!(!ctx.backend().surface_open);
    }

    #[test]
    fn zero_sized_surface_fails() {
        let mut ctx = DeviceContext::new(Mock::default());
        let mut config = DeviceConfig::default();
        config.surface.extent = Extent2d::new(0, 600);
        let err = ctx.init(&config).unwrap_err();
        assert!(matches!(err, InitError::SurfaceCreationFailed(_)));
        assert!(!ctx.backend().device_open);
    }

    #[test]
    fn init_twice_is_invalid() {
        let mut ctx = ready();
        assert_eq!(
            ctx.init(&DeviceConfig::default()),
            Err(InitError::InvalidState(DeviceState::Ready))
        );
    }

    #[test]
    fn destroy_releases_surface_then_device() {
        let mut ctx = ready();
        ctx.destroy().unwrap();
        assert_eq!(ctx.state(), DeviceState::Destroyed);
        assert!(!ctx.backend().device_open);
        assert!(!ctx.backend().surface_open);
        assert_eq!(ctx.backend().waits, 1);
        assert!(ctx.handle().is_err());
    }

    #[test]
    fn double_destroy_is_reported() {
        let mut ctx = ready();
        ctx.destroy().unwrap();
        assert_eq!(ctx.destroy(), Err(DeviceError::AlreadyDestroyed));
    }

    #[test]
    fn destroy_uninitialized_then_no_reinit() {
        let mut ctx = DeviceContext::new(Mock::default());
        ctx.destroy().unwrap();
        assert_eq!(ctx.state(), DeviceState::Destroyed);
        assert_eq!(
            ctx.init(&DeviceConfig::default()),
            Err(InitError::InvalidState(DeviceState::Destroyed))
        );
    }

    #[test]
    fn zero_resize_is_deferred() {
        let mut ctx = ready();
        ctx.resize(Extent2d::new(0, 0)).unwrap();
        assert!(!ctx.is_presentable());
        assert!(ctx.backend().resizes.is_empty());

        ctx.resize(Extent2d::new(800, 600)).unwrap();
        assert!(ctx.is_presentable());
        assert_eq!(ctx.backend().resizes, vec![Extent2d::new(800, 600)]);
        assert_eq!(ctx.surface().unwrap().extent, Extent2d::new(800, 600));
    }

    #[test]
    fn recreate_surface_keeps_extent() {
        let mut ctx = ready();
        ctx.recreate_surface().unwrap();
        assert_eq!(ctx.backend().resizes, vec![Extent2d::new(1280, 720)]);
    }

    #[test]
    fn drop_while_ready_destroys() {
        let ctx = ready();
        drop(ctx);
    }
}
