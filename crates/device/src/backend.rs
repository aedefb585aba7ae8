use procgfx_common::{BackendError, Extent2d, TextureFormat};
use serde::{Deserialize, Serialize};

/// What an opened device can do.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceCapabilities {
    pub adapter_name: String,
    /// Texture formats usable for sampled textures and render targets.
    pub formats: Vec<TextureFormat>,
    pub max_texture_dimension: u32,
    pub max_buffer_size: u64,
}

impl DeviceCapabilities {
    pub fn supports_format(&self, format: TextureFormat) -> bool {
        self.formats.contains(&format)
    }
}

/// Minimum capabilities the renderer needs from a device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeviceRequirements {
    pub min_texture_dimension: u32,
    pub min_buffer_size: u64,
    pub required_formats: Vec<TextureFormat>,
}

impl Default for DeviceRequirements {
    fn default() -> Self {
        Self {
            min_texture_dimension: 2048,
            min_buffer_size: 16 * 1024 * 1024,
            required_formats: vec![TextureFormat::Rgba8Unorm],
        }
    }
}

impl DeviceRequirements {
    /// Explain the first unmet requirement, if any.
    pub fn check(&self, caps: &DeviceCapabilities) -> Result<(), String> {
        if caps.max_texture_dimension < self.min_texture_dimension {
            return Err(format!(
                "{}: max texture dimension {} below required {}",
                caps.adapter_name, caps.max_texture_dimension, self.min_texture_dimension
            ));
        }
        if caps.max_buffer_size < self.min_buffer_size {
            return Err(format!(
                "{}: max buffer size {} below required {}",
                caps.adapter_name, caps.max_buffer_size, self.min_buffer_size
            ));
        }
        if let Some(missing) = self
            .required_formats
            .iter()
            .find(|f| !caps.supports_format(**f))
        {
            return Err(format!(
                "{}: required format {missing:?} unsupported",
                caps.adapter_name
            ));
        }
        Ok(())
    }
}

/// Presentation surface the renderer asks for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SurfaceRequest {
    pub extent: Extent2d,
    /// Preferred format; backends fall back to one they support.
    pub format: TextureFormat,
    pub vsync: bool,
}

impl Default for SurfaceRequest {
    fn default() -> Self {
        Self {
            extent: Extent2d::new(1280, 720),
            format: TextureFormat::Bgra8UnormSrgb,
            vsync: true,
        }
    }
}

/// Surface as actually configured by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurfaceConfig {
    pub extent: Extent2d,
    pub format: TextureFormat,
    /// Number of swapchain images the backend rotates through.
    pub image_count: u32,
}

/// Device and surface operations a graphics backend provides.
///
/// Called only through [`crate::DeviceContext`], which enforces ordering:
/// a surface exists only while the device is open, and `close_device` is
/// always preceded by `destroy_surface` once a surface was created.
pub trait DeviceBackend {
    fn name(&self) -> &str;

    fn open_device(
        &mut self,
        requirements: &DeviceRequirements,
    ) -> Result<DeviceCapabilities, BackendError>;

    fn create_surface(&mut self, request: &SurfaceRequest) -> Result<SurfaceConfig, BackendError>;

    fn resize_surface(&mut self, extent: Extent2d) -> Result<SurfaceConfig, BackendError>;

    fn destroy_surface(&mut self);

    fn close_device(&mut self);

    /// Block until every submitted piece of GPU work has retired.
    fn wait_idle(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caps() -> DeviceCapabilities {
        DeviceCapabilities {
            adapter_name: "test".into(),
            formats: vec![TextureFormat::Rgba8Unorm, TextureFormat::Bgra8UnormSrgb],
            max_texture_dimension: 4096,
            max_buffer_size: 256 << 20,
        }
    }

    #[test]
    fn default_requirements_accept_typical_device() {
        assert!(DeviceRequirements::default().check(&caps()).is_ok());
    }

    #[test]
    fn small_texture_limit_is_rejected() {
        let mut c = caps();
        c.max_texture_dimension = 512;
        let reason = DeviceRequirements::default().check(&c).unwrap_err();
        assert!(reason.contains("texture dimension"));
    }

    #[test]
    fn missing_format_is_rejected() {
        let req = DeviceRequirements {
            required_formats: vec![TextureFormat::Depth32Float],
            ..Default::default()
        };
        let reason = req.check(&caps()).unwrap_err();
        assert!(reason.contains("Depth32Float"));
    }

    #[test]
    fn surface_request_from_yaml() {
        let req: SurfaceRequest =
            serde_yaml::from_str("extent: { width: 640, height: 480 }\nformat: rgba8_unorm\n")
                .unwrap();
        assert_eq!(req.extent, Extent2d::new(640, 480));
        assert_eq!(req.format, TextureFormat::Rgba8Unorm);
        assert!(req.vsync);
    }
}
