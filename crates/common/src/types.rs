use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a GPU resource tracked by a resource manager.
///
/// Ids are handed out monotonically by the owning manager and never reused,
/// so a stale id can never alias a newer resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceId(pub u64);

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "res#{}", self.0)
    }
}

/// Monotonic index of a command submission.
///
/// `SubmissionId::NONE` means "nothing submitted yet"; a backend reporting it as
/// its completed index has no retired work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct SubmissionId(pub u64);

impl SubmissionId {
    pub const NONE: SubmissionId = SubmissionId(0);

    /// The submission that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Two-dimensional size in pixels (or grid cells).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Extent2d {
    pub width: u32,
    pub height: u32,
}

impl Extent2d {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True when either dimension is zero (e.g. a minimized window).
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn max_dimension(&self) -> u32 {
        self.width.max(self.height)
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }
}

impl fmt::Display for Extent2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Texel formats understood by the renderer core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Depth32Float,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> u32 {
        4
    }

    pub fn is_srgb(self) -> bool {
        matches!(self, Self::Rgba8UnormSrgb | Self::Bgra8UnormSrgb)
    }

    pub fn is_depth(self) -> bool {
        matches!(self, Self::Depth32Float)
    }
}

/// What kind of GPU object a resource is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    VertexBuffer,
    IndexBuffer,
    UniformBuffer,
    Texture {
        extent: Extent2d,
        format: TextureFormat,
    },
    /// Render pipeline drawing procedural meshes into `target_format`.
    Pipeline { target_format: TextureFormat },
}

impl ResourceKind {
    pub fn is_buffer(&self) -> bool {
        matches!(
            self,
            Self::VertexBuffer | Self::IndexBuffer | Self::UniformBuffer
        )
    }
}

/// Size/format description of a resource to allocate.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceDescriptor {
    pub label: String,
    pub kind: ResourceKind,
    /// Capacity in bytes. Zero for pipelines.
    pub size: u64,
}

impl ResourceDescriptor {
    pub fn vertex_buffer(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: label.into(),
            kind: ResourceKind::VertexBuffer,
            size,
        }
    }

    pub fn index_buffer(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: label.into(),
            kind: ResourceKind::IndexBuffer,
            size,
        }
    }

    pub fn uniform_buffer(label: impl Into<String>, size: u64) -> Self {
        Self {
            label: label.into(),
            kind: ResourceKind::UniformBuffer,
            size,
        }
    }

    /// Texture descriptor; capacity is derived from extent and format.
    pub fn texture(label: impl Into<String>, extent: Extent2d, format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            kind: ResourceKind::Texture { extent, format },
            size: extent.area() * format.bytes_per_pixel() as u64,
        }
    }

    pub fn pipeline(label: impl Into<String>, target_format: TextureFormat) -> Self {
        Self {
            label: label.into(),
            kind: ResourceKind::Pipeline { target_format },
            size: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submission_ids_are_ordered() {
        let a = SubmissionId::NONE.next();
        let b = a.next();
        assert!(SubmissionId::NONE < a);
        assert!(a < b);
        assert_eq!(b, SubmissionId(2));
    }

    #[test]
    fn empty_extent_detection() {
        assert!(Extent2d::new(0, 10).is_empty());
        assert!(Extent2d::new(10, 0).is_empty());
        assert!(!Extent2d::new(1, 1).is_empty());
        assert_eq!(Extent2d::new(4, 3).area(), 12);
    }

    #[test]
    fn texture_descriptor_size_from_extent() {
        let d = ResourceDescriptor::texture(
            "albedo",
            Extent2d::new(16, 8),
            TextureFormat::Rgba8Unorm,
        );
        assert_eq!(d.size, 16 * 8 * 4);
        assert!(!d.kind.is_buffer());
    }

    #[test]
    fn pipeline_has_no_capacity() {
        let d = ResourceDescriptor::pipeline("terrain", TextureFormat::Bgra8UnormSrgb);
        assert_eq!(d.size, 0);
        assert_eq!(
            d.kind,
            ResourceKind::Pipeline {
                target_format: TextureFormat::Bgra8UnormSrgb
            }
        );
    }

    #[test]
    fn format_classification() {
        assert!(TextureFormat::Bgra8UnormSrgb.is_srgb());
        assert!(!TextureFormat::Rgba8Unorm.is_srgb());
        assert!(TextureFormat::Depth32Float.is_depth());
        assert_eq!(TextureFormat::Depth32Float.bytes_per_pixel(), 4);
    }
}
