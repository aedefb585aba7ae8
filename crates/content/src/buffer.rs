use bytemuck::{Pod, Zeroable};
use sha2::{Digest, Sha256};
use std::sync::Arc;

/// Heightfield vertex as uploaded to the GPU.
#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
    pub uv: [f32; 2],
}

/// Which sections of a [`ContentBuffer`] differ from the previous buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirtySections {
    pub vertices: bool,
    pub indices: bool,
    pub texels: bool,
}

impl DirtySections {
    pub const ALL: DirtySections = DirtySections {
        vertices: true,
        indices: true,
        texels: true,
    };

    pub const NONE: DirtySections = DirtySections {
        vertices: false,
        indices: false,
        texels: false,
    };

    pub fn any(&self) -> bool {
        self.vertices || self.indices || self.texels
    }
}

/// Generated geometry and texture for one parameters version.
///
/// Index topology depends only on resolution and is shared between
/// consecutive buffers when generated incrementally.
#[derive(Debug, Clone)]
pub struct ContentBuffer {
    pub(crate) version: u64,
    /// Version of the buffer whose clean sections this one carries over.
    pub(crate) base: Option<u64>,
    pub(crate) resolution: u32,
    pub(crate) vertices: Vec<Vertex>,
    pub(crate) indices: Arc<[u32]>,
    pub(crate) texels: Vec<[u8; 4]>,
    pub(crate) dirty: DirtySections,
}

impl ContentBuffer {
    /// Parameters version this buffer was built from.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Version of the previous buffer the dirty mask was computed against;
    /// `None` for a full build, where every section is dirty.
    pub fn base(&self) -> Option<u64> {
        self.base
    }

    /// Vertices per side; also the texture width and height.
    pub fn resolution(&self) -> u32 {
        self.resolution
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    pub fn index_count(&self) -> u32 {
        self.indices.len() as u32
    }

    pub fn texels(&self) -> &[[u8; 4]] {
        &self.texels
    }

    pub fn dirty(&self) -> DirtySections {
        self.dirty
    }

    /// True when the index topology is shared with `other` rather than copied.
    pub fn shares_topology_with(&self, other: &ContentBuffer) -> bool {
        Arc::ptr_eq(&self.indices, &other.indices)
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn texel_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.texels)
    }

    /// Total payload size in bytes.
    pub fn byte_len(&self) -> usize {
        self.vertex_bytes().len() + self.index_bytes().len() + self.texel_bytes().len()
    }

    /// SHA-256 over every section, hex encoded.
    ///
    /// Independent of `version` and the dirty mask, so an incremental buffer
    /// and a full rebuild of the same parameters have the same digest.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.resolution.to_le_bytes());
        hasher.update(self.vertex_bytes());
        hasher.update(self.index_bytes());
        hasher.update(self.texel_bytes());
        format!("{:x}", hasher.finalize())
    }
}
