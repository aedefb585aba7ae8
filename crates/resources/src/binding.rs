use procgfx_common::{Extent2d, ResourceDescriptor, ResourceId, SubmissionId, TextureFormat};
use procgfx_content::ContentBuffer;
use procgfx_device::{DeviceBackend, DeviceContext};

use crate::{ResourceBackend, ResourceError, ResourceManager};

/// Format of procedural textures on the GPU.
pub const CONTENT_TEXTURE_FORMAT: TextureFormat = TextureFormat::Rgba8Unorm;

/// What a [`ContentBinding::sync`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub uploaded_bytes: u64,
    /// Resources rewritten in place.
    pub updated: u32,
    /// Resources replaced because the content outgrew them.
    pub recreated: u32,
    /// Sections unchanged since the previous version, only re-stamped.
    pub reused: u32,
}

#[derive(Debug, Clone, Copy)]
enum Section {
    Vertices,
    Indices,
    Texels,
}

impl Section {
    fn descriptor(self, content: &ContentBuffer) -> ResourceDescriptor {
        match self {
            Self::Vertices => ResourceDescriptor::vertex_buffer(
                "content.vertices",
                content.vertex_bytes().len() as u64,
            ),
            Self::Indices => ResourceDescriptor::index_buffer(
                "content.indices",
                content.index_bytes().len() as u64,
            ),
            Self::Texels => {
                let side = content.resolution();
                ResourceDescriptor::texture(
                    "content.texture",
                    Extent2d::new(side, side),
                    CONTENT_TEXTURE_FORMAT,
                )
            }
        }
    }

    fn bytes(self, content: &ContentBuffer) -> &[u8] {
        match self {
            Self::Vertices => content.vertex_bytes(),
            Self::Indices => content.index_bytes(),
            Self::Texels => content.texel_bytes(),
        }
    }

    fn dirty(self, content: &ContentBuffer) -> bool {
        let dirty = content.dirty();
        match self {
            Self::Vertices => dirty.vertices,
            Self::Indices => dirty.indices,
            Self::Texels => dirty.texels,
        }
    }
}

/// GPU resources mirroring a sequence of content buffers: a vertex buffer,
/// an index buffer and a texture, all stamped with the params version of the
/// content they hold.
#[derive(Debug, Clone, Default)]
pub struct ContentBinding {
    vertices: Option<ResourceId>,
    indices: Option<ResourceId>,
    texture: Option<ResourceId>,
    version: Option<u64>,
    index_count: u32,
}

impl ContentBinding {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn vertex_buffer(&self) -> Option<ResourceId> {
        self.vertices
    }

    pub fn index_buffer(&self) -> Option<ResourceId> {
        self.indices
    }

    pub fn texture(&self) -> Option<ResourceId> {
        self.texture
    }

    pub fn index_count(&self) -> u32 {
        self.index_count
    }

    /// Params version of the content last synced, if any.
    pub fn version(&self) -> Option<u64> {
        self.version
    }

    /// Bring the bound resources up to date with `content`.
    ///
    /// Dirty sections are uploaded. Clean ones are only re-stamped, and only
    /// when `content` was diffed against the buffer currently bound; content
    /// with any other base is uploaded in full. A section that no longer fits
    /// its resource gets a new one and the old is destroyed once `last_use`
    /// retires.
    pub fn sync<B>(
        &mut self,
        device: &mut DeviceContext<B>,
        rm: &mut ResourceManager,
        content: &ContentBuffer,
        last_use: SubmissionId,
    ) -> Result<SyncReport, ResourceError>
    where
        B: DeviceBackend + ResourceBackend,
    {
        let _span = tracing::debug_span!("content_sync", version = content.version()).entered();
        let mut report = SyncReport::default();
        let generation = content.version();
        let diffed_against_bound = self.version.is_some() && content.base() == self.version;
        if !diffed_against_bound && self.version.is_some() {
            tracing::debug!(
                bound = ?self.version,
                base = ?content.base(),
                "content not derived from bound buffer, uploading every section"
            );
        }

        for section in [Section::Vertices, Section::Indices, Section::Texels] {
            let slot = match section {
                Section::Vertices => &mut self.vertices,
                Section::Indices => &mut self.indices,
                Section::Texels => &mut self.texture,
            };
            let bytes = section.bytes(content);

            let Some(id) = *slot else {
                let id = rm.create_resource(device, section.descriptor(content))?;
                *slot = Some(id);
                rm.update_resource(device, id, bytes, generation)?;
                report.uploaded_bytes += bytes.len() as u64;
                report.updated += 1;
                continue;
            };

            if !section.dirty(content) && diffed_against_bound {
                rm.stamp(id, generation)?;
                report.reused += 1;
                continue;
            }

            match rm.update_resource(device, id, bytes, generation) {
                Ok(()) => report.updated += 1,
                Err(ResourceError::SizeMismatch {
                    capacity,
                    requested,
                }) => {
                    tracing::debug!(
                        %id,
                        capacity,
                        requested,
                        ?section,
                        "content outgrew resource, recreating"
                    );
                    rm.destroy_resource(device, id, last_use)?;
                    *slot = None;
                    let fresh = rm.create_resource(device, section.descriptor(content))?;
                    *slot = Some(fresh);
                    rm.update_resource(device, fresh, bytes, generation)?;
                    report.recreated += 1;
                }
                Err(e) => return Err(e),
            }
            report.uploaded_bytes += bytes.len() as u64;
        }

        self.version = Some(generation);
        self.index_count = content.index_count();
        tracing::trace!(?report, "content synced");
        Ok(report)
    }

    /// Refuse submission unless every bound resource holds `version`.
    pub fn ensure_current(&self, rm: &ResourceManager, version: u64) -> Result<(), ResourceError> {
        for id in [self.vertices, self.indices, self.texture].into_iter().flatten() {
            let resource = rm.get(id).ok_or(ResourceError::NotFound(id))?;
            if resource.generation != version {
                return Err(ResourceError::Stale {
                    id,
                    generation: resource.generation,
                    expected: version,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemBackend, ready_device};
    use procgfx_content::{Generator, GeneratorConfig, ProceduralParameters};

    fn incremental() -> Generator {
        Generator::new(GeneratorConfig { incremental: true })
    }

    #[test]
    fn first_sync_creates_and_uploads_everything() {
        let mut dev = ready_device(MemBackend::default());
        let mut rm = ResourceManager::new();
        let content = Generator::default()
            .generate(&ProceduralParameters::new(1, 8), None)
            .unwrap();

        let mut binding = ContentBinding::new();
        let report = binding
            .sync(&mut dev, &mut rm, &content, SubmissionId::NONE)
            .unwrap();

        assert_eq!(report.updated, 3);
        assert_eq!(report.uploaded_bytes, content.byte_len() as u64);
        assert_eq!(rm.live_count(), 3);
        assert_eq!(binding.index_count(), content.index_count());
        assert!(binding.ensure_current(&rm, content.version()).is_ok());
        rm.release_all(&mut dev).unwrap();
    }

    #[test]
    fn shared_topology_is_only_restamped() {
        let mut dev = ready_device(MemBackend::default());
        let mut rm = ResourceManager::new();
        let generator = incremental();
        let mut params = ProceduralParameters::new(1, 8).with_speed(1.0);
        let first = generator.generate(&params, None).unwrap();
        let mut binding = ContentBinding::new();
        binding
            .sync(&mut dev, &mut rm, &first, SubmissionId::NONE)
            .unwrap();
        let writes = dev.backend().writes;

        params.evolve(0.1);
        let next = generator.generate(&params, Some(&first)).unwrap();
        let report = binding
            .sync(&mut dev, &mut rm, &next, SubmissionId(1))
            .unwrap();

        assert_eq!(report.reused, 1);
        assert_eq!(report.updated, 2);
        assert_eq!(dev.backend().writes, writes + 2);
        assert!(binding.ensure_current(&rm, next.version()).is_ok());
        rm.release_all(&mut dev).unwrap();
    }

    #[test]
    fn clean_sections_from_another_base_are_uploaded() {
        let mut dev = ready_device(MemBackend::default());
        let mut rm = ResourceManager::new();
        let generator = incremental();
        let bound = generator
            .generate(&ProceduralParameters::new(1, 8), None)
            .unwrap();
        let mut binding = ContentBinding::new();
        binding
            .sync(&mut dev, &mut rm, &bound, SubmissionId::NONE)
            .unwrap();

        // Diffed against a buffer that was never bound here.
        let unrelated = generator
            .generate(&ProceduralParameters::new(2, 8), None)
            .unwrap();
        let next = generator
            .generate(&ProceduralParameters::new(3, 8), Some(&unrelated))
            .unwrap();
        assert!(!next.dirty().indices);
        let writes = dev.backend().writes;
        let report = binding
            .sync(&mut dev, &mut rm, &next, SubmissionId(1))
            .unwrap();

        assert_eq!(report.reused, 0);
        assert_eq!(report.updated, 3);
        assert_eq!(report.uploaded_bytes, next.byte_len() as u64);
        assert_eq!(dev.backend().writes, writes + 3);
        assert!(binding.ensure_current(&rm, next.version()).is_ok());
        rm.release_all(&mut dev).unwrap();
    }

    #[test]
    fn stale_resources_are_refused() {
        let mut dev = ready_device(MemBackend::default());
        let mut rm = ResourceManager::new();
        let mut params = ProceduralParameters::new(1, 8);
        let content = Generator::default().generate(&params, None).unwrap();
        let mut binding = ContentBinding::new();
        binding
            .sync(&mut dev, &mut rm, &content, SubmissionId::NONE)
            .unwrap();

        params.set_seed(2);
        let err = binding.ensure_current(&rm, params.version()).unwrap_err();
        assert!(matches!(err, ResourceError::Stale { expected, .. } if expected == params.version()));

        let regenerated = Generator::default().generate(&params, None).unwrap();
        binding
            .sync(&mut dev, &mut rm, &regenerated, SubmissionId(1))
            .unwrap();
        assert!(binding.ensure_current(&rm, params.version()).is_ok());
        rm.release_all(&mut dev).unwrap();
    }

    #[test]
    fn growth_recreates_explicitly() {
        let mut dev = ready_device(MemBackend::default());
        let mut rm = ResourceManager::new();
        let mut params = ProceduralParameters::new(1, 8);
        let small = Generator::default().generate(&params, None).unwrap();
        let mut binding = ContentBinding::new();
        binding
            .sync(&mut dev, &mut rm, &small, SubmissionId::NONE)
            .unwrap();
        let old_vertices = binding.vertex_buffer();

        params.set_resolution(16);
        let large = Generator::default().generate(&params, None).unwrap();
        let report = binding
            .sync(&mut dev, &mut rm, &large, SubmissionId(5))
            .unwrap();

        assert_eq!(report.recreated, 3);
        assert_ne!(binding.vertex_buffer(), old_vertices);
        assert_eq!(rm.live_count(), 3);
        assert_eq!(rm.pending_frees(), 3);
        assert_eq!(rm.reclaim(&mut dev, SubmissionId(5)).unwrap(), 3);
        assert_eq!(dev.backend().allocated.len(), 3);
        rm.release_all(&mut dev).unwrap();
    }

    #[test]
    fn shrinking_buffers_are_rewritten_in_place() {
        let mut dev = ready_device(MemBackend::default());
        let mut rm = ResourceManager::new();
        let mut params = ProceduralParameters::new(1, 16);
        let large = Generator::default().generate(&params, None).unwrap();
        let mut binding = ContentBinding::new();
        binding
            .sync(&mut dev, &mut rm, &large, SubmissionId::NONE)
            .unwrap();
        let vertices = binding.vertex_buffer();

        params.set_resolution(8);
        let small = Generator::default().generate(&params, None).unwrap();
        let report = binding
            .sync(&mut dev, &mut rm, &small, SubmissionId(1))
            .unwrap();

        // The texture extent changed, buffers just hold less data.
        assert_eq!(report.recreated, 1);
        assert_eq!(binding.vertex_buffer(), vertices);
        assert_eq!(binding.index_count(), small.index_count());
        rm.release_all(&mut dev).unwrap();
    }
}
