//! In-memory backend for unit tests.

use std::collections::HashMap;

use procgfx_common::{BackendError, Extent2d, ResourceDescriptor, ResourceId, TextureFormat};
use procgfx_device::{
    DeviceBackend, DeviceCapabilities, DeviceConfig, DeviceContext, DeviceRequirements,
    SurfaceConfig, SurfaceRequest,
};

use crate::{ResourceBackend, ResourceError};

#[derive(Default)]
pub(crate) struct MemBackend {
    pub memory_budget: Option<u64>,
    pub allocated: HashMap<ResourceId, Vec<u8>>,
    pub writes: usize,
    pub frees: Vec<ResourceId>,
}

impl MemBackend {
    fn in_use(&self) -> u64 {
        self.allocated.values().map(|b| b.len() as u64).sum()
    }
}

impl DeviceBackend for MemBackend {
    fn name(&self) -> &str {
        "mem"
    }

    fn open_device(
        &mut self,
        _requirements: &DeviceRequirements,
    ) -> Result<DeviceCapabilities, BackendError> {
        Ok(DeviceCapabilities {
            adapter_name: "mem".into(),
            formats: vec![TextureFormat::Rgba8Unorm, TextureFormat::Bgra8UnormSrgb],
            max_texture_dimension: 4096,
            max_buffer_size: 64 << 20,
        })
    }

    fn create_surface(&mut self, request: &SurfaceRequest) -> Result<SurfaceConfig, BackendError> {
        Ok(SurfaceConfig {
            extent: request.extent,
            format: request.format,
            image_count: 2,
        })
    }

    fn resize_surface(&mut self, extent: Extent2d) -> Result<SurfaceConfig, BackendError> {
        Ok(SurfaceConfig {
            extent,
            format: TextureFormat::Bgra8UnormSrgb,
            image_count: 2,
        })
    }

    fn destroy_surface(&mut self) {}

    fn close_device(&mut self) {}

    fn wait_idle(&mut self) {}
}

impl ResourceBackend for MemBackend {
    fn allocate(
        &mut self,
        id: ResourceId,
        descriptor: &ResourceDescriptor,
    ) -> Result<(), ResourceError> {
        if let Some(limit) = self.memory_budget {
            let requested = self.in_use() + descriptor.size;
            if requested > limit {
                return Err(ResourceError::OutOfMemory { requested, limit });
            }
        }
        self.allocated.insert(id, vec![0; descriptor.size as usize]);
        Ok(())
    }

    fn write(&mut self, id: ResourceId, data: &[u8]) -> Result<(), ResourceError> {
        let buf = self
            .allocated
            .get_mut(&id)
            .ok_or_else(|| ResourceError::Backend(format!("write to unallocated {id}")))?;
        buf[..data.len()].copy_from_slice(data);
        self.writes += 1;
        Ok(())
    }

    fn free(&mut self, id: ResourceId) {
        assert!(self.allocated.remove(&id).is_some(), "double free of {id}");
        self.frees.push(id);
    }
}

pub(crate) fn ready_device(backend: MemBackend) -> DeviceContext<MemBackend> {
    let mut device = DeviceContext::new(backend);
    device.init(&DeviceConfig::default()).unwrap();
    device
}
