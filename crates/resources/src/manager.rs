use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use procgfx_common::{ResourceDescriptor, ResourceId, ResourceKind, SubmissionId};
use procgfx_device::{DeviceBackend, DeviceContext};

use crate::{ResourceBackend, ResourceError};

static NEXT_MANAGER: AtomicU64 = AtomicU64::new(1);

/// Identifies the manager that owns a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ManagerId(pub u64);

/// A tracked GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub struct GpuResource {
    pub id: ResourceId,
    pub descriptor: ResourceDescriptor,
    /// Parameters version the current contents were built from.
    pub generation: u64,
    /// Number of content rewrites since allocation.
    pub revision: u64,
    pub owner: ManagerId,
}

/// Resources waiting for the submission that last used them to retire.
#[derive(Debug, Clone, Copy)]
struct Retired {
    id: ResourceId,
    last_use: SubmissionId,
}

/// Allocates, tracks and releases every GPU resource of one device context.
///
/// Ids are monotonic and never reused. Destroyed resources are freed on the
/// backend only once the submission that last referenced them has completed.
#[derive(Debug)]
pub struct ResourceManager {
    id: ManagerId,
    next_id: u64,
    resources: BTreeMap<ResourceId, GpuResource>,
    retired: Vec<Retired>,
    released: bool,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ResourceManager {
    pub fn new() -> Self {
        Self {
            id: ManagerId(NEXT_MANAGER.fetch_add(1, Ordering::Relaxed)),
            next_id: 1,
            resources: BTreeMap::new(),
            retired: Vec::new(),
            released: false,
        }
    }

    pub fn id(&self) -> ManagerId {
        self.id
    }

    /// Allocate a resource after checking it against device capabilities.
    pub fn create_resource<B>(
        &mut self,
        device: &mut DeviceContext<B>,
        descriptor: ResourceDescriptor,
    ) -> Result<ResourceId, ResourceError>
    where
        B: DeviceBackend + ResourceBackend,
    {
        self.check_live()?;
        let caps = device.capabilities()?;
        match descriptor.kind {
            ResourceKind::Texture { extent, format } => {
                if !caps.supports_format(format) {
                    return Err(ResourceError::UnsupportedFormat(format));
                }
                if extent.max_dimension() > caps.max_texture_dimension {
                    return Err(ResourceError::OutOfMemory {
                        requested: extent.max_dimension() as u64,
                        limit: caps.max_texture_dimension as u64,
                    });
                }
            }
            ResourceKind::Pipeline { target_format } => {
                if !caps.supports_format(target_format) {
                    return Err(ResourceError::UnsupportedFormat(target_format));
                }
            }
            _ => {
                if descriptor.size > caps.max_buffer_size {
                    return Err(ResourceError::OutOfMemory {
                        requested: descriptor.size,
                        limit: caps.max_buffer_size,
                    });
                }
            }
        }

        let id = ResourceId(self.next_id);
        device.backend_mut()?.allocate(id, &descriptor)?;
        self.next_id += 1;
        tracing::debug!(%id, label = %descriptor.label, size = descriptor.size, "resource created");
        self.resources.insert(
            id,
            GpuResource {
                id,
                descriptor,
                generation: 0,
                revision: 0,
                owner: self.id,
            },
        );
        Ok(id)
    }

    /// Rewrite the contents of `id` and stamp it with `generation`.
    ///
    /// Never reallocates: data larger than the allocation (or, for textures,
    /// not exactly its size) is a `SizeMismatch` and the caller recreates.
    pub fn update_resource<B>(
        &mut self,
        device: &mut DeviceContext<B>,
        id: ResourceId,
        data: &[u8],
        generation: u64,
    ) -> Result<(), ResourceError>
    where
        B: DeviceBackend + ResourceBackend,
    {
        self.check_live()?;
        let resource = self
            .resources
            .get_mut(&id)
            .ok_or(ResourceError::NotFound(id))?;
        let capacity = resource.descriptor.size;
        let requested = data.len() as u64;
        let fits = match resource.descriptor.kind {
            ResourceKind::Texture { .. } => requested == capacity,
            _ => requested <= capacity,
        };
        if !fits {
            return Err(ResourceError::SizeMismatch {
                capacity,
                requested,
            });
        }

        device.backend_mut()?.write(id, data)?;
        resource.generation = generation;
        resource.revision += 1;
        tracing::trace!(%id, generation, bytes = requested, "resource updated");
        Ok(())
    }

    /// Mark unchanged contents as current for `generation` without a rewrite.
    pub fn stamp(&mut self, id: ResourceId, generation: u64) -> Result<(), ResourceError> {
        self.check_live()?;
        let resource = self
            .resources
            .get_mut(&id)
            .ok_or(ResourceError::NotFound(id))?;
        resource.generation = generation;
        Ok(())
    }

    /// Stop tracking `id`; its backend object is freed once `last_use` retires.
    pub fn destroy_resource<B>(
        &mut self,
        device: &mut DeviceContext<B>,
        id: ResourceId,
        last_use: SubmissionId,
    ) -> Result<(), ResourceError>
    where
        B: DeviceBackend + ResourceBackend,
    {
        self.check_live()?;
        self.resources
            .remove(&id)
            .ok_or(ResourceError::NotFound(id))?;
        if last_use == SubmissionId::NONE {
            device.backend_mut()?.free(id);
            tracing::debug!(%id, "resource freed");
        } else {
            tracing::debug!(%id, last_use = last_use.0, "resource retired, free deferred");
            self.retired.push(Retired { id, last_use });
        }
        Ok(())
    }

    /// Free retired resources whose last use has completed. Returns how many.
    pub fn reclaim<B>(
        &mut self,
        device: &mut DeviceContext<B>,
        completed: SubmissionId,
    ) -> Result<usize, ResourceError>
    where
        B: DeviceBackend + ResourceBackend,
    {
        if self.retired.is_empty() {
            return Ok(0);
        }
        let backend = device.backend_mut()?;
        let before = self.retired.len();
        self.retired.retain(|r| {
            if r.last_use <= completed {
                backend.free(r.id);
                false
            } else {
                true
            }
        });
        let freed = before - self.retired.len();
        if freed > 0 {
            tracing::debug!(freed, completed = completed.0, "retired resources reclaimed");
        }
        Ok(freed)
    }

    /// Free every tracked and retired resource. Call once, after the device
    /// has gone idle and before it is destroyed.
    pub fn release_all<B>(&mut self, device: &mut DeviceContext<B>) -> Result<usize, ResourceError>
    where
        B: DeviceBackend + ResourceBackend,
    {
        if self.released {
            tracing::error!(manager = self.id.0, "release_all called twice");
            return Err(ResourceError::AlreadyReleased);
        }
        let backend = device.backend_mut()?;
        let mut freed = 0;
        for r in self.retired.drain(..) {
            backend.free(r.id);
            freed += 1;
        }
        for id in std::mem::take(&mut self.resources).into_keys() {
            backend.free(id);
            freed += 1;
        }
        self.released = true;
        tracing::info!(freed, "all resources released");
        Ok(freed)
    }

    /// Tracked resources (excluding retired ones awaiting their free).
    pub fn live_count(&self) -> usize {
        self.resources.len()
    }

    pub fn pending_frees(&self) -> usize {
        self.retired.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    pub fn get(&self, id: ResourceId) -> Option<&GpuResource> {
        self.resources.get(&id)
    }

    /// True when `id` was not built from parameters `version`.
    pub fn is_stale(&self, id: ResourceId, version: u64) -> Result<bool, ResourceError> {
        self.resources
            .get(&id)
            .map(|r| r.generation != version)
            .ok_or(ResourceError::NotFound(id))
    }

    fn check_live(&self) -> Result<(), ResourceError> {
        if self.released {
            Err(ResourceError::AlreadyReleased)
        } else {
            Ok(())
        }
    }
}

impl Drop for ResourceManager {
    fn drop(&mut self) {
        let leaked = self.resources.len() + self.retired.len();
        if !self.released && leaked > 0 {
            tracing::error!(
                manager = self.id.0,
                leaked,
                "resource manager dropped with live resources"
            );
        }
    }
}
