use procgfx_common::{ResourceDescriptor, ResourceId};

use crate::ResourceError;

/// Resource operations a graphics backend provides.
///
/// Ids are chosen by the [`crate::ResourceManager`]; a backend only maps them
/// to its own objects. `allocate` reports exhaustion as
/// [`ResourceError::OutOfMemory`] and anything else as
/// [`ResourceError::Backend`].
pub trait ResourceBackend {
    fn allocate(
        &mut self,
        id: ResourceId,
        descriptor: &ResourceDescriptor,
    ) -> Result<(), ResourceError>;

    /// Replace the contents of `id`, starting at offset zero.
    fn write(&mut self, id: ResourceId, data: &[u8]) -> Result<(), ResourceError>;

    fn free(&mut self, id: ResourceId);
}
