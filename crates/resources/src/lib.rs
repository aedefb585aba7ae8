//! Resource Manager: GPU resources derived from procedural content.
//!
//! # Invariants
//! - Every resource is owned by exactly one manager and referenced by id.
//! - A resource's generation names the params version its contents match.
//! - `release_all` runs once, after the fence and before device destruction.

mod backend;
mod binding;
mod error;
mod manager;
#[cfg(test)]
mod testing;

pub use backend::ResourceBackend;
pub use binding::{CONTENT_TEXTURE_FORMAT, ContentBinding, SyncReport};
pub use error::ResourceError;
pub use manager::{GpuResource, ManagerId, ResourceManager};

pub fn crate_info() -> &'static str {
    "procgfx-resources v0.1.0"
}
