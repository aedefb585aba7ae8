//! Shared types for the procgfx renderer core.
//!
//! # Invariants
//! - Resources are referenced by id everywhere outside the resource manager.
//! - Nothing in this crate touches a graphics API.

mod command;
mod error;
mod types;

pub use command::{CommandList, DrawCommand};
pub use error::BackendError;
pub use types::{Extent2d, ResourceDescriptor, ResourceId, ResourceKind, SubmissionId, TextureFormat};

pub fn crate_info() -> &'static str {
    "procgfx-common v0.1.0"
}
