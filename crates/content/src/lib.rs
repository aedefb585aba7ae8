//! Procedural Content Generator: seeded heightfield geometry and textures.
//!
//! # Invariants
//! - Generation is pure with respect to `(params, previous)`.
//! - Degenerate parameters fail before any buffer is allocated.
//! - Every parameter mutation takes a fresh, process-unique version; content
//!   is stamped with the version it was built from.

mod buffer;
mod generator;
pub mod noise;
mod params;

pub use buffer::{ContentBuffer, DirtySections, Vertex};
pub use generator::{Generator, GeneratorConfig};
pub use params::{MAX_RESOLUTION, ProceduralParameters};

/// Errors from content generation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GenerationError {
    #[error("invalid procedural parameters: {0}")]
    InvalidParameters(String),
}

pub fn crate_info() -> &'static str {
    "procgfx-content v0.1.0"
}
