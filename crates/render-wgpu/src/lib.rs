//! wgpu backend for the procedural renderer.
//!
//! Implements the device, resource and frame backend traits on top of wgpu,
//! presenting to a window surface. Draws the lit, textured heightfield.
//!
//! # Invariants
//! - Resources are addressed only by the ids the resource manager hands out.
//! - A submission is reported complete only after the queue signalled it.
//! - Surface errors map onto transient or fatal acquire errors; a lost device
//!   is always fatal.

mod gpu;
mod shaders;

pub use gpu::WgpuBackend;
pub use shaders::HEIGHTFIELD_SHADER;

pub fn crate_info() -> &'static str {
    "procgfx-render-wgpu v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("wgpu"));
    }

    #[test]
    fn wgpu_is_a_renderer_backend() {
        fn assert_backend<B: procgfx_render::Backend>() {}
        assert_backend::<WgpuBackend>();
    }
}
