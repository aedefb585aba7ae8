//! Renderer Core: the three-call entry contract over device, resources,
//! procedural content and frame scheduling.
//!
//! # Invariants
//! - `init_renderer` either brings every subsystem up or leaves nothing open.
//! - `render_loop` runs only after a successful init.
//! - `terminate_and_clean_up` is safe in any state and idempotent; it waits
//!   for in-flight work, releases resources, then destroys the device.
//! - Content is never drawn from a stale version.
//!
//! [`HeadlessBackend`] is a deterministic CPU backend for tests and CLI runs;
//! the GPU backend lives in `procgfx-render-wgpu`.

mod backend;
mod camera;
mod config;
mod headless;
mod renderer;
mod scene;

pub use backend::Backend;
pub use camera::OrbitCamera;
pub use config::{ConfigError, RendererConfig};
pub use headless::{FaultPlan, HeadlessBackend, HeadlessCounters};
pub use renderer::{CoreError, LoopExit, RendererCore};
pub use scene::{Scene, SceneFrame, SceneUniforms};

pub fn crate_info() -> &'static str {
    "procgfx-render v0.1.0"
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crate_loads() {
        assert!(crate_info().contains("render"));
    }

    #[test]
    fn headless_is_a_backend() {
        fn assert_backend<B: Backend>() {}
        assert_backend::<HeadlessBackend>();
    }
}
