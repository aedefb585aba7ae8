//! Device Context: acquires and holds the graphics device and its surface.
//!
//! # Invariants
//! - `Uninitialized -> Ready -> Destroyed`; nothing leaves `Destroyed`.
//! - A failed `init` leaves no device or surface open.
//! - The context is confined to the thread that created it.

mod backend;
mod context;
mod error;

pub use backend::{
    DeviceBackend, DeviceCapabilities, DeviceRequirements, SurfaceConfig, SurfaceRequest,
};
pub use context::{DeviceConfig, DeviceContext, DeviceHandle, DeviceState};
pub use error::{DeviceError, InitError};

pub fn crate_info() -> &'static str {
    "procgfx-device v0.1.0"
}
