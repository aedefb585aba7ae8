//! Frame Scheduler: drives the render loop cadence.
//!
//! # Invariants
//! - Each iteration runs acquire, update, record, submit, present in order.
//! - Stop is honored only between iterations; a started frame is presented.
//! - Transient acquisition failures are retried a bounded number of times;
//!   a fatal error is surfaced once and the scheduler then stays halted.

mod backend;
mod error;
mod scheduler;
mod timing;

pub use backend::{AcquireError, FrameBackend, TargetImage};
pub use error::{FatalCause, FrameError};
pub use scheduler::{
    FrameOutcome, FrameScheduler, FrameState, FrameStats, FrameWork, SchedulerConfig, StopHandle,
};
pub use timing::{FrameClock, FrameTime, FrameTimer};

pub fn crate_info() -> &'static str {
    "procgfx-frame v0.1.0"
}
