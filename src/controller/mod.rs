//! Controller module orchestrator.
//!
//! [`Controller`] owns the execution engine and every registry, and
//! implements the step lifecycle, the continuous forward/backward loops,
//! and the frame-boundary seek operations. [`LoopControls`] is the
//! clone-able stop handle that lets hooks (or another thread) end a loop
//! the controller is currently blocked in.

mod config;
mod controls;
mod core;

pub use config::ControllerConfig;
pub use controls::{LoopControls, LoopDirection};
pub use core::Controller;
