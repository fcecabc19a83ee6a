//! Capability contracts implemented by presentation backends and hooks.
//!
//! The controller consumes these traits but never implements them. Each
//! contract is a single capability so frontends can mix and match: a
//! terminal UI might register one graphics backend and one input backend
//! while a recorder registers only hooks.

use crate::error::Result;

/// Presents pixel data at frame boundaries.
///
/// The buffer reference is only valid for the duration of the call; the
/// borrow checker enforces the "do not retain across steps" rule from the
/// engine contract.
pub trait Graphics {
    fn draw(&mut self, pixels: &[u8]);
}

/// Emits the engine's single-tone sound request.
pub trait Audio {
    fn beep(&mut self);
}

/// Supplies key transitions gathered since the previous cycle.
///
/// Both methods drain: a key reported pressed once stays pressed on the
/// engine side until the backend reports it released.
pub trait Input {
    fn keys_pressed(&mut self) -> Vec<u8>;
    fn keys_released(&mut self) -> Vec<u8>;
}

/// Zero-argument extension point invoked at a fixed lifecycle position
/// (init, pre-cycle, post-cycle, pre-frame, post-frame).
///
/// A returned error aborts the remainder of the current cycle and
/// surfaces as [`ControlError::HookFault`](crate::ControlError::HookFault).
pub trait Hook {
    fn call(&mut self) -> Result<()>;
}

/// Closures are hooks. `controller.add_pre_cycle_hook("trace", || { ... Ok(()) })`.
impl<F> Hook for F
where
    F: FnMut() -> Result<()>,
{
    fn call(&mut self) -> Result<()> {
        self()
    }
}
