//! Execution engine facade.
//!
//! The controller treats the machine as an opaque collaborator behind the
//! [`Engine`] trait: it never interprets instructions and never assumes a
//! pixel or audio format beyond "byte buffer". [`scripted::ScriptedEngine`]
//! is a deterministic stand-in used by the tests, benches, and demos.

pub mod scripted;

use crate::error::Result;

/// Number of key codes the reference machines address (hex keypad).
pub const KEY_COUNT: u8 = 16;

/// Contract the control loop requires from an execution engine.
///
/// Error expectations:
/// - `step_forward` / `step_backward` fail with
///   [`ControlError::EngineFault`](crate::ControlError::EngineFault) when
///   the engine cannot advance; rewinding past the earliest recorded
///   state is a fault, and history retention is the engine's policy.
/// - `press_key` / `release_key` are idempotent and fail with
///   [`ControlError::InvalidInput`](crate::ControlError::InvalidInput)
///   for out-of-range codes.
/// - `load` replaces the program space with a buffer the caller has
///   already sized to `program_capacity`.
///
/// The `pixel_buffer` reference is valid until the next step; the `&self`
/// borrow keeps callers honest.
pub trait Engine {
    fn load(&mut self, program: &[u8]) -> Result<()>;

    /// Addressable program space in bytes; bounds program loading.
    fn program_capacity(&self) -> usize;

    fn step_forward(&mut self) -> Result<()>;
    fn step_backward(&mut self) -> Result<()>;

    /// True when the cycle that just completed produced new pixel data.
    fn draw_ready(&self) -> bool;

    /// True while the engine wants the audio backends to sound.
    fn sound_requested(&self) -> bool;

    fn pixel_buffer(&self) -> &[u8];

    fn press_key(&mut self, code: u8) -> Result<()>;
    fn release_key(&mut self, code: u8) -> Result<()>;
}
