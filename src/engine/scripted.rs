//! Deterministic engine used wherever the real machine is out of reach:
//! unit tests, benches, and the `scripted_run` demo.
//!
//! Forward steps mutate the pixel buffer with a fixed pattern and raise
//! the draw flag every `draw_every` cycles. Every forward step records a
//! snapshot, so backward steps restore engine-visible state exactly;
//! rewinding past the earliest snapshot is an engine fault.

use crate::engine::{Engine, KEY_COUNT};
use crate::error::{ControlError, Result};

/// Program space of the scripted machine, matching the reference
/// interpreter's addressable window.
pub const DEFAULT_PROGRAM_CAPACITY: usize = 512;

/// 64x32 monochrome pixel buffer, one byte per pixel.
pub const PIXEL_BUFFER_LEN: usize = 64 * 32;

#[derive(Debug, Clone)]
struct Snapshot {
    pixels: Vec<u8>,
    draw: bool,
    cycle: u64,
}

#[derive(Debug, Clone)]
pub struct ScriptedEngine {
    memory: Vec<u8>,
    pixels: Vec<u8>,
    keys: [bool; KEY_COUNT as usize],
    cycle: u64,
    draw: bool,
    draw_every: u64,
    sound: bool,
    fail_forward_at: Option<u64>,
    history: Vec<Snapshot>,
}

impl ScriptedEngine {
    /// Engine that reports a frame boundary every `draw_every` cycles.
    pub fn new(draw_every: u64) -> Self {
        Self {
            memory: vec![0; DEFAULT_PROGRAM_CAPACITY],
            pixels: vec![0; PIXEL_BUFFER_LEN],
            keys: [false; KEY_COUNT as usize],
            cycle: 0,
            draw: false,
            draw_every: draw_every.max(1),
            sound: false,
            fail_forward_at: None,
            history: Vec::new(),
        }
    }

    /// Arrange for `step_forward` to fault once `cycle` reaches the given
    /// count. Exercises the loop-terminates-on-fault policy.
    pub fn fail_forward_at(mut self, cycle: u64) -> Self {
        self.fail_forward_at = Some(cycle);
        self
    }

    pub fn set_sound(&mut self, on: bool) {
        self.sound = on;
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn key_down(&self, code: u8) -> bool {
        self.keys
            .get(code as usize)
            .copied()
            .unwrap_or(false)
    }

    pub fn memory(&self) -> &[u8] {
        &self.memory
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    fn check_key(&self, code: u8) -> Result<()> {
        if code >= KEY_COUNT {
            return Err(ControlError::invalid_input(format!(
                "key code {code:#x} out of range (0..{KEY_COUNT:#x})"
            )));
        }
        Ok(())
    }
}

impl Engine for ScriptedEngine {
    fn load(&mut self, program: &[u8]) -> Result<()> {
        if program.len() > self.memory.len() {
            return Err(ControlError::invalid_input(format!(
                "program of {} bytes exceeds capacity of {}",
                program.len(),
                self.memory.len()
            )));
        }
        self.memory.fill(0);
        self.memory[..program.len()].copy_from_slice(program);
        Ok(())
    }

    fn program_capacity(&self) -> usize {
        self.memory.len()
    }

    fn step_forward(&mut self) -> Result<()> {
        if self.fail_forward_at == Some(self.cycle) {
            return Err(ControlError::engine_fault(format!(
                "scripted fault at cycle {}",
                self.cycle
            )));
        }

        self.history.push(Snapshot {
            pixels: self.pixels.clone(),
            draw: self.draw,
            cycle: self.cycle,
        });

        self.cycle += 1;
        let slot = (self.cycle as usize) % self.pixels.len();
        self.pixels[slot] = self.pixels[slot].wrapping_add(self.cycle as u8 | 1);
        self.draw = self.cycle % self.draw_every == 0;
        Ok(())
    }

    fn step_backward(&mut self) -> Result<()> {
        let snapshot = self
            .history
            .pop()
            .ok_or_else(|| ControlError::engine_fault("step history exhausted"))?;
        self.pixels = snapshot.pixels;
        self.draw = snapshot.draw;
        self.cycle = snapshot.cycle;
        Ok(())
    }

    fn draw_ready(&self) -> bool {
        self.draw
    }

    fn sound_requested(&self) -> bool {
        self.sound
    }

    fn pixel_buffer(&self) -> &[u8] {
        &self.pixels
    }

    fn press_key(&mut self, code: u8) -> Result<()> {
        self.check_key(code)?;
        self.keys[code as usize] = true;
        Ok(())
    }

    fn release_key(&mut self, code: u8) -> Result<()> {
        self.check_key(code)?;
        self.keys[code as usize] = false;
        Ok(())
    }
}
