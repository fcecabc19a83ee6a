use std::fs;
use std::path::Path;
use std::time::Instant;

use serde_json::json;

use crate::backend::{Audio, Graphics, Hook, Input};
use crate::engine::Engine;
use crate::error::{ControlError, Result};
use crate::logging::{LogLevel, event_with_fields, json_kv};
use crate::pacer::FramePacer;
use crate::registry::Registry;

use super::config::ControllerConfig;
use super::controls::{LoopControls, LoopDirection};

const LOG_TARGET: &str = "conductor::controller";

/// Orchestrates one execution engine against registered presentation
/// backends and lifecycle hooks.
///
/// Single-threaded by contract: one driving context owns the controller
/// for its lifetime. The blocking loops are cancelled cooperatively
/// through [`LoopControls`]; the only state shared across contexts is the
/// pair of stop flags inside it.
pub struct Controller<E: Engine> {
    engine: E,

    graphics: Registry<dyn Graphics>,
    audio: Registry<dyn Audio>,
    input: Registry<dyn Input>,

    init_hooks: Registry<dyn Hook>,
    pre_cycle_hooks: Registry<dyn Hook>,
    post_cycle_hooks: Registry<dyn Hook>,
    pre_frame_hooks: Registry<dyn Hook>,
    post_frame_hooks: Registry<dyn Hook>,

    config: ControllerConfig,
    pacer: FramePacer,
    controls: LoopControls,
    frame_limit: bool,
    started: bool,
    start_instant: Option<Instant>,
    last_metrics_emit: Option<Instant>,
}

impl<E: Engine> Controller<E> {
    pub fn new(engine: E) -> Self {
        Self::with_config(engine, ControllerConfig::default())
    }

    pub fn with_config(engine: E, config: ControllerConfig) -> Self {
        let pacer = FramePacer::with_budget(config.cycle_budget);
        Self {
            engine,
            graphics: Registry::new("graphics backend"),
            audio: Registry::new("audio backend"),
            input: Registry::new("input backend"),
            init_hooks: Registry::new("init hook"),
            pre_cycle_hooks: Registry::new("pre-cycle hook"),
            post_cycle_hooks: Registry::new("post-cycle hook"),
            pre_frame_hooks: Registry::new("pre-frame hook"),
            post_frame_hooks: Registry::new("post-frame hook"),
            config,
            pacer,
            controls: LoopControls::new(),
            frame_limit: false,
            started: false,
            start_instant: None,
            last_metrics_emit: None,
        }
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn config_mut(&mut self) -> &mut ControllerConfig {
        &mut self.config
    }

    /// Hand out a stop handle; safe to clone into hooks or other threads.
    pub fn controls(&self) -> LoopControls {
        self.controls.clone()
    }

    pub fn started(&self) -> bool {
        self.started
    }

    /// Engage or disengage wall-clock pacing of the continuous loops.
    pub fn set_frame_limit(&mut self, enabled: bool) {
        self.frame_limit = enabled;
    }

    pub fn frame_limit(&self) -> bool {
        self.frame_limit
    }

    // Backends

    pub fn add_graphics(&mut self, id: impl Into<String>, backend: impl Graphics + 'static) {
        self.graphics.register(id, Box::new(backend));
    }

    pub fn remove_graphics(&mut self, id: &str) -> Result<()> {
        self.graphics.unregister(id).map(drop)
    }

    pub fn add_audio(&mut self, id: impl Into<String>, backend: impl Audio + 'static) {
        self.audio.register(id, Box::new(backend));
    }

    pub fn remove_audio(&mut self, id: &str) -> Result<()> {
        self.audio.unregister(id).map(drop)
    }

    pub fn add_input(&mut self, id: impl Into<String>, backend: impl Input + 'static) {
        self.input.register(id, Box::new(backend));
    }

    pub fn remove_input(&mut self, id: &str) -> Result<()> {
        self.input.unregister(id).map(drop)
    }

    // Hooks

    pub fn add_init_hook(&mut self, id: impl Into<String>, hook: impl Hook + 'static) {
        self.init_hooks.register(id, Box::new(hook));
    }

    pub fn remove_init_hook(&mut self, id: &str) -> Result<()> {
        self.init_hooks.unregister(id).map(drop)
    }

    pub fn add_pre_cycle_hook(&mut self, id: impl Into<String>, hook: impl Hook + 'static) {
        self.pre_cycle_hooks.register(id, Box::new(hook));
    }

    pub fn remove_pre_cycle_hook(&mut self, id: &str) -> Result<()> {
        self.pre_cycle_hooks.unregister(id).map(drop)
    }

    pub fn add_post_cycle_hook(&mut self, id: impl Into<String>, hook: impl Hook + 'static) {
        self.post_cycle_hooks.register(id, Box::new(hook));
    }

    pub fn remove_post_cycle_hook(&mut self, id: &str) -> Result<()> {
        self.post_cycle_hooks.unregister(id).map(drop)
    }

    pub fn add_pre_frame_hook(&mut self, id: impl Into<String>, hook: impl Hook + 'static) {
        self.pre_frame_hooks.register(id, Box::new(hook));
    }

    pub fn remove_pre_frame_hook(&mut self, id: &str) -> Result<()> {
        self.pre_frame_hooks.unregister(id).map(drop)
    }

    pub fn add_post_frame_hook(&mut self, id: impl Into<String>, hook: impl Hook + 'static) {
        self.post_frame_hooks.register(id, Box::new(hook));
    }

    pub fn remove_post_frame_hook(&mut self, id: &str) -> Result<()> {
        self.post_frame_hooks.unregister(id).map(drop)
    }

    // Program loading

    /// Read a program file into a buffer sized to the engine's program
    /// capacity, hand it to the engine, and return it.
    pub fn load_program(&mut self, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let bytes = fs::read(path)?;
        self.load_program_bytes(&bytes)
    }

    /// Buffer-based variant of [`load_program`](Self::load_program). The
    /// length check runs before the engine is touched, so a rejected load
    /// leaves previously loaded state intact.
    pub fn load_program_bytes(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        let capacity = self.engine.program_capacity();
        if bytes.len() > capacity {
            return Err(ControlError::invalid_input(format!(
                "program of {} bytes exceeds engine capacity of {capacity}",
                bytes.len()
            )));
        }

        let mut program = vec![0u8; capacity];
        program[..bytes.len()].copy_from_slice(bytes);
        self.engine.load(&program)?;

        self.log_event(
            LogLevel::Info,
            "program_loaded",
            [
                json_kv("bytes", json!(bytes.len())),
                json_kv("capacity", json!(capacity)),
            ],
        );
        Ok(program)
    }

    // Stepping

    /// Advance the engine one cycle, fanning out to hooks and backends.
    ///
    /// The draw-ready flag is captured once, before any hook or backend
    /// runs, so every participant in the cycle agrees on whether it is a
    /// frame boundary.
    pub fn step(&mut self) -> Result<()> {
        if !self.started {
            self.start_up()?;
        }

        let frame = self.engine.draw_ready();

        let mut hook_calls = Self::run_hooks(&mut self.pre_cycle_hooks)?;
        if frame {
            hook_calls += Self::run_hooks(&mut self.pre_frame_hooks)?;
        }

        let key_events = self.dispatch_backends(frame)?;

        self.engine.step_forward()?;

        hook_calls += Self::run_hooks(&mut self.post_cycle_hooks)?;
        if frame {
            hook_calls += Self::run_hooks(&mut self.post_frame_hooks)?;
        }

        self.record_cycle(LoopDirection::Forward, frame, hook_calls, key_events);
        Ok(())
    }

    /// Rewind the engine one cycle. Same dispatch shape as [`step`](Self::step)
    /// but with no frame-hook phases and no start-up trigger; graphics
    /// still present when the engine reports pixel data ready.
    pub fn step_backward(&mut self) -> Result<()> {
        let frame = self.engine.draw_ready();

        let mut hook_calls = Self::run_hooks(&mut self.pre_cycle_hooks)?;
        let key_events = self.dispatch_backends(frame)?;

        self.engine.step_backward()?;

        hook_calls += Self::run_hooks(&mut self.post_cycle_hooks)?;

        self.record_cycle(LoopDirection::Backward, frame, hook_calls, key_events);
        Ok(())
    }

    /// Block stepping forward until [`stop_forward`](Self::stop_forward)
    /// (or a [`LoopControls`] clone) clears the flag, pacing each cycle
    /// when the frame limit is enabled. A faulting cycle ends the loop
    /// and resurfaces the error.
    pub fn loop_forward(&mut self) -> Result<()> {
        self.run_loop(LoopDirection::Forward)
    }

    /// Backward counterpart of [`loop_forward`](Self::loop_forward).
    pub fn loop_backward(&mut self) -> Result<()> {
        self.run_loop(LoopDirection::Backward)
    }

    pub fn stop_forward(&self) {
        self.controls.stop_forward();
    }

    pub fn stop_backward(&self) {
        self.controls.stop_backward();
    }

    /// Step until one more frame boundary has been crossed.
    ///
    /// Seeks while the draw flag is down, then takes one unconditional
    /// step past the boundary. The returned state is therefore one cycle
    /// past the detected boundary, and the flag may already be down
    /// again on return. Deliberate; callers that want to sit exactly on
    /// a boundary should step manually and poll `draw_ready`.
    pub fn advance_to_next_frame(&mut self) -> Result<()> {
        while !self.engine.draw_ready() {
            self.step()?;
        }
        self.step()
    }

    /// Backward counterpart of [`advance_to_next_frame`](Self::advance_to_next_frame),
    /// with the same trailing unconditional step.
    pub fn rewind_to_previous_frame(&mut self) -> Result<()> {
        while !self.engine.draw_ready() {
            self.step_backward()?;
        }
        self.step_backward()
    }

    // Internals

    fn start_up(&mut self) -> Result<()> {
        self.started = true;
        let now = Instant::now();
        self.start_instant = Some(now);
        self.last_metrics_emit = Some(now);
        self.ensure_metrics_initialized();

        self.log_event(
            LogLevel::Info,
            "controller_started",
            [
                json_kv("graphics", json!(self.graphics.len())),
                json_kv("audio", json!(self.audio.len())),
                json_kv("input", json!(self.input.len())),
                json_kv("init_hooks", json!(self.init_hooks.len())),
            ],
        );

        let calls = Self::run_hooks(&mut self.init_hooks)?;
        self.note_hook_calls(calls);
        Ok(())
    }

    fn run_hooks(hooks: &mut Registry<dyn Hook>) -> Result<usize> {
        let mut calls = 0;
        hooks.try_for_each_mut(|id, hook| {
            calls += 1;
            hook.call().map_err(|source| ControlError::HookFault {
                id: id.to_string(),
                source: Box::new(source),
            })
        })?;
        Ok(calls)
    }

    /// Backend order is fixed: graphics, then input, then audio. Input
    /// must reach the engine before it advances, and graphics presents
    /// the state produced by the previous cycle.
    fn dispatch_backends(&mut self, frame: bool) -> Result<usize> {
        let Self {
            engine,
            graphics,
            input,
            audio,
            ..
        } = self;

        if frame {
            let pixels = engine.pixel_buffer();
            graphics.for_each_mut(|_, backend| backend.draw(pixels));
        }

        let mut key_events = 0;
        input.try_for_each_mut(|_, backend| {
            for code in backend.keys_pressed() {
                engine.press_key(code)?;
                key_events += 1;
            }
            for code in backend.keys_released() {
                engine.release_key(code)?;
                key_events += 1;
            }
            Ok(())
        })?;

        if engine.sound_requested() {
            audio.for_each_mut(|_, backend| backend.beep());
        }

        Ok(key_events)
    }

    fn run_loop(&mut self, direction: LoopDirection) -> Result<()> {
        self.controls.begin(direction)?;
        self.pacer = FramePacer::with_budget(self.config.cycle_budget);

        let loop_start = Instant::now();
        let mut cycles: u64 = 0;
        self.log_event(
            LogLevel::Info,
            "loop_started",
            [
                json_kv("direction", json!(direction.as_str())),
                json_kv("paced", json!(self.frame_limit)),
            ],
        );

        let result = loop {
            if !self.controls.is_running(direction) {
                break Ok(());
            }

            if self.frame_limit {
                self.pacer.begin();
            }

            let stepped = match direction {
                LoopDirection::Forward => self.step(),
                LoopDirection::Backward => self.step_backward(),
            };
            if let Err(err) = stepped {
                break Err(err);
            }
            cycles += 1;

            if self.frame_limit {
                self.pacer.pace();
            }

            self.maybe_emit_metrics();
        };

        self.controls.end(direction);
        match &result {
            Ok(()) => self.log_event(
                LogLevel::Info,
                "loop_stopped",
                [
                    json_kv("direction", json!(direction.as_str())),
                    json_kv("cycles", json!(cycles)),
                    json_kv("elapsed_ms", json!(loop_start.elapsed().as_millis() as u64)),
                ],
            ),
            Err(err) => self.log_event(
                LogLevel::Error,
                "loop_faulted",
                [
                    json_kv("direction", json!(direction.as_str())),
                    json_kv("cycles", json!(cycles)),
                    json_kv("error", json!(err.to_string())),
                ],
            ),
        }
        result
    }

    fn record_cycle(
        &mut self,
        direction: LoopDirection,
        frame: bool,
        hook_calls: usize,
        key_events: usize,
    ) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                match direction {
                    LoopDirection::Forward => guard.record_cycle(frame),
                    LoopDirection::Backward => guard.record_reverse_cycle(),
                }
                guard.record_hook_calls(hook_calls);
                guard.record_key_events(key_events);
            }
        }

        if self.config.trace_cycles {
            self.log_event(
                LogLevel::Debug,
                "cycle_completed",
                [
                    json_kv("direction", json!(direction.as_str())),
                    json_kv("frame", json!(frame)),
                    json_kv("hook_calls", json!(hook_calls)),
                ],
            );
        }
    }

    fn note_hook_calls(&mut self, calls: usize) {
        if let Some(metrics) = self.config.metrics.as_ref() {
            if let Ok(mut guard) = metrics.lock() {
                guard.record_hook_calls(calls);
            }
        }
    }

    fn ensure_metrics_initialized(&mut self) {
        if self.config.metrics.is_none() && !self.config.metrics_interval.is_zero() {
            self.config.enable_metrics();
        }
    }

    fn maybe_emit_metrics(&mut self) {
        if self.config.metrics.is_none() || self.config.metrics_interval.is_zero() {
            return;
        }

        let now = Instant::now();
        match self.last_metrics_emit {
            Some(last) if now.duration_since(last) < self.config.metrics_interval => return,
            _ => self.last_metrics_emit = Some(now),
        }

        let uptime = self
            .start_instant
            .map(|start| now.duration_since(start))
            .unwrap_or_default();

        if let (Some(logger), Some(metrics)) =
            (self.config.logger.as_ref(), self.config.metrics.as_ref())
        {
            if let Ok(guard) = metrics.lock() {
                let event = guard
                    .snapshot(uptime)
                    .to_log_event(&self.config.metrics_target);
                let _ = logger.log_event(event);
            }
        }
    }

    fn log_event<I>(&self, level: LogLevel, message: &str, fields: I)
    where
        I: IntoIterator<Item = (String, serde_json::Value)>,
    {
        if let Some(logger) = self.config.logger.as_ref() {
            let event = event_with_fields(level, LOG_TARGET, message, fields);
            let _ = logger.log_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{Audio, Graphics, Input};
    use crate::engine::KEY_COUNT;
    use crate::engine::scripted::ScriptedEngine;
    use crate::logging::{Logger, MemorySink};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;
    use std::time::Duration;

    fn counting_hook(counter: Rc<Cell<usize>>) -> impl FnMut() -> Result<()> {
        move || {
            counter.set(counter.get() + 1);
            Ok(())
        }
    }

    struct CapturePixels {
        frames: Rc<RefCell<Vec<Vec<u8>>>>,
    }

    impl Graphics for CapturePixels {
        fn draw(&mut self, pixels: &[u8]) {
            self.frames.borrow_mut().push(pixels.to_vec());
        }
    }

    struct BeepCounter(Rc<Cell<usize>>);

    impl Audio for BeepCounter {
        fn beep(&mut self) {
            self.0.set(self.0.get() + 1);
        }
    }

    /// Reports its key transitions once, then goes quiet.
    struct OneShotInput {
        pressed: Vec<u8>,
        released: Vec<u8>,
    }

    impl Input for OneShotInput {
        fn keys_pressed(&mut self) -> Vec<u8> {
            std::mem::take(&mut self.pressed)
        }

        fn keys_released(&mut self) -> Vec<u8> {
            std::mem::take(&mut self.released)
        }
    }

    #[test]
    fn first_step_runs_init_hooks_exactly_once() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        let inits = Rc::new(Cell::new(0));
        controller.add_init_hook("count", counting_hook(Rc::clone(&inits)));

        assert!(!controller.started());
        controller.step().unwrap();
        controller.step().unwrap();
        assert!(controller.started());
        assert_eq!(inits.get(), 1);
    }

    #[test]
    fn frame_hooks_fire_only_on_frame_boundaries() {
        let mut controller = Controller::new(ScriptedEngine::new(16));
        let pre_cycle = Rc::new(Cell::new(0));
        let pre_frame = Rc::new(Cell::new(0));
        let post_frame = Rc::new(Cell::new(0));
        controller.add_pre_cycle_hook("cycle", counting_hook(Rc::clone(&pre_cycle)));
        controller.add_pre_frame_hook("frame", counting_hook(Rc::clone(&pre_frame)));
        controller.add_post_frame_hook("frame", counting_hook(Rc::clone(&post_frame)));

        for _ in 0..1000 {
            controller.step().unwrap();
        }

        // The flag raised at cycle k is observed by the step that starts
        // at cycle k, so 1000 steps see the boundaries at 16, 32, .., 992.
        assert_eq!(pre_cycle.get(), 1000);
        assert_eq!(pre_frame.get(), 62);
        assert_eq!(post_frame.get(), 62);
    }

    #[test]
    fn graphics_draw_only_at_frame_boundaries() {
        let mut controller = Controller::new(ScriptedEngine::new(2));
        let frames = Rc::new(RefCell::new(Vec::new()));
        controller.add_graphics(
            "capture",
            CapturePixels {
                frames: Rc::clone(&frames),
            },
        );

        for _ in 0..6 {
            controller.step().unwrap();
        }
        // Boundaries at cycles 2 and 4 are observed by steps 3 and 5.
        assert_eq!(frames.borrow().len(), 2);
    }

    #[test]
    fn input_keys_reach_the_engine_before_it_advances() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        controller.add_input(
            "pad",
            OneShotInput {
                pressed: vec![0x4, 0xB],
                released: vec![],
            },
        );

        controller.step().unwrap();
        assert!(controller.engine().key_down(0x4));
        assert!(controller.engine().key_down(0xB));
    }

    #[test]
    fn out_of_range_key_code_aborts_the_cycle() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        controller.add_input(
            "pad",
            OneShotInput {
                pressed: vec![KEY_COUNT],
                released: vec![],
            },
        );
        let post_cycle = Rc::new(Cell::new(0));
        controller.add_post_cycle_hook("count", counting_hook(Rc::clone(&post_cycle)));

        let err = controller.step().unwrap_err();
        assert!(matches!(err, ControlError::InvalidInput(_)));
        assert_eq!(controller.engine().cycle(), 0);
        assert_eq!(post_cycle.get(), 0);
    }

    #[test]
    fn audio_beeps_only_while_sound_is_requested() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        let beeps = Rc::new(Cell::new(0));
        controller.add_audio("counter", BeepCounter(Rc::clone(&beeps)));

        controller.engine_mut().set_sound(true);
        controller.step().unwrap();
        assert_eq!(beeps.get(), 1);

        controller.engine_mut().set_sound(false);
        controller.step().unwrap();
        assert_eq!(beeps.get(), 1);
    }

    #[test]
    fn reregistering_a_hook_id_replaces_the_previous_hook() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        let first = Rc::new(Cell::new(0));
        let second = Rc::new(Cell::new(0));
        controller.add_pre_cycle_hook("tap", counting_hook(Rc::clone(&first)));
        controller.add_pre_cycle_hook("tap", counting_hook(Rc::clone(&second)));

        controller.step().unwrap();
        assert_eq!(first.get(), 0);
        assert_eq!(second.get(), 1);
    }

    #[test]
    fn removing_absent_entries_reports_not_found() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        assert!(matches!(
            controller.remove_init_hook("ghost").unwrap_err(),
            ControlError::NotFound { kind: "init hook", .. }
        ));
        assert!(matches!(
            controller.remove_graphics("ghost").unwrap_err(),
            ControlError::NotFound {
                kind: "graphics backend",
                ..
            }
        ));
    }

    #[test]
    fn step_backward_undoes_the_previous_step() {
        let mut controller = Controller::new(ScriptedEngine::new(3));
        controller.step().unwrap();
        controller.step().unwrap();
        let pixels = controller.engine().pixel_buffer().to_vec();
        let draw = controller.engine().draw_ready();

        controller.step().unwrap();
        controller.step_backward().unwrap();

        assert_eq!(controller.engine().pixel_buffer(), pixels.as_slice());
        assert_eq!(controller.engine().draw_ready(), draw);
        assert_eq!(controller.engine().cycle(), 2);
    }

    #[test]
    fn advance_to_next_frame_lands_one_cycle_past_the_boundary() {
        for draw_every in [1u64, 5, 60] {
            let mut controller = Controller::new(ScriptedEngine::new(draw_every));
            controller.advance_to_next_frame().unwrap();
            assert_eq!(controller.engine().cycle(), draw_every + 1);
        }
    }

    #[test]
    fn rewind_to_previous_frame_lands_one_cycle_before_the_boundary() {
        let mut controller = Controller::new(ScriptedEngine::new(5));
        for _ in 0..12 {
            controller.step().unwrap();
        }
        controller.rewind_to_previous_frame().unwrap();
        assert_eq!(controller.engine().cycle(), 9);
    }

    #[test]
    fn loop_finishes_the_iteration_that_requested_the_stop() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        let controls = controller.controls();
        let cycles = Rc::new(Cell::new(0));
        let counter = Rc::clone(&cycles);
        controller.add_post_cycle_hook("stopper", move || -> Result<()> {
            counter.set(counter.get() + 1);
            if counter.get() == 5 {
                controls.stop_forward();
            }
            Ok(())
        });

        controller.loop_forward().unwrap();
        assert_eq!(cycles.get(), 5);
        assert!(!controller.controls().looping_forward());
    }

    #[test]
    fn loop_terminates_and_surfaces_engine_faults() {
        let mut controller = Controller::new(ScriptedEngine::new(1).fail_forward_at(3));

        let err = controller.loop_forward().unwrap_err();
        assert!(matches!(err, ControlError::EngineFault(_)));
        assert!(!controller.controls().looping_forward());

        // Back in the idle state: another run is allowed and hits the
        // same fault, not an already-running guard.
        let err = controller.loop_forward().unwrap_err();
        assert!(matches!(err, ControlError::EngineFault(_)));
    }

    #[test]
    fn starting_a_loop_while_one_is_claimed_fails_fast() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        controller
            .controls()
            .begin(LoopDirection::Forward)
            .unwrap();

        let err = controller.loop_backward().unwrap_err();
        assert!(matches!(err, ControlError::AlreadyRunning { .. }));
    }

    #[test]
    fn backward_loop_faults_when_history_runs_out() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        for _ in 0..3 {
            controller.step().unwrap();
        }

        let err = controller.loop_backward().unwrap_err();
        assert!(matches!(err, ControlError::EngineFault(_)));
        assert_eq!(controller.engine().cycle(), 0);
        assert!(!controller.controls().looping_backward());
    }

    #[test]
    fn paced_cycles_respect_the_cycle_budget() {
        let mut config = ControllerConfig::default();
        config.cycle_budget = Duration::from_millis(10);
        let mut controller = Controller::with_config(ScriptedEngine::new(1), config);
        controller.set_frame_limit(true);

        let controls = controller.controls();
        let cycles = Rc::new(Cell::new(0));
        let counter = Rc::clone(&cycles);
        controller.add_post_cycle_hook("stopper", move || -> Result<()> {
            counter.set(counter.get() + 1);
            if counter.get() == 4 {
                controls.stop_forward();
            }
            Ok(())
        });

        let start = Instant::now();
        controller.loop_forward().unwrap();
        assert_eq!(cycles.get(), 4);
        assert!(start.elapsed() >= Duration::from_millis(40));
    }

    #[test]
    fn oversized_program_is_rejected_without_touching_the_engine() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        let capacity = controller.engine().program_capacity();

        let loaded = controller.load_program_bytes(&[1, 2, 3]).unwrap();
        assert_eq!(loaded.len(), capacity);
        assert_eq!(&loaded[..3], &[1, 2, 3]);

        let err = controller
            .load_program_bytes(&vec![0xFF; capacity + 1])
            .unwrap_err();
        assert!(matches!(err, ControlError::InvalidInput(_)));
        assert_eq!(&controller.engine().memory()[..3], &[1, 2, 3]);
    }

    #[test]
    fn load_program_reads_a_file_into_the_padded_buffer() {
        let path = std::env::temp_dir().join(format!(
            "conductor_program_{}.bin",
            std::process::id()
        ));
        fs::write(&path, [7u8, 8, 9]).unwrap();

        let mut controller = Controller::new(ScriptedEngine::new(1));
        let loaded = controller.load_program(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(&loaded[..3], &[7, 8, 9]);
        assert_eq!(&controller.engine().memory()[..3], &[7, 8, 9]);
    }

    #[test]
    fn a_faulting_hook_aborts_the_cycle() {
        let mut controller = Controller::new(ScriptedEngine::new(1));
        controller.add_pre_cycle_hook("bad", || -> Result<()> {
            Err(ControlError::invalid_input("boom"))
        });
        let post_cycle = Rc::new(Cell::new(0));
        controller.add_post_cycle_hook("count", counting_hook(Rc::clone(&post_cycle)));

        let err = controller.step().unwrap_err();
        match err {
            ControlError::HookFault { id, .. } => assert_eq!(id, "bad"),
            other => panic!("expected HookFault, got {other:?}"),
        }
        assert_eq!(controller.engine().cycle(), 0);
        assert_eq!(post_cycle.get(), 0);
    }

    #[test]
    fn lifecycle_events_are_logged() {
        let sink = MemorySink::new();
        let mut config = ControllerConfig::default();
        config.logger = Some(Logger::new(sink.clone()));
        let mut controller = Controller::with_config(ScriptedEngine::new(1), config);

        controller.load_program_bytes(&[1]).unwrap();
        let controls = controller.controls();
        controller.add_post_cycle_hook("stopper", move || -> Result<()> {
            controls.stop_forward();
            Ok(())
        });
        controller.loop_forward().unwrap();

        let messages = sink.messages();
        for expected in ["program_loaded", "controller_started", "loop_started", "loop_stopped"] {
            assert!(
                messages.iter().any(|m| m == expected),
                "missing `{expected}` in {messages:?}"
            );
        }
    }

    #[test]
    fn metrics_count_cycles_frames_hooks_and_keys() {
        let mut config = ControllerConfig::default();
        config.enable_metrics();
        let handle = config.metrics_handle().unwrap();
        let mut controller = Controller::with_config(ScriptedEngine::new(5), config);

        let pre_cycle = Rc::new(Cell::new(0));
        controller.add_pre_cycle_hook("count", counting_hook(Rc::clone(&pre_cycle)));
        controller.add_input(
            "pad",
            OneShotInput {
                pressed: vec![0x1],
                released: vec![],
            },
        );

        for _ in 0..10 {
            controller.step().unwrap();
        }
        controller.step_backward().unwrap();
        controller.step_backward().unwrap();

        let snapshot = handle.lock().unwrap().snapshot(Duration::ZERO);
        assert_eq!(snapshot.cycles, 10);
        assert_eq!(snapshot.frames, 1);
        assert_eq!(snapshot.reverse_cycles, 2);
        assert_eq!(snapshot.hook_calls, 12);
        assert_eq!(snapshot.key_events, 1);
    }
}
