//! Orchestration core for an interactive, reversible virtual-machine runner.
//!
//! The crate drives an opaque execution engine one cycle at a time,
//! multiplexing registered presentation backends (graphics, audio, input)
//! and an ordered hook pipeline around each step. It schedules and
//! dispatches; it never interprets machine opcodes and ships no concrete
//! frontend. Bring an [`Engine`] and whatever backends your host needs,
//! register them under string identifiers, and drive the [`Controller`]
//! with `step`, the blocking forward/backward loops, or the
//! frame-boundary seeks.

pub mod backend;
pub mod controller;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod pacer;
pub mod registry;

pub use backend::{Audio, Graphics, Hook, Input};
pub use controller::{Controller, ControllerConfig, LoopControls, LoopDirection};
pub use engine::scripted::ScriptedEngine;
pub use engine::{Engine, KEY_COUNT};
pub use error::{ControlError, Result};
pub use logging::{
    FileSink, LogEvent, LogFields, LogLevel, LogSink, Logger, LoggingError, LoggingResult,
    MemorySink,
};
pub use metrics::{ControlMetrics, MetricSnapshot};
pub use pacer::{CYCLE_HZ, FramePacer};
pub use registry::Registry;
