//! Drives the scripted engine through a short forward run and a partial
//! rewind, with lifecycle logging on stdout.
//!
//! ```text
//! cargo run --example scripted_run
//! ```

use conductor::{
    Controller, ControllerConfig, Graphics, LogEvent, LogSink, Logger, LoggingResult, Result,
    ScriptedEngine,
};

struct StdoutSink;

impl LogSink for StdoutSink {
    fn log(&self, event: &LogEvent) -> LoggingResult<()> {
        println!("{}", serde_json::to_string(event)?);
        Ok(())
    }
}

struct FrameBanner;

impl Graphics for FrameBanner {
    fn draw(&mut self, pixels: &[u8]) {
        let lit = pixels.iter().filter(|p| **p != 0).count();
        println!("frame: {lit}/{} pixels lit", pixels.len());
    }
}

fn main() -> Result<()> {
    let mut config = ControllerConfig::default();
    config.logger = Some(Logger::new(StdoutSink));
    config.enable_metrics();

    let mut controller = Controller::with_config(ScriptedEngine::new(16), config);
    controller.add_graphics("banner", FrameBanner);
    controller.add_init_hook("hello", || -> Result<()> {
        println!("control loop starting");
        Ok(())
    });

    controller.load_program_bytes(&[0xA2, 0x1E, 0xD0, 0x11])?;

    // A post-frame hook ends the loop after ten frame boundaries.
    let controls = controller.controls();
    let mut frames = 0;
    controller.add_post_frame_hook("stop-after-ten", move || -> Result<()> {
        frames += 1;
        if frames == 10 {
            controls.stop_forward();
        }
        Ok(())
    });

    controller.set_frame_limit(true);
    controller.loop_forward()?;

    // Step back across the last frame boundary and present it again.
    controller.rewind_to_previous_frame()?;
    println!("rewound to cycle {}", controller.engine().cycle());
    Ok(())
}
