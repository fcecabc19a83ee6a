use std::thread;
use std::time::{Duration, Instant};

/// Cycles per second the continuous loops are paced to.
pub const CYCLE_HZ: u32 = 60;

/// Wall-clock throttle for the continuous loops.
///
/// `begin` stamps the cycle start; `pace` sleeps off whatever is left of
/// the cycle budget. A cycle that overran its budget proceeds
/// immediately; there is no catch-up or frame skipping.
#[derive(Debug, Clone)]
pub struct FramePacer {
    budget: Duration,
    cycle_start: Option<Instant>,
}

impl FramePacer {
    pub fn new() -> Self {
        Self::with_budget(Duration::from_secs(1) / CYCLE_HZ)
    }

    pub fn with_budget(budget: Duration) -> Self {
        Self {
            budget,
            cycle_start: None,
        }
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn begin(&mut self) {
        self.cycle_start = Some(Instant::now());
    }

    pub fn pace(&mut self) {
        if let Some(start) = self.cycle_start.take() {
            if let Some(remaining) = self.budget.checked_sub(start.elapsed()) {
                thread::sleep(remaining);
            }
        }
    }
}

impl Default for FramePacer {
    fn default() -> Self {
        Self::new()
    }
}
