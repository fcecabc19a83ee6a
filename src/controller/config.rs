use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::logging::Logger;
use crate::metrics::ControlMetrics;
use crate::pacer::CYCLE_HZ;

/// Configuration knobs for the control loop.
#[derive(Clone)]
pub struct ControllerConfig {
    /// Wall-clock budget of one paced cycle.
    pub cycle_budget: Duration,
    /// Optional structured logger used by the controller.
    pub logger: Option<Logger>,
    /// Metrics accumulator used for periodic snapshots.
    pub metrics: Option<Arc<Mutex<ControlMetrics>>>,
    /// Interval between metrics snapshot emissions. Zero disables snapshots.
    pub metrics_interval: Duration,
    /// Target field used when emitting metrics snapshots.
    pub metrics_target: String,
    /// Emit a debug event for every completed cycle. Off by default; a
    /// paced loop produces sixty of these per second.
    pub trace_cycles: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cycle_budget: Duration::from_secs(1) / CYCLE_HZ,
            logger: None,
            metrics: None,
            metrics_interval: Duration::from_secs(5),
            metrics_target: "conductor::controller.metrics".to_string(),
            trace_cycles: false,
        }
    }
}

impl ControllerConfig {
    /// Enable metrics collection if it has not already been configured.
    pub fn enable_metrics(&mut self) {
        if self.metrics.is_none() {
            self.metrics = Some(Arc::new(Mutex::new(ControlMetrics::new())));
        }
    }

    /// Disable metrics collection and prevent further snapshots.
    pub fn disable_metrics(&mut self) {
        self.metrics = None;
    }

    /// Access the shared metrics handle if metrics are enabled.
    pub fn metrics_handle(&self) -> Option<Arc<Mutex<ControlMetrics>>> {
        self.metrics.as_ref().map(Arc::clone)
    }
}
