use serde_json::json;
use std::time::Duration;

use crate::logging::{LogEvent, LogFields, LogLevel};

/// Counters accumulated while the controller steps.
#[derive(Debug, Default, Clone)]
pub struct ControlMetrics {
    cycles: u64,
    reverse_cycles: u64,
    frames: u64,
    hook_calls: u64,
    key_events: u64,
}

impl ControlMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_cycle(&mut self, frame: bool) {
        self.cycles = self.cycles.saturating_add(1);
        if frame {
            self.frames = self.frames.saturating_add(1);
        }
    }

    pub fn record_reverse_cycle(&mut self) {
        self.reverse_cycles = self.reverse_cycles.saturating_add(1);
    }

    pub fn record_hook_calls(&mut self, count: usize) {
        if count > 0 {
            self.hook_calls = self.hook_calls.saturating_add(count as u64);
        }
    }

    pub fn record_key_events(&mut self, count: usize) {
        if count > 0 {
            self.key_events = self.key_events.saturating_add(count as u64);
        }
    }

    pub fn snapshot(&self, uptime: Duration) -> MetricSnapshot {
        MetricSnapshot {
            uptime_ms: uptime.as_millis() as u64,
            cycles: self.cycles,
            reverse_cycles: self.reverse_cycles,
            frames: self.frames,
            hook_calls: self.hook_calls,
            key_events: self.key_events,
        }
    }
}

/// Point-in-time copy of the counters, ready for logging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricSnapshot {
    pub uptime_ms: u64,
    pub cycles: u64,
    pub reverse_cycles: u64,
    pub frames: u64,
    pub hook_calls: u64,
    pub key_events: u64,
}

impl MetricSnapshot {
    pub fn to_log_event(&self, target: &str) -> LogEvent {
        LogEvent::with_fields(LogLevel::Info, target, "control_metrics", self.as_fields())
    }

    pub fn as_fields(&self) -> LogFields {
        let mut map = LogFields::new();
        map.insert("uptime_ms".to_string(), json!(self.uptime_ms));
        map.insert("cycles".to_string(), json!(self.cycles));
        map.insert("reverse_cycles".to_string(), json!(self.reverse_cycles));
        map.insert("frames".to_string(), json!(self.frames));
        map.insert("hook_calls".to_string(), json!(self.hook_calls));
        map.insert("key_events".to_string(), json!(self.key_events));
        map
    }
}
