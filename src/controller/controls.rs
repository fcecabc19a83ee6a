use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::{ControlError, Result};

/// Direction of a continuous loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopDirection {
    Forward,
    Backward,
}

impl LoopDirection {
    pub fn as_str(self) -> &'static str {
        match self {
            LoopDirection::Forward => "forwards",
            LoopDirection::Backward => "backwards",
        }
    }
}

/// Clone-able stop handle for the blocking loops.
///
/// `loop_forward`/`loop_backward` borrow the controller for their whole
/// run, so a hook that wants to end the loop it is being invoked from
/// cannot reach the controller itself. It holds a clone of this handle
/// instead; the loop polls the flags at the top of every iteration.
#[derive(Clone, Debug, Default)]
pub struct LoopControls {
    forward: Arc<AtomicBool>,
    backward: Arc<AtomicBool>,
}

impl LoopControls {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop_forward(&self) {
        self.forward.store(false, Ordering::SeqCst);
    }

    pub fn stop_backward(&self) {
        self.backward.store(false, Ordering::SeqCst);
    }

    pub fn looping_forward(&self) -> bool {
        self.forward.load(Ordering::SeqCst)
    }

    pub fn looping_backward(&self) -> bool {
        self.backward.load(Ordering::SeqCst)
    }

    /// Claim the loop for `direction`; the two directions are mutually
    /// exclusive and re-entry fails fast instead of silently nesting.
    pub(crate) fn begin(&self, direction: LoopDirection) -> Result<()> {
        let active = if self.looping_forward() {
            Some(LoopDirection::Forward)
        } else if self.looping_backward() {
            Some(LoopDirection::Backward)
        } else {
            None
        };

        if let Some(active) = active {
            return Err(ControlError::AlreadyRunning {
                requested: direction.as_str(),
                active: active.as_str(),
            });
        }

        self.flag(direction).store(true, Ordering::SeqCst);
        Ok(())
    }

    pub(crate) fn end(&self, direction: LoopDirection) {
        self.flag(direction).store(false, Ordering::SeqCst);
    }

    pub(crate) fn is_running(&self, direction: LoopDirection) -> bool {
        self.flag(direction).load(Ordering::SeqCst)
    }

    fn flag(&self, direction: LoopDirection) -> &AtomicBool {
        match direction {
            LoopDirection::Forward => &self.forward,
            LoopDirection::Backward => &self.backward,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directions_are_mutually_exclusive() {
        let controls = LoopControls::new();
        controls.begin(LoopDirection::Forward).unwrap();

        let err = controls.begin(LoopDirection::Backward).unwrap_err();
        assert!(matches!(
            err,
            ControlError::AlreadyRunning {
                requested: "backwards",
                active: "forwards",
            }
        ));

        controls.end(LoopDirection::Forward);
        controls.begin(LoopDirection::Backward).unwrap();
    }

    #[test]
    fn stop_clears_the_matching_flag_across_clones() {
        let controls = LoopControls::new();
        let handle = controls.clone();
        controls.begin(LoopDirection::Forward).unwrap();
        assert!(handle.looping_forward());

        handle.stop_forward();
        assert!(!controls.is_running(LoopDirection::Forward));
    }
}
