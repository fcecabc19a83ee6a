use thiserror::Error;

/// Unified result type for the conductor crate.
pub type Result<T> = std::result::Result<T, ControlError>;

/// Errors surfaced by the control loop and its registries.
#[derive(Debug, Error)]
pub enum ControlError {
    /// Removal was requested for an identifier the registry never saw.
    #[error("no {kind} registered under `{id}`")]
    NotFound { kind: &'static str, id: String },
    /// A continuous loop was started while one was still active.
    #[error("cannot start looping {requested}: already looping {active}")]
    AlreadyRunning {
        requested: &'static str,
        active: &'static str,
    },
    /// Caller-supplied data the engine cannot accept.
    #[error("invalid input: {0}")]
    InvalidInput(String),
    /// The execution engine could not advance or rewind.
    #[error("engine fault: {0}")]
    EngineFault(String),
    /// A registered hook failed; the cycle it ran in was aborted.
    #[error("hook `{id}` failed: {source}")]
    HookFault {
        id: String,
        #[source]
        source: Box<ControlError>,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ControlError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn engine_fault(message: impl Into<String>) -> Self {
        Self::EngineFault(message.into())
    }
}
