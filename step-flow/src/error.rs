use thiserror::Error;

/// Errors raised by the step engine.
///
/// Local validation failures are not errors: a step reports them through
/// [`crate::StepResult::validation_error`] and the session stays where it is.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Step not found: {0}")]
    StepNotFound(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Context error: {0}")]
    ContextError(String),

    #[error("Step execution failed: {0}")]
    StepExecutionFailed(String),

    #[error("Step {current} is not reachable from the collected answers")]
    InconsistentPath { current: String },

    #[error("Step {0} has no previous step")]
    NoPreviousStep(String),

    #[error("Edit rejected for field {field}")]
    EditRejected { field: String },

    #[error("Storage error: {0}")]
    StorageError(String),
}

pub type Result<T> = std::result::Result<T, FlowError>;
