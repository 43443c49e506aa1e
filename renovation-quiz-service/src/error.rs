use step_flow::FlowError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum QuizError {
    #[error(transparent)]
    Flow(#[from] FlowError),

    #[error("Unknown renovation type: {0}")]
    UnknownRenovationType(String),

    #[error("{action} is not available on step {step}")]
    InvalidAction { step: String, action: &'static str },

    #[error("Internal error: {0}")]
    Internal(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}
