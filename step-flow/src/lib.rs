pub mod context;
pub mod error;
pub mod graph;
pub mod runner;
pub mod step;
pub mod storage;

// Re-export commonly used types
pub use context::Context;
pub use error::{FlowError, Result};
pub use graph::{ExecutionResult, ExecutionStatus, GraphBuilder, StepGraph};
pub use runner::FlowRunner;
pub use step::{NextAction, Step, StepResult};
pub use storage::{InMemorySessionStorage, Session, SessionStorage};
