use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{context::Context, error::Result};

/// Result of submitting input to a step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    /// Response to send to the user
    pub response: Option<String>,
    /// Next action to take
    pub next_action: NextAction,
    /// Status message describing what the step did
    pub status_message: Option<String>,
    /// Field-scoped message when the input failed the step's own predicate
    pub validation_error: Option<String>,
    /// Filled in by the graph with the id of the step that produced this result
    #[serde(default)]
    pub step_id: String,
}

impl StepResult {
    pub fn new(response: Option<String>, next_action: NextAction) -> Self {
        Self::new_with_status(response, next_action, None)
    }

    pub fn new_with_status(
        response: Option<String>,
        next_action: NextAction,
        status_message: Option<String>,
    ) -> Self {
        Self {
            response,
            next_action,
            status_message,
            validation_error: None,
            step_id: String::new(),
        }
    }

    /// The input did not satisfy the step; the session stays on this step.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            response: None,
            next_action: NextAction::WaitForInput,
            status_message: None,
            validation_error: Some(message.into()),
            step_id: String::new(),
        }
    }
}

/// Defines what should happen after a step handles a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum NextAction {
    /// Move to the next step along the forward edges
    Continue,
    /// Stay on the current step
    WaitForInput,
    /// Terminal step reached
    End,
}

/// Core trait that all steps must implement
#[async_trait]
pub trait Step: Send + Sync {
    /// Unique identifier for this step
    fn id(&self) -> &str;

    /// Keystroke-level filter applied to draft edits before they are stored.
    fn accepts(&self, _field: &str, _value: &Value) -> bool {
        true
    }

    /// Handle a submission of `input` (the session draft).
    ///
    /// Implementations must check their predicate before writing to `context`.
    async fn run(&self, input: &Map<String, Value>, context: Context) -> Result<StepResult>;
}
