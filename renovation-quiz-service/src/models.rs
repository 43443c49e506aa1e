use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use step_flow::ExecutionStatus;

use crate::presentation::ResultView;

#[derive(Debug, Serialize, Deserialize)]
pub struct ToggleSelectionRequest {
    pub label: String,
}

/// Current state of one quiz session, shaped for rendering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: String,
    pub step: String,
    pub position: u8,
    /// "Step N of 9"; absent on the landing screen
    pub progress: Option<String>,
    pub heading: String,
    /// Draft keys the current step reads. On per-room steps these are the
    /// room labels ("Bedroom 1", "Kitchen").
    pub fields: Vec<String>,
    /// Allowed values for choice steps
    pub options: Vec<String>,
    pub draft: Map<String, Value>,
    pub validation_error: Option<String>,
    pub status_message: Option<String>,
    pub answers: Map<String, Value>,
    pub completed: bool,
    pub upgrade_pending: bool,
    pub result: Option<ResultView>,
}

#[derive(Debug, Serialize)]
pub struct ActionResponse {
    pub execution_status: &'static str,
    pub response: Option<String>,
    #[serde(flatten)]
    pub session: SessionView,
}

pub fn status_label(status: &ExecutionStatus) -> &'static str {
    match status {
        ExecutionStatus::WaitingForInput => "waiting_for_input",
        ExecutionStatus::Invalid(_) => "invalid",
        ExecutionStatus::Completed => "completed",
        ExecutionStatus::Busy => "busy",
    }
}
