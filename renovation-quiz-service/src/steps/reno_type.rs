use async_trait::async_trait;
use serde_json::{Map, Value};
use step_flow::{Context, NextAction, Result, Step, StepResult};
use tracing::info;

use crate::catalogue::QuizStep;
use crate::selection::RenovationSelection;

use super::types::{messages, session_keys};

/// Multi-select of renovation types.
///
/// The draft holds `renovation_type` as an array of labels, normally built
/// up one toggle at a time.
pub struct RenoTypeStep;

#[async_trait]
impl Step for RenoTypeStep {
    fn id(&self) -> &str {
        QuizStep::RenoType.id()
    }

    fn accepts(&self, field: &str, value: &Value) -> bool {
        field == session_keys::RENOVATION_TYPE && RenovationSelection::is_valid_draft(value)
    }

    async fn run(&self, input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        let selection = RenovationSelection::from_draft(input.get(session_keys::RENOVATION_TYPE));
        if selection.is_empty() {
            return Ok(StepResult::rejected(messages::SELECT_AT_LEAST_ONE));
        }

        info!(renovation_type = ?selection.labels(), "Renovation types selected");
        context
            .set(session_keys::RENOVATION_TYPE, selection.labels())
            .await?;
        Ok(StepResult::new(None, NextAction::Continue))
    }
}
