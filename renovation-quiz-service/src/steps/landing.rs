use async_trait::async_trait;
use serde_json::{Map, Value};
use step_flow::{Context, NextAction, Result, Step, StepResult};
use tracing::info;

use crate::catalogue::QuizStep;

/// Entry screen. Starting the quiz discards whatever an earlier run left
/// behind in the answer store.
pub struct LandingStep;

#[async_trait]
impl Step for LandingStep {
    fn id(&self) -> &str {
        QuizStep::Landing.id()
    }

    fn accepts(&self, _field: &str, _value: &Value) -> bool {
        false
    }

    async fn run(&self, _input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        if !context.is_empty() {
            info!(answers = context.len(), "Discarding answers from an earlier run");
            context.clear().await;
        }
        Ok(StepResult::new(None, NextAction::Continue))
    }
}
