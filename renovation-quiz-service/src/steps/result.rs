use async_trait::async_trait;
use serde_json::{Map, Value};
use step_flow::{Context, NextAction, Result, Step, StepResult};
use tracing::info;

use crate::catalogue::QuizStep;
use crate::presentation::ResultView;

/// Terminal step: reports the estimate. Its only way out is a restart.
pub struct ResultStep;

#[async_trait]
impl Step for ResultStep {
    fn id(&self) -> &str {
        QuizStep::Result.id()
    }

    fn accepts(&self, _field: &str, _value: &Value) -> bool {
        false
    }

    async fn run(&self, _input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        let view = ResultView::from_context(&context);
        info!(
            predicted_cost = view.predicted_cost,
            post_renovation_value = view.post_renovation_value,
            "Quiz complete"
        );
        Ok(StepResult::new(Some(view.summary()), NextAction::End))
    }
}
