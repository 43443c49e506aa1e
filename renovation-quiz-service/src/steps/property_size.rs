use async_trait::async_trait;
use serde_json::{Map, Value};
use step_flow::{Context, NextAction, Result, Step, StepResult};
use tracing::info;

use crate::catalogue::QuizStep;

use super::types::{messages, session_keys};
use super::utils::{is_digit_input, whole_number};

/// Total property size. Unlike the per-room footage, zero is rejected.
pub struct PropertySizeStep;

#[async_trait]
impl Step for PropertySizeStep {
    fn id(&self) -> &str {
        QuizStep::PropertySize.id()
    }

    fn accepts(&self, field: &str, value: &Value) -> bool {
        field == session_keys::PROPERTY_SIZE && is_digit_input(value)
    }

    async fn run(&self, input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        match whole_number(input.get(session_keys::PROPERTY_SIZE)) {
            None => Ok(StepResult::rejected(messages::ENTER_A_VALUE)),
            Some(0) => Ok(StepResult::rejected(messages::GREATER_THAN_ZERO)),
            Some(size) => {
                context.set(session_keys::PROPERTY_SIZE, size).await?;
                Ok(StepResult::new(None, NextAction::Continue))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn submit(value: Value) -> (StepResult, Context) {
        let context = Context::new();
        let mut input = Map::new();
        input.insert(session_keys::PROPERTY_SIZE.to_string(), value);
        let result = PropertySizeStep.run(&input, context.clone()).await.unwrap();
        (result, context)
    }

    #[tokio::test]
    async fn boundaries() {
        let (empty, _) = submit(json!("")).await;
        let (zero, context) = submit(json!("0")).await;
        assert_eq!(empty.validation_error.as_deref(), Some(messages::ENTER_A_VALUE));
        assert_eq!(zero.validation_error.as_deref(), Some(messages::GREATER_THAN_ZERO));
        assert_ne!(empty.validation_error, zero.validation_error);
        assert!(!context.contains("property_size"));

        let (one, context) = submit(json!("1")).await;
        assert_eq!(one.next_action, NextAction::Continue);
        assert_eq!(context.get::<u64>("property_size").await, Some(1));

        let (large, context) = submit(json!("999999")).await;
        assert_eq!(large.next_action, NextAction::Continue);
        assert_eq!(context.get::<u64>("property_size").await, Some(999999));
    }

    #[test]
    fn digits_only() {
        assert!(PropertySizeStep.accepts("property_size", &json!("900")));
        assert!(!PropertySizeStep.accepts("property_size", &json!("-1")));
        assert!(!PropertySizeStep.accepts("property_size", &json!("9e2")));
    }
}
