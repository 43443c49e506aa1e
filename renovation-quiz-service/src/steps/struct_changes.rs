use async_trait::async_trait;
use serde_json::{Map, Value};
use step_flow::{Context, NextAction, Result, Step, StepResult};
use tracing::info;

use crate::catalogue::QuizStep;
use crate::rooms::rooms_from_context;

use super::types::{StructuralChange, messages, session_keys};
use super::utils::is_choice_input;

const ANSWERS: [&str; 2] = ["Yes", "No"];

/// Yes/No per room instance, stored flat in room order.
pub struct StructChangesStep;

fn parse(value: Option<&Value>) -> Option<StructuralChange> {
    match value?.as_str()? {
        "Yes" => Some(StructuralChange::Yes),
        "No" => Some(StructuralChange::No),
        _ => None,
    }
}

#[async_trait]
impl Step for StructChangesStep {
    fn id(&self) -> &str {
        QuizStep::StructChanges.id()
    }

    fn accepts(&self, _field: &str, value: &Value) -> bool {
        is_choice_input(value, &ANSWERS)
    }

    async fn run(&self, input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        let rooms = rooms_from_context(&context).await?;
        let Some(changes) = rooms
            .iter()
            .map(|room| parse(input.get(&room.to_string())))
            .collect::<Option<Vec<_>>>()
        else {
            return Ok(StepResult::rejected(messages::ANSWER_ALL_ROOMS));
        };

        context.set(session_keys::STRUCTURAL_CHANGES, changes).await?;
        Ok(StepResult::new(None, NextAction::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn answers_follow_room_order() {
        let context = Context::new();
        context
            .set(session_keys::RENOVATION_TYPE, ["Kitchen", "Bathroom"])
            .await
            .unwrap();
        context.set(session_keys::BATHROOMS_TO_RENO, 1).await.unwrap();

        let mut input = Map::new();
        input.insert("Kitchen".to_string(), json!("No"));
        input.insert("Bathroom 1".to_string(), json!("Yes"));
        StructChangesStep.run(&input, context.clone()).await.unwrap();

        assert_eq!(
            context.get::<Vec<String>>("structural_changes").await,
            Some(vec!["Yes".to_string(), "No".to_string()])
        );
    }

    #[tokio::test]
    async fn unanswered_room_is_rejected() {
        let context = Context::new();
        context
            .set(session_keys::RENOVATION_TYPE, ["Kitchen", "Living room"])
            .await
            .unwrap();

        let mut input = Map::new();
        input.insert("Kitchen".to_string(), json!("Yes"));
        let result = StructChangesStep.run(&input, context.clone()).await.unwrap();

        assert_eq!(result.validation_error.as_deref(), Some(messages::ANSWER_ALL_ROOMS));
        assert!(!context.contains("structural_changes"));
    }

    #[test]
    fn only_yes_or_no() {
        assert!(StructChangesStep.accepts("Kitchen", &json!("Yes")));
        assert!(!StructChangesStep.accepts("Kitchen", &json!("Maybe")));
        assert!(!StructChangesStep.accepts("Kitchen", &json!(true)));
    }
}
