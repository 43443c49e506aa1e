use async_trait::async_trait;
use serde_json::{Map, Value};
use step_flow::{Context, NextAction, Result, Step, StepResult};
use tracing::info;

use crate::catalogue::QuizStep;
use crate::rooms::{PerRoomValue, rooms_from_context};

use super::types::{MATERIAL_GRADES, messages, session_keys};
use super::utils::{is_choice_input, non_empty_str};

/// One material grade per room instance.
pub struct MaterialGradeStep;

#[async_trait]
impl Step for MaterialGradeStep {
    fn id(&self) -> &str {
        QuizStep::MaterialGrade.id()
    }

    fn accepts(&self, _field: &str, value: &Value) -> bool {
        is_choice_input(value, &MATERIAL_GRADES)
    }

    async fn run(&self, input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        let rooms = rooms_from_context(&context).await?;
        let Some(grades) = PerRoomValue::collect(&rooms, |room| {
            non_empty_str(input.get(&room.to_string()))
                .filter(|grade| MATERIAL_GRADES.contains(grade))
                .map(str::to_string)
        }) else {
            return Ok(StepResult::rejected(messages::SELECT_MATERIAL_GRADE));
        };

        context.set(session_keys::MATERIAL_GRADE, grades).await?;
        Ok(StepResult::new(None, NextAction::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn grade_per_room() {
        let context = Context::new();
        context
            .set(session_keys::RENOVATION_TYPE, ["Bathroom", "Kitchen"])
            .await
            .unwrap();
        context.set(session_keys::BATHROOMS_TO_RENO, 2).await.unwrap();

        let mut input = Map::new();
        input.insert("Bathroom 1".to_string(), json!("High-end"));
        input.insert("Bathroom 2".to_string(), json!("Budget-friendly"));
        let result = MaterialGradeStep.run(&input, context.clone()).await.unwrap();
        assert_eq!(
            result.validation_error.as_deref(),
            Some(messages::SELECT_MATERIAL_GRADE)
        );

        input.insert("Kitchen".to_string(), json!("Mid-range"));
        MaterialGradeStep.run(&input, context.clone()).await.unwrap();
        assert_eq!(
            context.get::<Value>("material_grade").await,
            Some(json!({
                "bedrooms": [],
                "bathrooms": ["High-end", "Budget-friendly"],
                "other": { "Kitchen": "Mid-range" }
            }))
        );
    }

    #[test]
    fn only_known_grades() {
        assert!(MaterialGradeStep.accepts("Kitchen", &json!("Mid-range")));
        assert!(MaterialGradeStep.accepts("Kitchen", &json!("")));
        assert!(!MaterialGradeStep.accepts("Kitchen", &json!("Luxury")));
    }
}
