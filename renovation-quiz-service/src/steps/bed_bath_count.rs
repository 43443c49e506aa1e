use async_trait::async_trait;
use serde_json::{Map, Value};
use step_flow::{Context, FlowError, NextAction, Result, Step, StepResult};
use tracing::info;

use crate::catalogue::QuizStep;

use super::types::{BATHROOM, BEDROOM, FULL_RENOVATION, messages, session_keys};
use super::utils::{is_digit_input, whole_number};

/// Which room counts the current selection asks for, in display order.
pub fn applicable_counts(selection: &[String]) -> Vec<&'static str> {
    let has = |label: &str| selection.iter().any(|l| l == label);
    let full = has(FULL_RENOVATION);

    let mut keys = Vec::new();
    if full || has(BEDROOM) {
        keys.push(session_keys::BEDROOMS_TO_RENO);
    }
    if full || has(BATHROOM) {
        keys.push(session_keys::BATHROOMS_TO_RENO);
    }
    keys
}

/// Number of bedrooms and/or bathrooms to renovate.
pub struct BedBathCountStep;

#[async_trait]
impl Step for BedBathCountStep {
    fn id(&self) -> &str {
        QuizStep::BedBathCount.id()
    }

    fn accepts(&self, field: &str, value: &Value) -> bool {
        matches!(
            field,
            session_keys::BEDROOMS_TO_RENO | session_keys::BATHROOMS_TO_RENO
        ) && is_digit_input(value)
    }

    async fn run(&self, input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        let selection: Vec<String> = context
            .get(session_keys::RENOVATION_TYPE)
            .await
            .ok_or_else(|| FlowError::ContextError("renovation_type not found".to_string()))?;

        let mut counts = Vec::new();
        for key in applicable_counts(&selection) {
            match whole_number(input.get(key)) {
                None => return Ok(StepResult::rejected(messages::ENTER_A_VALUE)),
                Some(0) => return Ok(StepResult::rejected(messages::GREATER_THAN_ZERO)),
                Some(count) => match u32::try_from(count) {
                    Ok(count) => counts.push((key, count)),
                    Err(_) => return Ok(StepResult::rejected(messages::ENTER_A_VALUE)),
                },
            }
        }

        for (key, count) in counts {
            info!(field = key, count, "Room count recorded");
            context.set(key, count).await?;
        }
        Ok(StepResult::new(None, NextAction::Continue))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn labels(selection: &[&str]) -> Vec<String> {
        selection.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn full_renovation_asks_for_both_counts() {
        assert_eq!(
            applicable_counts(&labels(&["Full renovation"])),
            vec!["bedrooms_to_reno", "bathrooms_to_reno"]
        );
        assert_eq!(
            applicable_counts(&labels(&["Bathroom", "Kitchen"])),
            vec!["bathrooms_to_reno"]
        );
        assert!(applicable_counts(&labels(&["Kitchen"])).is_empty());
    }

    #[tokio::test]
    async fn writes_only_applicable_counts() {
        let context = Context::new();
        context.set(session_keys::RENOVATION_TYPE, ["Bedroom"]).await.unwrap();

        let mut input = Map::new();
        input.insert("bedrooms_to_reno".to_string(), json!("2"));
        input.insert("bathrooms_to_reno".to_string(), json!("5"));
        let result = BedBathCountStep.run(&input, context.clone()).await.unwrap();

        assert_eq!(result.next_action, NextAction::Continue);
        assert_eq!(context.get::<u32>("bedrooms_to_reno").await, Some(2));
        assert!(!context.contains("bathrooms_to_reno"));
    }

    #[tokio::test]
    async fn empty_and_zero_have_distinct_messages() {
        let context = Context::new();
        context
            .set(session_keys::RENOVATION_TYPE, ["Bedroom", "Bathroom"])
            .await
            .unwrap();

        let mut input = Map::new();
        input.insert("bedrooms_to_reno".to_string(), json!("1"));
        let result = BedBathCountStep.run(&input, context.clone()).await.unwrap();
        assert_eq!(result.validation_error.as_deref(), Some(messages::ENTER_A_VALUE));

        input.insert("bathrooms_to_reno".to_string(), json!("0"));
        let result = BedBathCountStep.run(&input, context.clone()).await.unwrap();
        assert_eq!(result.validation_error.as_deref(), Some(messages::GREATER_THAN_ZERO));

        assert!(!context.contains("bedrooms_to_reno"));
    }

    #[test]
    fn only_digits_get_into_the_draft() {
        assert!(BedBathCountStep.accepts("bedrooms_to_reno", &json!("12")));
        assert!(!BedBathCountStep.accepts("bedrooms_to_reno", &json!("1.5")));
        assert!(!BedBathCountStep.accepts("bedrooms_to_reno", &json!("two")));
        assert!(!BedBathCountStep.accepts("kitchens", &json!("1")));
    }
}
