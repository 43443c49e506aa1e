use async_trait::async_trait;
use serde_json::{Map, Value};
use step_flow::{Context, NextAction, Result, Step, StepResult};
use tracing::info;

use crate::catalogue::QuizStep;
use crate::rooms::{PerRoomValue, rooms_from_context};

use super::types::{messages, session_keys};
use super::utils::{is_digit_input, whole_number};

/// Square footage per room instance. Zero is a valid answer ("no change").
///
/// The draft is keyed by room label (`"Bedroom 1"`, `"Kitchen"`), one
/// digits-only value per room.
pub struct SqftStep {
    step: QuizStep,
    answer_key: &'static str,
}

impl SqftStep {
    /// Extension footage, stored as `sqft_to_add`.
    pub fn to_add() -> Self {
        Self {
            step: QuizStep::SqftToAdd,
            answer_key: session_keys::SQFT_TO_ADD,
        }
    }

    /// Footage being renovated, stored as `sqft_renovated`.
    pub fn to_renovate() -> Self {
        Self {
            step: QuizStep::SqftToReno,
            answer_key: session_keys::SQFT_RENOVATED,
        }
    }
}

#[async_trait]
impl Step for SqftStep {
    fn id(&self) -> &str {
        self.step.id()
    }

    fn accepts(&self, _field: &str, value: &Value) -> bool {
        is_digit_input(value)
    }

    async fn run(&self, input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        let rooms = rooms_from_context(&context).await?;
        let Some(footage) =
            PerRoomValue::collect(&rooms, |room| whole_number(input.get(&room.to_string())))
        else {
            return Ok(StepResult::rejected(messages::FILL_ALL_FIELDS));
        };

        info!(field = self.answer_key, rooms = rooms.len(), "Square footage recorded");
        context.set(self.answer_key, footage).await?;
        Ok(StepResult::new(None, NextAction::Continue))
    }
}
