use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use step_flow::{Context, NextAction, Result, Step, StepResult};
use tracing::{info, warn};

use crate::catalogue::QuizStep;
use crate::gateway::Estimator;

use super::types::{messages, session_keys};
use super::utils::non_empty_str;

/// Keys the estimator writes back; never sent to it.
const ESTIMATE_KEYS: [&str; 4] = [
    session_keys::LOCATION,
    session_keys::PREDICTED_COST,
    session_keys::POST_RENOVATION_VALUE,
    session_keys::ESTIMATE_UNAVAILABLE,
];

/// Last question. Submitting it calls the estimator and only moves on once
/// the estimate (or its zero fallback) is in the answer store.
pub struct LocationStep {
    locations: Vec<String>,
    estimator: Arc<dyn Estimator>,
}

impl LocationStep {
    pub fn new(locations: Vec<String>, estimator: Arc<dyn Estimator>) -> Self {
        Self {
            locations,
            estimator,
        }
    }

    fn is_known(&self, location: &str) -> bool {
        self.locations.iter().any(|l| l == location)
    }
}

#[async_trait]
impl Step for LocationStep {
    fn id(&self) -> &str {
        QuizStep::Location.id()
    }

    fn accepts(&self, field: &str, value: &Value) -> bool {
        field == session_keys::LOCATION
            && match value {
                Value::Null => true,
                Value::String(s) => s.is_empty() || self.is_known(s),
                _ => false,
            }
    }

    async fn run(&self, input: &Map<String, Value>, context: Context) -> Result<StepResult> {
        info!("running step: {}", self.id());

        let Some(location) = non_empty_str(input.get(session_keys::LOCATION))
            .filter(|location| self.is_known(location))
        else {
            return Ok(StepResult::rejected(messages::SELECT_LOCATION));
        };

        let mut answers = context.snapshot();
        for key in ESTIMATE_KEYS {
            answers.remove(key);
        }

        let estimate = self.estimator.estimate(&answers, location).await;
        if estimate.fallback {
            warn!(location = %location, "No estimate available, showing zero figures");
        }

        context.set(session_keys::LOCATION, location).await?;
        context
            .set(session_keys::PREDICTED_COST, estimate.predicted_cost)
            .await?;
        context
            .set(session_keys::POST_RENOVATION_VALUE, estimate.post_renovation_value)
            .await?;
        context
            .set(session_keys::ESTIMATE_UNAVAILABLE, estimate.fallback)
            .await?;

        let status = if estimate.fallback {
            "Estimate unavailable"
        } else {
            "Estimate received"
        };
        Ok(StepResult::new_with_status(
            None,
            NextAction::Continue,
            Some(status.to_string()),
        ))
    }
}
