use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::{
    context::Context,
    error::{FlowError, Result},
    step::{NextAction, Step},
    storage::Session,
};

/// Type alias for edge condition functions
pub type EdgeCondition = Arc<dyn Fn(&Context) -> bool + Send + Sync>;

/// Forward edge between steps
#[derive(Clone)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub condition: Option<EdgeCondition>,
}

/// A graph of steps forming one multi-step form.
///
/// The graph is immutable once built. Forward movement follows the edges in
/// the order they were added; backward movement is derived from the same
/// edges and the answers collected so far, so there is no history stack to
/// drift out of sync with the branch actually taken.
pub struct StepGraph {
    pub id: String,
    steps: HashMap<String, Arc<dyn Step>>,
    edges: Vec<Edge>,
    back_edges: HashMap<String, String>,
    start_step_id: Option<String>,
}

impl StepGraph {
    /// Submit the session draft to the current step and move the session on
    /// according to the step's verdict.
    pub async fn execute_session(&self, session: &mut Session) -> Result<ExecutionResult> {
        let step = self.step(&session.current_step_id)?;

        debug!(
            session_id = %session.id,
            step = %session.current_step_id,
            draft_fields = session.draft.len(),
            "Submitting step"
        );

        let mut result = step.run(&session.draft, session.context.clone()).await?;
        result.step_id = session.current_step_id.clone();
        session.status_message = result.status_message.clone();

        match result.next_action {
            NextAction::Continue => {
                match self.find_next_step(&result.step_id, &session.context) {
                    Some(next_step_id) => {
                        info!(
                            session_id = %session.id,
                            from = %result.step_id,
                            to = %next_step_id,
                            "Advancing"
                        );
                        session.move_to(next_step_id);
                    }
                    None => {
                        // no outgoing edge, stay at current step
                        session.draft.clear();
                        session.validation_error = None;
                    }
                }
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::WaitingForInput,
                    current_step_id: session.current_step_id.clone(),
                })
            }
            NextAction::WaitForInput => {
                session.validation_error = result.validation_error.clone();
                let status = match result.validation_error {
                    Some(message) => {
                        debug!(
                            session_id = %session.id,
                            step = %result.step_id,
                            message = %message,
                            "Submission rejected"
                        );
                        ExecutionStatus::Invalid(message)
                    }
                    None => ExecutionStatus::WaitingForInput,
                };
                Ok(ExecutionResult {
                    response: result.response,
                    status,
                    current_step_id: session.current_step_id.clone(),
                })
            }
            NextAction::End => {
                session.completed = true;
                session.draft.clear();
                session.validation_error = None;
                Ok(ExecutionResult {
                    response: result.response,
                    status: ExecutionStatus::Completed,
                    current_step_id: session.current_step_id.clone(),
                })
            }
        }
    }

    /// Move the session to the step it came from.
    pub fn go_back(&self, session: &mut Session) -> Result<ExecutionResult> {
        let previous = self.find_previous_step(&session.current_step_id, &session.context)?;
        info!(
            session_id = %session.id,
            from = %session.current_step_id,
            to = %previous,
            "Going back"
        );
        session.move_to(previous);
        session.completed = false;
        Ok(ExecutionResult {
            response: None,
            status: ExecutionStatus::WaitingForInput,
            current_step_id: session.current_step_id.clone(),
        })
    }

    /// Find the next step based on edges and conditions
    pub fn find_next_step(&self, current_step_id: &str, context: &Context) -> Option<String> {
        self.edges
            .iter()
            .filter(|edge| edge.from == current_step_id)
            .find(|edge| match &edge.condition {
                Some(condition) => condition(context),
                None => true,
            })
            .map(|edge| edge.to.clone())
    }

    /// Find the step that precedes `current_step_id` on the path the answers
    /// in `context` select.
    ///
    /// An explicit back edge wins. Otherwise the forward rules are replayed
    /// from the start step and the step visited right before the current one
    /// is returned.
    pub fn find_previous_step(&self, current_step_id: &str, context: &Context) -> Result<String> {
        self.step(current_step_id)?;

        if let Some(target) = self.back_edges.get(current_step_id) {
            return Ok(target.clone());
        }

        let start = self
            .start_step_id
            .clone()
            .ok_or_else(|| FlowError::StepNotFound("<start>".to_string()))?;
        if start == current_step_id {
            return Err(FlowError::NoPreviousStep(current_step_id.to_string()));
        }

        let mut previous = start;
        // every step is visited at most once on a valid path
        for _ in 0..self.steps.len() {
            match self.find_next_step(&previous, context) {
                Some(next) if next == current_step_id => return Ok(previous),
                Some(next) => previous = next,
                None => break,
            }
        }

        Err(FlowError::InconsistentPath {
            current: current_step_id.to_string(),
        })
    }

    /// Get the start step ID
    pub fn start_step_id(&self) -> Option<&str> {
        self.start_step_id.as_deref()
    }

    /// Get a step by ID
    pub fn get_step(&self, step_id: &str) -> Option<Arc<dyn Step>> {
        self.steps.get(step_id).cloned()
    }

    fn step(&self, step_id: &str) -> Result<Arc<dyn Step>> {
        self.get_step(step_id)
            .ok_or_else(|| FlowError::StepNotFound(step_id.to_string()))
    }
}

/// Builder for creating graphs
pub struct GraphBuilder {
    id: String,
    steps: HashMap<String, Arc<dyn Step>>,
    edges: Vec<Edge>,
    back_edges: HashMap<String, String>,
    start_step_id: Option<String>,
}

impl GraphBuilder {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            steps: HashMap::new(),
            edges: Vec::new(),
            back_edges: HashMap::new(),
            start_step_id: None,
        }
    }

    /// Add a step; the first one added becomes the start step.
    pub fn add_step(mut self, step: Arc<dyn Step>) -> Self {
        let step_id = step.id().to_string();
        if self.start_step_id.is_none() {
            self.start_step_id = Some(step_id.clone());
        }
        self.steps.insert(step_id, step);
        self
    }

    pub fn add_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.edges.push(Edge {
            from: from.into(),
            to: to.into(),
            condition: None,
        });
        self
    }

    /// Route from `from` to `yes` when `condition` holds, else to `no`.
    pub fn add_conditional_edge<F>(
        mut self,
        from: impl Into<String>,
        condition: F,
        yes: impl Into<String>,
        no: impl Into<String>,
    ) -> Self
    where
        F: Fn(&Context) -> bool + Send + Sync + 'static,
    {
        let from = from.into();
        self.edges.push(Edge {
            from: from.clone(),
            to: yes.into(),
            condition: Some(Arc::new(condition)),
        });
        self.edges.push(Edge {
            from,
            to: no.into(),
            condition: None,
        });
        self
    }

    /// Pin the back target of `from` instead of deriving it.
    pub fn add_back_edge(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.back_edges.insert(from.into(), to.into());
        self
    }

    pub fn set_start_step(mut self, step_id: impl Into<String>) -> Self {
        let step_id = step_id.into();
        if self.steps.contains_key(&step_id) {
            self.start_step_id = Some(step_id);
        }
        self
    }

    pub fn build(self) -> StepGraph {
        StepGraph {
            id: self.id,
            steps: self.steps,
            edges: self.edges,
            back_edges: self.back_edges,
            start_step_id: self.start_step_id,
        }
    }
}

/// Outcome of one engine call
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub response: Option<String>,
    pub status: ExecutionStatus,
    /// Step the session is on after the call
    pub current_step_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    /// Waiting for user input on the current step
    WaitingForInput,
    /// The submission failed the step's predicate
    Invalid(String),
    /// The terminal step was reached
    Completed,
    /// Another call for the same session is still in progress
    Busy,
}
