//! FlowRunner – wraps the _load → act → save_ cycle for one session and makes
//! sure only one call per session is in progress at a time.
//!
//! A form front end issues one runner call per user action (Next, Back, an
//! edit, a restart). The runner loads the session, lets the graph act on it,
//! and persists the result so the next call starts where this one left off.
//!
//! ## Single flight
//! A call that arrives while another call for the same session has not
//! finished yet returns [`ExecutionStatus::Busy`] and leaves the session
//! untouched. This keeps a double-clicked Next from submitting twice while a
//! slow step (for example one that calls a remote service) is still running.

use dashmap::DashSet;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    error::{FlowError, Result},
    graph::{ExecutionResult, ExecutionStatus, StepGraph},
    storage::{Session, SessionStorage},
};

/// High-level helper that orchestrates session actions against one graph.
#[derive(Clone)]
pub struct FlowRunner {
    graph: Arc<StepGraph>,
    storage: Arc<dyn SessionStorage>,
    in_flight: Arc<DashSet<String>>,
}

/// Releases the single-flight slot for a session when dropped.
struct FlightGuard {
    session_id: String,
    in_flight: Arc<DashSet<String>>,
}

impl Drop for FlightGuard {
    fn drop(&mut self) {
        self.in_flight.remove(&self.session_id);
    }
}

impl FlowRunner {
    pub fn new(graph: Arc<StepGraph>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            graph,
            storage,
            in_flight: Arc::new(DashSet::new()),
        }
    }

    pub fn graph(&self) -> &Arc<StepGraph> {
        &self.graph
    }

    pub fn storage(&self) -> &Arc<dyn SessionStorage> {
        &self.storage
    }

    /// Create and persist a fresh session positioned on the start step.
    pub async fn create_session(&self, session_id: String) -> Result<Session> {
        let start = self
            .graph
            .start_step_id()
            .ok_or_else(|| FlowError::StepNotFound("<start>".to_string()))?;
        let mut session = Session::new_from_step(session_id, start);
        session.graph_id = self.graph.id.clone();
        self.storage.save(session.clone()).await?;
        Ok(session)
    }

    /// Submit the current draft of the session to its current step.
    pub async fn run(&self, session_id: &str) -> Result<ExecutionResult> {
        let Some(_guard) = self.try_acquire(session_id) else {
            return self.busy(session_id).await;
        };
        let mut session = self.load(session_id).await?;
        let result = self.graph.execute_session(&mut session).await?;
        self.storage.save(session).await?;
        Ok(result)
    }

    /// Merge `fields` into the draft and submit it in one call.
    pub async fn submit(&self, session_id: &str, fields: Map<String, Value>) -> Result<ExecutionResult> {
        self.submit_inner(session_id, fields, None).await
    }

    /// Like [`submit`](Self::submit), but a session that lands on `then_run`
    /// has that step run too before the single-flight slot is released.
    ///
    /// For steps with nothing to ask, such as a final summary.
    pub async fn submit_then_run(
        &self,
        session_id: &str,
        fields: Map<String, Value>,
        then_run: &str,
    ) -> Result<ExecutionResult> {
        self.submit_inner(session_id, fields, Some(then_run)).await
    }

    async fn submit_inner(
        &self,
        session_id: &str,
        fields: Map<String, Value>,
        then_run: Option<&str>,
    ) -> Result<ExecutionResult> {
        let Some(_guard) = self.try_acquire(session_id) else {
            return self.busy(session_id).await;
        };
        let mut session = self.load(session_id).await?;
        self.apply_edit(&mut session, fields)?;
        let mut result = self.graph.execute_session(&mut session).await?;
        if result.status == ExecutionStatus::WaitingForInput
            && then_run.is_some_and(|step_id| step_id == session.current_step_id)
        {
            debug!(session_id = %session_id, step = %session.current_step_id, "Running step on arrival");
            result = self.graph.execute_session(&mut session).await?;
        }
        self.storage.save(session).await?;
        Ok(result)
    }

    /// Go back to the step the session came from.
    pub async fn back(&self, session_id: &str) -> Result<ExecutionResult> {
        let Some(_guard) = self.try_acquire(session_id) else {
            return self.busy(session_id).await;
        };
        let mut session = self.load(session_id).await?;
        let result = self.graph.go_back(&mut session)?;
        self.storage.save(session).await?;
        Ok(result)
    }

    /// Merge unsubmitted field values into the draft of the current step.
    ///
    /// Every field must pass the step's keystroke filter, otherwise nothing
    /// is stored. An accepted edit clears the error of the last submission.
    pub async fn edit(&self, session_id: &str, fields: Map<String, Value>) -> Result<ExecutionResult> {
        let Some(_guard) = self.try_acquire(session_id) else {
            return self.busy(session_id).await;
        };
        let mut session = self.load(session_id).await?;
        self.apply_edit(&mut session, fields)?;
        let current_step_id = session.current_step_id.clone();
        self.storage.save(session).await?;
        Ok(ExecutionResult {
            response: None,
            status: ExecutionStatus::WaitingForInput,
            current_step_id,
        })
    }

    /// Compute draft fields from the current session and merge them, all
    /// while holding the session's single-flight slot.
    ///
    /// Used for edits that depend on what is already in the draft, such as
    /// toggling one entry of a multi-select.
    pub async fn edit_with<F, E>(&self, session_id: &str, f: F) -> std::result::Result<ExecutionResult, E>
    where
        F: FnOnce(&Session) -> std::result::Result<Map<String, Value>, E>,
        E: From<FlowError>,
    {
        let Some(_guard) = self.try_acquire(session_id) else {
            return Ok(self.busy(session_id).await?);
        };
        let mut session = self.load(session_id).await?;
        let fields = f(&session)?;
        self.apply_edit(&mut session, fields)?;
        let current_step_id = session.current_step_id.clone();
        self.storage.save(session).await?;
        Ok(ExecutionResult {
            response: None,
            status: ExecutionStatus::WaitingForInput,
            current_step_id,
        })
    }

    /// Drop every answer and put the session back on the start step.
    pub async fn reset(&self, session_id: &str) -> Result<ExecutionResult> {
        let Some(_guard) = self.try_acquire(session_id) else {
            return self.busy(session_id).await;
        };
        let mut session = self.load(session_id).await?;
        let start = self
            .graph
            .start_step_id()
            .ok_or_else(|| FlowError::StepNotFound("<start>".to_string()))?
            .to_string();
        session.context.clear().await;
        session.move_to(start);
        session.completed = false;
        session.status_message = None;
        let current_step_id = session.current_step_id.clone();
        self.storage.save(session).await?;
        Ok(ExecutionResult {
            response: None,
            status: ExecutionStatus::WaitingForInput,
            current_step_id,
        })
    }

    fn apply_edit(&self, session: &mut Session, fields: Map<String, Value>) -> Result<()> {
        if fields.is_empty() {
            return Ok(());
        }
        let step = self
            .graph
            .get_step(&session.current_step_id)
            .ok_or_else(|| FlowError::StepNotFound(session.current_step_id.clone()))?;

        if let Some((field, _)) = fields.iter().find(|(field, value)| !step.accepts(field, value)) {
            debug!(session_id = %session.id, field = %field, "Edit rejected by step filter");
            return Err(FlowError::EditRejected {
                field: field.clone(),
            });
        }

        session.draft.extend(fields);
        session.validation_error = None;
        Ok(())
    }

    async fn load(&self, session_id: &str) -> Result<Session> {
        self.storage
            .get(session_id)
            .await?
            .ok_or_else(|| FlowError::SessionNotFound(session_id.to_string()))
    }

    async fn busy(&self, session_id: &str) -> Result<ExecutionResult> {
        warn!(session_id = %session_id, "Ignoring call while another is in flight");
        let session = self.load(session_id).await?;
        Ok(ExecutionResult {
            response: None,
            status: ExecutionStatus::Busy,
            current_step_id: session.current_step_id,
        })
    }

    fn try_acquire(&self, session_id: &str) -> Option<FlightGuard> {
        self.in_flight
            .insert(session_id.to_string())
            .then(|| FlightGuard {
                session_id: session_id.to_string(),
                in_flight: self.in_flight.clone(),
            })
    }
}
