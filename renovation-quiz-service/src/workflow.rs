use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use step_flow::{
    Context, ExecutionResult, ExecutionStatus, FlowRunner, GraphBuilder, Session, SessionStorage,
    Step, StepGraph,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalogue::QuizStep;
use crate::error::QuizError;
use crate::gateway::Estimator;
use crate::models::SessionView;
use crate::presentation::ResultView;
use crate::rooms::rooms_from_context;
use crate::selection::{RenovationSelection, UpgradeScheduler};
use crate::steps::bed_bath_count::applicable_counts;
use crate::steps::types::{MATERIAL_GRADES, RENOVATION_TYPES, ROOM_COUNT_TYPES};
use crate::steps::*;

/// Whether the answers so far route through the room-count question.
pub fn needs_room_counts(context: &Context) -> bool {
    context
        .get_sync::<Vec<String>>(session_keys::RENOVATION_TYPE)
        .map(|selection| {
            selection
                .iter()
                .any(|label| ROOM_COUNT_TYPES.contains(&label.as_str()))
        })
        .unwrap_or(false)
}

pub fn build_quiz_graph(estimator: Arc<dyn Estimator>, locations: Vec<String>) -> StepGraph {
    let landing = Arc::new(LandingStep);
    let reno_type = Arc::new(RenoTypeStep);
    let bed_bath_count = Arc::new(BedBathCountStep);
    let sqft_to_add = Arc::new(SqftStep::to_add());
    let struct_changes = Arc::new(StructChangesStep);
    let sqft_to_reno = Arc::new(SqftStep::to_renovate());
    let material_grade = Arc::new(MaterialGradeStep);
    let property_size = Arc::new(PropertySizeStep);
    let location = Arc::new(LocationStep::new(locations, estimator));
    let result = Arc::new(ResultStep);

    let landing_id = landing.id().to_string();
    let reno_type_id = reno_type.id().to_string();
    let bed_bath_count_id = bed_bath_count.id().to_string();
    let sqft_to_add_id = sqft_to_add.id().to_string();
    let struct_changes_id = struct_changes.id().to_string();
    let sqft_to_reno_id = sqft_to_reno.id().to_string();
    let material_grade_id = material_grade.id().to_string();
    let property_size_id = property_size.id().to_string();
    let location_id = location.id().to_string();
    let result_id = result.id().to_string();

    GraphBuilder::new("renovation_quiz")
        .add_step(landing)
        .add_step(reno_type)
        .add_step(bed_bath_count)
        .add_step(sqft_to_add)
        .add_step(struct_changes)
        .add_step(sqft_to_reno)
        .add_step(material_grade)
        .add_step(property_size)
        .add_step(location)
        .add_step(result)
        .add_edge(&landing_id, &reno_type_id)
        .add_conditional_edge(
            &reno_type_id,
            needs_room_counts,
            &bed_bath_count_id,
            &sqft_to_add_id,
        )
        .add_edge(&bed_bath_count_id, &sqft_to_add_id)
        .add_edge(&sqft_to_add_id, &struct_changes_id)
        .add_edge(&struct_changes_id, &sqft_to_reno_id)
        .add_edge(&sqft_to_reno_id, &material_grade_id)
        .add_edge(&material_grade_id, &property_size_id)
        .add_edge(&property_size_id, &location_id)
        .add_edge(&location_id, &result_id)
        // room counts always lead back to the type question
        .add_back_edge(&bed_bath_count_id, &reno_type_id)
        .build()
}

/// Every user action on a quiz session goes through here.
///
/// Each action first cancels any pending full-renovation upgrade for the
/// session, then hands the session to the runner.
#[derive(Clone)]
pub struct QuizFlow {
    runner: FlowRunner,
    upgrades: Arc<UpgradeScheduler>,
    locations: Arc<Vec<String>>,
}

impl QuizFlow {
    pub fn new(
        estimator: Arc<dyn Estimator>,
        storage: Arc<dyn SessionStorage>,
        locations: Vec<String>,
        auto_upgrade_delay: Duration,
    ) -> Self {
        let graph = Arc::new(build_quiz_graph(estimator, locations.clone()));
        let runner = FlowRunner::new(graph, storage);
        let upgrades = Arc::new(UpgradeScheduler::new(auto_upgrade_delay, runner.clone()));
        Self {
            runner,
            upgrades,
            locations: Arc::new(locations),
        }
    }

    pub fn runner(&self) -> &FlowRunner {
        &self.runner
    }

    pub fn upgrades(&self) -> &UpgradeScheduler {
        &self.upgrades
    }

    pub async fn create(&self) -> Result<Session, QuizError> {
        let session_id = Uuid::new_v4().to_string();
        let session = self.runner.create_session(session_id).await?;
        info!(session_id = %session.id, "Quiz session created");
        Ok(session)
    }

    pub async fn session(&self, session_id: &str) -> Result<Session, QuizError> {
        self.runner
            .storage()
            .get(session_id)
            .await?
            .ok_or_else(|| step_flow::FlowError::SessionNotFound(session_id.to_string()).into())
    }

    /// Merge `fields` into the draft and submit it to the current step.
    ///
    /// Landing treats this as "start". Reaching the result step runs it
    /// straight away so the session comes back completed.
    pub async fn next(
        &self,
        session_id: &str,
        fields: Map<String, Value>,
    ) -> Result<ExecutionResult, QuizError> {
        self.upgrades.cancel(session_id);
        self.ensure_not_on(session_id, QuizStep::Result, "next").await?;

        Ok(self
            .runner
            .submit_then_run(session_id, fields, QuizStep::Result.id())
            .await?)
    }

    pub async fn back(&self, session_id: &str) -> Result<ExecutionResult, QuizError> {
        self.upgrades.cancel(session_id);
        self.ensure_not_on(session_id, QuizStep::Result, "back").await?;
        Ok(self.runner.back(session_id).await?)
    }

    /// Store unsubmitted field values for the current step.
    pub async fn edit(
        &self,
        session_id: &str,
        fields: Map<String, Value>,
    ) -> Result<ExecutionResult, QuizError> {
        self.upgrades.cancel(session_id);

        let selection = fields
            .get(session_keys::RENOVATION_TYPE)
            .map(|value| RenovationSelection::from_draft(Some(value)));
        let result = self.runner.edit(session_id, fields).await?;

        if result.status != ExecutionStatus::Busy
            && result.current_step_id == QuizStep::RenoType.id()
        {
            if let Some(selection) = selection.filter(RenovationSelection::needs_auto_upgrade) {
                self.upgrades.schedule(session_id, selection);
            }
        }
        Ok(result)
    }

    /// Click one renovation type on the type question.
    pub async fn toggle_selection(
        &self,
        session_id: &str,
        label: &str,
    ) -> Result<ExecutionResult, QuizError> {
        self.upgrades.cancel(session_id);

        let mut toggled = None;
        let result = self
            .runner
            .edit_with(session_id, |session| {
                if session.current_step_id != QuizStep::RenoType.id() {
                    return Err(QuizError::InvalidAction {
                        step: session.current_step_id.clone(),
                        action: "toggle",
                    });
                }
                let mut selection = RenovationSelection::from_draft(
                    session.draft.get(session_keys::RENOVATION_TYPE),
                );
                selection.toggle(label)?;

                let mut fields = Map::new();
                fields.insert(session_keys::RENOVATION_TYPE.to_string(), selection.to_value());
                toggled = Some(selection);
                Ok(fields)
            })
            .await?;

        if let Some(selection) = toggled {
            debug!(session_id = %session_id, selection = ?selection.labels(), "Selection toggled");
            if selection.needs_auto_upgrade() {
                self.upgrades.schedule(session_id, selection);
            }
        }
        Ok(result)
    }

    /// Clear every answer and return to the landing screen. Only offered on
    /// the result screen.
    pub async fn restart(&self, session_id: &str) -> Result<ExecutionResult, QuizError> {
        self.upgrades.cancel(session_id);
        let session = self.session(session_id).await?;
        if session.current_step_id != QuizStep::Result.id() {
            return Err(QuizError::InvalidAction {
                step: session.current_step_id,
                action: "restart",
            });
        }

        info!(session_id = %session_id, "Restarting quiz");
        Ok(self.runner.reset(session_id).await?)
    }

    /// Everything a client needs to render the current step.
    pub async fn view(&self, session: &Session) -> Result<SessionView, QuizError> {
        let step = QuizStep::from_id(&session.current_step_id)
            .ok_or_else(|| step_flow::FlowError::StepNotFound(session.current_step_id.clone()))?;

        let fields: Vec<String> = match step {
            QuizStep::RenoType => vec![session_keys::RENOVATION_TYPE.to_string()],
            QuizStep::BedBathCount => {
                let selection: Vec<String> = session
                    .context
                    .get(session_keys::RENOVATION_TYPE)
                    .await
                    .unwrap_or_default();
                applicable_counts(&selection)
                    .into_iter()
                    .map(str::to_string)
                    .collect()
            }
            QuizStep::SqftToAdd
            | QuizStep::StructChanges
            | QuizStep::SqftToReno
            | QuizStep::MaterialGrade => rooms_from_context(&session.context)
                .await?
                .iter()
                .map(ToString::to_string)
                .collect(),
            QuizStep::PropertySize => vec![session_keys::PROPERTY_SIZE.to_string()],
            QuizStep::Location => vec![session_keys::LOCATION.to_string()],
            QuizStep::Landing | QuizStep::Result => Vec::new(),
        };

        let options: Vec<String> = match step {
            QuizStep::RenoType => RENOVATION_TYPES.iter().map(|s| s.to_string()).collect(),
            QuizStep::StructChanges => vec!["Yes".to_string(), "No".to_string()],
            QuizStep::MaterialGrade => MATERIAL_GRADES.iter().map(|s| s.to_string()).collect(),
            QuizStep::Location => self.locations.as_ref().clone(),
            _ => Vec::new(),
        };

        let result = (step == QuizStep::Result).then(|| ResultView::from_context(&session.context));

        Ok(SessionView {
            session_id: session.id.clone(),
            step: step.id().to_string(),
            position: step.position(),
            progress: step.progress_label(),
            heading: step.heading().to_string(),
            fields,
            options,
            draft: session.draft.clone(),
            validation_error: session.validation_error.clone(),
            status_message: session.status_message.clone(),
            answers: session.context.snapshot(),
            completed: session.completed,
            upgrade_pending: self.upgrades.is_pending(&session.id),
            result,
        })
    }

    async fn ensure_not_on(
        &self,
        session_id: &str,
        step: QuizStep,
        action: &'static str,
    ) -> Result<(), QuizError> {
        let session = self.session(session_id).await?;
        if session.current_step_id == step.id() {
            return Err(QuizError::InvalidAction {
                step: session.current_step_id,
                action,
            });
        }
        Ok(())
    }
}
