use axum::{
    Router,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderValue, Request, StatusCode},
    middleware::{Next, from_fn},
    response::{IntoResponse, Json, Response},
    routing::{get, patch, post},
};
use serde_json::{Map, Value, json};
use std::sync::Arc;
use std::time::Duration;
use step_flow::{ExecutionResult, ExecutionStatus, FlowError, InMemorySessionStorage};
use thiserror::Error;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, error, info, warn};
use uuid::Uuid;

use crate::config::ServiceConfig;
use crate::error::QuizError;
use crate::gateway::HttpEstimationGateway;
use crate::models::{ActionResponse, SessionView, ToggleSelectionRequest, status_label};
use crate::workflow::QuizFlow;

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Invalid session id")]
    InvalidSessionId(String),

    #[error("Session not found")]
    NotFound(String),

    #[error("Invalid request body: {message}")]
    InvalidBody { session_id: String, message: String },

    #[error("{message}")]
    Rejected { session_id: String, message: String },

    #[error("{message}")]
    Conflict { session_id: String, message: String },

    #[error("{message}")]
    Internal { session_id: String, message: String },
}

impl ApiError {
    fn from_quiz(session_id: &str, e: QuizError) -> Self {
        let session_id = session_id.to_string();
        match e {
            QuizError::Flow(FlowError::SessionNotFound(_)) => ApiError::NotFound(session_id),
            QuizError::Flow(e @ FlowError::EditRejected { .. }) => ApiError::Rejected {
                session_id,
                message: e.to_string(),
            },
            e @ QuizError::UnknownRenovationType(_) => ApiError::Rejected {
                session_id,
                message: e.to_string(),
            },
            QuizError::Flow(e @ FlowError::NoPreviousStep(_)) => ApiError::Conflict {
                session_id,
                message: e.to_string(),
            },
            e @ QuizError::InvalidAction { .. } => ApiError::Conflict {
                session_id,
                message: e.to_string(),
            },
            e => {
                error!(session_id = %session_id, error = %e, "Quiz action failed");
                ApiError::Internal {
                    session_id,
                    message: e.to_string(),
                }
            }
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidSessionId(_) | ApiError::InvalidBody { .. } => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Rejected { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Conflict { .. } => StatusCode::CONFLICT,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn session_id(&self) -> &str {
        match self {
            ApiError::InvalidSessionId(id) | ApiError::NotFound(id) => id,
            ApiError::InvalidBody { session_id, .. }
            | ApiError::Rejected { session_id, .. }
            | ApiError::Conflict { session_id, .. }
            | ApiError::Internal { session_id, .. } => session_id,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": self.to_string(),
            "session_id": self.session_id(),
        });
        (self.status(), Json(body)).into_response()
    }
}

#[derive(Clone)]
pub struct AppState {
    pub flow: QuizFlow,
}

/// Router backed by the HTTP estimator and in-memory sessions.
///
/// Must be called inside a tokio runtime; it starts the idle-session sweeper.
pub fn create_app(config: &ServiceConfig) -> anyhow::Result<Router> {
    let estimator = HttpEstimationGateway::new(config.gateway.clone())?;
    let storage = Arc::new(InMemorySessionStorage::new());
    tokio::spawn(sweep_idle_sessions(
        storage.clone(),
        config.session_idle_ttl,
        config.session_sweep_interval,
    ));
    let flow = QuizFlow::new(
        Arc::new(estimator),
        storage,
        config.locations.clone(),
        config.auto_upgrade_delay,
    );
    Ok(build_router(AppState { flow }))
}

/// Periodically drop sessions idle for longer than `idle_ttl`.
pub async fn sweep_idle_sessions(
    storage: Arc<InMemorySessionStorage>,
    idle_ttl: Duration,
    every: Duration,
) {
    let mut interval_timer = tokio::time::interval(every);
    loop {
        interval_timer.tick().await;
        let pruned = storage.prune_idle(idle_ttl);
        if pruned > 0 {
            info!(count = pruned, remaining = storage.len(), "Pruned idle quiz sessions");
        }
    }
}

pub fn build_router(app_state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/quiz", post(create_quiz))
        .route("/quiz/{session_id}", get(get_quiz))
        .route("/quiz/{session_id}/next", post(next_step))
        .route("/quiz/{session_id}/back", post(previous_step))
        .route("/quiz/{session_id}/draft", patch(edit_draft))
        .route("/quiz/{session_id}/selection", post(toggle_selection))
        .route("/quiz/{session_id}/restart", post(restart_quiz))
        .layer(from_fn(correlation_id_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

/// Middleware to add correlation ID to all requests
async fn correlation_id_middleware(mut request: Request<axum::body::Body>, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        request.headers_mut().insert("x-correlation-id", value);
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    next.run(request).instrument(span).await
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Renovation Quiz Service",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "POST /quiz": "Start a new quiz session",
            "GET /quiz/{session_id}": "Current step, draft and answers",
            "POST /quiz/{session_id}/next": "Submit the current step",
            "POST /quiz/{session_id}/back": "Return to the previous step",
            "PATCH /quiz/{session_id}/draft": "Edit field values of the current step",
            "POST /quiz/{session_id}/selection": "Toggle one renovation type",
            "POST /quiz/{session_id}/restart": "Clear all answers from the result screen",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn create_quiz(State(state): State<AppState>) -> Result<(StatusCode, Json<SessionView>), ApiError> {
    let session = state
        .flow
        .create()
        .await
        .map_err(|e| ApiError::from_quiz("", e))?;
    let view = state
        .flow
        .view(&session)
        .await
        .map_err(|e| ApiError::from_quiz(&session.id, e))?;
    Ok((StatusCode::CREATED, Json(view)))
}

async fn get_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<SessionView> {
    validate_session_id(&session_id)?;
    Ok(Json(session_view(&state, &session_id).await?))
}

async fn next_step(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    body: Bytes,
) -> ApiResult<ActionResponse> {
    validate_session_id(&session_id)?;
    let fields = optional_fields(&session_id, &body)?;
    info!(session_id = %session_id, fields = fields.len(), "Submitting step");

    let result = state.flow.next(&session_id, fields).await;
    respond(&state, &session_id, result).await
}

async fn previous_step(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ActionResponse> {
    validate_session_id(&session_id)?;
    let result = state.flow.back(&session_id).await;
    respond(&state, &session_id, result).await
}

async fn edit_draft(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(fields): Json<Map<String, Value>>,
) -> ApiResult<ActionResponse> {
    validate_session_id(&session_id)?;
    let result = state.flow.edit(&session_id, fields).await;
    respond(&state, &session_id, result).await
}

async fn toggle_selection(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    Json(request): Json<ToggleSelectionRequest>,
) -> ApiResult<ActionResponse> {
    validate_session_id(&session_id)?;
    let result = state.flow.toggle_selection(&session_id, &request.label).await;
    respond(&state, &session_id, result).await
}

async fn restart_quiz(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> ApiResult<ActionResponse> {
    validate_session_id(&session_id)?;
    let result = state.flow.restart(&session_id).await;
    respond(&state, &session_id, result).await
}

/// An empty body submits the draft as it is.
fn optional_fields(session_id: &str, body: &[u8]) -> Result<Map<String, Value>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Map::new());
    }
    serde_json::from_slice(body).map_err(|e| ApiError::InvalidBody {
        session_id: session_id.to_string(),
        message: e.to_string(),
    })
}

fn validate_session_id(session_id: &str) -> Result<(), ApiError> {
    if Uuid::parse_str(session_id).is_err() {
        warn!(session_id = %session_id, "Invalid session ID format");
        return Err(ApiError::InvalidSessionId(session_id.to_string()));
    }
    Ok(())
}

async fn session_view(state: &AppState, session_id: &str) -> Result<SessionView, ApiError> {
    let session = state
        .flow
        .session(session_id)
        .await
        .map_err(|e| ApiError::from_quiz(session_id, e))?;
    state
        .flow
        .view(&session)
        .await
        .map_err(|e| ApiError::from_quiz(session_id, e))
}

async fn respond(
    state: &AppState,
    session_id: &str,
    result: Result<ExecutionResult, QuizError>,
) -> ApiResult<ActionResponse> {
    let result = result.map_err(|e| ApiError::from_quiz(session_id, e))?;

    if result.status == ExecutionStatus::Busy {
        return Err(ApiError::Conflict {
            session_id: session_id.to_string(),
            message: "Another request for this session is still in progress".to_string(),
        });
    }

    info!(
        session_id = %session_id,
        step = %result.current_step_id,
        status = status_label(&result.status),
        "Request completed"
    );

    Ok(Json(ActionResponse {
        execution_status: status_label(&result.status),
        response: result.response,
        session: session_view(state, session_id).await?,
    }))
}
