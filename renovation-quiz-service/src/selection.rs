//! Multi-select rules for renovation types and the delayed upgrade to a
//! full renovation.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

use step_flow::{ExecutionStatus, FlowRunner};

use crate::catalogue::QuizStep;
use crate::error::QuizError;
use crate::steps::types::{FULL_RENOVATION, RENOVATION_TYPES, session_keys};

/// Selecting this many distinct partial renovation types upgrades the
/// selection to a full renovation.
pub const AUTO_UPGRADE_THRESHOLD: usize = 4;

/// The renovation types picked on the first question, in the order picked.
///
/// Repeated labels collapse to their first occurrence.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct RenovationSelection {
    labels: Vec<String>,
}

impl From<Vec<String>> for RenovationSelection {
    fn from(labels: Vec<String>) -> Self {
        let mut distinct: Vec<String> = Vec::with_capacity(labels.len());
        for label in labels {
            if !distinct.contains(&label) {
                distinct.push(label);
            }
        }
        Self { labels: distinct }
    }
}

impl From<RenovationSelection> for Vec<String> {
    fn from(selection: RenovationSelection) -> Self {
        selection.labels
    }
}

impl RenovationSelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check a raw draft value: an array of known labels, no repeats, and
    /// Full renovation only on its own.
    pub fn is_valid_draft(value: &Value) -> bool {
        let Some(items) = value.as_array() else {
            return false;
        };
        let mut labels: Vec<&str> = Vec::with_capacity(items.len());
        for item in items {
            match item.as_str() {
                Some(label) if RENOVATION_TYPES.contains(&label) && !labels.contains(&label) => {
                    labels.push(label)
                }
                _ => return false,
            }
        }
        !(labels.len() > 1 && labels.contains(&FULL_RENOVATION))
    }

    /// Read the selection held in a step draft; anything malformed reads as empty.
    pub fn from_draft(value: Option<&Value>) -> Self {
        value
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or_default()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn contains(&self, label: &str) -> bool {
        self.labels.iter().any(|l| l == label)
    }

    pub fn contains_any(&self, labels: &[&str]) -> bool {
        labels.iter().any(|label| self.contains(label))
    }

    /// Click on a renovation type.
    ///
    /// Full renovation replaces everything else; any other label switches
    /// Full renovation off. Clicking a selected label deselects it.
    pub fn toggle(&mut self, label: &str) -> Result<(), QuizError> {
        if !RENOVATION_TYPES.contains(&label) {
            return Err(QuizError::UnknownRenovationType(label.to_string()));
        }

        if self.contains(label) {
            self.labels.retain(|l| l != label);
        } else if label == FULL_RENOVATION {
            self.labels = vec![FULL_RENOVATION.to_string()];
        } else {
            self.labels.retain(|l| l != FULL_RENOVATION);
            self.labels.push(label.to_string());
        }
        Ok(())
    }

    /// Labels are held distinct, so the count is of distinct types.
    pub fn needs_auto_upgrade(&self) -> bool {
        !self.contains(FULL_RENOVATION) && self.labels.len() >= AUTO_UPGRADE_THRESHOLD
    }

    pub fn upgrade_to_full(&mut self) {
        self.labels = vec![FULL_RENOVATION.to_string()];
    }

    /// Draft representation: a plain array of labels.
    pub fn to_value(&self) -> Value {
        Value::Array(self.labels.iter().cloned().map(Value::String).collect())
    }
}

/// Runs the delayed collapse to a full renovation, one pending task per session.
///
/// The selection stays visible as picked until the delay elapses. Any
/// further action on the session cancels the pending task, and the task
/// itself gives up if the session has moved on or the selection changed.
/// The write goes through the runner, so it never overlaps another call on
/// the same session.
pub struct UpgradeScheduler {
    delay: Duration,
    runner: FlowRunner,
    pending: Arc<DashMap<String, (u64, AbortHandle)>>,
    generation: AtomicU64,
}

impl UpgradeScheduler {
    pub fn new(delay: Duration, runner: FlowRunner) -> Self {
        Self {
            delay,
            runner,
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn schedule(&self, session_id: &str, expected: RenovationSelection) {
        self.cancel(session_id);

        let generation = self.generation.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        let runner = self.runner.clone();
        let pending = self.pending.clone();
        let sid = session_id.to_string();

        debug!(session_id = %sid, delay_ms = delay.as_millis() as u64, "Scheduling full renovation upgrade");

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            pending.remove_if(&sid, |_, (g, _)| *g == generation);
            if let Err(e) = apply_upgrade(&runner, &sid, &expected).await {
                warn!(session_id = %sid, error = %e, "Full renovation upgrade failed");
            }
        });
        self.pending
            .insert(session_id.to_string(), (generation, task.abort_handle()));
    }

    pub fn cancel(&self, session_id: &str) {
        if let Some((_, (_, handle))) = self.pending.remove(session_id) {
            debug!(session_id = %session_id, "Cancelling pending full renovation upgrade");
            handle.abort();
        }
    }

    pub fn is_pending(&self, session_id: &str) -> bool {
        self.pending.contains_key(session_id)
    }
}

async fn apply_upgrade(
    runner: &FlowRunner,
    session_id: &str,
    expected: &RenovationSelection,
) -> Result<(), QuizError> {
    let mut upgraded = false;
    let result = runner
        .edit_with(session_id, |session| {
            let mut fields = Map::new();
            if session.current_step_id != QuizStep::RenoType.id() {
                return Ok::<_, QuizError>(fields);
            }
            let current =
                RenovationSelection::from_draft(session.draft.get(session_keys::RENOVATION_TYPE));
            if &current != expected {
                return Ok(fields);
            }
            let mut selection = current;
            selection.upgrade_to_full();
            fields.insert(session_keys::RENOVATION_TYPE.to_string(), selection.to_value());
            upgraded = true;
            Ok(fields)
        })
        .await?;

    if result.status == ExecutionStatus::Busy {
        debug!(session_id = %session_id, "Session busy, skipping full renovation upgrade");
    } else if upgraded {
        info!(session_id = %session_id, "Selection upgraded to full renovation");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::json;
    use step_flow::{
        Context, GraphBuilder, InMemorySessionStorage, NextAction, Session, SessionStorage, Step,
        StepResult,
    };

    struct Picker;

    #[async_trait]
    impl Step for Picker {
        fn id(&self) -> &str {
            QuizStep::RenoType.id()
        }

        async fn run(&self, _input: &Map<String, Value>, _context: Context) -> step_flow::Result<StepResult> {
            Ok(StepResult::new(None, NextAction::WaitForInput))
        }
    }

    fn scheduler(delay_ms: u64, storage: &Arc<InMemorySessionStorage>) -> UpgradeScheduler {
        let graph = GraphBuilder::new("picker").add_step(Arc::new(Picker)).build();
        let runner = FlowRunner::new(Arc::new(graph), storage.clone());
        UpgradeScheduler::new(Duration::from_millis(delay_ms), runner)
    }

    fn select(labels: &[&str]) -> RenovationSelection {
        let mut selection = RenovationSelection::new();
        for label in labels {
            selection.toggle(label).unwrap();
        }
        selection
    }

    #[test]
    fn full_renovation_clears_other_choices() {
        let selection = select(&["Kitchen", "Bedroom", "Full renovation"]);
        assert_eq!(selection.labels(), ["Full renovation"]);
    }

    #[test]
    fn manual_choice_after_full_renovation_removes_it() {
        let selection = select(&["Full renovation", "Kitchen"]);
        assert_eq!(selection.labels(), ["Kitchen"]);
    }

    #[test]
    fn clicking_twice_deselects() {
        assert!(select(&["Kitchen", "Kitchen"]).is_empty());
        assert!(select(&["Full renovation", "Full renovation"]).is_empty());
        assert_eq!(select(&["Kitchen", "Bedroom", "Kitchen"]).labels(), ["Bedroom"]);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let mut selection = RenovationSelection::new();
        assert!(matches!(
            selection.toggle("Garage"),
            Err(QuizError::UnknownRenovationType(_))
        ));
        assert!(selection.is_empty());
    }

    #[test]
    fn upgrade_needed_from_fourth_partial_type() {
        assert!(!select(&["Kitchen", "Bedroom", "Bathroom"]).needs_auto_upgrade());
        let four = select(&["Kitchen", "Bedroom", "Bathroom", "Living room"]);
        assert!(four.needs_auto_upgrade());
        assert_eq!(four.labels().len(), 4);
        assert!(!select(&["Full renovation"]).needs_auto_upgrade());
    }

    #[test]
    fn repeated_labels_count_once() {
        let selection = RenovationSelection::from_draft(Some(&json!([
            "Kitchen", "Kitchen", "Kitchen", "Kitchen"
        ])));
        assert_eq!(selection.labels(), ["Kitchen"]);
        assert!(!selection.needs_auto_upgrade());

        let mixed = RenovationSelection::from_draft(Some(&json!([
            "Kitchen", "Bedroom", "Kitchen", "Bathroom", "Bedroom"
        ])));
        assert_eq!(mixed.labels(), ["Kitchen", "Bedroom", "Bathroom"]);
        assert!(!mixed.needs_auto_upgrade());
    }

    #[test]
    fn draft_validity() {
        assert!(RenovationSelection::is_valid_draft(&json!([])));
        assert!(RenovationSelection::is_valid_draft(&json!(["Kitchen", "Bedroom"])));
        assert!(RenovationSelection::is_valid_draft(&json!(["Full renovation"])));
        assert!(!RenovationSelection::is_valid_draft(&json!(["Kitchen", "Kitchen"])));
        assert!(!RenovationSelection::is_valid_draft(&json!(["Full renovation", "Kitchen"])));
        assert!(!RenovationSelection::is_valid_draft(&json!(["Kitchen", "Full renovation"])));
        assert!(!RenovationSelection::is_valid_draft(&json!(["Garage"])));
        assert!(!RenovationSelection::is_valid_draft(&json!("Kitchen")));
        assert!(!RenovationSelection::is_valid_draft(&json!([1])));
    }

    async fn session_on_reno_type(
        storage: &InMemorySessionStorage,
        selection: &RenovationSelection,
    ) {
        let mut session = Session::new_from_step("s".to_string(), QuizStep::RenoType.id());
        session
            .draft
            .insert(session_keys::RENOVATION_TYPE.to_string(), json!(selection));
        storage.save(session).await.unwrap();
    }

    async fn draft_selection(storage: &InMemorySessionStorage) -> RenovationSelection {
        let session = storage.get("s").await.unwrap().unwrap();
        RenovationSelection::from_draft(session.draft.get(session_keys::RENOVATION_TYPE))
    }

    #[tokio::test(start_paused = true)]
    async fn upgrade_fires_after_delay() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let four = select(&["Kitchen", "Bedroom", "Bathroom", "Living room"]);
        session_on_reno_type(&storage, &four).await;

        let scheduler = scheduler(500, &storage);
        scheduler.schedule("s", four.clone());

        tokio::time::sleep(Duration::from_millis(499)).await;
        assert_eq!(draft_selection(&storage).await, four);

        tokio::time::sleep(Duration::from_millis(2)).await;
        tokio::task::yield_now().await;
        assert_eq!(draft_selection(&storage).await.labels(), ["Full renovation"]);
        assert!(!scheduler.is_pending("s"));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_upgrade_never_fires() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let four = select(&["Kitchen", "Bedroom", "Bathroom", "Living room"]);
        session_on_reno_type(&storage, &four).await;

        let scheduler = scheduler(500, &storage);
        scheduler.schedule("s", four.clone());
        scheduler.cancel("s");

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(draft_selection(&storage).await, four);
    }

    #[tokio::test(start_paused = true)]
    async fn stale_selection_is_left_alone() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let four = select(&["Kitchen", "Bedroom", "Bathroom", "Living room"]);
        let three = select(&["Kitchen", "Bedroom", "Bathroom"]);
        session_on_reno_type(&storage, &three).await;

        let scheduler = scheduler(10, &storage);
        scheduler.schedule("s", four);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(draft_selection(&storage).await, three);
    }

    #[tokio::test(start_paused = true)]
    async fn session_that_moved_on_is_left_alone() {
        let storage = Arc::new(InMemorySessionStorage::new());
        let four = select(&["Kitchen", "Bedroom", "Bathroom", "Living room"]);
        session_on_reno_type(&storage, &four).await;
        let mut session = storage.get("s").await.unwrap().unwrap();
        session.current_step_id = QuizStep::SqftToAdd.id().to_string();
        storage.save(session).await.unwrap();

        let scheduler = scheduler(10, &storage);
        scheduler.schedule("s", four.clone());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(draft_selection(&storage).await, four);
    }
}
