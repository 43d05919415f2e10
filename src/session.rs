//! Live state for one owner's prep-planning screen.
//!
//! The session owns the prep list and the editor, hands snapshots to the
//! autosaver, and turns failures into [`Notice`]s. Layout generation is split
//! into [`PrepSession::begin_generation`] and
//! [`PrepSession::complete_generation`] so the slow call can run elsewhere
//! while pointer events keep flowing; a result that comes back after the user
//! changed something, or after the request was abandoned, is thrown away.

use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::catalog::PrepItem;
use crate::editor::{DragState, EditorSettings, GestureOutcome, TimelineEditor};
use crate::layout::LayoutError;
use crate::persistence::{restore_latest, AutoSaver, SaveStatus, ScheduleStore};
use crate::schedule::{
    ClockTime, ScheduleRecord, ScheduleTask, ScheduleTaskRequest, TimeWindow, ValidationError,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("A schedule is already being generated")]
    GenerationInProgress,
    #[error("Add items to the prep list before generating a schedule")]
    EmptyPrepList,
    #[error("The following items don't have recipes yet: {}. Please add recipes before generating a schedule.", .0.join(", "))]
    MissingRecipes(Vec<String>),
    #[error("Cannot schedule this recipe: {0}")]
    InvalidRecipe(ValidationError),
    #[error("Unknown menu item '{0}'")]
    UnknownItem(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    Warning,
    Error,
}

/// A short-lived, non-blocking message for the user.
#[derive(Debug, Clone)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    pub created: Instant,
}

/// Everything a layout request needs, detached from the session.
#[derive(Debug, Clone)]
pub struct GenerationTicket {
    id: u64,
    epoch: u64,
    pub requests: Vec<ScheduleTaskRequest>,
    pub window: TimeWindow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerationOutcome {
    Applied { tasks: usize },
    Failed,
    Discarded,
}

pub struct PrepSession {
    owner_id: String,
    catalog: Vec<PrepItem>,
    prep_list: Vec<PrepItem>,
    selected_item: Option<String>,
    editor: TimelineEditor,
    settings: EditorSettings,
    notices: Vec<Notice>,
    notice_lifetime: Duration,
    next_generation: u64,
    outstanding_generation: Option<u64>,
    edit_epoch: u64,
    autosaver: Option<AutoSaver>,
    save_status: Option<watch::Receiver<SaveStatus>>,
    last_save_status: SaveStatus,
}

impl PrepSession {
    pub fn new(
        owner_id: impl Into<String>,
        catalog: Vec<PrepItem>,
        window: TimeWindow,
        settings: EditorSettings,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            catalog,
            prep_list: Vec::new(),
            selected_item: None,
            editor: TimelineEditor::new(window, settings),
            settings,
            notices: Vec::new(),
            notice_lifetime: Duration::from_secs(5),
            next_generation: 0,
            outstanding_generation: None,
            edit_epoch: 0,
            autosaver: None,
            save_status: None,
            last_save_status: SaveStatus::Idle,
        }
    }

    pub fn with_autosaver(mut self, autosaver: AutoSaver) -> Self {
        self.save_status = Some(autosaver.subscribe());
        self.autosaver = Some(autosaver);
        self
    }

    pub fn with_notice_lifetime(mut self, lifetime: Duration) -> Self {
        self.notice_lifetime = lifetime;
        self
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn catalog(&self) -> &[PrepItem] {
        &self.catalog
    }

    pub fn prep_list(&self) -> &[PrepItem] {
        &self.prep_list
    }

    pub fn editor(&self) -> &TimelineEditor {
        &self.editor
    }

    pub fn schedule(&self) -> &[ScheduleTask] {
        self.editor.tasks()
    }

    pub fn autosaver(&self) -> Option<&AutoSaver> {
        self.autosaver.as_ref()
    }

    /// Report the save status if it changed since the last call; a failure
    /// also becomes an error notice.
    pub fn sync_save_status(&mut self) -> Option<SaveStatus> {
        let status = self.save_status.as_ref()?.borrow().clone();
        if status == self.last_save_status {
            return None;
        }
        self.last_save_status = status.clone();
        if let SaveStatus::Failed { message } = &status {
            self.notify(NoticeKind::Error, format!("Error saving schedule: {}", message));
        }
        Some(status)
    }

    /// Write any pending edit now and stop autosaving. Returns the final save
    /// status; a failure also becomes a notice.
    pub async fn close(&mut self) -> SaveStatus {
        let Some(saver) = self.autosaver.take() else {
            return SaveStatus::Idle;
        };
        saver.flush().await;
        self.sync_save_status();
        self.save_status = None;
        self.last_save_status.clone()
    }

    pub fn is_generating(&self) -> bool {
        self.outstanding_generation.is_some()
    }

    fn notify(&mut self, kind: NoticeKind, text: impl Into<String>) {
        let text = text.into();
        match kind {
            NoticeKind::Error => warn!(owner = %self.owner_id, "{}", text),
            _ => info!(owner = %self.owner_id, "{}", text),
        }
        self.notices.push(Notice {
            kind,
            text,
            created: Instant::now(),
        });
    }

    /// Notices that have not yet expired at `now`.
    pub fn notices(&self, now: Instant) -> Vec<&Notice> {
        self.notices
            .iter()
            .filter(|n| now.saturating_duration_since(n.created) < self.notice_lifetime)
            .collect()
    }

    pub fn expire_notices(&mut self, now: Instant) {
        let lifetime = self.notice_lifetime;
        self.notices
            .retain(|n| now.saturating_duration_since(n.created) < lifetime);
    }

    /// Returns false if the item is already listed.
    pub fn add_to_prep_list(&mut self, item_id: &str) -> Result<bool, SessionError> {
        if self.prep_list.iter().any(|p| p.id == item_id) {
            return Ok(false);
        }
        let item = self
            .catalog
            .iter()
            .find(|item| item.id == item_id)
            .cloned()
            .ok_or_else(|| SessionError::UnknownItem(item_id.to_string()))?;
        self.prep_list.push(item);
        self.edit_epoch += 1;
        Ok(true)
    }

    pub fn remove_from_prep_list(&mut self, item_id: &str) -> bool {
        let before = self.prep_list.len();
        self.prep_list.retain(|p| p.id != item_id);
        if self.prep_list.len() == before {
            return false;
        }
        if self.selected_item.as_deref() == Some(item_id) {
            self.selected_item = None;
            self.editor.clear_selection();
        }
        self.edit_epoch += 1;
        true
    }

    /// Clear the prep list, schedule, selection and notices. Returns false when
    /// there was nothing to clear.
    pub fn start_fresh(&mut self) -> bool {
        if self.prep_list.is_empty() && self.editor.is_empty() {
            return false;
        }
        self.prep_list.clear();
        self.editor.clear();
        self.selected_item = None;
        self.notices.clear();
        self.outstanding_generation = None;
        self.edit_epoch += 1;
        true
    }

    /// Select a prep-list item; highlights its block too when it is scheduled.
    pub fn select_item(&mut self, item_id: &str) -> bool {
        if !self.prep_list.iter().any(|p| p.id == item_id) {
            return false;
        }
        self.selected_item = Some(item_id.to_string());
        if !self.editor.select(item_id) {
            self.editor.clear_selection();
        }
        true
    }

    pub fn selected_item(&self) -> Option<&PrepItem> {
        let id = self.selected_item.as_deref()?;
        self.prep_list.iter().find(|p| p.id == id)
    }

    pub fn pointer_down(&mut self, index: usize, x: f64) -> bool {
        self.editor.pointer_down(index, x)
    }

    pub fn pointer_move(&mut self, x: f64, surface_width: f64) -> Option<usize> {
        let moved = self.editor.pointer_move(x, surface_width);
        if moved.is_some() {
            self.edit_epoch += 1;
        }
        moved
    }

    pub fn pointer_up(&mut self) -> GestureOutcome {
        let outcome = self.editor.pointer_up();
        self.after_gesture(&outcome);
        outcome
    }

    pub fn pointer_leave(&mut self) -> GestureOutcome {
        let outcome = self.editor.pointer_leave();
        self.after_gesture(&outcome);
        outcome
    }

    /// Leaving the screen: drop any gesture without side effects.
    pub fn cancel_gesture(&mut self) {
        self.editor.cancel_gesture();
    }

    fn after_gesture(&mut self, outcome: &GestureOutcome) {
        match outcome {
            GestureOutcome::Selected(task_id) => {
                if !self.select_item(task_id) {
                    self.selected_item = None;
                }
            }
            GestureOutcome::Dragged { .. } if outcome.moved() => {
                self.edit_epoch += 1;
                self.schedule_save();
            }
            _ => {}
        }
    }

    /// Move a task by time rather than by pointer; same clamping and snapping.
    pub fn move_task(&mut self, task_id: &str, start: ClockTime) -> Option<ScheduleTask> {
        let before = self.editor.tasks().iter().find(|t| t.task_id() == task_id)?.start_time();
        let placed = self.editor.move_task(task_id, start)?;
        if placed != before {
            self.edit_epoch += 1;
            self.schedule_save();
        }
        self.editor.tasks().iter().find(|t| t.task_id() == task_id).cloned()
    }

    pub fn begin_generation(&mut self) -> Result<GenerationTicket, SessionError> {
        if self.outstanding_generation.is_some() {
            return Err(SessionError::GenerationInProgress);
        }
        if self.prep_list.is_empty() {
            return Err(SessionError::EmptyPrepList);
        }
        let missing: Vec<String> = self
            .prep_list
            .iter()
            .filter(|item| item.recipe.is_none())
            .map(|item| item.name.clone())
            .collect();
        if !missing.is_empty() {
            return Err(SessionError::MissingRecipes(missing));
        }

        let requests: Vec<ScheduleTaskRequest> = self
            .prep_list
            .iter()
            .filter_map(PrepItem::to_task_request)
            .collect();
        for request in &requests {
            request.check_consistent().map_err(SessionError::InvalidRecipe)?;
        }
        self.next_generation += 1;
        self.outstanding_generation = Some(self.next_generation);
        Ok(GenerationTicket {
            id: self.next_generation,
            epoch: self.edit_epoch,
            requests,
            window: *self.editor.window(),
        })
    }

    /// Forget the outstanding request; its result will be discarded.
    pub fn abandon_generation(&mut self) {
        self.outstanding_generation = None;
    }

    pub fn complete_generation(
        &mut self,
        ticket: GenerationTicket,
        result: Result<Vec<ScheduleTask>, LayoutError>,
    ) -> GenerationOutcome {
        if self.outstanding_generation != Some(ticket.id) {
            info!(ticket = ticket.id, "discarding abandoned schedule generation");
            return GenerationOutcome::Discarded;
        }
        self.outstanding_generation = None;
        if ticket.epoch != self.edit_epoch {
            info!(ticket = ticket.id, "discarding schedule generated for an older prep list");
            return GenerationOutcome::Discarded;
        }
        if self.editor.drag_state() != DragState::Idle {
            self.notify(
                NoticeKind::Warning,
                "A new schedule arrived while a task was being moved and was not applied",
            );
            return GenerationOutcome::Discarded;
        }

        let tasks = match result {
            Ok(tasks) => tasks,
            Err(e) => {
                self.notify(NoticeKind::Error, format!("Error generating schedule: {}", e));
                return GenerationOutcome::Failed;
            }
        };
        // checked first so a bad layout never replaces the current one
        let loaded = self.editor.check(&tasks).and_then(|_| self.editor.load(tasks));
        if let Err(e) = loaded {
            self.notify(NoticeKind::Error, format!("Error generating schedule: {}", e));
            return GenerationOutcome::Failed;
        }
        self.edit_epoch += 1;
        self.schedule_save();
        GenerationOutcome::Applied {
            tasks: self.editor.tasks().len(),
        }
    }

    pub fn snapshot(&self) -> ScheduleRecord {
        ScheduleRecord::new(
            self.owner_id.clone(),
            self.prep_list.iter().map(|p| p.id.clone()).collect(),
            self.editor.tasks().to_vec(),
            *self.editor.window(),
        )
    }

    fn schedule_save(&mut self) {
        if self.editor.is_empty() {
            return;
        }
        let record = self.snapshot();
        if let Some(saver) = &self.autosaver {
            saver.schedule(record);
        }
    }

    /// Bring back the owner's last saved schedule. Returns how many prep-list
    /// items were restored; storage problems become notices.
    pub async fn restore(&mut self, store: &dyn ScheduleStore) -> usize {
        let outcome = match restore_latest(store, &self.owner_id, &self.catalog).await {
            Ok(Some(outcome)) => outcome,
            Ok(None) => return 0,
            Err(e) => {
                self.notify(NoticeKind::Error, format!("Error loading schedule: {}", e));
                return 0;
            }
        };

        self.prep_list = outcome.prep_items.clone();
        self.selected_item = None;
        self.editor = TimelineEditor::new(outcome.window, self.settings);
        if let Err(e) = self.editor.load(outcome.tasks.clone()) {
            self.notify(NoticeKind::Error, format!("Saved schedule could not be shown: {}", e));
        }
        if !outcome.invalid_tasks.is_empty() {
            self.notify(
                NoticeKind::Warning,
                format!("Dropped {} invalid task(s) from the saved schedule", outcome.invalid_tasks.len()),
            );
        }
        if let Some(message) = outcome.message() {
            self.notify(NoticeKind::Info, message);
        }
        self.edit_epoch += 1;
        outcome.restored_count()
    }
}
