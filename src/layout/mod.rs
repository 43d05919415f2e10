//! Proposing an initial production layout.
//!
//! Placement is delegated to a [`LayoutStrategy`]; whatever it proposes is
//! checked here before the editor ever sees it. A proposal that breaks a rule
//! is rejected whole, never patched up.

pub mod llm;
pub mod prompt;
pub mod response;

use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;
use tracing::{info, warn};

use crate::api_connection::ApiConnectionError;
use crate::schedule::{ScheduleTask, ScheduleTaskRequest, TimeWindow, ValidationError};

pub use llm::LlmLayoutStrategy;
pub use response::{equipment_conflicts, EquipmentConflict};

#[derive(Debug, Error)]
pub enum LayoutError {
    #[error("Cannot request a schedule for an empty prep list")]
    EmptyRequest,
    #[error("Invalid schedule request: {0}")]
    InconsistentRequest(ValidationError),
    #[error("Invalid schedule format from generator: {0}")]
    MalformedResponse(String),
    #[error("Generated schedule broke a constraint: {0}")]
    ConstraintViolation(String),
    #[error("Schedule generation failed: {0}")]
    Transport(#[from] ApiConnectionError),
}

impl LayoutError {
    /// Network and backend failures, as opposed to a bad answer.
    pub fn is_transient(&self) -> bool {
        matches!(self, LayoutError::Transport(_))
    }
}

/// Something that can place tasks inside a window.
#[async_trait]
pub trait LayoutStrategy: Send + Sync {
    async fn propose(
        &self,
        tasks: &[ScheduleTaskRequest],
        window: &TimeWindow,
    ) -> Result<Vec<ScheduleTask>, LayoutError>;
}

fn check_request(tasks: &[ScheduleTaskRequest]) -> Result<(), LayoutError> {
    if tasks.is_empty() {
        return Err(LayoutError::EmptyRequest);
    }
    let mut ids = HashSet::new();
    for task in tasks {
        task.check_consistent().map_err(LayoutError::InconsistentRequest)?;
        if !ids.insert(task.task_id.as_str()) {
            return Err(LayoutError::InconsistentRequest(ValidationError::DuplicateTaskId {
                task_id: task.task_id.clone(),
            }));
        }
    }
    Ok(())
}

/// Ask `strategy` for a layout of `tasks` within `window` and return it only
/// if every task is present once, keeps its stated duration and fits the window.
///
/// This may take seconds; hosts should run it off the event path.
pub async fn request_schedule(
    strategy: &dyn LayoutStrategy,
    tasks: &[ScheduleTaskRequest],
    window: &TimeWindow,
) -> Result<Vec<ScheduleTask>, LayoutError> {
    check_request(tasks)?;
    let proposed = strategy.propose(tasks, window).await?;
    if let Err(e) = response::validate_layout(&proposed, tasks, window) {
        warn!(error = %e, "rejecting generated schedule");
        return Err(e);
    }
    for conflict in equipment_conflicts(&proposed, tasks) {
        warn!(
            first = %conflict.first,
            second = %conflict.second,
            equipment = %conflict.equipment,
            "generated schedule overlaps on shared equipment"
        );
    }
    info!(tasks = proposed.len(), "schedule generated");
    Ok(proposed)
}
