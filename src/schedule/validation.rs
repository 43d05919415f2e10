use thiserror::Error;

use super::task::ScheduleTask;
use super::time_model::{ClockTime, TimeWindow};

/// A task or time value that breaks the schedule's shape invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Invalid clock time '{0}', expected HH:MM")]
    InvalidClockTime(String),
    #[error("Invalid time window {start}-{end}: start must be before end")]
    InvalidWindow { start: ClockTime, end: ClockTime },
    #[error("Task has an empty id")]
    EmptyTaskId,
    #[error("Task id '{task_id}' appears more than once")]
    DuplicateTaskId { task_id: String },
    #[error("Task '{task_id}' has a non-positive duration")]
    NonPositiveDuration { task_id: String },
    #[error("Task '{task_id}' runs {start}-{end} which does not match its {duration} minute duration")]
    InconsistentTimes {
        task_id: String,
        start: ClockTime,
        end: ClockTime,
        duration: u32,
    },
    #[error("Task '{task_id}' prep {prep} + cook {cook} minutes is too long to schedule")]
    DurationOverflow { task_id: String, prep: u32, cook: u32 },
    #[error("Task '{task_id}' states {stated} minutes but prep {prep} + cook {cook} disagree")]
    DurationMismatch {
        task_id: String,
        stated: u32,
        prep: u32,
        cook: u32,
    },
    #[error("Task '{task_id}' ({start}-{end}) falls outside the {window_start}-{window_end} window")]
    OutsideWindow {
        task_id: String,
        start: ClockTime,
        end: ClockTime,
        window_start: ClockTime,
        window_end: ClockTime,
    },
}

/// Check a task against the window it is meant to live in.
pub fn check_within_window(task: &ScheduleTask, window: &TimeWindow) -> Result<(), ValidationError> {
    if window.contains_range(task.start_time(), task.end_time()) {
        Ok(())
    } else {
        Err(ValidationError::OutsideWindow {
            task_id: task.task_id().to_string(),
            start: task.start_time(),
            end: task.end_time(),
            window_start: window.start(),
            window_end: window.end(),
        })
    }
}

/// Keep the tasks that are well formed and inside `window`; returns the kept
/// tasks and the errors for the ones that were dropped.
pub fn partition_valid(
    tasks: Vec<ScheduleTask>,
    window: &TimeWindow,
) -> (Vec<ScheduleTask>, Vec<ValidationError>) {
    let mut kept = Vec::with_capacity(tasks.len());
    let mut dropped = Vec::new();
    for task in tasks {
        match task.validate().and_then(|_| check_within_window(&task, window)) {
            Ok(()) => kept.push(task),
            Err(e) => dropped.push(e),
        }
    }
    (kept, dropped)
}
