use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::time_model::{ClockTime, TimeWindow};
use super::validation::ValidationError;

/// One dish placed on the production timeline.
///
/// The duration is fixed when the task is created; moving a task shifts both
/// ends together. Field names follow the layout wire format, with the older
/// `menuItemId`/`menuItemName`/`duration` names accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTask {
    #[serde(alias = "menuItemId")]
    task_id: String,
    #[serde(alias = "menuItemName")]
    display_name: String,
    start_time: ClockTime,
    end_time: ClockTime,
    #[serde(alias = "duration")]
    duration_minutes: u32,
}

impl ScheduleTask {
    /// Build a task starting at `start`; the end time is derived from the duration.
    pub fn new(
        task_id: impl Into<String>,
        display_name: impl Into<String>,
        start: ClockTime,
        duration_minutes: u32,
    ) -> Result<Self, ValidationError> {
        let task = Self {
            task_id: task_id.into(),
            display_name: display_name.into(),
            start_time: start,
            end_time: start.plus_minutes(duration_minutes),
            duration_minutes,
        };
        task.validate()?;
        Ok(task)
    }

    /// Build a task from explicit start/end times as reported by an outside
    /// source. Fails unless `end - start == duration_minutes`.
    pub fn from_parts(
        task_id: impl Into<String>,
        display_name: impl Into<String>,
        start_time: ClockTime,
        end_time: ClockTime,
        duration_minutes: u32,
    ) -> Result<Self, ValidationError> {
        let task = Self {
            task_id: task_id.into(),
            display_name: display_name.into(),
            start_time,
            end_time,
            duration_minutes,
        };
        task.validate()?;
        Ok(task)
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn start_time(&self) -> ClockTime {
        self.start_time
    }

    pub fn end_time(&self) -> ClockTime {
        self.end_time
    }

    pub fn duration_minutes(&self) -> u32 {
        self.duration_minutes
    }

    /// Boundary check applied to generator output, drag results and stored records.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.task_id.trim().is_empty() {
            return Err(ValidationError::EmptyTaskId);
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration {
                task_id: self.task_id.clone(),
            });
        }
        if self.end_time.minutes_since(self.start_time) != self.duration_minutes as i64 {
            return Err(ValidationError::InconsistentTimes {
                task_id: self.task_id.clone(),
                start: self.start_time,
                end: self.end_time,
                duration: self.duration_minutes,
            });
        }
        Ok(())
    }

    /// Move the task so it starts at `start`, keeping its duration.
    pub(crate) fn shift_to(&mut self, start: ClockTime) {
        self.start_time = start;
        self.end_time = start.plus_minutes(self.duration_minutes);
    }
}

/// What the layout generator is told about one dish.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleTaskRequest {
    #[serde(alias = "menuItemId")]
    pub task_id: String,
    #[serde(alias = "menuItemName")]
    pub display_name: String,
    #[serde(alias = "prepTimeMinutes")]
    pub prep_minutes: u32,
    #[serde(alias = "cookTimeMinutes")]
    pub cook_minutes: u32,
    #[serde(alias = "totalDuration")]
    pub duration_minutes: u32,
    /// Cooking methods / equipment, e.g. `["oven", "stovetop"]`.
    #[serde(alias = "cookingMethods", default)]
    pub equipment_tags: Vec<String>,
}

impl ScheduleTaskRequest {
    pub fn new(
        task_id: impl Into<String>,
        display_name: impl Into<String>,
        prep_minutes: u32,
        cook_minutes: u32,
        equipment_tags: Vec<String>,
    ) -> Self {
        Self {
            task_id: task_id.into(),
            display_name: display_name.into(),
            prep_minutes,
            cook_minutes,
            duration_minutes: prep_minutes.saturating_add(cook_minutes),
            equipment_tags,
        }
    }

    pub fn check_consistent(&self) -> Result<(), ValidationError> {
        if self.task_id.trim().is_empty() {
            return Err(ValidationError::EmptyTaskId);
        }
        let Some(total) = self.prep_minutes.checked_add(self.cook_minutes) else {
            return Err(ValidationError::DurationOverflow {
                task_id: self.task_id.clone(),
                prep: self.prep_minutes,
                cook: self.cook_minutes,
            });
        };
        if self.duration_minutes != total {
            return Err(ValidationError::DurationMismatch {
                task_id: self.task_id.clone(),
                stated: self.duration_minutes,
                prep: self.prep_minutes,
                cook: self.cook_minutes,
            });
        }
        if self.duration_minutes == 0 {
            return Err(ValidationError::NonPositiveDuration {
                task_id: self.task_id.clone(),
            });
        }
        Ok(())
    }
}

/// The persisted unit: one per owner, replaced wholesale on every save.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleRecord {
    #[serde(alias = "chef_id")]
    pub owner_id: String,
    #[serde(alias = "prep_list_items", default)]
    pub task_id_list: Vec<String>,
    #[serde(alias = "schedule_data", default)]
    pub schedule_tasks: Vec<ScheduleTask>,
    #[serde(alias = "time_window_start")]
    pub window_start: ClockTime,
    #[serde(alias = "time_window_end")]
    pub window_end: ClockTime,
    #[serde(alias = "updated_at")]
    pub updated_at: DateTime<Utc>,
}

impl ScheduleRecord {
    pub fn new(
        owner_id: impl Into<String>,
        task_id_list: Vec<String>,
        schedule_tasks: Vec<ScheduleTask>,
        window: TimeWindow,
    ) -> Self {
        Self {
            owner_id: owner_id.into(),
            task_id_list,
            schedule_tasks,
            window_start: window.start(),
            window_end: window.end(),
            updated_at: Utc::now(),
        }
    }

    pub fn window(&self) -> Result<TimeWindow, ValidationError> {
        TimeWindow::new(self.window_start, self.window_end)
    }
}
