use std::collections::HashMap;
use tracing::{info, warn};

use super::store::{ScheduleStore, StoreError};
use crate::catalog::PrepItem;
use crate::schedule::{partition_valid, ScheduleRecord, ScheduleTask, TimeWindow, ValidationError};

/// What came back from storage after reconciling it with the current catalog.
#[derive(Debug, Clone)]
pub struct RestoreOutcome {
    pub record: ScheduleRecord,
    pub window: TimeWindow,
    /// Prep-list items that still exist, in their saved order.
    pub prep_items: Vec<PrepItem>,
    /// Saved tasks that are well formed and still refer to an existing item.
    pub tasks: Vec<ScheduleTask>,
    /// Saved ids with no matching catalog item.
    pub unresolved_ids: Vec<String>,
    /// Why malformed tasks were left out.
    pub invalid_tasks: Vec<ValidationError>,
}

impl RestoreOutcome {
    pub fn restored_count(&self) -> usize {
        self.prep_items.len()
    }

    /// Notice text for the host, if anything was restored.
    pub fn message(&self) -> Option<String> {
        (self.restored_count() > 0).then(|| {
            format!(
                "Loaded your last schedule with {} item(s)",
                self.restored_count()
            )
        })
    }
}

/// Load the owner's latest record and keep only what still makes sense:
/// ids that resolve against `catalog` and tasks that pass validation.
/// `Ok(None)` means nothing has been saved yet.
pub async fn restore_latest(
    store: &dyn ScheduleStore,
    owner_id: &str,
    catalog: &[PrepItem],
) -> Result<Option<RestoreOutcome>, StoreError> {
    let Some(record) = store.load_latest(owner_id).await? else {
        return Ok(None);
    };
    let window = record
        .window()
        .map_err(|e| StoreError::Corrupt(e.to_string()))?;

    let by_id: HashMap<&str, &PrepItem> = catalog.iter().map(|item| (item.id.as_str(), item)).collect();

    let mut prep_items = Vec::new();
    let mut unresolved_ids = Vec::new();
    for id in &record.task_id_list {
        match by_id.get(id.as_str()) {
            Some(item) => prep_items.push((*item).clone()),
            None => unresolved_ids.push(id.clone()),
        }
    }

    let (valid, invalid_tasks) = partition_valid(record.schedule_tasks.clone(), &window);
    let tasks: Vec<ScheduleTask> = valid
        .into_iter()
        .filter(|task| {
            let known = by_id.contains_key(task.task_id());
            if !known && !unresolved_ids.iter().any(|id| id == task.task_id()) {
                unresolved_ids.push(task.task_id().to_string());
            }
            known
        })
        .collect();

    if !invalid_tasks.is_empty() {
        warn!(owner = %owner_id, dropped = invalid_tasks.len(), "dropped malformed saved tasks");
    }
    info!(
        owner = %owner_id,
        items = prep_items.len(),
        tasks = tasks.len(),
        unresolved = unresolved_ids.len(),
        "restored saved schedule"
    );

    Ok(Some(RestoreOutcome {
        record,
        window,
        prep_items,
        tasks,
        unresolved_ids,
        invalid_tasks,
    }))
}
