//! Turning untrusted generator output into a schedule.
//!
//! Parsing is lenient about wrapping (code fences, a bare array or an object
//! holding the array) and strict about content: every requested task must come
//! back exactly once, with its stated duration, inside the window.

use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use super::LayoutError;
use crate::schedule::{check_within_window, ClockTime, ScheduleTask, ScheduleTaskRequest, TimeWindow};

/// One element of the generator's answer before any field is trusted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposedTask {
    #[serde(alias = "menuItemId", default)]
    pub task_id: Option<String>,
    #[serde(alias = "menuItemName", default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(alias = "duration", default)]
    pub duration_minutes: Option<u32>,
}

/// Remove markdown code fences (```json ... ```) wherever they appear.
pub fn strip_code_fences(content: &str) -> String {
    content
        .replace("```json", "")
        .replace("```JSON", "")
        .replace("```", "")
        .trim()
        .to_string()
}

/// Parse the generator's text into proposed tasks.
pub fn parse_proposed_tasks(content: &str) -> Result<Vec<ProposedTask>, LayoutError> {
    let cleaned = strip_code_fences(content);
    if cleaned.is_empty() {
        return Err(LayoutError::MalformedResponse("empty response".to_string()));
    }

    let parsed: Value = serde_json::from_str(&cleaned).map_err(|e| {
        warn!(error = %e, "failed to parse layout response as JSON");
        LayoutError::MalformedResponse(format!("invalid JSON: {}", e))
    })?;

    let array = match parsed {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("schedule").or_else(|| map.remove("tasks")) {
            Some(Value::Array(items)) => items,
            _ => {
                return Err(LayoutError::MalformedResponse(
                    "object has no \"schedule\" or \"tasks\" array".to_string(),
                ))
            }
        },
        _ => {
            return Err(LayoutError::MalformedResponse(
                "expected a JSON array or object".to_string(),
            ))
        }
    };

    array
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            serde_json::from_value::<ProposedTask>(item).map_err(|e| {
                LayoutError::MalformedResponse(format!("task {} has the wrong shape: {}", idx + 1, e))
            })
        })
        .collect()
}

fn required<T>(value: Option<T>, field: &str, idx: usize) -> Result<T, LayoutError> {
    value.ok_or_else(|| LayoutError::MalformedResponse(format!("task {} is missing '{}'", idx + 1, field)))
}

fn parse_time(value: &str, field: &str, idx: usize) -> Result<ClockTime, LayoutError> {
    value.parse::<ClockTime>().map_err(|_| {
        LayoutError::MalformedResponse(format!("task {} has an invalid {} '{}'", idx + 1, field, value))
    })
}

/// Convert proposed tasks into [`ScheduleTask`]s, rejecting incomplete entries
/// and entries whose start, end and duration disagree.
pub fn into_schedule_tasks(proposed: Vec<ProposedTask>) -> Result<Vec<ScheduleTask>, LayoutError> {
    proposed
        .into_iter()
        .enumerate()
        .map(|(idx, p)| {
            let task_id = required(p.task_id.filter(|s| !s.trim().is_empty()), "taskId", idx)?;
            let display_name = required(p.display_name.filter(|s| !s.trim().is_empty()), "displayName", idx)?;
            let start = parse_time(&required(p.start_time, "startTime", idx)?, "startTime", idx)?;
            let end = parse_time(&required(p.end_time, "endTime", idx)?, "endTime", idx)?;
            let duration = required(p.duration_minutes.filter(|d| *d > 0), "durationMinutes", idx)?;
            ScheduleTask::from_parts(task_id, display_name, start, end, duration)
                .map_err(|e| LayoutError::ConstraintViolation(e.to_string()))
        })
        .collect()
}

/// Check a candidate layout against the requests it answers.
pub fn validate_layout(
    tasks: &[ScheduleTask],
    requests: &[ScheduleTaskRequest],
    window: &TimeWindow,
) -> Result<(), LayoutError> {
    let by_id: HashMap<&str, &ScheduleTaskRequest> =
        requests.iter().map(|r| (r.task_id.as_str(), r)).collect();
    let mut seen: HashSet<&str> = HashSet::new();

    for task in tasks {
        task.validate()
            .map_err(|e| LayoutError::ConstraintViolation(e.to_string()))?;
        let request = by_id.get(task.task_id()).ok_or_else(|| {
            LayoutError::ConstraintViolation(format!("unknown task '{}' in layout", task.task_id()))
        })?;
        if !seen.insert(task.task_id()) {
            return Err(LayoutError::ConstraintViolation(format!(
                "task '{}' is scheduled more than once",
                task.task_id()
            )));
        }
        if task.duration_minutes() != request.duration_minutes {
            return Err(LayoutError::ConstraintViolation(format!(
                "task '{}' was given {} minutes but must take {}",
                task.task_id(),
                task.duration_minutes(),
                request.duration_minutes
            )));
        }
        check_within_window(task, window).map_err(|e| LayoutError::ConstraintViolation(e.to_string()))?;
    }

    let missing: Vec<&str> = requests
        .iter()
        .map(|r| r.task_id.as_str())
        .filter(|id| !seen.contains(id))
        .collect();
    if !missing.is_empty() {
        return Err(LayoutError::ConstraintViolation(format!(
            "layout is missing tasks: {}",
            missing.join(", ")
        )));
    }
    debug!(tasks = tasks.len(), "layout passed validation");
    Ok(())
}

/// Two tasks that share an equipment tag and overlap in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EquipmentConflict {
    pub first: String,
    pub second: String,
    pub equipment: String,
}

/// Overlaps on shared equipment. The generator is asked to avoid these but
/// they are reported, not rejected.
pub fn equipment_conflicts(tasks: &[ScheduleTask], requests: &[ScheduleTaskRequest]) -> Vec<EquipmentConflict> {
    let tags: HashMap<&str, &[String]> = requests
        .iter()
        .map(|r| (r.task_id.as_str(), r.equipment_tags.as_slice()))
        .collect();
    let mut conflicts = Vec::new();
    for (i, a) in tasks.iter().enumerate() {
        for b in &tasks[i + 1..] {
            let overlaps = a.start_time() < b.end_time() && b.start_time() < a.end_time();
            if !overlaps {
                continue;
            }
            let (Some(a_tags), Some(b_tags)) = (tags.get(a.task_id()), tags.get(b.task_id())) else {
                continue;
            };
            if let Some(shared) = a_tags.iter().find(|tag| b_tags.iter().any(|t| t.eq_ignore_ascii_case(tag))) {
                conflicts.push(EquipmentConflict {
                    first: a.task_id().to_string(),
                    second: b.task_id().to_string(),
                    equipment: shared.clone(),
                });
            }
        }
    }
    conflicts
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requests() -> Vec<ScheduleTaskRequest> {
        vec![
            ScheduleTaskRequest::new("a", "Roast chicken", 10, 20, vec!["oven".into()]),
            ScheduleTaskRequest::new("b", "Fried rice", 5, 15, vec!["stovetop".into()]),
        ]
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  [ ]  "), "[ ]");
    }

    #[test]
    fn test_parse_fenced_bare_array() {
        let content = "```json\n[{\"taskId\":\"a\",\"displayName\":\"Roast chicken\",\"startTime\":\"06:00\",\"endTime\":\"06:30\",\"durationMinutes\":30}]\n```";
        let proposed = parse_proposed_tasks(content).unwrap();
        assert_eq!(proposed.len(), 1);
        assert_eq!(proposed[0].task_id.as_deref(), Some("a"));
    }

    #[test]
    fn test_parse_object_wrappers() {
        let schedule = r#"{"schedule":[{"menuItemId":"a","menuItemName":"X","startTime":"06:00","endTime":"06:30","duration":30}]}"#;
        assert_eq!(parse_proposed_tasks(schedule).unwrap().len(), 1);
        let tasks = r#"{"tasks":[]}"#;
        assert!(parse_proposed_tasks(tasks).unwrap().is_empty());
    }

    #[test]
    fn test_parse_failures_are_malformed() {
        for bad in ["", "not json", "42", r#"{"items":[]}"#, r#"[{"taskId": 5}]"#] {
            assert!(
                matches!(parse_proposed_tasks(bad), Err(LayoutError::MalformedResponse(_))),
                "input {:?}",
                bad
            );
        }
    }

    #[test]
    fn test_missing_field_is_malformed() {
        let proposed = vec![ProposedTask {
            task_id: Some("a".into()),
            display_name: Some("Roast".into()),
            start_time: Some("06:00".into()),
            end_time: None,
            duration_minutes: Some(30),
        }];
        let err = into_schedule_tasks(proposed).unwrap_err();
        assert!(err.to_string().contains("endTime"));
    }

    #[test]
    fn test_inconsistent_times_are_constraint_violation() {
        let proposed = vec![ProposedTask {
            task_id: Some("a".into()),
            display_name: Some("Roast".into()),
            start_time: Some("06:00".into()),
            end_time: Some("06:20".into()),
            duration_minutes: Some(30),
        }];
        assert!(matches!(into_schedule_tasks(proposed), Err(LayoutError::ConstraintViolation(_))));
    }

    #[test]
    fn test_validate_accepts_compliant_layout() {
        let window = TimeWindow::parse("06:00", "17:00").unwrap();
        let tasks = vec![
            ScheduleTask::new("a", "Roast chicken", "06:00".parse().unwrap(), 30).unwrap(),
            ScheduleTask::new("b", "Fried rice", "06:00".parse().unwrap(), 20).unwrap(),
        ];
        assert!(validate_layout(&tasks, &requests(), &window).is_ok());
        assert!(equipment_conflicts(&tasks, &requests()).is_empty());
    }

    #[test]
    fn test_validate_rejects_changed_duration() {
        let window = TimeWindow::default();
        let tasks = vec![
            ScheduleTask::new("a", "Roast chicken", "06:00".parse().unwrap(), 25).unwrap(),
            ScheduleTask::new("b", "Fried rice", "07:00".parse().unwrap(), 20).unwrap(),
        ];
        let err = validate_layout(&tasks, &requests(), &window).unwrap_err();
        assert!(matches!(err, LayoutError::ConstraintViolation(ref m) if m.contains("25")));
    }

    #[test]
    fn test_validate_rejects_outside_window_missing_and_unknown() {
        let window = TimeWindow::default();
        let late = vec![
            ScheduleTask::new("a", "Roast chicken", "16:45".parse().unwrap(), 30).unwrap(),
            ScheduleTask::new("b", "Fried rice", "07:00".parse().unwrap(), 20).unwrap(),
        ];
        assert!(validate_layout(&late, &requests(), &window).is_err());

        let missing = vec![ScheduleTask::new("a", "Roast chicken", "06:00".parse().unwrap(), 30).unwrap()];
        let err = validate_layout(&missing, &requests(), &window).unwrap_err();
        assert!(err.to_string().contains("missing tasks: b"));

        let unknown = vec![ScheduleTask::new("z", "Mystery", "06:00".parse().unwrap(), 30).unwrap()];
        assert!(validate_layout(&unknown, &requests(), &window).is_err());

        let twice = vec![
            ScheduleTask::new("a", "Roast chicken", "06:00".parse().unwrap(), 30).unwrap(),
            ScheduleTask::new("a", "Roast chicken", "08:00".parse().unwrap(), 30).unwrap(),
        ];
        assert!(validate_layout(&twice, &requests(), &window).is_err());
    }

    #[test]
    fn test_equipment_conflicts_reported() {
        let reqs = vec![
            ScheduleTaskRequest::new("a", "Roast chicken", 10, 20, vec!["oven".into()]),
            ScheduleTaskRequest::new("c", "Gratin", 10, 40, vec!["Oven".into(), "stovetop".into()]),
        ];
        let tasks = vec![
            ScheduleTask::new("a", "Roast chicken", "06:00".parse().unwrap(), 30).unwrap(),
            ScheduleTask::new("c", "Gratin", "06:15".parse().unwrap(), 50).unwrap(),
        ];
        let conflicts = equipment_conflicts(&tasks, &reqs);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].equipment, "oven");
    }
}
