//! Pointer-driven editing of the production timeline.
//!
//! The editor owns the live task list. A gesture goes
//! `Idle -> Pressed -> Dragging -> Idle`; a press released before crossing the
//! drag threshold is a click and selects the task instead. While dragging, the
//! task's start follows the pointer, clamped to the window and snapped, and its
//! duration never changes. Overlaps between tasks are left alone.

use tracing::{debug, warn};

use crate::schedule::{
    check_within_window, duration_to_proportion, offset_to_time, time_to_offset, ClockTime,
    ScheduleTask, TimeWindow, ValidationError, DEFAULT_SNAP_MINUTES,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EditorSettings {
    pub snap_minutes: u32,
    pub drag_threshold_px: f64,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            snap_minutes: DEFAULT_SNAP_MINUTES,
            drag_threshold_px: 5.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragState {
    Idle,
    Pressed {
        index: usize,
        origin_x: f64,
        origin_start: ClockTime,
    },
    Dragging {
        index: usize,
        origin_x: f64,
        origin_start: ClockTime,
    },
}

/// What a finished gesture amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GestureOutcome {
    Nothing,
    Selected(String),
    Dragged {
        task_id: String,
        from: ClockTime,
        to: ClockTime,
    },
}

impl GestureOutcome {
    /// True when a drag left the task somewhere new.
    pub fn moved(&self) -> bool {
        matches!(self, GestureOutcome::Dragged { from, to, .. } if from != to)
    }
}

/// Horizontal placement of one task, as fractions of the timeline width.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskBlock {
    pub task_id: String,
    pub display_name: String,
    pub start: ClockTime,
    pub end: ClockTime,
    pub duration_minutes: u32,
    pub left: f64,
    pub width: f64,
    pub selected: bool,
    pub dragging: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HourTick {
    pub time: ClockTime,
    pub position: f64,
}

#[derive(Debug, Clone)]
pub struct TimelineEditor {
    window: TimeWindow,
    settings: EditorSettings,
    tasks: Vec<ScheduleTask>,
    selected: Option<String>,
    drag: DragState,
}

impl TimelineEditor {
    pub fn new(window: TimeWindow, settings: EditorSettings) -> Self {
        Self {
            window,
            settings,
            tasks: Vec::new(),
            selected: None,
            drag: DragState::Idle,
        }
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    pub fn tasks(&self) -> &[ScheduleTask] {
        &self.tasks
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn drag_state(&self) -> DragState {
        self.drag
    }

    /// First problem that would make [`load`](Self::load) refuse `tasks`.
    pub fn check(&self, tasks: &[ScheduleTask]) -> Result<(), ValidationError> {
        tasks
            .iter()
            .try_for_each(|task| task.validate().and_then(|_| check_within_window(task, &self.window)))
    }

    /// Replace the live list. If any task is malformed or outside the window the
    /// editor is left empty and the first problem is returned.
    pub fn load(&mut self, tasks: Vec<ScheduleTask>) -> Result<(), ValidationError> {
        self.drag = DragState::Idle;
        if let Err(e) = self.check(&tasks) {
            warn!(error = %e, "refusing to load schedule");
            self.tasks.clear();
            self.selected = None;
            return Err(e);
        }
        self.tasks = tasks;
        if let Some(id) = &self.selected {
            if !self.tasks.iter().any(|t| t.task_id() == id) {
                self.selected = None;
            }
        }
        Ok(())
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
        self.selected = None;
        self.drag = DragState::Idle;
    }

    /// Select `task_id`, deselecting anything else. Unknown ids clear the selection.
    pub fn select(&mut self, task_id: &str) -> bool {
        let known = self.tasks.iter().any(|t| t.task_id() == task_id);
        self.selected = known.then(|| task_id.to_string());
        known
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Drop any gesture in progress without selecting or moving anything.
    pub fn cancel_gesture(&mut self) {
        self.drag = DragState::Idle;
    }

    pub fn pointer_down(&mut self, index: usize, x: f64) -> bool {
        if self.drag != DragState::Idle {
            return false;
        }
        let Some(task) = self.tasks.get(index) else {
            return false;
        };
        self.drag = DragState::Pressed {
            index,
            origin_x: x,
            origin_start: task.start_time(),
        };
        true
    }

    /// Feed one pointer position. `surface_width` is the pixel width of the
    /// whole window on screen. Returns the index of the task that moved, if any.
    pub fn pointer_move(&mut self, x: f64, surface_width: f64) -> Option<usize> {
        if !(surface_width > 0.0) {
            return None;
        }
        let (index, origin_x, origin_start) = match self.drag {
            DragState::Idle => return None,
            DragState::Pressed {
                index,
                origin_x,
                origin_start,
            } => {
                if (x - origin_x).abs() <= self.settings.drag_threshold_px {
                    return None;
                }
                self.drag = DragState::Dragging {
                    index,
                    origin_x,
                    origin_start,
                };
                (index, origin_x, origin_start)
            }
            DragState::Dragging {
                index,
                origin_x,
                origin_start,
            } => (index, origin_x, origin_start),
        };

        let duration = self.tasks.get(index)?.duration_minutes();
        let delta_minutes = (x - origin_x) / surface_width * self.window.length_minutes() as f64;
        let candidate = time_to_offset(origin_start, &self.window) as f64 + delta_minutes;
        let new_start = self.place(candidate, duration);

        let task = self.tasks.get_mut(index)?;
        if task.start_time() == new_start {
            return None;
        }
        task.shift_to(new_start);
        Some(index)
    }

    pub fn pointer_up(&mut self) -> GestureOutcome {
        let drag = std::mem::replace(&mut self.drag, DragState::Idle);
        match drag {
            DragState::Idle => GestureOutcome::Nothing,
            DragState::Pressed { index, .. } => match self.tasks.get(index) {
                Some(task) => {
                    let id = task.task_id().to_string();
                    self.selected = Some(id.clone());
                    GestureOutcome::Selected(id)
                }
                None => GestureOutcome::Nothing,
            },
            DragState::Dragging {
                index, origin_start, ..
            } => match self.tasks.get(index) {
                Some(task) => {
                    debug!(task = task.task_id(), from = %origin_start, to = %task.start_time(), "drag finished");
                    GestureOutcome::Dragged {
                        task_id: task.task_id().to_string(),
                        from: origin_start,
                        to: task.start_time(),
                    }
                }
                None => GestureOutcome::Nothing,
            },
        }
    }

    /// The pointer left the timeline; ends the gesture like a release.
    pub fn pointer_leave(&mut self) -> GestureOutcome {
        self.pointer_up()
    }

    /// Move a task to start as close to `start` as the window and snap allow.
    pub fn move_task(&mut self, task_id: &str, start: ClockTime) -> Option<ClockTime> {
        let index = self.tasks.iter().position(|t| t.task_id() == task_id)?;
        let duration = self.tasks[index].duration_minutes();
        let placed = self.place(time_to_offset(start, &self.window) as f64, duration);
        self.tasks[index].shift_to(placed);
        Some(placed)
    }

    /// Clamp a start offset so the task stays inside the window, then snap.
    /// When no snapped start fits, the clamped minute is used unsnapped.
    fn place(&self, candidate_offset: f64, duration: u32) -> ClockTime {
        let snap = self.settings.snap_minutes.max(1);
        let earliest = self.window.start().minutes();
        let latest = self.window.end().minutes().saturating_sub(duration).max(earliest);
        let max_offset = (latest - earliest) as f64;
        let clamped = candidate_offset.clamp(0.0, max_offset);

        let mut start = offset_to_time(clamped, &self.window, snap).minutes();
        if start < earliest {
            start = earliest.div_ceil(snap) * snap;
        }
        if start > latest {
            start = latest / snap * snap;
        }
        if start < earliest || start > latest {
            start = earliest + clamped.round() as u32;
        }
        ClockTime::from_minutes(start)
    }

    pub fn blocks(&self) -> Vec<TaskBlock> {
        let len = self.window.length_minutes() as f64;
        let dragged = match self.drag {
            DragState::Pressed { index, .. } | DragState::Dragging { index, .. } => Some(index),
            DragState::Idle => None,
        };
        self.tasks
            .iter()
            .enumerate()
            .map(|(idx, task)| TaskBlock {
                task_id: task.task_id().to_string(),
                display_name: task.display_name().to_string(),
                start: task.start_time(),
                end: task.end_time(),
                duration_minutes: task.duration_minutes(),
                left: (time_to_offset(task.start_time(), &self.window) as f64 / len).clamp(0.0, 1.0),
                width: duration_to_proportion(task.duration_minutes(), &self.window),
                selected: self.selected.as_deref() == Some(task.task_id()),
                dragging: dragged == Some(idx),
            })
            .collect()
    }

    /// Whole hours inside the window, with their position along the axis.
    pub fn hour_ticks(&self) -> Vec<HourTick> {
        let len = self.window.length_minutes() as f64;
        let first = self.window.start().minutes().div_ceil(60) * 60;
        (first..=self.window.end().minutes())
            .step_by(60)
            .map(|m| {
                let time = ClockTime::from_minutes(m);
                HourTick {
                    time,
                    position: time_to_offset(time, &self.window) as f64 / len,
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    const WIDTH: f64 = 660.0; // one pixel per minute over 06:00-17:00

    fn t(s: &str) -> ClockTime {
        s.parse().unwrap()
    }

    fn editor_with(tasks: Vec<ScheduleTask>) -> TimelineEditor {
        let mut editor = TimelineEditor::new(TimeWindow::default(), EditorSettings::default());
        editor.load(tasks).unwrap();
        editor
    }

    fn two_tasks() -> Vec<ScheduleTask> {
        vec![
            ScheduleTask::new("a", "Roast chicken", t("06:00"), 30).unwrap(),
            ScheduleTask::new("b", "Fried rice", t("08:00"), 20).unwrap(),
        ]
    }

    #[test]
    fn test_click_selects_without_moving() {
        let mut editor = editor_with(two_tasks());
        assert!(editor.pointer_down(1, 100.0));
        assert_eq!(editor.pointer_move(103.0, WIDTH), None);
        assert!(matches!(editor.drag_state(), DragState::Pressed { .. }));
        assert_eq!(editor.pointer_up(), GestureOutcome::Selected("b".into()));
        assert_eq!(editor.tasks()[1].start_time(), t("08:00"));
        assert_eq!(editor.selected(), Some("b"));
        assert_eq!(editor.drag_state(), DragState::Idle);
    }

    #[test]
    fn test_selection_is_exclusive() {
        let mut editor = editor_with(two_tasks());
        editor.pointer_down(0, 0.0);
        editor.pointer_up();
        editor.pointer_down(1, 0.0);
        editor.pointer_up();
        let selected: Vec<_> = editor.blocks().into_iter().filter(|b| b.selected).collect();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].task_id, "b");
    }

    #[test]
    fn test_drag_moves_and_snaps() {
        let mut editor = editor_with(two_tasks());
        editor.pointer_down(0, 10.0);
        // 47 minutes to the right snaps to 06:45
        assert_eq!(editor.pointer_move(57.0, WIDTH), Some(0));
        assert_eq!(editor.tasks()[0].start_time(), t("06:45"));
        assert_eq!(editor.tasks()[0].end_time(), t("07:15"));
        let outcome = editor.pointer_up();
        assert!(outcome.moved());
        assert_eq!(
            outcome,
            GestureOutcome::Dragged {
                task_id: "a".into(),
                from: t("06:00"),
                to: t("06:45")
            }
        );
        assert_eq!(editor.selected(), None);
    }

    #[test]
    fn test_drag_back_to_origin_is_not_a_move() {
        let mut editor = editor_with(two_tasks());
        editor.pointer_down(1, 200.0);
        editor.pointer_move(260.0, WIDTH);
        editor.pointer_move(201.0, WIDTH);
        let outcome = editor.pointer_up();
        assert!(matches!(outcome, GestureOutcome::Dragged { .. }));
        assert!(!outcome.moved());
    }

    #[test]
    fn test_drag_clamps_to_window_edges() {
        let mut editor = editor_with(two_tasks());
        editor.pointer_down(1, 300.0);
        editor.pointer_move(-5000.0, WIDTH);
        assert_eq!(editor.tasks()[1].start_time(), t("06:00"));
        editor.pointer_move(5000.0, WIDTH);
        // 16:40 would end exactly at 17:00 but is off the quarter-hour grid
        assert_eq!(editor.tasks()[1].start_time(), t("16:30"));
        assert_eq!(editor.tasks()[1].end_time(), t("16:50"));
        editor.pointer_leave();
        assert_eq!(editor.drag_state(), DragState::Idle);
    }

    #[test]
    fn test_clamp_prefers_window_over_snap() {
        // 50 minutes cannot end on a quarter hour inside 06:00-17:00; latest start is 16:10
        let mut editor = editor_with(vec![ScheduleTask::new("a", "Stock", t("06:00"), 50).unwrap()]);
        editor.pointer_down(0, 0.0);
        editor.pointer_move(10_000.0, WIDTH);
        let task = &editor.tasks()[0];
        assert!(task.end_time() <= t("17:00"));
        assert_eq!(task.start_time(), t("16:00"));
    }

    #[test]
    fn test_unaligned_window_falls_back_to_unsnapped() {
        let window = TimeWindow::parse("06:05", "06:40").unwrap();
        let mut editor = TimelineEditor::new(window, EditorSettings::default());
        editor
            .load(vec![ScheduleTask::new("a", "Sauce", t("06:05"), 30).unwrap()])
            .unwrap();
        editor.pointer_down(0, 0.0);
        editor.pointer_move(400.0, 350.0);
        assert_eq!(editor.tasks()[0].start_time(), t("06:10"));
        editor.pointer_move(-400.0, 350.0);
        assert_eq!(editor.tasks()[0].start_time(), t("06:05"));
    }

    #[test]
    fn test_random_drags_keep_duration_and_window() {
        let mut rng = rand::thread_rng();
        let mut editor = editor_with(two_tasks());
        let window = *editor.window();
        for _ in 0..200 {
            let index = rng.gen_range(0..2);
            let before = editor.tasks()[index].duration_minutes();
            editor.pointer_down(index, rng.gen_range(-1000.0..1000.0));
            for _ in 0..rng.gen_range(1..20) {
                editor.pointer_move(rng.gen_range(-3000.0..3000.0), rng.gen_range(1.0..2000.0));
                for task in editor.tasks() {
                    assert!(task.validate().is_ok());
                    assert!(window.contains_range(task.start_time(), task.end_time()));
                }
            }
            editor.pointer_up();
            assert_eq!(editor.tasks()[index].duration_minutes(), before);
        }
    }

    #[test]
    fn test_other_tasks_are_not_pushed_aside() {
        let mut editor = editor_with(two_tasks());
        editor.pointer_down(0, 0.0);
        editor.pointer_move(120.0, WIDTH); // onto task b at 08:00
        editor.pointer_up();
        assert_eq!(editor.tasks()[0].start_time(), t("08:00"));
        assert_eq!(editor.tasks()[1].start_time(), t("08:00"));
    }

    #[test]
    fn test_load_rejects_invalid_and_empties() {
        let mut editor = editor_with(two_tasks());
        let outside = ScheduleTask::new("c", "Late dish", t("16:50"), 30).unwrap();
        let result = editor.load(vec![two_tasks()[0].clone(), outside]);
        assert!(matches!(result, Err(ValidationError::OutsideWindow { .. })));
        assert!(editor.is_empty());
    }

    #[test]
    fn test_ignores_moves_without_press_or_width() {
        let mut editor = editor_with(two_tasks());
        assert_eq!(editor.pointer_move(100.0, WIDTH), None);
        editor.pointer_down(0, 0.0);
        assert_eq!(editor.pointer_move(100.0, 0.0), None);
        assert!(!editor.pointer_down(1, 0.0));
        assert!(!editor.pointer_down(7, 0.0));
    }

    #[test]
    fn test_move_task_uses_same_rules() {
        let mut editor = editor_with(two_tasks());
        assert_eq!(editor.move_task("a", t("09:08")), Some(t("09:15")));
        assert_eq!(editor.move_task("a", t("23:00")), Some(t("16:30")));
        assert_eq!(editor.move_task("zzz", t("09:00")), None);
    }

    #[test]
    fn test_block_layout_and_ticks() {
        let mut editor = editor_with(two_tasks());
        editor.select("b");
        let blocks = editor.blocks();
        assert_eq!(blocks[0].left, 0.0);
        assert!((blocks[0].width - 30.0 / 660.0).abs() < 1e-9);
        assert!((blocks[1].left - 120.0 / 660.0).abs() < 1e-9);
        assert!(blocks[1].selected);

        let ticks = editor.hour_ticks();
        assert_eq!(ticks.len(), 12);
        assert_eq!(ticks[0].time, t("06:00"));
        assert_eq!(ticks[11].position, 1.0);
    }
}
