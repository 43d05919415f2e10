pub mod task;
pub mod time_model;
pub mod validation;

pub use task::{ScheduleRecord, ScheduleTask, ScheduleTaskRequest};
pub use time_model::{
    duration_to_proportion, offset_to_time, time_to_offset, ClockTime, TimeWindow,
    DEFAULT_SNAP_MINUTES,
};
pub use validation::{check_within_window, partition_valid, ValidationError};
