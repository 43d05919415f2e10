pub mod render;
pub mod timeline;

pub use render::render_text;
pub use timeline::{DragState, EditorSettings, GestureOutcome, HourTick, TaskBlock, TimelineEditor};
