pub mod autosave;
pub mod restore;
pub mod store;

pub use autosave::{AutoSaver, SaveStatus};
pub use restore::{restore_latest, RestoreOutcome};
pub use store::{JsonFileStore, MemoryStore, SaveKind, ScheduleStore, StoreError};
