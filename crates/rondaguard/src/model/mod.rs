//! Core record types for rondaguard.

mod round;
mod settings;
mod task;
mod user;

pub use round::{ChecklistItem, RoundLog, StoredSyncFlag, SyncFlag};
pub use settings::ReportConfig;
pub use task::{ChecklistTemplate, Task};
pub use user::{default_users, User, UserRole};
