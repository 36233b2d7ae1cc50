//! Planning, applying and undoing icon patches on an archive.

pub mod backup;
mod constants;
mod error;
pub mod orchestrator;
pub mod plan;
pub mod record;

pub use backup::BackupStore;
pub use constants::{BACKUP_DIR_SUFFIX, RECORD_KEY, TOOL_VERSION};
pub use error::{ErrorKind, PatchError, Unmatched};
pub use orchestrator::{status, ArchiveStatus, PatchOptions, PatchOutcome, PatchState, PatchSummary, Patcher};
pub use plan::{existing_patch, plan, plan_restore, PatchPlan, PlanOutcome, PlannedWrite, WriteKind};
pub use record::{PatchRecord, RecordEntry};
