//! Schedule reconciliation core.
//!
//! Represents a month of shift assignments as a grid, overlays pending
//! local edits on a remote baseline, and computes the minimal
//! create/update/delete instruction set to bring the remote tracker in
//! sync. A single-flight + TTL request cache backs the month loaders.

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod context;
pub mod grid;
pub mod model;
pub mod output;
pub mod overlay;
pub mod reconcile;
pub mod remote;
pub mod timeconv;

mod test_helpers;

pub use archive::ScheduleArchive;
pub use cache::{CacheOptions, RequestCache};
pub use config::Config;
pub use context::{schedule_cache_key, LoadToken, ReconciliationContext};
pub use grid::build_month_schedule;
pub use model::{
    MonthSchedule, ScheduleGrid, Shift, ShiftTemplate, SyncInstruction, SyncPlan, TemplateCatalog,
};
pub use overlay::{OverlayEntry, OverlayKey, OverlayStore, ShiftPatch};
pub use reconcile::{diff, shifts_equal};
pub use remote::{RemoteMonthPayload, RemoteScheduleItem};
