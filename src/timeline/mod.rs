//! Branching timelines of committed snapshots
//!
//! - `snapshot` - immutable world captures with a content hash
//! - `manager` - the shared, append-only branching store
//! - `persist` - versioned JSON envelopes and schema migration
//! - `autosave` - background disk writer

pub mod autosave;
pub mod manager;
pub mod persist;
pub mod snapshot;

pub use autosave::Autosaver;
pub use manager::{BranchPoint, Fallback, Resumed, TimelineInfo, TimelineManager};
pub use persist::{TimelineArchive, SCHEMA_VERSION};
pub use snapshot::Snapshot;
