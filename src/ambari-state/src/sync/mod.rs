// ambari-state/src/sync/mod.rs

pub mod cache;
pub mod changes;
pub mod detector;
pub mod resources;

pub use cache::FingerprintCache;
pub use changes::{ChangeSet, DiffStats, Keyed, Rejection, SkippedItem};
pub use detector::ChangeDetector;
pub use resources::Resource;
