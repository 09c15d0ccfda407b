// ambari-state/src/lib.rs

pub mod cli;
pub mod config;
pub mod constants;
pub mod error;
pub mod fetch;
pub mod mappers;
pub mod scheduler;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use config::SyncConfig;
pub use error::{FetchError, MapError, PollError, StoreError};
pub use fetch::{FetchMode, SnapshotFetcher, Transport};
pub use mappers::{MapReport, Mapper, RawSnapshot};
pub use scheduler::{PollEvent, Scheduler};
pub use store::{ChangeEvent, RecordStore, RecordType, SharedStore};
pub use sync::{ChangeDetector, ChangeSet, Resource};
