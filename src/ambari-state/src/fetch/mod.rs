// ambari-state/src/fetch/mod.rs

//! Snapshot acquisition: url rendering, transports and the per-resource
//! in-flight and generation bookkeeping.

pub mod descriptor;
pub mod fetcher;
pub mod transport;

pub use descriptor::{FetchMode, ResourceDescriptor};
pub use fetcher::{SnapshotFetcher, TaggedSnapshot};
pub use transport::{HttpTransport, MemoryTransport, Transport};
