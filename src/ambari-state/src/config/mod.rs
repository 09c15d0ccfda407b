// ambari-state/src/config/mod.rs

pub mod fingerprint;
pub mod interval;
pub mod model;
pub mod schema;

pub use fingerprint::Fingerprint;
pub use interval::PollInterval;
pub use model::{PollGroupConfig, ServerConfig, StackRef, SyncConfig};
pub use schema::{FieldMap, FieldSpec, IdTemplate, Identified, RecordSchema};
