// ambari-state/src/store/mod.rs

pub mod events;
pub mod record;
pub mod record_store;
pub mod relations;
pub mod views;

pub use events::ChangeEvent;
pub use record::{Fields, Record, RecordRef, RecordType};
pub use record_store::{ChangeListener, RecordStore, Shared, SharedStore, Transaction};
pub use relations::{ParentKind, RelationDef, RelationIndex, RelationKey};
pub use views::{
    ConfigGroupView, ConfigVersionView, HostComponentView, RepositoryView, ServiceView,
};
