// ambari-state/src/cli/mod.rs

mod replay;
mod watch;

pub use replay::{replay_files, replay_snapshots};
pub use watch::{build_scheduler, watch_cluster};
