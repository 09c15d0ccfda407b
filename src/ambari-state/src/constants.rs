// ambari-state/src/constants.rs

pub const DEFAULT_CONFIG_NAME: &str = "ambari-state.yml";

/// Buffered change events per subscriber before slow receivers lag.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Buffered poll events per subscriber.
pub const POLL_EVENT_CAPACITY: usize = 64;

/// Default HTTP request timeout, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Header the Ambari server requires on API requests.
pub const REQUESTED_BY_HEADER: &str = "X-Requested-By";
pub const REQUESTED_BY_VALUE: &str = "ambari-state";

/// `group_id` of a service's default config group.
pub const DEFAULT_GROUP_ID: i64 = -1;
pub const DEFAULT_GROUP_NAME: &str = "Default";
