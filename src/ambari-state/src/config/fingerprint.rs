// ambari-state/src/config/fingerprint.rs

use serde_json::Value;
use std::fmt;
use std::hash::{Hash, Hasher};
use twox_hash::XxHash64;

/// Comparable summary of the change-relevant fields of a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(u64);

impl Fingerprint {
    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Compute a deterministic fingerprint for any hashable value.
///
/// Seeded xxHash so the result is stable across runs and processes.
pub fn fingerprint_of<T: Hash + ?Sized>(data: &T) -> Fingerprint {
    let mut hasher = XxHash64::with_seed(0);
    data.hash(&mut hasher);
    Fingerprint(hasher.finish())
}

/// Fingerprint an ordered list of JSON values.
///
/// Each value is hashed through its canonical (compact, sorted-key) JSON
/// encoding, so byte-identical field values always agree and a missing
/// value (`None`) never collides with an explicit `null`.
pub fn fingerprint_values<'a, I>(values: I) -> Fingerprint
where
    I: IntoIterator<Item = Option<&'a Value>>,
{
    let mut hasher = XxHash64::with_seed(0);
    for value in values {
        match value {
            Some(value) => {
                1u8.hash(&mut hasher);
                value.to_string().hash(&mut hasher);
            }
            None => 0u8.hash(&mut hasher),
        }
    }
    Fingerprint(hasher.finish())
}
