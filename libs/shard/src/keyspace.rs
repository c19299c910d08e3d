//! Consistent hashing keyspace and its partition into per-replica ranges.
//!
//! The keyspace `[0, KEYSPACE_SIZE)` is split into `pod_count` contiguous
//! ranges. The first `keyspace_size % pod_count` replicas receive one extra
//! token so that every token is owned by exactly one replica.
//!
//! # Invariants
//!
//! - Ranges are contiguous: `range(i).end == range(i + 1).start`
//! - Ranges cover the keyspace: `range(0).start == 0`, `range(n - 1).end == keyspace_size`
//! - Range sizes differ by at most one token

use std::fmt;
use std::ops::Range;

use serde::Serialize;

/// Number of tokens in the consistent hashing keyspace.
pub const KEYSPACE_SIZE: u32 = 32;

/// Half-open range of keyspace tokens `[start, end)` owned by one replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct KeyRange {
    pub start: u32,
    pub end: u32,
}

impl KeyRange {
    pub fn new(start: u32, end: u32) -> Self {
        debug_assert!(start <= end, "key range start {start} exceeds end {end}");
        Self { start, end }
    }

    /// Number of tokens in the range.
    pub fn len(&self) -> u32 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, token: u32) -> bool {
        (self.start..self.end).contains(&token)
    }

    /// Tokens in ascending order.
    pub fn tokens(&self) -> Range<u32> {
        self.start..self.end
    }
}

impl fmt::Display for KeyRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end)
    }
}

/// First token owned by `pod_index`.
///
/// Replicas below `remainder` own `keys_per_pod + 1` tokens, the rest own
/// `keys_per_pod`.
pub fn start_key(keys_per_pod: u32, remainder: u32, pod_index: u32) -> u32 {
    pod_index.min(remainder) * (keys_per_pod + 1)
        + pod_index.saturating_sub(remainder) * keys_per_pod
}

/// Compute the `[start, end)` token range owned by `pod_index`.
///
/// `pod_count` must be non-zero and no larger than `keyspace_size`.
///
/// # Panics
///
/// Panics if `pod_count` is zero. Strategies built by
/// [`crate::new_shard_strategy`] never pass zero.
pub fn compute_key_range(keyspace_size: u32, pod_count: u32, pod_index: u32) -> KeyRange {
    debug_assert!(pod_count > 0, "pod_count must be positive");

    let keys_per_pod = keyspace_size / pod_count;
    let remainder = keyspace_size - keys_per_pod * pod_count;

    KeyRange::new(
        start_key(keys_per_pod, remainder, pod_index),
        start_key(keys_per_pod, remainder, pod_index + 1),
    )
}

/// Ranges for every replica, indexed by pod index.
pub fn partition(keyspace_size: u32, pod_count: u32) -> Vec<KeyRange> {
    (0..pod_count)
        .map(|pod_index| compute_key_range(keyspace_size, pod_count, pod_index))
        .collect()
}
