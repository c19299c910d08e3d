//! # propeller-shard
//!
//! Static shard strategies for running propeller as a fleet of replicas.
//!
//! Ownership of workflows is partitioned once, when replica pod templates are
//! generated. Each replica is launched with flags naming exactly what it owns,
//! so no coordination is needed at runtime.
//!
//! ## Strategies
//!
//! - **Consistent hashing**: the keyspace `[0, 32)` is split into `pod_count`
//!   contiguous ranges whose sizes differ by at most one token.
//! - **Namespace**: replica `i` owns the `i`-th configured namespace group.
//!
//! ## Usage
//!
//! ```
//! use propeller_shard::{new_shard_strategy, Container, PodSpec, ShardConfig, ShardStrategy};
//!
//! let strategy = new_shard_strategy(&ShardConfig::consistent_hashing(4)).unwrap();
//! let template = PodSpec::new(vec![Container::new("propeller", &["flytepropeller"])]);
//!
//! for index in 0..strategy.pod_count() {
//!     let pod = strategy.update_pod_spec(&template, index).unwrap();
//!     assert_eq!(pod.containers[0].args.len(), 2 * 8);
//! }
//! ```

mod config;
mod error;
mod keyspace;
mod ownership;
mod pod;
mod render;
mod strategy;

pub use config::{NamespaceReplica, ShardConfig, ShardType};
pub use error::{Result, ShardError};
pub use keyspace::{compute_key_range, partition, start_key, KeyRange, KEYSPACE_SIZE};
pub use ownership::{shard_key, OwnershipFilter, NAMESPACE_LABEL, SHARD_KEY_LABEL};
pub use pod::{locate_target_container, with_appended_args, Container, PodSpec, PROPELLER_BINARY};
pub use render::{render_replicas, ReplicaPod, TemplateHash, DEFAULT_NAME_PREFIX};
pub use strategy::{
    new_shard_strategy, ConsistentHashingStrategy, NamespaceStrategy, ShardStrategy, Strategy,
    NAMESPACE_LABEL_FLAG, SHARD_LABEL_FLAG,
};
