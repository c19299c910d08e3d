//! Shard strategies and the factory that builds them from configuration.

use tracing::debug;

use crate::config::{ShardConfig, ShardType};
use crate::error::{Result, ShardError};
use crate::keyspace::{compute_key_range, KeyRange, KEYSPACE_SIZE};
use crate::pod::{with_appended_args, PodSpec};

/// Flag selecting one consistent hashing token for a replica.
pub const SHARD_LABEL_FLAG: &str = "--propeller.include-shard-label";

/// Flag selecting one namespace for a replica.
pub const NAMESPACE_LABEL_FLAG: &str = "--propeller.include-namespace-label";

/// A static partition of workflow ownership across a fixed set of replicas.
///
/// The deployment generator asks for [`pod_count`](Self::pod_count) and then
/// calls [`update_pod_spec`](Self::update_pod_spec) once per replica index.
pub trait ShardStrategy: Send + Sync {
    /// Number of replicas this strategy requires.
    fn pod_count(&self) -> usize;

    /// Flag/value pairs encoding the ownership of replica `pod_index`.
    fn ownership_args(&self, pod_index: usize) -> Result<Vec<String>>;

    /// Return a copy of `pod` with the ownership of replica `pod_index`
    /// appended to the propeller container's arguments.
    fn update_pod_spec(&self, pod: &PodSpec, pod_index: usize) -> Result<PodSpec> {
        let args = self.ownership_args(pod_index)?;
        with_appended_args(pod, &args)
    }
}

fn check_index(pod_index: usize, pod_count: usize) -> Result<()> {
    if pod_index >= pod_count {
        return Err(ShardError::PodIndexOutOfRange {
            index: pod_index,
            pod_count,
        });
    }
    Ok(())
}

/// Evenly splits the keyspace into contiguous token ranges, one per replica.
///
/// Every keyspace token is assigned to exactly one replica, which gives
/// deterministic processing without any coordination at runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistentHashingStrategy {
    pod_count: u32,
}

impl ConsistentHashingStrategy {
    /// Token range owned by replica `pod_index`.
    pub fn key_range(&self, pod_index: usize) -> Result<KeyRange> {
        check_index(pod_index, self.pod_count())?;
        Ok(compute_key_range(
            KEYSPACE_SIZE,
            self.pod_count,
            pod_index as u32,
        ))
    }
}

impl ShardStrategy for ConsistentHashingStrategy {
    fn pod_count(&self) -> usize {
        self.pod_count as usize
    }

    fn ownership_args(&self, pod_index: usize) -> Result<Vec<String>> {
        let range = self.key_range(pod_index)?;
        Ok(range
            .tokens()
            .flat_map(|token| [SHARD_LABEL_FLAG.to_string(), token.to_string()])
            .collect())
    }
}

/// Assigns a configured group of namespaces to each replica by position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceStrategy {
    namespace_replicas: Vec<Vec<String>>,
}

impl NamespaceStrategy {
    /// Namespaces owned by replica `pod_index`, in configured order.
    pub fn namespaces(&self, pod_index: usize) -> Result<&[String]> {
        check_index(pod_index, self.pod_count())?;
        Ok(&self.namespace_replicas[pod_index])
    }
}

impl ShardStrategy for NamespaceStrategy {
    fn pod_count(&self) -> usize {
        self.namespace_replicas.len()
    }

    fn ownership_args(&self, pod_index: usize) -> Result<Vec<String>> {
        Ok(self
            .namespaces(pod_index)?
            .iter()
            .flat_map(|ns| [NAMESPACE_LABEL_FLAG.to_string(), ns.clone()])
            .collect())
    }
}

/// A constructed shard strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Strategy {
    ConsistentHashing(ConsistentHashingStrategy),
    Namespace(NamespaceStrategy),
}

impl Strategy {
    fn inner(&self) -> &dyn ShardStrategy {
        match self {
            Strategy::ConsistentHashing(s) => s,
            Strategy::Namespace(s) => s,
        }
    }

    pub fn shard_type(&self) -> ShardType {
        match self {
            Strategy::ConsistentHashing(_) => ShardType::ConsistentHashing,
            Strategy::Namespace(_) => ShardType::Namespace,
        }
    }
}

impl ShardStrategy for Strategy {
    fn pod_count(&self) -> usize {
        self.inner().pod_count()
    }

    fn ownership_args(&self, pod_index: usize) -> Result<Vec<String>> {
        self.inner().ownership_args(pod_index)
    }
}

/// Build a shard strategy, rejecting invalid configuration.
pub fn new_shard_strategy(config: &ShardConfig) -> Result<Strategy> {
    let strategy = match &config.shard_type {
        ShardType::ConsistentHashing => {
            if config.pod_count <= 0 {
                return Err(ShardError::PodCountNotPositive(config.pod_count));
            }
            if config.pod_count > i64::from(KEYSPACE_SIZE) {
                return Err(ShardError::PodCountExceedsKeyspace {
                    pod_count: config.pod_count,
                    keyspace: KEYSPACE_SIZE,
                });
            }

            Strategy::ConsistentHashing(ConsistentHashingStrategy {
                pod_count: config.pod_count as u32,
            })
        }
        ShardType::Namespace => {
            if config.namespace_replicas.is_empty() {
                return Err(ShardError::NoNamespaceReplicas);
            }

            let mut namespace_replicas = Vec::with_capacity(config.namespace_replicas.len());
            for replica in &config.namespace_replicas {
                if replica.namespaces.is_empty() {
                    return Err(ShardError::EmptyNamespaceReplica);
                }
                namespace_replicas.push(replica.namespaces.clone());
            }

            Strategy::Namespace(NamespaceStrategy { namespace_replicas })
        }
        ShardType::Unknown(name) => return Err(ShardError::UnknownStrategy(name.clone())),
    };

    debug!(
        shard_type = %strategy.shard_type(),
        pod_count = strategy.pod_count(),
        "Shard strategy constructed"
    );

    Ok(strategy)
}
