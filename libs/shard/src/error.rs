//! Error types for shard strategy construction and pod template mutation.

use thiserror::Error;

/// Errors raised while building a shard strategy or applying it to a pod spec.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ShardError {
    /// Consistent hashing was configured with zero or a negative pod count.
    #[error("configured PodCount ({0}) must be greater than zero")]
    PodCountNotPositive(i64),

    /// Consistent hashing was configured with more pods than keyspace tokens.
    #[error("configured PodCount ({pod_count}) is larger than available keyspace size ({keyspace})")]
    PodCountExceedsKeyspace { pod_count: i64, keyspace: u32 },

    /// A namespace replica was configured without any namespaces.
    #[error("unable to create namespace replica with 0 configured namespace(s)")]
    EmptyNamespaceReplica,

    /// The namespace strategy was configured without any replicas.
    #[error("namespace shard strategy requires at least one namespace replica")]
    NoNamespaceReplicas,

    /// The configured strategy type is not recognized.
    #[error("shard strategy '{0}' does not exist")]
    UnknownStrategy(String),

    /// The pod template does not contain exactly one propeller container.
    #[error("expecting 1 flytepropeller container in podtemplate but found {found}")]
    TargetContainer { found: usize },

    /// The replica index is outside of the strategy's pod count.
    #[error("pod index {index} is out of range for {pod_count} replica(s)")]
    PodIndexOutOfRange { index: usize, pod_count: usize },

    /// An ownership argument could not be parsed.
    #[error("invalid ownership argument: {0}")]
    InvalidArgument(String),

    /// A pod spec could not be serialized for hashing.
    #[error("failed to serialize pod spec: {0}")]
    Serialization(String),
}

impl ShardError {
    /// Returns true if this error was raised while validating configuration.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            ShardError::PodCountNotPositive(_)
                | ShardError::PodCountExceedsKeyspace { .. }
                | ShardError::EmptyNamespaceReplica
                | ShardError::NoNamespaceReplicas
                | ShardError::UnknownStrategy(_)
        )
    }

    /// Returns true if this error was raised while mutating a pod spec.
    pub fn is_pod_spec(&self) -> bool {
        matches!(
            self,
            ShardError::TargetContainer { .. } | ShardError::PodIndexOutOfRange { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ShardError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_offending_values() {
        assert_eq!(
            ShardError::PodCountNotPositive(0).to_string(),
            "configured PodCount (0) must be greater than zero"
        );
        assert_eq!(
            ShardError::PodCountExceedsKeyspace {
                pod_count: 33,
                keyspace: 32
            }
            .to_string(),
            "configured PodCount (33) is larger than available keyspace size (32)"
        );
        assert_eq!(
            ShardError::TargetContainer { found: 2 }.to_string(),
            "expecting 1 flytepropeller container in podtemplate but found 2"
        );
    }

    #[test]
    fn error_kinds_are_disjoint() {
        let config = ShardError::UnknownStrategy("bogus".to_string());
        assert!(config.is_configuration());
        assert!(!config.is_pod_spec());

        let pod = ShardError::TargetContainer { found: 0 };
        assert!(pod.is_pod_spec());
        assert!(!pod.is_configuration());

        let arg = ShardError::InvalidArgument("x".to_string());
        assert!(!arg.is_pod_spec());
        assert!(!arg.is_configuration());
    }
}
