//! Shard configuration model.
//!
//! The configuration is parsed once by the deployment generator and handed to
//! [`crate::new_shard_strategy`]. Only one of `pod_count` or
//! `namespace_replicas` is consulted, selected by `type`.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Strategy type for partitioning workflows across replicas.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ShardType {
    /// Split the hash keyspace into contiguous ranges.
    ConsistentHashing,

    /// Assign a fixed group of namespaces to each replica.
    Namespace,

    /// Unrecognized type, kept verbatim so it can be reported.
    Unknown(String),
}

impl ShardType {
    /// Canonical configuration string for this type.
    pub fn as_str(&self) -> &str {
        match self {
            ShardType::ConsistentHashing => "consistent-hashing",
            ShardType::Namespace => "namespace",
            ShardType::Unknown(s) => s,
        }
    }
}

impl From<String> for ShardType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "consistent-hashing" => ShardType::ConsistentHashing,
            "namespace" => ShardType::Namespace,
            _ => ShardType::Unknown(s),
        }
    }
}

impl From<&str> for ShardType {
    fn from(s: &str) -> Self {
        ShardType::from(s.to_string())
    }
}

impl From<ShardType> for String {
    fn from(t: ShardType) -> Self {
        t.as_str().to_string()
    }
}

impl fmt::Display for ShardType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Namespaces owned by a single replica.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceReplica {
    #[serde(default)]
    pub namespaces: Vec<String>,
}

impl NamespaceReplica {
    pub fn new<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            namespaces: namespaces.into_iter().map(Into::into).collect(),
        }
    }
}

/// Shard configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardConfig {
    /// Strategy type.
    #[serde(rename = "type")]
    pub shard_type: ShardType,

    /// Number of replicas (consistent hashing only).
    #[serde(default, alias = "pod-count")]
    pub pod_count: i64,

    /// Namespace groups, one per replica (namespace only).
    #[serde(default, alias = "namespace-replicas")]
    pub namespace_replicas: Vec<NamespaceReplica>,
}

impl ShardConfig {
    /// Configuration for the consistent hashing strategy.
    pub fn consistent_hashing(pod_count: i64) -> Self {
        Self {
            shard_type: ShardType::ConsistentHashing,
            pod_count,
            namespace_replicas: Vec::new(),
        }
    }

    /// Configuration for the namespace strategy.
    pub fn namespace(namespace_replicas: Vec<NamespaceReplica>) -> Self {
        Self {
            shard_type: ShardType::Namespace,
            pod_count: 0,
            namespace_replicas,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_consistent_hashing_json() {
        let config: ShardConfig =
            serde_json::from_str(r#"{"type":"consistent-hashing","podCount":4}"#).unwrap();
        assert_eq!(config, ShardConfig::consistent_hashing(4));
    }

    #[test]
    fn parses_namespace_toml_with_kebab_aliases() {
        let config: ShardConfig = toml::from_str(
            r#"
type = "namespace"

[[namespace-replicas]]
namespaces = ["ns-a"]

[[namespace-replicas]]
namespaces = ["ns-b", "ns-c"]
"#,
        )
        .unwrap();

        assert_eq!(config.shard_type, ShardType::Namespace);
        assert_eq!(config.pod_count, 0);
        assert_eq!(
            config.namespace_replicas,
            vec![
                NamespaceReplica::new(["ns-a"]),
                NamespaceReplica::new(["ns-b", "ns-c"]),
            ]
        );
    }

    #[test]
    fn unknown_type_is_retained() {
        let config: ShardConfig = serde_json::from_str(r#"{"type":"bogus"}"#).unwrap();
        assert_eq!(config.shard_type, ShardType::Unknown("bogus".to_string()));
        assert_eq!(config.shard_type.to_string(), "bogus");
    }

    #[test]
    fn type_serializes_as_string() {
        let json = serde_json::to_value(ShardConfig::consistent_hashing(2)).unwrap();
        assert_eq!(json["type"], "consistent-hashing");
        assert_eq!(json["podCount"], 2);
    }
}
