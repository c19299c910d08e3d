//! Replica-side ownership filter.
//!
//! A propeller replica is launched with the flags produced by a
//! [`crate::ShardStrategy`]. This module parses those flags back into a filter
//! and decides whether a given workflow belongs to the replica.

use std::collections::BTreeSet;

use sha2::{Digest, Sha256};

use crate::error::{Result, ShardError};
use crate::keyspace::KEYSPACE_SIZE;
use crate::strategy::{NAMESPACE_LABEL_FLAG, SHARD_LABEL_FLAG};

/// Label carrying a workflow's keyspace token.
pub const SHARD_KEY_LABEL: &str = "shard-key";

/// Label carrying a workflow's namespace.
pub const NAMESPACE_LABEL: &str = "namespace";

/// Keyspace token for a workflow name.
///
/// Stable across processes and platforms.
pub fn shard_key(workflow_name: &str) -> u32 {
    let digest = Sha256::digest(workflow_name.as_bytes());
    let mut prefix = [0u8; 8];
    prefix.copy_from_slice(&digest[..8]);
    (u64::from_be_bytes(prefix) % u64::from(KEYSPACE_SIZE)) as u32
}

/// Set of tokens and namespaces a replica is responsible for.
///
/// An empty dimension places no constraint, so a replica started without any
/// ownership flags processes every workflow.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnershipFilter {
    shard_keys: BTreeSet<u32>,
    namespaces: BTreeSet<String>,
}

impl OwnershipFilter {
    /// Parse ownership flags from a replica's argument list.
    ///
    /// Accepts both `--flag value` and `--flag=value`. Unrelated arguments are
    /// skipped.
    pub fn from_args<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut filter = Self::default();
        let mut args = args.into_iter();

        while let Some(arg) = args.next() {
            let arg = arg.as_ref();
            let (flag, inline) = match arg.split_once('=') {
                Some((flag, value)) => (flag, Some(value.to_string())),
                None => (arg, None),
            };

            if flag != SHARD_LABEL_FLAG && flag != NAMESPACE_LABEL_FLAG {
                continue;
            }

            let value = match inline {
                Some(value) => value,
                None => args
                    .next()
                    .map(|v| v.as_ref().to_string())
                    .ok_or_else(|| {
                        ShardError::InvalidArgument(format!("{flag} requires a value"))
                    })?,
            };

            if flag == SHARD_LABEL_FLAG {
                filter.shard_keys.insert(parse_token(&value)?);
            } else {
                if value.is_empty() {
                    return Err(ShardError::InvalidArgument(format!(
                        "{flag} requires a non-empty namespace"
                    )));
                }
                filter.namespaces.insert(value);
            }
        }

        Ok(filter)
    }

    pub fn shard_keys(&self) -> &BTreeSet<u32> {
        &self.shard_keys
    }

    pub fn namespaces(&self) -> &BTreeSet<String> {
        &self.namespaces
    }

    /// Returns true if no ownership constraint is configured.
    pub fn is_unrestricted(&self) -> bool {
        self.shard_keys.is_empty() && self.namespaces.is_empty()
    }

    /// Returns true if this replica should reconcile the workflow.
    pub fn owns(&self, namespace: &str, workflow_name: &str) -> bool {
        let shard_ok =
            self.shard_keys.is_empty() || self.shard_keys.contains(&shard_key(workflow_name));
        let namespace_ok = self.namespaces.is_empty() || self.namespaces.contains(namespace);
        shard_ok && namespace_ok
    }

    /// Kubernetes label selector matching the owned workflows.
    ///
    /// Returns `None` for an unrestricted filter.
    pub fn label_selector(&self) -> Option<String> {
        let mut requirements = Vec::new();

        if !self.shard_keys.is_empty() {
            let keys: Vec<String> = self.shard_keys.iter().map(u32::to_string).collect();
            requirements.push(format!("{} in ({})", SHARD_KEY_LABEL, keys.join(",")));
        }
        if !self.namespaces.is_empty() {
            let namespaces: Vec<&str> = self.namespaces.iter().map(String::as_str).collect();
            requirements.push(format!("{} in ({})", NAMESPACE_LABEL, namespaces.join(",")));
        }

        if requirements.is_empty() {
            None
        } else {
            Some(requirements.join(","))
        }
    }
}

fn parse_token(value: &str) -> Result<u32> {
    let token: u32 = value.parse().map_err(|_| {
        ShardError::InvalidArgument(format!("shard label '{value}' is not a number"))
    })?;

    if token >= KEYSPACE_SIZE {
        return Err(ShardError::InvalidArgument(format!(
            "shard label {token} is outside keyspace [0, {KEYSPACE_SIZE})"
        )));
    }
    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_both_flag_forms() {
        let filter = OwnershipFilter::from_args([
            "--config",
            "/etc/flyte/config/*.yaml",
            "--propeller.include-shard-label",
            "3",
            "--propeller.include-shard-label=4",
            "--propeller.include-namespace-label",
            "ns-a",
        ])
        .unwrap();

        assert_eq!(filter.shard_keys().iter().copied().collect::<Vec<_>>(), vec![3, 4]);
        assert!(filter.namespaces().contains("ns-a"));
        assert!(!filter.is_unrestricted());
    }

    #[test]
    fn rejects_malformed_tokens() {
        for bad in ["32", "-1", "abc"] {
            let err = OwnershipFilter::from_args([SHARD_LABEL_FLAG, bad]).unwrap_err();
            assert!(matches!(err, ShardError::InvalidArgument(_)), "{bad} accepted");
        }
    }

    #[test]
    fn rejects_flag_without_value() {
        let err = OwnershipFilter::from_args([NAMESPACE_LABEL_FLAG]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid ownership argument: --propeller.include-namespace-label requires a value"
        );
        assert!(OwnershipFilter::from_args(["--propeller.include-namespace-label="]).is_err());
    }

    #[test]
    fn empty_filter_owns_everything() {
        let filter = OwnershipFilter::from_args(Vec::<String>::new()).unwrap();
        assert!(filter.is_unrestricted());
        assert!(filter.owns("any", "wf"));
        assert_eq!(filter.label_selector(), None);
    }

    #[test]
    fn namespace_filter() {
        let filter = OwnershipFilter::from_args([
            NAMESPACE_LABEL_FLAG,
            "ns-b",
            NAMESPACE_LABEL_FLAG,
            "ns-c",
        ])
        .unwrap();
        assert!(filter.owns("ns-c", "wf"));
        assert!(!filter.owns("ns-a", "wf"));
        assert_eq!(filter.label_selector().unwrap(), "namespace in (ns-b,ns-c)");
    }

    #[test]
    fn shard_filter_selector() {
        let filter =
            OwnershipFilter::from_args([SHARD_LABEL_FLAG, "9", SHARD_LABEL_FLAG, "1"]).unwrap();
        assert_eq!(filter.label_selector().unwrap(), "shard-key in (1,9)");
    }

    #[test]
    fn shard_key_is_deterministic() {
        assert_eq!(shard_key("wf-abc"), shard_key("wf-abc"));
    }

    proptest! {
        #[test]
        fn shard_key_within_keyspace(name in ".*") {
            prop_assert!(shard_key(&name) < KEYSPACE_SIZE);
        }
    }
}
