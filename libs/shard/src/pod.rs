//! Minimal pod template model and the propeller container mutator.
//!
//! Only the fields the shard strategies touch are typed. Everything else in a
//! pod template is carried through untouched so that rendered replicas keep
//! volumes, service accounts, resources, and so on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, ShardError};

/// Binary name identifying the propeller container in a pod template.
pub const PROPELLER_BINARY: &str = "flytepropeller";

/// A container within a pod template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,

    /// Untyped container fields (env, resources, ports, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Container {
    pub fn new(name: &str, command: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    /// Set the container arguments.
    pub fn with_args(mut self, args: &[&str]) -> Self {
        self.args = args.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Returns true if this container runs the propeller binary.
    pub fn runs_propeller(&self) -> bool {
        self.command.first().map(String::as_str) == Some(PROPELLER_BINARY)
    }
}

/// A pod specification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PodSpec {
    #[serde(default)]
    pub containers: Vec<Container>,

    /// Untyped pod fields (volumes, serviceAccountName, ...).
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl PodSpec {
    pub fn new(containers: Vec<Container>) -> Self {
        Self {
            containers,
            extra: BTreeMap::new(),
        }
    }
}

/// Find the index of the single propeller container.
///
/// Fails unless exactly one container's command starts with
/// [`PROPELLER_BINARY`].
pub fn locate_target_container(pod: &PodSpec) -> Result<usize> {
    let matches: Vec<usize> = pod
        .containers
        .iter()
        .enumerate()
        .filter(|(_, c)| c.runs_propeller())
        .map(|(i, _)| i)
        .collect();

    match matches.as_slice() {
        [index] => Ok(*index),
        _ => Err(ShardError::TargetContainer {
            found: matches.len(),
        }),
    }
}

/// Return a copy of `pod` with `args` appended to the propeller container.
///
/// Existing arguments are kept and nothing is deduplicated: feeding the
/// result back in appends the flags a second time.
pub fn with_appended_args(pod: &PodSpec, args: &[String]) -> Result<PodSpec> {
    let index = locate_target_container(pod)?;

    let mut updated = pod.clone();
    updated.containers[index].args.extend_from_slice(args);
    Ok(updated)
}
