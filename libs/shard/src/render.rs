//! Per-replica pod template rendering.
//!
//! Rendering applies a strategy to a base template once per replica index and
//! tags every replica with a hash of the base template, so a deployment tool
//! can tell when replicas were produced from an outdated template.

use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::{Result, ShardError};
use crate::pod::PodSpec;
use crate::strategy::ShardStrategy;

/// Default replica name prefix.
pub const DEFAULT_NAME_PREFIX: &str = "flytepropeller";

/// Hash of a base pod template.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TemplateHash(String);

impl TemplateHash {
    /// Hash the canonical JSON form of a pod template.
    pub fn from_pod_spec(pod: &PodSpec) -> Result<Self> {
        let value = serde_json::to_value(pod)
            .map_err(|e| ShardError::Serialization(e.to_string()))?;
        Ok(Self::from_json(&value))
    }

    pub fn from_json(json: &serde_json::Value) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(canonical_json(json).as_bytes());
        let digest = hasher.finalize();
        Self(format!("sha256:{}", hex::encode(&digest[..16])))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TemplateHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// JSON with sorted object keys and no whitespace.
fn canonical_json(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Object(map) => {
            let mut pairs: Vec<_> = map.iter().collect();
            pairs.sort_by_key(|(k, _)| *k);
            let inner: Vec<String> = pairs
                .iter()
                .map(|(k, v)| {
                    let key = serde_json::Value::from(k.as_str());
                    format!("{}:{}", key, canonical_json(v))
                })
                .collect();
            format!("{{{}}}", inner.join(","))
        }
        serde_json::Value::Array(arr) => {
            let inner: Vec<String> = arr.iter().map(canonical_json).collect();
            format!("[{}]", inner.join(","))
        }
        other => other.to_string(),
    }
}

/// Pod template rendered for one replica.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplicaPod {
    /// Pod name, `<prefix>-<index>`.
    pub name: String,

    pub index: usize,

    /// Hash of the unmodified base template.
    pub template_hash: TemplateHash,

    pub spec: PodSpec,
}

/// Render one pod template per replica.
///
/// Stops at the first replica that fails; a partially rendered fleet is never
/// returned.
pub fn render_replicas<S>(
    strategy: &S,
    template: &PodSpec,
    name_prefix: &str,
) -> Result<Vec<ReplicaPod>>
where
    S: ShardStrategy + ?Sized,
{
    let template_hash = TemplateHash::from_pod_spec(template)?;
    let pod_count = strategy.pod_count();

    let mut replicas = Vec::with_capacity(pod_count);
    for index in 0..pod_count {
        let spec = strategy.update_pod_spec(template, index)?;
        let name = format!("{name_prefix}-{index}");
        debug!(pod = %name, "Rendered replica pod spec");

        replicas.push(ReplicaPod {
            name,
            index,
            template_hash: template_hash.clone(),
            spec,
        });
    }

    info!(
        replicas = replicas.len(),
        template_hash = %template_hash,
        "Rendered replica pod specs"
    );

    Ok(replicas)
}
