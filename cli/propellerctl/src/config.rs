//! Loading shard configuration and pod templates from disk.
//!
//! Files ending in `.toml` are parsed as TOML; anything else as JSON.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use propeller_shard::{PodSpec, ShardConfig};
use serde::de::DeserializeOwned;

use crate::error::CliError;

/// Supported on-disk formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Toml,
    Json,
}

impl FileFormat {
    pub fn from_path(path: &Path) -> Result<Self, CliError> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Ok(Self::Toml),
            Some("json") | None => Ok(Self::Json),
            Some(other) => Err(CliError::UnsupportedFormat(other.to_string())),
        }
    }
}

fn load<T: DeserializeOwned>(path: &Path, what: &str) -> Result<T> {
    let format = FileFormat::from_path(path)?;
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} from {}", what, path.display()))?;

    match format {
        FileFormat::Toml => toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {} from {}", what, path.display())),
        FileFormat::Json => serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {} from {}", what, path.display())),
    }
}

/// Load a shard configuration file.
pub fn load_shard_config(path: &Path) -> Result<ShardConfig> {
    load(path, "shard config")
}

/// Load a base pod template.
pub fn load_pod_template(path: &Path) -> Result<PodSpec> {
    load(path, "pod template")
}

#[cfg(test)]
mod tests {
    use super::*;
    use propeller_shard::ShardType;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn loads_toml_and_json_configs() {
        let dir = tempfile::tempdir().unwrap();
        let toml_path = write_file(
            &dir,
            "shard.toml",
            "type = \"consistent-hashing\"\npod-count = 3\n",
        );
        let json_path = write_file(
            &dir,
            "shard.json",
            r#"{"type":"namespace","namespaceReplicas":[{"namespaces":["a"]}]}"#,
        );

        let from_toml = load_shard_config(&toml_path).unwrap();
        assert_eq!(from_toml, ShardConfig::consistent_hashing(3));

        let from_json = load_shard_config(&json_path).unwrap();
        assert_eq!(from_json.shard_type, ShardType::Namespace);
        assert_eq!(from_json.namespace_replicas.len(), 1);
    }

    #[test]
    fn rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "shard.yaml", "type: namespace\n");
        let err = load_shard_config(&path).unwrap_err();
        assert!(err.to_string().contains("Unsupported file format 'yaml'"));
    }

    #[test]
    fn reports_parse_failures_with_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(&dir, "template.json", "{not json");
        let err = load_pod_template(&path).unwrap_err();
        assert!(err.to_string().contains("template.json"));
    }
}
