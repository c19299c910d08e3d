//! Shard commands (plan, render, owner).

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use propeller_shard::{
    new_shard_strategy, render_replicas, shard_key, OwnershipFilter, ReplicaPod, ShardStrategy,
    Strategy, DEFAULT_NAME_PREFIX,
};
use serde::Serialize;
use tabled::Tabled;
use tracing::info;

use crate::config::{load_pod_template, load_shard_config};
use crate::error::CliError;
use crate::output::{print_json, print_output, print_success, OutputFormat};

/// Shard command.
#[derive(Debug, Args)]
pub struct ShardCommand {
    /// Shard configuration file (.toml or .json).
    #[arg(long, global = true, env = "PROPELLER_SHARD_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: ShardSubcommand,
}

#[derive(Debug, Subcommand)]
enum ShardSubcommand {
    /// Show what every replica owns.
    Plan,

    /// Render one pod template per replica.
    Render(RenderArgs),

    /// Show which replica owns a workflow.
    Owner(OwnerArgs),
}

#[derive(Debug, Args)]
struct RenderArgs {
    /// Base pod template (.toml or .json).
    #[arg(long)]
    template: PathBuf,

    /// Replica name prefix; replicas are named PREFIX-INDEX.
    #[arg(long, default_value = DEFAULT_NAME_PREFIX)]
    name_prefix: String,

    /// Write one PREFIX-INDEX.json per replica here instead of printing.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Overwrite existing files in --out-dir.
    #[arg(long)]
    force: bool,
}

#[derive(Debug, Args)]
struct OwnerArgs {
    /// Workflow name.
    workflow: String,

    /// Workflow namespace.
    #[arg(long, short = 'n', default_value = "default")]
    namespace: String,
}

#[derive(Debug, Serialize, Tabled)]
struct PlanRow {
    #[tabled(rename = "Replica")]
    replica: usize,
    #[tabled(rename = "Owns")]
    owns: String,
    #[tabled(rename = "Flags")]
    flags: usize,
    #[tabled(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tokens: Vec<u32>,
    #[tabled(skip)]
    #[serde(skip_serializing_if = "Vec::is_empty")]
    namespaces: Vec<String>,
}

#[derive(Debug, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct OwnerRow {
    #[tabled(rename = "Workflow")]
    workflow: String,
    #[tabled(rename = "Namespace")]
    namespace: String,
    #[tabled(rename = "Shard Key")]
    shard_key: u32,
    #[tabled(rename = "Replica", display = "display_replica")]
    replica: Option<usize>,
}

fn display_replica(replica: &Option<usize>) -> String {
    replica.map_or_else(|| "none".to_string(), |r| r.to_string())
}

impl ShardCommand {
    pub fn run(self, format: OutputFormat) -> Result<()> {
        let config_path = self.config.as_deref().ok_or_else(|| {
            anyhow::anyhow!("No shard config specified. Use --config or set PROPELLER_SHARD_CONFIG.")
        })?;
        let strategy = build_strategy(config_path)?;

        match self.command {
            ShardSubcommand::Plan => print_output(&plan(&strategy)?, format),
            ShardSubcommand::Render(args) => render(&strategy, &args),
            ShardSubcommand::Owner(args) => {
                let row = owner(&strategy, &args.namespace, &args.workflow)?;
                print_output(&[row], format)
            }
        }
    }
}

fn build_strategy(config_path: &Path) -> Result<Strategy> {
    let config = load_shard_config(config_path)?;
    let strategy = new_shard_strategy(&config)
        .with_context(|| format!("Invalid shard config {}", config_path.display()))?;

    info!(
        shard_type = %strategy.shard_type(),
        pod_count = strategy.pod_count(),
        "Loaded shard strategy"
    );
    Ok(strategy)
}

fn plan(strategy: &Strategy) -> Result<Vec<PlanRow>> {
    (0..strategy.pod_count())
        .map(|index| -> Result<PlanRow> {
            let flags = strategy.ownership_args(index)?.len() / 2;
            let row = match strategy {
                Strategy::ConsistentHashing(s) => {
                    let range = s.key_range(index)?;
                    PlanRow {
                        replica: index,
                        owns: format!("tokens {range}"),
                        flags,
                        tokens: range.tokens().collect(),
                        namespaces: Vec::new(),
                    }
                }
                Strategy::Namespace(s) => {
                    let namespaces = s.namespaces(index)?.to_vec();
                    PlanRow {
                        replica: index,
                        owns: namespaces.join(", "),
                        flags,
                        tokens: Vec::new(),
                        namespaces,
                    }
                }
            };
            Ok(row)
        })
        .collect()
}

fn render(strategy: &Strategy, args: &RenderArgs) -> Result<()> {
    let template = load_pod_template(&args.template)?;
    let replicas = render_replicas(strategy, &template, &args.name_prefix)
        .with_context(|| format!("Failed to render pod template {}", args.template.display()))?;

    match &args.out_dir {
        None => print_json(&replicas),
        Some(dir) => {
            write_replicas(dir, &replicas, args.force)?;
            print_success(&format!(
                "Wrote {} replica pod spec(s) to {}",
                replicas.len(),
                dir.display()
            ));
            Ok(())
        }
    }
}

fn write_replicas(dir: &Path, replicas: &[ReplicaPod], force: bool) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("Failed to create {}", dir.display()))?;

    // Check everything first so a refused run leaves the directory untouched.
    let paths: Vec<PathBuf> = replicas
        .iter()
        .map(|r| dir.join(format!("{}.json", r.name)))
        .collect();
    if !force {
        if let Some(existing) = paths.iter().find(|p| p.exists()) {
            return Err(CliError::OutputExists(existing.clone()).into());
        }
    }

    for (replica, path) in replicas.iter().zip(&paths) {
        let contents = serde_json::to_string_pretty(replica)?;
        fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))?;
    }
    Ok(())
}

fn owner(strategy: &Strategy, namespace: &str, workflow: &str) -> Result<OwnerRow> {
    let mut replica = None;
    for index in 0..strategy.pod_count() {
        let filter = OwnershipFilter::from_args(strategy.ownership_args(index)?)?;
        if filter.owns(namespace, workflow) {
            replica = Some(index);
            break;
        }
    }

    Ok(OwnerRow {
        workflow: workflow.to_string(),
        namespace: namespace.to_string(),
        shard_key: shard_key(workflow),
        replica,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use propeller_shard::{NamespaceReplica, ShardConfig, ShardError};

    fn hashing(pod_count: i64) -> Strategy {
        new_shard_strategy(&ShardConfig::consistent_hashing(pod_count)).unwrap()
    }

    fn namespaced() -> Strategy {
        new_shard_strategy(&ShardConfig::namespace(vec![
            NamespaceReplica::new(["ns-a"]),
            NamespaceReplica::new(["ns-b", "ns-c"]),
        ]))
        .unwrap()
    }

    const TEMPLATE: &str = r#"{"containers":[{"name":"propeller","command":["flytepropeller"]}]}"#;

    #[test]
    fn plan_lists_ranges() {
        let rows = plan(&hashing(5)).unwrap();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0].owns, "tokens [0, 7)");
        assert_eq!(rows[0].flags, 7);
        assert_eq!(rows[4].tokens, (26..32).collect::<Vec<_>>());
    }

    #[test]
    fn plan_lists_namespaces() {
        let rows = plan(&namespaced()).unwrap();
        assert_eq!(rows[1].owns, "ns-b, ns-c");
        assert_eq!(rows[1].flags, 2);
        assert!(rows[1].tokens.is_empty());
    }

    #[test]
    fn owner_finds_the_namespace_replica() {
        let row = owner(&namespaced(), "ns-c", "wf").unwrap();
        assert_eq!(row.replica, Some(1));

        let row = owner(&namespaced(), "ns-z", "wf").unwrap();
        assert_eq!(row.replica, None);
        assert_eq!(display_replica(&row.replica), "none");
    }

    #[test]
    fn owner_matches_keyspace_range() {
        let row = owner(&hashing(32), "default", "wf-123").unwrap();
        assert_eq!(row.replica, Some(row.shard_key as usize));
    }

    #[test]
    fn writes_one_file_per_replica_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let template_path = dir.path().join("template.json");
        fs::write(&template_path, TEMPLATE).unwrap();
        let out_dir = dir.path().join("out");

        let args = RenderArgs {
            template: template_path,
            name_prefix: "propeller".to_string(),
            out_dir: Some(out_dir.clone()),
            force: false,
        };

        render(&hashing(2), &args).unwrap();
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(out_dir.join("propeller-1.json")).unwrap())
                .unwrap();
        assert_eq!(written["name"], "propeller-1");
        assert_eq!(written["index"], 1);
        assert_eq!(written["spec"]["containers"][0]["args"][1], "16");

        let err = render(&hashing(2), &args).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::OutputExists(_))
        ));

        let forced = RenderArgs { force: true, ..args };
        render(&hashing(2), &forced).unwrap();
    }

    #[test]
    fn refuses_namespace_config_without_replicas() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("shard.json");
        fs::write(&config_path, r#"{"type":"namespace"}"#).unwrap();

        let err = build_strategy(&config_path).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ShardError>(),
            Some(ShardError::NoNamespaceReplicas)
        ));
    }
}
