// Copyright 2025 kube-fzf-cache Authors.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use crate::domain::config::{NamespaceScope, SyncConfig};
use crate::domain::sync::{run_until_shutdown, SyncDeps};
use crate::infrastructure::constants::CACHE_DIR_ENV;
use crate::infrastructure::kubernetes::{KubeCredentials, KubeconfigContext};
use crate::infrastructure::snapshot::DirectorySnapshots;
use crate::shared::ShutdownRx;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Args, Debug, Clone, Default)]
pub struct SyncCommand {
    /// Cache directory. Defaults to the KUBECTL_FZF_CACHE environment variable
    #[arg(long, short = 'd', env = CACHE_DIR_ENV)]
    pub dir: Option<PathBuf>,

    /// Label selector applied to every resource type
    #[arg(long, short = 'l')]
    pub selector: Option<String>,

    /// Seconds between two polls of Nodes
    #[arg(long)]
    pub node_poll_time: Option<u64>,

    /// Seconds between two polls of Namespaces
    #[arg(long)]
    pub namespace_poll_time: Option<u64>,

    /// Namespace to track; `all` disables filtering.
    /// If not specified, uses the namespace of the current context
    #[arg(long, short = 'n')]
    pub namespace: Option<NamespaceScope>,

    /// Command run with the context name when the login token is expired
    #[arg(long)]
    pub refresh_command: Option<String>,

    /// Resource types to track, comma separated (e.g. Pod,Service,Node)
    #[arg(long, value_delimiter = ',')]
    pub resources: Vec<String>,

    /// Namespaces to leave out of the snapshots, comma separated regular expressions
    #[arg(long, value_delimiter = ',')]
    pub excluded_namespaces: Vec<String>,

    /// Node roles to leave out of the node snapshot, comma separated (e.g. master,etcd)
    #[arg(long, alias = "role-blacklist", value_delimiter = ',')]
    pub ignored_node_roles: Vec<String>,

    /// Kubernetes context to use.
    /// If not specified, follows the current context from kubeconfig
    #[arg(long)]
    pub context: Option<String>,

    /// Configuration file path (TOML); command line flags take precedence
    #[arg(long, short = 'c')]
    pub config: Option<PathBuf>,
}

impl SyncCommand {
    /// Resolves the effective configuration: command line > config file > defaults.
    pub fn to_config(&self) -> anyhow::Result<SyncConfig> {
        let mut config = match &self.config {
            Some(path) => SyncConfig::from_file(path)?,
            None => SyncConfig::default(),
        };

        if let Some(dir) = &self.dir {
            config.cache_dir = dir.clone();
        }
        if let Some(selector) = &self.selector {
            config.selector = Some(selector.clone());
        }
        if let Some(seconds) = self.node_poll_time {
            config.node_poll_interval = seconds;
        }
        if let Some(seconds) = self.namespace_poll_time {
            config.namespace_poll_interval = seconds;
        }
        if let Some(namespace) = &self.namespace {
            config.namespace = namespace.clone();
        }
        if let Some(command) = &self.refresh_command {
            config.refresh_command = Some(command.clone());
        }
        if let Some(resources) = non_empty(&self.resources) {
            config.resources = resources;
        }
        if let Some(patterns) = non_empty(&self.excluded_namespaces) {
            config.excluded_namespaces = patterns;
        }
        if let Some(roles) = non_empty(&self.ignored_node_roles) {
            config.ignored_node_roles = roles;
        }
        if let Some(context) = &self.context {
            config.context = Some(context.clone());
        }

        config.validate()?;
        Ok(config)
    }

    pub async fn execute(&self, shutdown: ShutdownRx) -> anyhow::Result<()> {
        let config = Arc::new(self.to_config()?);
        let snapshots = DirectorySnapshots::new(&config.cache_dir)?;
        info!(
            dir = %snapshots.dir().display(),
            scope = %config.namespace,
            resources = %config.resources.join(","),
            "Starting kube-fzf-cache"
        );

        let deps = SyncDeps {
            contexts: Arc::new(KubeconfigContext::new(config.context.clone())),
            credentials: Arc::new(KubeCredentials::new(
                config.refresh_command.clone(),
                config.request_timeout,
            )),
            snapshots: Arc::new(snapshots),
            config,
        };
        run_until_shutdown(deps, shutdown).await;
        Ok(())
    }
}

/// Trimmed list values, `None` when the flag was not given.
fn non_empty(values: &[String]) -> Option<Vec<String>> {
    let values: Vec<String> = values
        .iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect();
    (!values.is_empty()).then_some(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::CliArgs;
    use clap::Parser;

    #[test]
    fn test_flags_override_defaults() {
        let args = CliArgs::try_parse_from([
            "kube-fzf-cache",
            "--dir",
            "/tmp/fzf",
            "-l",
            "team=core",
            "--node-poll-time",
            "30",
            "-n",
            "all",
            "--resources",
            "Pod,Node",
            "-v",
        ])
        .unwrap();
        assert!(args.verbose);

        let config = args.sync.to_config().unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/tmp/fzf"));
        assert_eq!(config.selector(), Some("team=core"));
        assert_eq!(config.node_poll_interval, 30);
        assert_eq!(config.namespace_poll_interval, 600);
        assert_eq!(config.namespace, NamespaceScope::All);
        assert_eq!(config.resources, vec!["Pod", "Node"]);
    }

    #[test]
    fn test_config_file_then_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.toml");
        std::fs::write(
            &path,
            "cache_dir = \"/from/file\"\nnamespace = \"prod\"\nnode_poll_interval = 45\n",
        )
        .unwrap();

        let command = SyncCommand {
            config: Some(path),
            dir: Some(PathBuf::from("/from/flag")),
            ..Default::default()
        };
        let config = command.to_config().unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/from/flag"));
        assert_eq!(config.namespace, NamespaceScope::Named("prod".to_string()));
        assert_eq!(config.node_poll_interval, 45);
    }

    #[test]
    fn test_filter_flags() {
        let args = CliArgs::try_parse_from([
            "kube-fzf-cache",
            "--dir",
            "/tmp/fzf",
            "--excluded-namespaces",
            "^kube-, monitoring",
            "--role-blacklist",
            "master,etcd",
        ])
        .unwrap();
        let config = args.sync.to_config().unwrap();
        assert_eq!(config.excluded_namespaces, vec!["^kube-", "monitoring"]);
        assert_eq!(config.ignored_node_roles, vec!["master", "etcd"]);

        let bad = SyncCommand {
            dir: Some(PathBuf::from("/tmp/fzf")),
            excluded_namespaces: vec!["kube-(".to_string()],
            ..Default::default()
        };
        assert!(bad.to_config().is_err());
    }

    #[test]
    fn test_unknown_resource_is_rejected() {
        let command = SyncCommand {
            dir: Some(PathBuf::from("/tmp/fzf")),
            resources: vec!["Pod".to_string(), "Ingress".to_string()],
            ..Default::default()
        };
        assert!(command.to_config().is_err());
    }
}
