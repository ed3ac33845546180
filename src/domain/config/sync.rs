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

use crate::domain::resource::{PollCadence, ResourceDescriptor};
use crate::domain::sync::filter::RecordFilter;
use crate::infrastructure::constants::{
    ALL_NAMESPACES, CACHE_DIR_ENV, DEFAULT_LIVENESS_SECS, DEFAULT_NAMESPACE,
    DEFAULT_NAMESPACE_POLL_SECS, DEFAULT_NODE_POLL_SECS, DEFAULT_RESOURCES,
    DEFAULT_RETRY_BACKOFF_SECS, DEFAULT_WATCH_TIMEOUT_SECS,
};
use crate::infrastructure::kubernetes::resources;
use crate::shared::error::{Result, SyncError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

// ============================================================================
// Namespace scope
// ============================================================================

/// Which namespaces namespaced kinds are tracked in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum NamespaceScope {
    All,
    Named(String),
    /// The namespace of the kubeconfig context, `default` when it has none.
    #[default]
    Current,
}

impl NamespaceScope {
    /// Namespace filter for API calls; `None` means every namespace.
    pub fn resolve(&self, context_namespace: Option<&str>) -> Option<String> {
        match self {
            NamespaceScope::All => None,
            NamespaceScope::Named(namespace) => Some(namespace.clone()),
            NamespaceScope::Current => {
                Some(context_namespace.unwrap_or(DEFAULT_NAMESPACE).to_string())
            }
        }
    }
}

impl FromStr for NamespaceScope {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "" => Ok(NamespaceScope::Current),
            ALL_NAMESPACES => Ok(NamespaceScope::All),
            name if name.contains(char::is_whitespace) => Err(SyncError::config_error(
                format!("Invalid namespace: {}", name),
            )),
            name => Ok(NamespaceScope::Named(name.to_string())),
        }
    }
}

impl TryFrom<String> for NamespaceScope {
    type Error = SyncError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<NamespaceScope> for String {
    fn from(scope: NamespaceScope) -> Self {
        match scope {
            NamespaceScope::All => ALL_NAMESPACES.to_string(),
            NamespaceScope::Named(namespace) => namespace,
            NamespaceScope::Current => String::new(),
        }
    }
}

impl fmt::Display for NamespaceScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NamespaceScope::All => write!(f, "all namespaces"),
            NamespaceScope::Named(namespace) => write!(f, "namespace {}", namespace),
            NamespaceScope::Current => write!(f, "current namespace"),
        }
    }
}

// ============================================================================
// Sync configuration
// ============================================================================

/// Everything the cache builder needs to know. Durations are in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub cache_dir: PathBuf,
    pub selector: Option<String>,
    pub namespace: NamespaceScope,
    pub refresh_command: Option<String>,
    pub resources: Vec<String>,
    /// Namespace patterns (regular expressions) whose objects are left out of the snapshots.
    pub excluded_namespaces: Vec<String>,
    /// Nodes carrying any of these roles are left out of the node snapshot.
    pub ignored_node_roles: Vec<String>,
    pub node_poll_interval: u64,
    pub namespace_poll_interval: u64,
    pub retry_backoff: u64,
    pub liveness_interval: u64,
    /// Server-side timeout of a single watch request.
    pub request_timeout: u32,
    /// Kubeconfig context to use instead of `current-context`.
    pub context: Option<String>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            cache_dir: std::env::var_os(CACHE_DIR_ENV)
                .map(PathBuf::from)
                .unwrap_or_default(),
            selector: None,
            namespace: NamespaceScope::default(),
            refresh_command: None,
            resources: DEFAULT_RESOURCES.iter().map(|r| r.to_string()).collect(),
            excluded_namespaces: Vec::new(),
            ignored_node_roles: Vec::new(),
            node_poll_interval: DEFAULT_NODE_POLL_SECS,
            namespace_poll_interval: DEFAULT_NAMESPACE_POLL_SECS,
            retry_backoff: DEFAULT_RETRY_BACKOFF_SECS,
            liveness_interval: DEFAULT_LIVENESS_SECS,
            request_timeout: DEFAULT_WATCH_TIMEOUT_SECS,
            context: None,
        }
    }
}

impl SyncConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = read_to_string(path).map_err(|e| {
            SyncError::config_error(format!(
                "Failed to read config file {}: {}",
                path.display(),
                e
            ))
        })?;
        Ok(toml::from_str(&content)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_dir.as_os_str().is_empty() {
            return Err(SyncError::config_error(format!(
                "No cache directory given, use --dir or set {}",
                CACHE_DIR_ENV
            )));
        }
        if self.resources.is_empty() {
            return Err(SyncError::config_error("No resource types configured"));
        }
        self.descriptors()?;
        RecordFilter::from_config(self)?;

        for (name, value) in [
            ("node_poll_interval", self.node_poll_interval),
            ("namespace_poll_interval", self.namespace_poll_interval),
            ("retry_backoff", self.retry_backoff),
            ("liveness_interval", self.liveness_interval),
            ("request_timeout", u64::from(self.request_timeout)),
        ] {
            if value == 0 {
                return Err(SyncError::config_error(format!("{} must be positive", name)));
            }
        }
        Ok(())
    }

    pub fn descriptors(&self) -> Result<Vec<&'static ResourceDescriptor>> {
        resources::resolve(&self.resources)
    }

    /// Label selector, ignoring blank values.
    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref().filter(|s| !s.trim().is_empty())
    }

    pub fn poll_interval(&self, cadence: PollCadence) -> Duration {
        match cadence {
            PollCadence::Nodes => Duration::from_secs(self.node_poll_interval),
            PollCadence::Namespaces => Duration::from_secs(self.namespace_poll_interval),
        }
    }

    pub fn retry_backoff(&self) -> Duration {
        Duration::from_secs(self.retry_backoff)
    }

    pub fn liveness_interval(&self) -> Duration {
        Duration::from_secs(self.liveness_interval)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SyncConfig {
        SyncConfig {
            cache_dir: PathBuf::from("/tmp/kube-fzf-cache"),
            ..Default::default()
        }
    }

    #[test]
    fn test_namespace_scope_parsing() {
        assert_eq!("all".parse::<NamespaceScope>().unwrap(), NamespaceScope::All);
        assert_eq!("".parse::<NamespaceScope>().unwrap(), NamespaceScope::Current);
        assert_eq!(
            "kube-system".parse::<NamespaceScope>().unwrap(),
            NamespaceScope::Named("kube-system".to_string())
        );
        assert!("two words".parse::<NamespaceScope>().is_err());
    }

    #[test]
    fn test_namespace_scope_resolution() {
        assert_eq!(NamespaceScope::All.resolve(Some("team-a")), None);
        assert_eq!(
            NamespaceScope::Current.resolve(Some("team-a")),
            Some("team-a".to_string())
        );
        assert_eq!(
            NamespaceScope::Current.resolve(None),
            Some("default".to_string())
        );
        assert_eq!(
            NamespaceScope::Named("prod".to_string()).resolve(Some("team-a")),
            Some("prod".to_string())
        );
    }

    #[test]
    fn test_defaults_validate() {
        let config = config();
        config.validate().unwrap();
        assert_eq!(config.descriptors().unwrap().len(), 11);
        assert_eq!(
            config.poll_interval(PollCadence::Nodes),
            Duration::from_secs(300)
        );
        assert_eq!(
            config.poll_interval(PollCadence::Namespaces),
            Duration::from_secs(600)
        );
    }

    #[test]
    fn test_validation_failures() {
        let mut bad = config();
        bad.cache_dir = PathBuf::new();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.resources = vec!["Pod".to_string(), "Widget".to_string()];
        assert!(matches!(bad.validate(), Err(SyncError::UnknownResource(_))));

        let mut bad = config();
        bad.resources.clear();
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.node_poll_interval = 0;
        assert!(bad.validate().is_err());

        let mut bad = config();
        bad.excluded_namespaces = vec!["kube-(".to_string()];
        assert!(matches!(bad.validate(), Err(SyncError::ConfigError(_))));
    }

    #[test]
    fn test_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.toml");
        std::fs::write(
            &path,
            r#"
cache_dir = "/var/cache/fzf"
namespace = "all"
selector = "team=core"
resources = ["Pod", "Node"]
node_poll_interval = 60
excluded_namespaces = ["^kube-"]
ignored_node_roles = ["master"]
"#,
        )
        .unwrap();

        let config = SyncConfig::from_file(&path).unwrap();
        assert_eq!(config.cache_dir, PathBuf::from("/var/cache/fzf"));
        assert_eq!(config.namespace, NamespaceScope::All);
        assert_eq!(config.selector(), Some("team=core"));
        assert_eq!(config.resources, vec!["Pod", "Node"]);
        assert_eq!(config.node_poll_interval, 60);
        assert_eq!(config.namespace_poll_interval, 600);
        assert_eq!(config.excluded_namespaces, vec!["^kube-"]);
        assert_eq!(config.ignored_node_roles, vec!["master"]);
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_toml_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.toml");
        std::fs::write(&path, "node_poll_interval = \"soon\"").unwrap();
        assert!(matches!(
            SyncConfig::from_file(&path),
            Err(SyncError::TomlParse(_))
        ));
    }
}
