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

use crate::domain::config::SyncConfig;
use crate::domain::resource::ResourceDescriptor;
use crate::infrastructure::constants::{NODE_KIND, NODE_ROLE_PREFIX};
use crate::shared::error::{Result, SyncError};
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeSet;

/// Hides objects from the snapshots before they are decoded.
///
/// Namespace patterns are unanchored regular expressions: `kube-` hides `kube-system`
/// and `kube-public`. Node roles are matched exactly.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    excluded_namespaces: Vec<Regex>,
    ignored_node_roles: BTreeSet<String>,
}

impl RecordFilter {
    pub fn new<S: AsRef<str>>(excluded_namespaces: &[S], ignored_node_roles: &[S]) -> Result<Self> {
        let excluded_namespaces = excluded_namespaces
            .iter()
            .map(|pattern| {
                Regex::new(pattern.as_ref()).map_err(|e| {
                    SyncError::config_error(format!(
                        "Invalid excluded namespace pattern '{}': {}",
                        pattern.as_ref(),
                        e
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;
        let ignored_node_roles = ignored_node_roles
            .iter()
            .map(|role| role.as_ref().trim().to_string())
            .filter(|role| !role.is_empty())
            .collect();

        Ok(Self {
            excluded_namespaces,
            ignored_node_roles,
        })
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self> {
        Self::new(&config.excluded_namespaces, &config.ignored_node_roles)
    }

    pub fn is_empty(&self) -> bool {
        self.excluded_namespaces.is_empty() && self.ignored_node_roles.is_empty()
    }

    pub fn excludes_namespace(&self, namespace: &str) -> bool {
        self.excluded_namespaces.iter().any(|re| re.is_match(namespace))
    }

    /// Whether `object` of kind `descriptor` belongs in the snapshot.
    pub fn admits(&self, descriptor: &ResourceDescriptor, object: &Value) -> bool {
        if self.is_empty() {
            return true;
        }

        let metadata = &object["metadata"];
        if let Some(namespace) = metadata["namespace"].as_str() {
            if self.excludes_namespace(namespace) {
                return false;
            }
        }

        if descriptor.kind == NODE_KIND && !self.ignored_node_roles.is_empty() {
            let hidden = metadata["labels"]
                .as_object()
                .into_iter()
                .flat_map(|labels| labels.keys())
                .filter_map(|key| key.strip_prefix(NODE_ROLE_PREFIX))
                .any(|role| self.ignored_node_roles.contains(role));
            if hidden {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kubernetes::resources::{configmap, namespace, node};
    use serde_json::json;

    fn node_with_roles(name: &str, roles: &[&str]) -> Value {
        let labels: serde_json::Map<String, Value> = roles
            .iter()
            .map(|role| (format!("{}{}", NODE_ROLE_PREFIX, role), json!("")))
            .collect();
        json!({
            "apiVersion": "v1",
            "kind": "Node",
            "metadata": {"name": name, "labels": labels}
        })
    }

    fn config_map_in(namespace: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {"name": "settings", "namespace": namespace}
        })
    }

    #[test]
    fn test_default_filter_admits_everything() {
        let filter = RecordFilter::default();
        assert!(filter.admits(&configmap::DESCRIPTOR, &config_map_in("kube-system")));
        assert!(filter.admits(&node::DESCRIPTOR, &node_with_roles("n1", &["master"])));
    }

    #[test]
    fn test_excluded_namespaces_match_patterns() {
        let filter = RecordFilter::new(&["^kube-", "monitoring"], &[]).unwrap();
        assert!(!filter.admits(&configmap::DESCRIPTOR, &config_map_in("kube-system")));
        assert!(!filter.admits(&configmap::DESCRIPTOR, &config_map_in("team-monitoring")));
        assert!(filter.admits(&configmap::DESCRIPTOR, &config_map_in("default")));

        // Cluster-scoped objects have no namespace to match.
        let ns = json!({"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": "kube-system"}});
        assert!(filter.admits(&namespace::DESCRIPTOR, &ns));
    }

    #[test]
    fn test_ignored_roles_hide_nodes_only() {
        let filter = RecordFilter::new(&[], &["master", " etcd "]).unwrap();
        assert!(!filter.admits(&node::DESCRIPTOR, &node_with_roles("cp-1", &["master"])));
        assert!(!filter.admits(&node::DESCRIPTOR, &node_with_roles("cp-2", &["worker", "etcd"])));
        assert!(filter.admits(&node::DESCRIPTOR, &node_with_roles("w-1", &["worker"])));
        assert!(filter.admits(&node::DESCRIPTOR, &node_with_roles("bare", &[])));
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let err = RecordFilter::new(&["kube-("], &[]).unwrap_err();
        assert!(matches!(err, SyncError::ConfigError(_)));
    }
}
