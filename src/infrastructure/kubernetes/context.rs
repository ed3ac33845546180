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

use crate::shared::error::{Result, SyncError};
use kube::config::Kubeconfig;
use serde_json::Value;
use std::fmt;

/// The kubeconfig context the cache is built against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterContext {
    /// Context name, also handed to the credential refresh command.
    pub name: String,
    pub cluster: String,
    pub user: Option<String>,
    pub namespace: Option<String>,
}

impl fmt::Display for ClusterContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(namespace) => write!(f, "{} (namespace {})", self.name, namespace),
            None => write!(f, "{}", self.name),
        }
    }
}

pub trait ContextProvider: Send + Sync {
    /// Reads the context as it is right now.
    fn current(&self) -> Result<ClusterContext>;
}

/// Reads the context from the user's kubeconfig on every call.
#[derive(Debug, Clone, Default)]
pub struct KubeconfigContext {
    context: Option<String>,
}

impl KubeconfigContext {
    /// `context` pins a named context instead of following `current-context`.
    pub fn new(context: Option<String>) -> Self {
        Self { context }
    }
}

impl ContextProvider for KubeconfigContext {
    fn current(&self) -> Result<ClusterContext> {
        let kubeconfig = Kubeconfig::read()
            .map_err(|e| SyncError::config_error(format!("Failed to load kubeconfig: {}", e)))?;
        resolve_context(&kubeconfig, self.context.as_deref())
    }
}

pub(crate) fn resolve_context(
    kubeconfig: &Kubeconfig,
    name: Option<&str>,
) -> Result<ClusterContext> {
    let name = name
        .map(str::to_string)
        .or_else(|| kubeconfig.current_context.clone())
        .ok_or_else(|| SyncError::config_error("kubeconfig has no current context"))?;

    let named = kubeconfig
        .contexts
        .iter()
        .find(|c| c.name == name)
        .ok_or_else(|| SyncError::config_error(format!("context {} not found", name)))?;
    let context = named
        .context
        .as_ref()
        .ok_or_else(|| SyncError::config_error(format!("context {} is empty", name)))?;

    // Read through JSON so optional and required kubeconfig fields are handled alike.
    let fields = serde_json::to_value(context)?;
    let field = |key: &str| {
        fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(ClusterContext {
        cluster: field("cluster").unwrap_or_default(),
        user: field("user"),
        namespace: field("namespace"),
        name,
    })
}
