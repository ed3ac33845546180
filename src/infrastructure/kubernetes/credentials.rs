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

use super::client::{KubeResourceSource, ResourceSource};
use super::context::ClusterContext;
use crate::infrastructure::constants::{ID_TOKEN_KEY, TOKEN_EXPIRY_SKEW_SECS};
use crate::shared::error::{Result, SyncError};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::Client;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, warn};

/// Hands out API access for a context, refreshing expired credentials first.
#[async_trait::async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn connect(&self, context: &ClusterContext) -> Result<Arc<dyn ResourceSource>>;
}

pub struct KubeCredentials {
    refresh_command: Option<String>,
    watch_timeout: u32,
}

impl KubeCredentials {
    pub fn new(refresh_command: Option<String>, watch_timeout: u32) -> Self {
        Self {
            refresh_command: refresh_command.filter(|c| !c.trim().is_empty()),
            watch_timeout,
        }
    }

    async fn refresh(&self, command: &str, context: &ClusterContext) -> Result<()> {
        info!(command, context = %context.name, "Credentials expired, running refresh command");
        let status = tokio::process::Command::new(command)
            .arg(&context.name)
            .status()
            .await
            .map_err(|e| SyncError::credential(format!("Failed to run {}: {}", command, e)))?;
        if !status.success() {
            warn!(command, %status, "Refresh command failed");
        }
        Ok(())
    }

    async fn client(&self, kubeconfig: Kubeconfig, context: &ClusterContext) -> Result<Client> {
        let options = KubeConfigOptions {
            context: Some(context.name.clone()),
            cluster: None,
            user: None,
        };
        let config = kube::Config::from_custom_kubeconfig(kubeconfig, &options)
            .await
            .map_err(|e| {
                SyncError::credential(format!("Failed to create Kubernetes config: {}", e))
            })?;
        Client::try_from(config).map_err(|e| {
            SyncError::credential(format!("Failed to create Kubernetes client: {}", e))
        })
    }
}

fn read_kubeconfig() -> Result<Kubeconfig> {
    Kubeconfig::read()
        .map_err(|e| SyncError::credential(format!("Failed to load kubeconfig: {}", e)))
}

#[async_trait::async_trait]
impl CredentialProvider for KubeCredentials {
    async fn connect(&self, context: &ClusterContext) -> Result<Arc<dyn ResourceSource>> {
        let mut kubeconfig = read_kubeconfig()?;
        if let Some(command) = &self.refresh_command {
            let now = chrono::Utc::now().timestamp();
            if id_token(&kubeconfig, context).is_some_and(|t| token_expired(&t, now)) {
                self.refresh(command, context).await?;
                kubeconfig = read_kubeconfig()?;
            }
        }

        let client = self.client(kubeconfig, context).await?;
        Ok(Arc::new(KubeResourceSource::new(client, self.watch_timeout)))
    }
}

/// OIDC id token of the context's user, if it authenticates through an auth provider.
pub(crate) fn id_token(kubeconfig: &Kubeconfig, context: &ClusterContext) -> Option<String> {
    let user = context.user.as_deref()?;
    kubeconfig
        .auth_infos
        .iter()
        .find(|a| a.name == user)?
        .auth_info
        .as_ref()?
        .auth_provider
        .as_ref()?
        .config
        .get(ID_TOKEN_KEY)
        .cloned()
}

/// Whether the JWT's `exp` claim is at or before `now`. Tokens that cannot be
/// read are treated as valid and left to the API server to reject.
pub(crate) fn token_expired(token: &str, now: i64) -> bool {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return false;
    }
    let Ok(payload) = URL_SAFE_NO_PAD.decode(parts[1].trim_end_matches('=')) else {
        return false;
    };
    let Ok(claims) = serde_json::from_slice::<Value>(&payload) else {
        return false;
    };
    claims
        .get("exp")
        .and_then(Value::as_f64)
        .is_some_and(|exp| exp as i64 - TOKEN_EXPIRY_SKEW_SECS <= now)
}
