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

use crate::domain::resource::record::ResourceRecord;
use crate::shared::error::Result;
use kube::api::ApiResource;
use serde_json::Value;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceScope {
    Namespaced,
    Cluster,
}

/// Which configured interval a polled kind refreshes on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollCadence {
    Nodes,
    Namespaces,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    Watch,
    Poll(PollCadence),
}

pub type Decoder = fn(Value) -> Result<ResourceRecord>;

/// Static per-kind contract: how to address the kind on the API server, how to decode
/// its objects and how its snapshot file looks.
pub struct ResourceDescriptor {
    /// Type name as accepted on the command line, e.g. `Pod`.
    pub name: &'static str,
    pub group: &'static str,
    pub version: &'static str,
    pub kind: &'static str,
    pub plural: &'static str,
    pub scope: ResourceScope,
    pub mode: SyncMode,
    pub header: &'static str,
    pub decoder: Decoder,
}

impl ResourceDescriptor {
    /// Snapshot file name inside the cache directory.
    pub fn file_name(&self) -> String {
        format!("{}s", self.name).to_lowercase()
    }

    pub fn is_namespaced(&self) -> bool {
        self.scope == ResourceScope::Namespaced
    }

    pub fn is_poll(&self) -> bool {
        matches!(self.mode, SyncMode::Poll(_))
    }

    pub fn decode(&self, object: Value) -> Result<ResourceRecord> {
        (self.decoder)(object)
    }

    pub fn api_resource(&self) -> ApiResource {
        let api_version = if self.group.is_empty() {
            self.version.to_string()
        } else {
            format!("{}/{}", self.group, self.version)
        };
        ApiResource {
            group: self.group.to_string(),
            version: self.version.to_string(),
            api_version,
            kind: self.kind.to_string(),
            plural: self.plural.to_string(),
        }
    }

    /// Namespace filter to apply for this kind; cluster-scoped kinds ignore it.
    pub fn effective_namespace<'a>(&self, namespace: Option<&'a str>) -> Option<&'a str> {
        if self.is_namespaced() {
            namespace
        } else {
            None
        }
    }
}

impl fmt::Debug for ResourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("scope", &self.scope)
            .field("mode", &self.mode)
            .finish()
    }
}
