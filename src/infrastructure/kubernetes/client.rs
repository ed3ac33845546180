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

use crate::domain::resource::ResourceDescriptor;
use crate::domain::sync::SessionScope;
use crate::infrastructure::constants::MAX_WATCH_TIMEOUT_SECS;
use crate::shared::error::{Result, SyncError};
use futures::stream::BoxStream;
use futures::StreamExt;
use kube::api::{DynamicObject, ListParams, WatchEvent, WatchParams};
use kube::core::TypeMeta;
use kube::{Api, Client};
use serde_json::Value;

/// Full listing of one resource type.
#[derive(Debug, Clone, Default)]
pub struct Listing {
    pub items: Vec<Value>,
    /// Collection version to resume a watch from.
    pub version: Option<String>,
}

/// One item of a watch stream, carrying the raw API object.
#[derive(Debug, Clone)]
pub enum SourceEvent {
    Applied {
        object: Value,
        version: Option<String>,
    },
    Deleted {
        object: Value,
        version: Option<String>,
    },
    Bookmark {
        version: String,
    },
}

impl SourceEvent {
    pub fn version(&self) -> Option<&str> {
        match self {
            SourceEvent::Applied { version, .. } | SourceEvent::Deleted { version, .. } => {
                version.as_deref()
            }
            SourceEvent::Bookmark { version } => Some(version),
        }
    }
}

pub type EventStream = BoxStream<'static, Result<SourceEvent>>;

/// Upstream the workers pull listings and change events from.
#[async_trait::async_trait]
pub trait ResourceSource: Send + Sync {
    async fn list(
        &self,
        descriptor: &'static ResourceDescriptor,
        scope: &SessionScope,
    ) -> Result<Listing>;

    /// Opens a change stream starting after `version`.
    async fn watch(
        &self,
        descriptor: &'static ResourceDescriptor,
        scope: &SessionScope,
        version: &str,
    ) -> Result<EventStream>;
}

/// [`ResourceSource`] backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeResourceSource {
    client: Client,
    watch_timeout: u32,
}

impl KubeResourceSource {
    pub fn new(client: Client, watch_timeout: u32) -> Self {
        Self {
            client,
            watch_timeout: watch_timeout.clamp(1, MAX_WATCH_TIMEOUT_SECS),
        }
    }

    fn api(&self, descriptor: &ResourceDescriptor, scope: &SessionScope) -> Api<DynamicObject> {
        let resource = descriptor.api_resource();
        match descriptor.effective_namespace(scope.namespace()) {
            Some(namespace) => Api::namespaced_with(self.client.clone(), namespace, &resource),
            None => Api::all_with(self.client.clone(), &resource),
        }
    }
}

/// Converts a dynamic object into plain JSON, restoring the type fields that list
/// responses leave out of their items.
fn into_value(
    descriptor: &ResourceDescriptor,
    mut object: DynamicObject,
) -> Result<(Value, Option<String>)> {
    let version = object.metadata.resource_version.clone();
    let resource = descriptor.api_resource();
    object.types = Some(TypeMeta {
        api_version: resource.api_version,
        kind: resource.kind,
    });
    Ok((serde_json::to_value(object)?, version))
}

fn into_event(
    descriptor: &ResourceDescriptor,
    event: kube::Result<WatchEvent<DynamicObject>>,
) -> Result<SourceEvent> {
    match event? {
        WatchEvent::Added(object) | WatchEvent::Modified(object) => {
            let (object, version) = into_value(descriptor, object)?;
            Ok(SourceEvent::Applied { object, version })
        }
        WatchEvent::Deleted(object) => {
            let (object, version) = into_value(descriptor, object)?;
            Ok(SourceEvent::Deleted { object, version })
        }
        WatchEvent::Bookmark(bookmark) => Ok(SourceEvent::Bookmark {
            version: bookmark.metadata.resource_version,
        }),
        WatchEvent::Error(status) => Err(SyncError::from(status)),
    }
}

#[async_trait::async_trait]
impl ResourceSource for KubeResourceSource {
    async fn list(
        &self,
        descriptor: &'static ResourceDescriptor,
        scope: &SessionScope,
    ) -> Result<Listing> {
        let mut params = ListParams::default();
        if let Some(selector) = scope.selector() {
            params = params.labels(selector);
        }

        let list = self.api(descriptor, scope).list(&params).await?;
        let items = list
            .items
            .into_iter()
            .map(|object| into_value(descriptor, object).map(|(value, _)| value))
            .collect::<Result<Vec<_>>>()?;

        Ok(Listing {
            items,
            version: list.metadata.resource_version,
        })
    }

    async fn watch(
        &self,
        descriptor: &'static ResourceDescriptor,
        scope: &SessionScope,
        version: &str,
    ) -> Result<EventStream> {
        let mut params = WatchParams::default().timeout(self.watch_timeout);
        if let Some(selector) = scope.selector() {
            params = params.labels(selector);
        }

        let stream = self.api(descriptor, scope).watch(&params, version).await?;
        Ok(stream
            .map(move |event| into_event(descriptor, event))
            .boxed())
    }
}
