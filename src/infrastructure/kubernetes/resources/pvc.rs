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

use super::common::{age_column, build_record, decode_object, labels_column};
use crate::domain::resource::{Column, ResourceDescriptor, ResourceRecord, ResourceScope, SyncMode};
use crate::shared::error::Result;
use k8s_openapi::api::core::v1::PersistentVolumeClaim;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "Pvc",
    group: "",
    version: "v1",
    kind: "PersistentVolumeClaim",
    plural: "persistentvolumeclaims",
    scope: ResourceScope::Namespaced,
    mode: SyncMode::Watch,
    header: "Namespace Name Status Capacity VolumeName StorageClass Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let pvc: PersistentVolumeClaim = decode_object(&DESCRIPTOR, value)?;
    let spec = pvc.spec.as_ref();
    let status = pvc.status.as_ref();

    let capacity = status
        .and_then(|s| s.capacity.as_ref())
        .and_then(|c| c.get("storage"))
        .map(|q| q.0.clone());

    build_record(
        &DESCRIPTOR,
        &pvc.metadata,
        vec![
            Column::Text(status.and_then(|s| s.phase.clone())),
            Column::Text(capacity),
            Column::Text(spec.and_then(|s| s.volume_name.clone())),
            Column::Text(spec.and_then(|s| s.storage_class_name.clone())),
            age_column(&pvc.metadata),
            labels_column(&pvc.metadata),
        ],
    )
}
