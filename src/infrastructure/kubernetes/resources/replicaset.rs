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

use super::common::{age_column, build_record, decode_object, labels_column, pairs_column};
use crate::domain::resource::{Column, ResourceDescriptor, ResourceRecord, ResourceScope, SyncMode};
use crate::shared::error::Result;
use k8s_openapi::api::apps::v1::ReplicaSet;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "ReplicaSet",
    group: "apps",
    version: "v1",
    kind: "ReplicaSet",
    plural: "replicasets",
    scope: ResourceScope::Namespaced,
    mode: SyncMode::Watch,
    header: "Namespace Name Replicas AvailableReplicas ReadyReplicas Selector Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let rs: ReplicaSet = decode_object(&DESCRIPTOR, value)?;
    let status = rs.status.as_ref();

    let count = |n: Option<i32>| Column::text(n.unwrap_or(0).to_string());

    build_record(
        &DESCRIPTOR,
        &rs.metadata,
        vec![
            count(status.map(|s| s.replicas)),
            count(status.and_then(|s| s.available_replicas)),
            count(status.and_then(|s| s.ready_replicas)),
            pairs_column(rs.spec.as_ref().and_then(|s| s.selector.match_labels.as_ref())),
            age_column(&rs.metadata),
            labels_column(&rs.metadata),
        ],
    )
}
