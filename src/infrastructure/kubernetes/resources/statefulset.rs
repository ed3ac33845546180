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
use crate::domain::resource::{
    Column, ResourceDescriptor, ResourceRecord, ResourceScope, SyncMode, NONE_TOKEN,
};
use crate::shared::error::Result;
use k8s_openapi::api::apps::v1::StatefulSet;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "StatefulSet",
    group: "apps",
    version: "v1",
    kind: "StatefulSet",
    plural: "statefulsets",
    scope: ResourceScope::Namespaced,
    mode: SyncMode::Watch,
    header: "Namespace Name Replicas Selector Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let sts: StatefulSet = decode_object(&DESCRIPTOR, value)?;
    let status = sts.status.as_ref();

    let current = status
        .and_then(|s| s.current_replicas.or(s.ready_replicas))
        .map(|n| n.to_string());
    let desired = status.map(|s| s.replicas.to_string());
    let replicas = format!(
        "{}/{}",
        current.as_deref().unwrap_or(NONE_TOKEN),
        desired.as_deref().unwrap_or(NONE_TOKEN)
    );

    build_record(
        &DESCRIPTOR,
        &sts.metadata,
        vec![
            Column::text(replicas),
            pairs_column(sts.spec.as_ref().and_then(|s| s.selector.match_labels.as_ref())),
            age_column(&sts.metadata),
            labels_column(&sts.metadata),
        ],
    )
}
