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

use super::common::{build_record, creation_time, decode_object, labels_column};
use crate::domain::resource::{Column, ResourceDescriptor, ResourceRecord, ResourceScope, SyncMode};
use crate::infrastructure::constants::WAITING_REASON_COMPLETED;
use crate::shared::error::Result;
use k8s_openapi::api::core::v1::{Pod, PodStatus};
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "Pod",
    group: "",
    version: "v1",
    kind: "Pod",
    plural: "pods",
    scope: ResourceScope::Namespaced,
    mode: SyncMode::Watch,
    header: "Namespace Name PodIp HostIp NodeName Phase Containers Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let pod: Pod = decode_object(&DESCRIPTOR, value)?;
    let status = pod.status.as_ref();
    let spec = pod.spec.as_ref();

    let containers = spec
        .map(|s| {
            s.containers
                .iter()
                .chain(s.init_containers.iter().flatten())
                .map(|c| c.name.clone())
                .collect()
        })
        .unwrap_or_default();
    let started = status
        .and_then(|s| s.start_time.as_ref())
        .map(|t| t.0)
        .or_else(|| creation_time(&pod.metadata));

    build_record(
        &DESCRIPTOR,
        &pod.metadata,
        vec![
            Column::Text(status.and_then(|s| s.pod_ip.clone())),
            Column::Text(status.and_then(|s| s.host_ip.clone())),
            Column::Text(spec.and_then(|s| s.node_name.clone())),
            Column::Text(status.and_then(phase)),
            Column::List(containers),
            Column::Age(started),
            labels_column(&pod.metadata),
        ],
    )
}

/// A waiting container's reason wins over the pod phase, unless it just completed.
fn phase(status: &PodStatus) -> Option<String> {
    let waiting_reason = status
        .container_statuses
        .iter()
        .flatten()
        .filter_map(|s| s.state.as_ref()?.waiting.as_ref()?.reason.clone())
        .find(|reason| !reason.contains(WAITING_REASON_COMPLETED));
    waiting_reason.or_else(|| status.phase.clone())
}
