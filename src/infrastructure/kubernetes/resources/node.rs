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

use super::common::{
    age_column, build_record, decode_object, first_label, labels_column, visible_labels,
};
use crate::domain::resource::{
    Column, PollCadence, ResourceDescriptor, ResourceRecord, ResourceScope, SyncMode,
};
use crate::infrastructure::constants::{
    ADDRESS_TYPE_INTERNAL_IP, INSTANCE_TYPE_LABELS, NODE_ROLE_PREFIX, ZONE_LABELS,
};
use crate::shared::error::Result;
use k8s_openapi::api::core::v1::Node;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "Node",
    group: "",
    version: "v1",
    kind: "Node",
    plural: "nodes",
    scope: ResourceScope::Cluster,
    mode: SyncMode::Poll(PollCadence::Nodes),
    header: "Name Roles InstanceType Zone InternalIp Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let node: Node = decode_object(&DESCRIPTOR, value)?;
    let labels = visible_labels(&node.metadata);

    let roles = labels
        .keys()
        .filter_map(|k| k.strip_prefix(NODE_ROLE_PREFIX))
        .map(str::to_string)
        .collect();
    let internal_ip = node
        .status
        .as_ref()
        .and_then(|s| s.addresses.as_ref())
        .and_then(|addresses| {
            addresses
                .iter()
                .rev()
                .find(|a| a.type_ == ADDRESS_TYPE_INTERNAL_IP)
                .map(|a| a.address.clone())
        });

    build_record(
        &DESCRIPTOR,
        &node.metadata,
        vec![
            Column::List(roles),
            Column::Text(first_label(&labels, INSTANCE_TYPE_LABELS)),
            Column::Text(first_label(&labels, ZONE_LABELS)),
            Column::Text(internal_ip),
            age_column(&node.metadata),
            labels_column(&node.metadata),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_node() {
        let record = DESCRIPTOR
            .decode(json!({
                "apiVersion": "v1",
                "kind": "Node",
                "metadata": {
                    "name": "ip-10-0-0-1",
                    "labels": {
                        "node-role.kubernetes.io/worker": "",
                        "node.kubernetes.io/instance-type": "m5.large",
                        "topology.kubernetes.io/zone": "us-east-1a"
                    }
                },
                "status": {
                    "addresses": [
                        {"type": "Hostname", "address": "ip-10-0-0-1"},
                        {"type": "InternalIP", "address": "10.0.0.1"}
                    ]
                }
            }))
            .unwrap();
        let line = record.render();
        assert!(line.starts_with("ip-10-0-0-1 worker m5.large us-east-1a 10.0.0.1 None "));
        assert_eq!(record.key().namespace(), None);
    }
}
