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
use k8s_openapi::api::core::v1::Service;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "Service",
    group: "",
    version: "v1",
    kind: "Service",
    plural: "services",
    scope: ResourceScope::Namespaced,
    mode: SyncMode::Watch,
    header: "Namespace Name Type ClusterIp Ports Selector Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let service: Service = decode_object(&DESCRIPTOR, value)?;
    let spec = service.spec.as_ref();

    let ports = spec
        .and_then(|s| s.ports.as_ref())
        .map(|ports| {
            ports
                .iter()
                .map(|p| format!("{}:{}", p.name.as_deref().unwrap_or(NONE_TOKEN), p.port))
                .collect()
        })
        .unwrap_or_default();

    build_record(
        &DESCRIPTOR,
        &service.metadata,
        vec![
            Column::Text(spec.and_then(|s| s.type_.clone())),
            Column::Text(spec.and_then(|s| s.cluster_ip.clone())),
            Column::List(ports),
            pairs_column(spec.and_then(|s| s.selector.as_ref())),
            age_column(&service.metadata),
            labels_column(&service.metadata),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_service() {
        let record = DESCRIPTOR
            .decode(json!({
                "apiVersion": "v1",
                "kind": "Service",
                "metadata": {"name": "web", "namespace": "prod"},
                "spec": {
                    "type": "ClusterIP",
                    "clusterIP": "10.96.0.12",
                    "ports": [{"name": "http", "port": 80}, {"port": 9090}],
                    "selector": {"app": "web", "pod-template-hash": "abc"}
                }
            }))
            .unwrap();
        assert_eq!(
            record.render(),
            "prod web ClusterIP 10.96.0.12 http:80,None:9090 app=web None None"
        );
    }
}
