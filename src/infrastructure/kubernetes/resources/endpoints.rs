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
use k8s_openapi::api::core::v1::{EndpointAddress, Endpoints};
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "Endpoint",
    group: "",
    version: "v1",
    kind: "Endpoints",
    plural: "endpoints",
    scope: ResourceScope::Namespaced,
    mode: SyncMode::Watch,
    header: "Namespace Name Age ReadyIps ReadyPods NotReadyIps NotReadyPods Labels",
    decoder: decode,
};

#[derive(Default)]
struct Addresses {
    ips: Vec<String>,
    pods: Vec<String>,
}

impl Addresses {
    fn collect<'a>(addresses: impl Iterator<Item = &'a EndpointAddress>) -> Self {
        let mut out = Self::default();
        for address in addresses {
            out.ips.push(address.ip.clone());
            if let Some(target) = &address.target_ref {
                if target.kind.as_deref() == Some("Pod") {
                    out.pods.extend(target.name.clone());
                }
            }
        }
        out
    }
}

fn decode(value: Value) -> Result<ResourceRecord> {
    let endpoints: Endpoints = decode_object(&DESCRIPTOR, value)?;
    let subsets = endpoints.subsets.as_deref().unwrap_or_default();

    let ready = Addresses::collect(subsets.iter().flat_map(|s| s.addresses.iter().flatten()));
    let not_ready = Addresses::collect(
        subsets
            .iter()
            .flat_map(|s| s.not_ready_addresses.iter().flatten()),
    );

    build_record(
        &DESCRIPTOR,
        &endpoints.metadata,
        vec![
            age_column(&endpoints.metadata),
            Column::List(ready.ips),
            Column::List(ready.pods),
            Column::List(not_ready.ips),
            Column::List(not_ready.pods),
            labels_column(&endpoints.metadata),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_endpoints() {
        let record = DESCRIPTOR
            .decode(json!({
                "apiVersion": "v1",
                "kind": "Endpoints",
                "metadata": {"name": "web", "namespace": "default"},
                "subsets": [{
                    "addresses": [
                        {"ip": "10.0.0.5", "targetRef": {"kind": "Pod", "name": "web-0"}},
                        {"ip": "10.0.0.6"}
                    ],
                    "notReadyAddresses": [
                        {"ip": "10.0.0.7", "targetRef": {"kind": "Pod", "name": "web-2"}}
                    ]
                }]
            }))
            .unwrap();
        assert_eq!(
            record.render(),
            "default web None 10.0.0.5,10.0.0.6 web-0 10.0.0.7 web-2 None"
        );
        assert_eq!(DESCRIPTOR.file_name(), "endpoints");
    }

    #[test]
    fn test_no_subsets() {
        let record = DESCRIPTOR
            .decode(json!({
                "apiVersion": "v1",
                "kind": "Endpoints",
                "metadata": {"name": "idle", "namespace": "default"}
            }))
            .unwrap();
        assert_eq!(record.render(), "default idle None None None None None None");
    }
}
