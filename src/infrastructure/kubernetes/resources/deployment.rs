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
use crate::domain::resource::{ResourceDescriptor, ResourceRecord, ResourceScope, SyncMode};
use crate::shared::error::Result;
use k8s_openapi::api::apps::v1::Deployment;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "Deployment",
    group: "apps",
    version: "v1",
    kind: "Deployment",
    plural: "deployments",
    scope: ResourceScope::Namespaced,
    mode: SyncMode::Watch,
    header: "Namespace Name Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let deployment: Deployment = decode_object(&DESCRIPTOR, value)?;
    build_record(
        &DESCRIPTOR,
        &deployment.metadata,
        vec![age_column(&deployment.metadata), labels_column(&deployment.metadata)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_deployment() {
        let record = DESCRIPTOR
            .decode(json!({
                "apiVersion": "apps/v1",
                "kind": "Deployment",
                "metadata": {"name": "foo", "namespace": "default", "labels": {"app": "foo"}}
            }))
            .unwrap();
        assert_eq!(record.render(), "default foo None app=foo");
        assert_eq!(DESCRIPTOR.file_name(), "deployments");
    }
}
