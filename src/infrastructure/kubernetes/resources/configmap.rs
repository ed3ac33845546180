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
use k8s_openapi::api::core::v1::ConfigMap;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "ConfigMap",
    group: "",
    version: "v1",
    kind: "ConfigMap",
    plural: "configmaps",
    scope: ResourceScope::Namespaced,
    mode: SyncMode::Watch,
    header: "Namespace Name Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let config_map: ConfigMap = decode_object(&DESCRIPTOR, value)?;
    build_record(
        &DESCRIPTOR,
        &config_map.metadata,
        vec![age_column(&config_map.metadata), labels_column(&config_map.metadata)],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use serde_json::json;

    #[test]
    fn test_decode_configmap_age() {
        let created = (Utc::now() - Duration::days(2)).to_rfc3339();
        let record = DESCRIPTOR
            .decode(json!({
                "apiVersion": "v1",
                "kind": "ConfigMap",
                "metadata": {"name": "settings", "namespace": "apps", "creationTimestamp": created},
                "data": {"key": "value"}
            }))
            .unwrap();
        assert_eq!(record.render(), "apps settings 2d None");
    }
}
