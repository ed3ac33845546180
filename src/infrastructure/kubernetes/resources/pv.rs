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
use crate::domain::resource::{Column, ResourceDescriptor, ResourceRecord, ResourceScope, SyncMode};
use crate::infrastructure::constants::ZONE_LABELS;
use crate::shared::error::Result;
use k8s_openapi::api::core::v1::PersistentVolume;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "Pv",
    group: "",
    version: "v1",
    kind: "PersistentVolume",
    plural: "persistentvolumes",
    scope: ResourceScope::Cluster,
    mode: SyncMode::Watch,
    header: "Name Status StorageClass Zone Claim Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let pv: PersistentVolume = decode_object(&DESCRIPTOR, value)?;
    let spec = pv.spec.as_ref();

    build_record(
        &DESCRIPTOR,
        &pv.metadata,
        vec![
            Column::Text(pv.status.as_ref().and_then(|s| s.phase.clone())),
            Column::Text(spec.and_then(|s| s.storage_class_name.clone())),
            Column::Text(first_label(&visible_labels(&pv.metadata), ZONE_LABELS)),
            Column::Text(
                spec.and_then(|s| s.claim_ref.as_ref())
                    .and_then(|c| c.name.clone()),
            ),
            age_column(&pv.metadata),
            labels_column(&pv.metadata),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_pv() {
        let record = DESCRIPTOR
            .decode(json!({
                "apiVersion": "v1",
                "kind": "PersistentVolume",
                "metadata": {
                    "name": "pv-1",
                    "labels": {"failure-domain.beta.kubernetes.io/zone": "eu-west-1b"}
                },
                "spec": {
                    "storageClassName": "gp2",
                    "claimRef": {"name": "data-db-0", "namespace": "data"}
                },
                "status": {"phase": "Bound"}
            }))
            .unwrap();
        assert_eq!(
            record.render(),
            "pv-1 Bound gp2 eu-west-1b data-db-0 None failure-domain.beta.kubernetes.io/zone=eu-west-1b"
        );
        assert_eq!(DESCRIPTOR.file_name(), "pvs");
    }
}
