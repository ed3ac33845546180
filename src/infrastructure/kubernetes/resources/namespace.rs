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
use crate::domain::resource::{
    PollCadence, ResourceDescriptor, ResourceRecord, ResourceScope, SyncMode,
};
use crate::shared::error::Result;
use k8s_openapi::api::core::v1::Namespace;
use serde_json::Value;

pub static DESCRIPTOR: ResourceDescriptor = ResourceDescriptor {
    name: "Namespace",
    group: "",
    version: "v1",
    kind: "Namespace",
    plural: "namespaces",
    scope: ResourceScope::Cluster,
    mode: SyncMode::Poll(PollCadence::Namespaces),
    header: "Name Age Labels",
    decoder: decode,
};

fn decode(value: Value) -> Result<ResourceRecord> {
    let namespace: Namespace = decode_object(&DESCRIPTOR, value)?;
    build_record(
        &DESCRIPTOR,
        &namespace.metadata,
        vec![age_column(&namespace.metadata), labels_column(&namespace.metadata)],
    )
}
