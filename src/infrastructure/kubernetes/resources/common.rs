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

//! Field extraction shared by every resource decoder

use crate::domain::resource::{Column, ResourceDescriptor, ResourceKey, ResourceRecord};
use crate::infrastructure::constants::EXCLUDED_LABELS;
use crate::shared::error::{Result, SyncError};
use chrono::{DateTime, Utc};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::BTreeMap;

pub(crate) fn decode_object<K: DeserializeOwned>(
    descriptor: &ResourceDescriptor,
    value: Value,
) -> Result<K> {
    serde_json::from_value(value).map_err(|e| SyncError::decode(descriptor.kind, e))
}

/// Builds a record whose leading columns are the identity (`Namespace Name` or `Name`).
pub(crate) fn build_record(
    descriptor: &ResourceDescriptor,
    meta: &ObjectMeta,
    columns: Vec<Column>,
) -> Result<ResourceRecord> {
    let name = meta
        .name
        .clone()
        .ok_or_else(|| SyncError::decode(descriptor.kind, "metadata.name is missing"))?;

    let (key, mut row) = if descriptor.is_namespaced() {
        let namespace = meta.namespace.clone().ok_or_else(|| {
            SyncError::decode(descriptor.kind, format!("{} has no namespace", name))
        })?;
        (
            ResourceKey::namespaced(namespace.clone(), name.clone()),
            vec![Column::text(namespace), Column::text(name)],
        )
    } else {
        (ResourceKey::cluster(name.clone()), vec![Column::text(name)])
    };
    row.extend(columns);

    Ok(ResourceRecord::new(key, row, meta.deletion_timestamp.is_some()))
}

/// Labels minus the controller bookkeeping ones.
pub(crate) fn visible_labels(meta: &ObjectMeta) -> BTreeMap<String, String> {
    meta.labels
        .iter()
        .flatten()
        .filter(|(k, _)| !EXCLUDED_LABELS.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect()
}

pub(crate) fn labels_column(meta: &ObjectMeta) -> Column {
    pairs_column(Some(&visible_labels(meta)))
}

/// `k=v` list for selectors and label maps, sorted by key, excluded labels dropped.
pub(crate) fn pairs_column(pairs: Option<&BTreeMap<String, String>>) -> Column {
    Column::List(
        pairs
            .into_iter()
            .flatten()
            .filter(|(k, _)| !EXCLUDED_LABELS.contains(&k.as_str()))
            .map(|(k, v)| format!("{}={}", k, v))
            .collect(),
    )
}

pub(crate) fn creation_time(meta: &ObjectMeta) -> Option<DateTime<Utc>> {
    meta.creation_timestamp.as_ref().map(|t| t.0)
}

pub(crate) fn age_column(meta: &ObjectMeta) -> Column {
    Column::Age(creation_time(meta))
}

/// First label value found among `keys`.
pub(crate) fn first_label(labels: &BTreeMap<String, String>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| labels.get(*k).cloned())
}
