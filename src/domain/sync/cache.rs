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

use crate::domain::resource::{ResourceKey, ResourceRecord};
use std::collections::btree_map::{self, Entry};
use std::collections::BTreeMap;

/// Outcome of feeding one record into a [`ResourceCache`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Change {
    Add,
    Update,
    Delete,
    NoOp,
}

impl Change {
    /// Whether the snapshot file has to be rewritten from the cache.
    pub fn needs_rewrite(self) -> bool {
        matches!(self, Change::Update | Change::Delete)
    }
}

/// Latest known record per identity for a single resource type.
///
/// Owned by exactly one worker, so no locking is involved.
#[derive(Debug, Default)]
pub struct ResourceCache {
    records: BTreeMap<ResourceKey, ResourceRecord>,
}

impl ResourceCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn process(&mut self, record: ResourceRecord) -> Change {
        match self.records.entry(record.key().clone()) {
            Entry::Occupied(entry) if record.is_deleted() => {
                entry.remove();
                Change::Delete
            }
            Entry::Vacant(_) if record.is_deleted() => Change::NoOp,
            Entry::Vacant(entry) => {
                entry.insert(record);
                Change::Add
            }
            Entry::Occupied(mut entry) => {
                if entry.get().has_changed(&record) {
                    entry.insert(record);
                    Change::Update
                } else {
                    Change::NoOp
                }
            }
        }
    }

    /// Replaces the whole content with a fresh listing. Deleted records are skipped.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = ResourceRecord>) {
        self.records = records
            .into_iter()
            .filter(|r| !r.is_deleted())
            .map(|r| (r.key().clone(), r))
            .collect();
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    pub fn get(&self, key: &ResourceKey) -> Option<&ResourceRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in identity order.
    pub fn iter(&self) -> btree_map::Values<'_, ResourceKey, ResourceRecord> {
        self.records.values()
    }
}

impl<'a> IntoIterator for &'a ResourceCache {
    type Item = &'a ResourceRecord;
    type IntoIter = btree_map::Values<'a, ResourceKey, ResourceRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::Column;

    fn record(name: &str, status: &str, deleted: bool) -> ResourceRecord {
        ResourceRecord::new(
            ResourceKey::namespaced("default", name),
            vec![Column::text("default"), Column::text(name), Column::text(status)],
            deleted,
        )
    }

    #[test]
    fn test_add_then_identical_is_noop() {
        let mut cache = ResourceCache::new();
        assert_eq!(cache.process(record("foo", "Running", false)), Change::Add);
        assert_eq!(cache.process(record("foo", "Running", false)), Change::NoOp);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_changed_content_replaces() {
        let mut cache = ResourceCache::new();
        cache.process(record("foo", "Pending", false));
        assert_eq!(cache.process(record("foo", "Running", false)), Change::Update);
        assert_eq!(cache.len(), 1);
        let key = ResourceKey::namespaced("default", "foo");
        assert_eq!(cache.get(&key).unwrap().render(), "default foo Running");
    }

    #[test]
    fn test_delete_tracked_and_untracked() {
        let mut cache = ResourceCache::new();
        cache.process(record("foo", "Running", false));
        assert_eq!(cache.process(record("foo", "Running", true)), Change::Delete);
        assert!(cache.is_empty());
        assert_eq!(cache.process(record("bar", "Running", true)), Change::NoOp);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_replace_all_drops_previous_and_deleted() {
        let mut cache = ResourceCache::new();
        cache.process(record("stale", "Running", false));
        cache.replace_all(vec![
            record("b", "Running", false),
            record("a", "Running", false),
            record("gone", "Running", true),
        ]);
        let names: Vec<_> = cache.iter().map(|r| r.key().name().to_string()).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_rewrite_needed_only_for_update_and_delete() {
        assert!(!Change::Add.needs_rewrite());
        assert!(!Change::NoOp.needs_rewrite());
        assert!(Change::Update.needs_rewrite());
        assert!(Change::Delete.needs_rewrite());
    }
}
