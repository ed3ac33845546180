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

use chrono::{DateTime, Utc};
use std::fmt;

/// Literal written for absent scalars and empty lists.
pub const NONE_TOKEN: &str = "None";

/// Identity of a cached object. Cluster-scoped kinds have no namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResourceKey {
    namespace: Option<String>,
    name: String,
}

impl ResourceKey {
    pub fn namespaced(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            name: name.into(),
        }
    }

    pub fn cluster(name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            name: name.into(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{}/{}", ns, self.name),
            None => write!(f, "{}", self.name),
        }
    }
}

/// One cell of a snapshot line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Column {
    Text(Option<String>),
    List(Vec<String>),
    /// Rendered relative to the time the line is written.
    Age(Option<DateTime<Utc>>),
}

impl Column {
    pub fn text(value: impl Into<String>) -> Self {
        Column::Text(Some(value.into()))
    }

    pub fn render_at(&self, now: DateTime<Utc>) -> String {
        match self {
            Column::Text(Some(value)) if !value.is_empty() => value.clone(),
            Column::Text(_) => NONE_TOKEN.to_string(),
            Column::List(items) if items.is_empty() => NONE_TOKEN.to_string(),
            Column::List(items) => items.join(","),
            Column::Age(Some(start)) => format_age(*start, now),
            Column::Age(None) => NONE_TOKEN.to_string(),
        }
    }
}

/// Formats elapsed time as whole days, else hours, else minutes.
pub fn format_age(start: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let seconds = (now - start).num_seconds().max(0);
    let days = seconds / 86_400;
    let hours = seconds / 3_600;
    let minutes = (seconds % 3_600) / 60;
    if days > 0 {
        format!("{}d", days)
    } else if hours > 0 {
        format!("{}h", hours)
    } else {
        format!("{}m", minutes)
    }
}

/// Decoded, type-specific view of one cluster object.
///
/// Records are immutable: a changed object produces a new record that replaces the
/// previous one under the same [`ResourceKey`].
#[derive(Debug, Clone)]
pub struct ResourceRecord {
    key: ResourceKey,
    columns: Vec<Column>,
    deleted: bool,
}

impl ResourceRecord {
    pub fn new(key: ResourceKey, columns: Vec<Column>, deleted: bool) -> Self {
        Self {
            key,
            columns,
            deleted,
        }
    }

    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// Same record flagged as deleted, used for watch `DELETED` events.
    pub fn into_deleted(self) -> Self {
        Self {
            deleted: true,
            ..self
        }
    }

    /// Content comparison, independent of when the lines are rendered.
    pub fn has_changed(&self, other: &ResourceRecord) -> bool {
        self.columns != other.columns
    }

    pub fn render_at(&self, now: DateTime<Utc>) -> String {
        self.columns
            .iter()
            .map(|c| c.render_at(now))
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn render(&self) -> String {
        self.render_at(Utc::now())
    }
}

impl PartialEq for ResourceRecord {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ResourceRecord {}

impl fmt::Display for ResourceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}
