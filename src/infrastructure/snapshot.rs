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

//! Snapshot files read by the fuzzy lookup tool.
//!
//! A snapshot is a header line followed by one line per record. Readers never see a
//! partial listing: additions are appended as whole lines, everything else replaces the
//! file through a rename.

use crate::domain::resource::{ResourceDescriptor, ResourceKey, ResourceRecord};
use crate::domain::sync::{Change, ResourceCache};
use crate::shared::error::Result;
use chrono::Utc;
use std::fs::File;
use std::io::{Seek, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

pub trait SnapshotWriter: Send + Sync {
    /// Appends one line, writing the header first when the file is empty.
    fn append(&mut self, record: &ResourceRecord) -> Result<()>;

    /// Replaces the file with the header plus every cached record.
    fn rewrite(&mut self, cache: &ResourceCache) -> Result<()>;

    /// Persists the outcome of [`ResourceCache::process`].
    fn write(&mut self, change: Change, key: &ResourceKey, cache: &ResourceCache) -> Result<()> {
        match change {
            Change::Add => match cache.get(key) {
                Some(record) => self.append(record),
                None => self.rewrite(cache),
            },
            Change::Update | Change::Delete => self.rewrite(cache),
            Change::NoOp => Ok(()),
        }
    }
}

/// Creates one writer per resource type.
pub trait SnapshotFactory: Send + Sync {
    fn open(&self, descriptor: &'static ResourceDescriptor) -> Result<Box<dyn SnapshotWriter>>;
}

/// File-backed snapshot living at `<dir>/<file_name>`.
#[derive(Debug)]
pub struct SnapshotDumper {
    header: &'static str,
    path: PathBuf,
    file: File,
}

impl SnapshotDumper {
    /// Replaces whatever a previous run left behind with a header-only snapshot.
    pub fn create(dir: &Path, descriptor: &ResourceDescriptor) -> Result<Self> {
        let path = dir.join(descriptor.file_name());
        let file = replace_file(&path, &format!("{}\n", descriptor.header))?;
        Ok(Self {
            header: descriptor.header,
            path,
            file,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn render_all(&self, cache: &ResourceCache) -> String {
        let now = Utc::now();
        let mut out = String::with_capacity(self.header.len() + 1 + cache.len() * 96);
        out.push_str(self.header);
        out.push('\n');
        for record in cache {
            out.push_str(&record.render_at(now));
            out.push('\n');
        }
        out
    }
}

impl SnapshotWriter for SnapshotDumper {
    fn append(&mut self, record: &ResourceRecord) -> Result<()> {
        let mut line = String::new();
        if self.file.stream_position()? == 0 {
            line.push_str(self.header);
            line.push('\n');
        }
        line.push_str(&record.render());
        line.push('\n');
        self.file.write_all(line.as_bytes())?;
        self.file.flush()?;
        Ok(())
    }

    fn rewrite(&mut self, cache: &ResourceCache) -> Result<()> {
        self.file = replace_file(&self.path, &self.render_all(cache))?;
        debug!(path = %self.path.display(), records = cache.len(), "Rewrote snapshot");
        Ok(())
    }
}

/// Atomically replaces `path` with `content` and returns a handle positioned at its end,
/// so later appends follow the new content.
fn replace_file(path: &Path, content: &str) -> Result<File> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = tempfile::Builder::new().prefix(".snapshot").tempfile_in(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o644))?;
    }
    tmp.write_all(content.as_bytes())?;
    tmp.flush()?;
    Ok(tmp.persist(path).map_err(|e| e.error)?)
}

/// Opens [`SnapshotDumper`]s inside one cache directory.
#[derive(Debug, Clone)]
pub struct DirectorySnapshots {
    dir: PathBuf,
}

impl DirectorySnapshots {
    /// Uses `dir`, creating it when missing.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl SnapshotFactory for DirectorySnapshots {
    fn open(&self, descriptor: &'static ResourceDescriptor) -> Result<Box<dyn SnapshotWriter>> {
        Ok(Box::new(SnapshotDumper::create(&self.dir, descriptor)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::resource::Column;
    use crate::infrastructure::kubernetes::resources::deployment;

    fn record(name: &str, label: &str, deleted: bool) -> ResourceRecord {
        ResourceRecord::new(
            ResourceKey::namespaced("default", name),
            vec![
                Column::text("default"),
                Column::text(name),
                Column::Age(None),
                Column::List(vec![label.to_string()]),
            ],
            deleted,
        )
    }

    fn feed(
        dumper: &mut SnapshotDumper,
        cache: &mut ResourceCache,
        record: ResourceRecord,
    ) -> Change {
        let key = record.key().clone();
        let change = cache.process(record);
        dumper.write(change, &key, cache).unwrap();
        change
    }

    fn lines(path: &Path) -> Vec<String> {
        std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_create_replaces_previous_run_with_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deployments");
        std::fs::write(&path, "stale\n").unwrap();

        let mut dumper = SnapshotDumper::create(dir.path(), &deployment::DESCRIPTOR).unwrap();
        assert_eq!(dumper.path(), path);
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "Namespace Name Age Labels\n"
        );

        // The header is not repeated by the first append.
        let mut cache = ResourceCache::new();
        feed(&mut dumper, &mut cache, record("a", "app=a", false));
        assert_eq!(
            lines(&path),
            vec!["Namespace Name Age Labels", "default a None app=a"]
        );
    }

    #[test]
    fn test_append_writes_header_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumper = SnapshotDumper::create(dir.path(), &deployment::DESCRIPTOR).unwrap();
        let mut cache = ResourceCache::new();

        feed(&mut dumper, &mut cache, record("a", "app=a", false));
        feed(&mut dumper, &mut cache, record("b", "app=b", false));

        assert_eq!(
            lines(dumper.path()),
            vec![
                "Namespace Name Age Labels",
                "default a None app=a",
                "default b None app=b"
            ]
        );
    }

    #[test]
    fn test_update_and_delete_rewrite_from_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumper = SnapshotDumper::create(dir.path(), &deployment::DESCRIPTOR).unwrap();
        let mut cache = ResourceCache::new();

        feed(&mut dumper, &mut cache, record("a", "app=a", false));
        feed(&mut dumper, &mut cache, record("b", "app=b", false));
        assert_eq!(
            feed(&mut dumper, &mut cache, record("a", "app=new", false)),
            Change::Update
        );
        assert_eq!(
            lines(dumper.path()),
            vec![
                "Namespace Name Age Labels",
                "default a None app=new",
                "default b None app=b"
            ]
        );

        assert_eq!(
            feed(&mut dumper, &mut cache, record("b", "app=b", true)),
            Change::Delete
        );
        assert_eq!(
            lines(dumper.path()),
            vec!["Namespace Name Age Labels", "default a None app=new"]
        );

        // Appends after a rewrite land on the renamed file.
        feed(&mut dumper, &mut cache, record("c", "app=c", false));
        assert_eq!(
            lines(dumper.path()),
            vec![
                "Namespace Name Age Labels",
                "default a None app=new",
                "default c None app=c"
            ]
        );
    }

    #[test]
    fn test_rewrite_of_empty_cache_keeps_header() {
        let dir = tempfile::tempdir().unwrap();
        let mut dumper = SnapshotDumper::create(dir.path(), &deployment::DESCRIPTOR).unwrap();
        dumper.rewrite(&ResourceCache::new()).unwrap();
        assert_eq!(lines(dumper.path()), vec!["Namespace Name Age Labels"]);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[test]
    fn test_directory_factory_creates_dir() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("cache").join("cluster");
        let factory = DirectorySnapshots::new(&nested).unwrap();
        factory.open(&deployment::DESCRIPTOR).unwrap();
        assert!(nested.join("deployments").exists());
    }
}
