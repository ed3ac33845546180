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

//! Per resource type sync loop.
//!
//! Watch-mode workers seed their cache from a listing, then follow the change stream,
//! retrying transient faults with the same resume token and relisting when the token
//! expires. Poll-mode workers relist on a fixed interval and always rewrite the snapshot.
//! Any other failure stops the worker and is reported to the supervisor.

use crate::domain::resource::{ResourceDescriptor, ResourceRecord, SyncMode};
use crate::domain::sync::cache::{Change, ResourceCache};
use crate::domain::sync::filter::RecordFilter;
use crate::domain::sync::session::{SessionScope, WatchSession};
use crate::infrastructure::constants::PROGRESS_LOG_EVERY;
use crate::infrastructure::kubernetes::client::{ResourceSource, SourceEvent};
use crate::infrastructure::snapshot::SnapshotWriter;
use crate::shared::error::{ErrorClass, Result, SyncError};
use crate::shared::shutdown::ShutdownRx;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Version to watch from when a listing did not report one.
const ANY_VERSION: &str = "0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Connecting,
    Streaming,
    Retrying,
    Stopped,
}

/// Why a worker reached [`WorkerState::Stopped`].
#[derive(Debug)]
pub enum WorkerExit {
    Shutdown,
    Failed(SyncError),
}

impl WorkerExit {
    pub fn is_shutdown(&self) -> bool {
        matches!(self, WorkerExit::Shutdown)
    }
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub retry_backoff: Duration,
    /// Listing interval, only used by poll-mode kinds.
    pub poll_interval: Duration,
    pub filter: Arc<RecordFilter>,
}

pub struct Worker {
    descriptor: &'static ResourceDescriptor,
    source: Arc<dyn ResourceSource>,
    writer: Box<dyn SnapshotWriter>,
    cache: ResourceCache,
    session: WatchSession,
    settings: WorkerSettings,
    shutdown: ShutdownRx,
    state: WorkerState,
}

impl Worker {
    pub fn new(
        descriptor: &'static ResourceDescriptor,
        source: Arc<dyn ResourceSource>,
        writer: Box<dyn SnapshotWriter>,
        scope: SessionScope,
        settings: WorkerSettings,
        shutdown: ShutdownRx,
    ) -> Self {
        Self {
            descriptor,
            source,
            writer,
            cache: ResourceCache::new(),
            session: WatchSession::new(scope),
            settings,
            shutdown,
            state: WorkerState::Connecting,
        }
    }

    pub fn state(&self) -> WorkerState {
        self.state
    }

    pub fn spawn(self) -> JoinHandle<WorkerExit> {
        tokio::spawn(self.run())
    }

    pub async fn run(mut self) -> WorkerExit {
        let kind = self.descriptor.name;
        let namespace = self
            .descriptor
            .effective_namespace(self.session.scope().namespace())
            .unwrap_or("all namespaces")
            .to_string();

        let exit = match self.descriptor.mode {
            SyncMode::Watch => {
                info!(kind, %namespace, "Watching");
                self.watch_loop().await
            }
            SyncMode::Poll(_) => {
                info!(kind, %namespace, interval = ?self.settings.poll_interval, "Polling");
                self.poll_loop().await
            }
        };
        self.transition(WorkerState::Stopped);

        match &exit {
            WorkerExit::Shutdown => debug!(kind, "Worker stopped on shutdown"),
            WorkerExit::Failed(e) => warn!(kind, error = %e, "Worker exiting"),
        }
        exit
    }

    fn transition(&mut self, state: WorkerState) {
        if self.state != state {
            debug!(kind = self.descriptor.name, from = ?self.state, to = ?state, "Worker state");
            self.state = state;
        }
    }

    // ========================================================================
    // Watch mode
    // ========================================================================

    async fn watch_loop(&mut self) -> WorkerExit {
        let mut shutdown = self.shutdown.clone();
        loop {
            self.transition(WorkerState::Connecting);
            let Some(result) = shutdown.guard(self.stream_once()).await else {
                return WorkerExit::Shutdown;
            };

            match result {
                Ok(()) => {
                    debug!(
                        kind = self.descriptor.name,
                        version = self.session.resume_token().unwrap_or_default(),
                        "Watch stream ended, reconnecting"
                    );
                }
                Err(e) => match e.class() {
                    ErrorClass::Transient => {
                        self.transition(WorkerState::Retrying);
                        let attempt = self.session.record_retry();
                        warn!(kind = self.descriptor.name, attempt, error = %e, "Watcher retrying");
                        let backoff = tokio::time::sleep(self.settings.retry_backoff);
                        if shutdown.guard(backoff).await.is_none() {
                            return WorkerExit::Shutdown;
                        }
                    }
                    ErrorClass::ResumeInvalid => {
                        info!(kind = self.descriptor.name, error = %e, "Resume token expired, relisting");
                        self.cache.clear();
                        self.session.reset();
                    }
                    _ => return WorkerExit::Failed(e),
                },
            }
        }
    }

    /// Runs one connection: relists when needed, then consumes the stream until it ends.
    async fn stream_once(&mut self) -> Result<()> {
        if self.session.needs_listing() {
            self.seed().await?;
        }
        let version = self
            .session
            .resume_token()
            .unwrap_or(ANY_VERSION)
            .to_string();

        let mut stream = self
            .source
            .watch(self.descriptor, self.session.scope(), &version)
            .await?;
        self.transition(WorkerState::Streaming);

        while let Some(event) = stream.next().await {
            self.apply(event?)?;
        }
        Ok(())
    }

    async fn seed(&mut self) -> Result<()> {
        let listing = self
            .source
            .list(self.descriptor, self.session.scope())
            .await?;
        self.replace_from(listing.items)?;
        debug!(
            kind = self.descriptor.name,
            count = self.cache.len(),
            version = listing.version.as_deref().unwrap_or_default(),
            "Seeded from listing"
        );
        self.session.seed(listing.version);
        Ok(())
    }

    fn apply(&mut self, event: SourceEvent) -> Result<()> {
        match event {
            SourceEvent::Applied { object, version } => {
                if self.settings.filter.admits(self.descriptor, &object) {
                    let record = self.descriptor.decode(object)?;
                    self.process(record)?;
                }
                self.session.advance(version);
            }
            SourceEvent::Deleted { object, version } => {
                if self.settings.filter.admits(self.descriptor, &object) {
                    let record = self.descriptor.decode(object)?.into_deleted();
                    self.process(record)?;
                }
                self.session.advance(version);
            }
            SourceEvent::Bookmark { version } => {
                self.session.bookmark(version);
                return Ok(());
            }
        }

        let events = self.session.events();
        if events % PROGRESS_LOG_EVERY == 0 {
            info!(kind = self.descriptor.name, events, "Processed events");
        }
        Ok(())
    }

    fn process(&mut self, record: ResourceRecord) -> Result<Change> {
        let key = record.key().clone();
        let change = self.cache.process(record);
        if change != Change::NoOp {
            debug!(kind = self.descriptor.name, %key, ?change, "Cache changed");
        }
        self.writer.write(change, &key, &self.cache)?;
        Ok(change)
    }

    // ========================================================================
    // Poll mode
    // ========================================================================

    async fn poll_loop(&mut self) -> WorkerExit {
        let mut shutdown = self.shutdown.clone();
        loop {
            self.transition(WorkerState::Connecting);
            let Some(result) = shutdown.guard(self.poll_once()).await else {
                return WorkerExit::Shutdown;
            };

            match result {
                Ok(()) => self.transition(WorkerState::Streaming),
                Err(e) if e.is_transient() => {
                    self.transition(WorkerState::Retrying);
                    warn!(kind = self.descriptor.name, error = %e, "Poll failed, retrying next interval");
                }
                Err(e) => return WorkerExit::Failed(e),
            }

            let wait = tokio::time::sleep(self.settings.poll_interval);
            if shutdown.guard(wait).await.is_none() {
                return WorkerExit::Shutdown;
            }
        }
    }

    async fn poll_once(&mut self) -> Result<()> {
        let listing = self
            .source
            .list(self.descriptor, self.session.scope())
            .await?;
        self.replace_from(listing.items)?;
        debug!(kind = self.descriptor.name, count = self.cache.len(), "Polled");
        Ok(())
    }

    /// Replaces the cache with decoded listing items and rewrites the snapshot.
    fn replace_from(&mut self, items: Vec<serde_json::Value>) -> Result<()> {
        let filter = &self.settings.filter;
        let records = items
            .into_iter()
            .filter(|item| filter.admits(self.descriptor, item))
            .map(|item| self.descriptor.decode(item))
            .collect::<Result<Vec<_>>>()?;
        self.cache.replace_all(records);
        self.writer.rewrite(&self.cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::kubernetes::client::{EventStream, Listing};
    use crate::infrastructure::kubernetes::resources::{configmap, namespace};
    use crate::shared::shutdown::create_shutdown_channel;
    use futures::stream;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    fn config_map(name: &str, version: &str, data: &str) -> Value {
        json!({
            "apiVersion": "v1",
            "kind": "ConfigMap",
            "metadata": {
                "name": name,
                "namespace": "default",
                "resourceVersion": version,
                "labels": {"data": data}
            }
        })
    }

    type Connection = Result<Vec<Result<SourceEvent>>>;

    /// Serves scripted connections, then keeps the stream open until shutdown.
    #[derive(Default)]
    struct ScriptedSource {
        listings: Mutex<VecDeque<Result<Listing>>>,
        connections: Mutex<VecDeque<Connection>>,
        watched_from: Mutex<Vec<String>>,
        lists: Mutex<u32>,
    }

    impl ScriptedSource {
        fn listing(self, items: Vec<Value>, version: &str) -> Self {
            self.listings.lock().unwrap().push_back(Ok(Listing {
                items,
                version: Some(version.to_string()),
            }));
            self
        }

        fn list_error(self, err: SyncError) -> Self {
            self.listings.lock().unwrap().push_back(Err(err));
            self
        }

        fn connection(self, connection: Connection) -> Self {
            self.connections.lock().unwrap().push_back(connection);
            self
        }
    }

    #[async_trait::async_trait]
    impl ResourceSource for ScriptedSource {
        async fn list(
            &self,
            _descriptor: &'static ResourceDescriptor,
            _scope: &SessionScope,
        ) -> Result<Listing> {
            *self.lists.lock().unwrap() += 1;
            self.listings
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(Listing::default()))
        }

        async fn watch(
            &self,
            _descriptor: &'static ResourceDescriptor,
            _scope: &SessionScope,
            version: &str,
        ) -> Result<EventStream> {
            self.watched_from.lock().unwrap().push(version.to_string());
            match self.connections.lock().unwrap().pop_front() {
                Some(Ok(events)) => Ok(stream::iter(events).boxed()),
                Some(Err(e)) => Err(e),
                None => Ok(stream::pending().boxed()),
            }
        }
    }

    #[derive(Default)]
    struct Calls {
        appends: Vec<String>,
        rewrites: Vec<usize>,
    }

    #[derive(Clone, Default)]
    struct RecordingWriter(Arc<Mutex<Calls>>);

    impl SnapshotWriter for RecordingWriter {
        fn append(&mut self, record: &ResourceRecord) -> Result<()> {
            self.0.lock().unwrap().appends.push(record.key().to_string());
            Ok(())
        }

        fn rewrite(&mut self, cache: &ResourceCache) -> Result<()> {
            self.0.lock().unwrap().rewrites.push(cache.len());
            Ok(())
        }
    }

    fn settings() -> WorkerSettings {
        WorkerSettings {
            retry_backoff: Duration::from_millis(10),
            poll_interval: Duration::from_secs(60),
            filter: Arc::default(),
        }
    }

    fn worker(
        descriptor: &'static ResourceDescriptor,
        source: Arc<ScriptedSource>,
        writer: RecordingWriter,
        shutdown: ShutdownRx,
    ) -> Worker {
        Worker::new(
            descriptor,
            source,
            Box::new(writer),
            SessionScope::new(Some("default".to_string()), None),
            settings(),
            shutdown,
        )
    }

    async fn settle() {
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    #[tokio::test]
    async fn test_watch_applies_events_in_order() {
        let source = Arc::new(
            ScriptedSource::default()
                .listing(vec![config_map("a", "10", "1")], "10")
                .connection(Ok(vec![
                    Ok(SourceEvent::Applied {
                        object: config_map("b", "11", "1"),
                        version: Some("11".to_string()),
                    }),
                    Ok(SourceEvent::Applied {
                        object: config_map("b", "12", "1"),
                        version: Some("12".to_string()),
                    }),
                    Ok(SourceEvent::Applied {
                        object: config_map("a", "13", "2"),
                        version: Some("13".to_string()),
                    }),
                    Ok(SourceEvent::Deleted {
                        object: config_map("b", "14", "1"),
                        version: Some("14".to_string()),
                    }),
                    Ok(SourceEvent::Bookmark {
                        version: "20".to_string(),
                    }),
                ])),
        );
        let writer = RecordingWriter::default();
        let (tx, rx) = create_shutdown_channel();
        let handle = worker(&configmap::DESCRIPTOR, source.clone(), writer.clone(), rx).spawn();

        settle().await;
        tx.shutdown();
        assert!(handle.await.unwrap().is_shutdown());

        let calls = writer.0.lock().unwrap();
        // Seed rewrite, then add b (append), no-op b, update a, delete b.
        assert_eq!(calls.appends, vec!["default/b"]);
        assert_eq!(calls.rewrites, vec![1, 2, 1]);
        assert_eq!(*source.watched_from.lock().unwrap(), vec!["10", "20"]);
    }

    #[tokio::test]
    async fn test_excluded_namespace_is_skipped_but_advances_token() {
        let in_namespace = |name: &str, namespace: &str, version: &str| {
            let mut object = config_map(name, version, "1");
            object["metadata"]["namespace"] = json!(namespace);
            object
        };
        let source = Arc::new(
            ScriptedSource::default()
                .listing(
                    vec![in_namespace("a", "default", "3"), in_namespace("b", "kube-system", "3")],
                    "3",
                )
                .connection(Ok(vec![
                    Ok(SourceEvent::Applied {
                        object: in_namespace("c", "kube-public", "4"),
                        version: Some("4".to_string()),
                    }),
                    Ok(SourceEvent::Applied {
                        object: in_namespace("d", "default", "5"),
                        version: Some("5".to_string()),
                    }),
                ]))
                .connection(Ok(vec![Ok(SourceEvent::Deleted {
                    object: in_namespace("b", "kube-system", "6"),
                    version: Some("6".to_string()),
                })])),
        );
        let writer = RecordingWriter::default();
        let (tx, rx) = create_shutdown_channel();
        let settings = WorkerSettings {
            filter: Arc::new(RecordFilter::new(&["^kube-"], &[]).unwrap()),
            ..settings()
        };
        let handle = Worker::new(
            &configmap::DESCRIPTOR,
            source.clone(),
            Box::new(writer.clone()),
            SessionScope::default(),
            settings,
            rx,
        )
        .spawn();

        settle().await;
        tx.shutdown();
        assert!(handle.await.unwrap().is_shutdown());

        let calls = writer.0.lock().unwrap();
        assert_eq!(calls.rewrites, vec![1]);
        assert_eq!(calls.appends, vec!["default/d"]);
        assert_eq!(*source.watched_from.lock().unwrap(), vec!["3", "5", "6"]);
    }

    #[tokio::test]
    async fn test_transient_error_keeps_resume_token() {
        let source = Arc::new(
            ScriptedSource::default()
                .listing(vec![], "5")
                .connection(Ok(vec![
                    Ok(SourceEvent::Applied {
                        object: config_map("a", "6", "1"),
                        version: Some("6".to_string()),
                    }),
                    Err(SyncError::Transient("connection reset".to_string())),
                ]))
                .connection(Err(SyncError::Transient("refused".to_string()))),
        );
        let writer = RecordingWriter::default();
        let (tx, rx) = create_shutdown_channel();
        let handle = worker(&configmap::DESCRIPTOR, source.clone(), writer.clone(), rx).spawn();

        settle().await;
        tx.shutdown();
        assert!(handle.await.unwrap().is_shutdown());

        assert_eq!(*source.watched_from.lock().unwrap(), vec!["5", "6", "6"]);
        assert_eq!(*source.lists.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_expired_token_relists_from_scratch() {
        let source = Arc::new(
            ScriptedSource::default()
                .listing(vec![config_map("a", "5", "1"), config_map("b", "5", "1")], "5")
                .connection(Err(SyncError::ResumeExpired("too old".to_string())))
                .listing(vec![config_map("b", "30", "1")], "30"),
        );
        let writer = RecordingWriter::default();
        let (tx, rx) = create_shutdown_channel();
        let handle = worker(&configmap::DESCRIPTOR, source.clone(), writer.clone(), rx).spawn();

        settle().await;
        tx.shutdown();
        assert!(handle.await.unwrap().is_shutdown());

        assert_eq!(*source.lists.lock().unwrap(), 2);
        assert_eq!(*source.watched_from.lock().unwrap(), vec!["5", "30"]);
        assert_eq!(writer.0.lock().unwrap().rewrites, vec![2, 1]);
    }

    #[tokio::test]
    async fn test_decode_failure_stops_worker() {
        let source = Arc::new(ScriptedSource::default().listing(vec![], "1").connection(Ok(
            vec![Ok(SourceEvent::Applied {
                object: json!({"metadata": {"namespace": "default"}}),
                version: Some("2".to_string()),
            })],
        )));
        let (_tx, rx) = create_shutdown_channel();
        let exit = worker(&configmap::DESCRIPTOR, source, RecordingWriter::default(), rx)
            .run()
            .await;
        assert!(matches!(exit, WorkerExit::Failed(SyncError::Decode { .. })));
    }

    #[tokio::test]
    async fn test_fatal_list_error_stops_worker() {
        let source = Arc::new(
            ScriptedSource::default().list_error(SyncError::KubeError("forbidden (403)".into())),
        );
        let (_tx, rx) = create_shutdown_channel();
        let exit = worker(&configmap::DESCRIPTOR, source, RecordingWriter::default(), rx)
            .run()
            .await;
        assert!(matches!(exit, WorkerExit::Failed(SyncError::KubeError(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_rewrites_every_tick() {
        let ns = |name: &str| json!({"apiVersion": "v1", "kind": "Namespace", "metadata": {"name": name}});
        let source = Arc::new(
            ScriptedSource::default()
                .listing(vec![ns("default"), ns("kube-system")], "1")
                .list_error(SyncError::Transient("timeout".to_string()))
                .listing(vec![ns("default"), ns("kube-system")], "2"),
        );
        let writer = RecordingWriter::default();
        let (tx, rx) = create_shutdown_channel();
        let handle = worker(&namespace::DESCRIPTOR, source.clone(), writer.clone(), rx).spawn();

        // Three ticks: the first listing, the failed one, the identical third one.
        tokio::time::sleep(Duration::from_secs(150)).await;
        tx.shutdown();
        assert!(handle.await.unwrap().is_shutdown());

        assert_eq!(*source.lists.lock().unwrap(), 3);
        assert_eq!(writer.0.lock().unwrap().rewrites, vec![2, 2]);
        assert!(writer.0.lock().unwrap().appends.is_empty());
    }
}
