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

//! Worker supervision and the outer rebuild loop.

use crate::domain::config::{NamespaceScope, SyncConfig};
use crate::domain::resource::{ResourceDescriptor, SyncMode};
use crate::domain::sync::filter::RecordFilter;
use crate::domain::sync::session::SessionScope;
use crate::domain::sync::worker::{Worker, WorkerExit, WorkerSettings};
use crate::infrastructure::constants::{
    REBUILD_MAX_DELAY_SECS, REBUILD_MIN_DELAY_SECS, WORKER_STOP_GRACE_SECS,
};
use crate::infrastructure::kubernetes::client::ResourceSource;
use crate::infrastructure::kubernetes::context::{ClusterContext, ContextProvider};
use crate::infrastructure::kubernetes::credentials::CredentialProvider;
use crate::infrastructure::snapshot::SnapshotFactory;
use crate::shared::error::Result;
use crate::shared::shutdown::{create_shutdown_channel, ShutdownRx, ShutdownTx};
use backon::{BackoffBuilder, ExponentialBuilder};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Collaborators shared by every supervisor the control loop builds.
#[derive(Clone)]
pub struct SyncDeps {
    pub config: Arc<SyncConfig>,
    pub contexts: Arc<dyn ContextProvider>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub snapshots: Arc<dyn SnapshotFactory>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SupervisorExit {
    Shutdown,
    /// The kubeconfig now points somewhere else; the supervisor must be rebuilt.
    ContextChanged(ClusterContext),
}

struct WorkerSlot {
    descriptor: &'static ResourceDescriptor,
    handle: Option<JoinHandle<WorkerExit>>,
    restarts: u32,
}

impl WorkerSlot {
    fn is_stopped(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

/// Owns one worker per configured resource type for a single cluster context.
pub struct Supervisor {
    deps: SyncDeps,
    context: ClusterContext,
    scope: SessionScope,
    filter: Arc<RecordFilter>,
    source: Arc<dyn ResourceSource>,
    slots: Vec<WorkerSlot>,
    /// Stops this supervisor's workers, independently of process shutdown.
    stop: ShutdownTx,
    shutdown: ShutdownRx,
}

impl Supervisor {
    /// Connects to `context` and prepares a slot per resource type. Workers are not
    /// started until [`Supervisor::run`].
    ///
    /// Returns `Ok(None)` when shutdown is requested while connecting.
    pub async fn build(
        deps: SyncDeps,
        context: ClusterContext,
        mut shutdown: ShutdownRx,
    ) -> Result<Option<Self>> {
        let descriptors = deps.config.descriptors()?;
        let filter = Arc::new(RecordFilter::from_config(&deps.config)?);
        let scope = SessionScope::new(
            deps.config.namespace.resolve(context.namespace.as_deref()),
            deps.config.selector().map(str::to_string),
        );
        let Some(source) = shutdown.guard(deps.credentials.connect(&context)).await else {
            return Ok(None);
        };
        let source = source?;
        let (stop, _) = create_shutdown_channel();

        info!(
            context = %context,
            scope = %deps.config.namespace,
            resources = descriptors.len(),
            "Supervisor ready"
        );
        Ok(Some(Self {
            slots: descriptors
                .into_iter()
                .map(|descriptor| WorkerSlot {
                    descriptor,
                    handle: None,
                    restarts: 0,
                })
                .collect(),
            deps,
            context,
            scope,
            filter,
            source,
            stop,
            shutdown,
        }))
    }

    pub fn context(&self) -> &ClusterContext {
        &self.context
    }

    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    fn settings(&self, descriptor: &ResourceDescriptor) -> WorkerSettings {
        let config = &self.deps.config;
        WorkerSettings {
            retry_backoff: config.retry_backoff(),
            poll_interval: match descriptor.mode {
                SyncMode::Poll(cadence) => config.poll_interval(cadence),
                SyncMode::Watch => config.retry_backoff(),
            },
            filter: self.filter.clone(),
        }
    }

    /// Starts a fresh worker (empty cache, new session, truncated snapshot) in `slot`.
    fn start_worker(&mut self, index: usize) -> Result<()> {
        let descriptor = self.slots[index].descriptor;
        let writer = self.deps.snapshots.open(descriptor)?;
        let worker = Worker::new(
            descriptor,
            self.source.clone(),
            writer,
            self.scope.clone(),
            self.settings(descriptor),
            self.stop.subscribe(),
        );
        self.slots[index].handle = Some(worker.spawn());
        Ok(())
    }

    fn start_all(&mut self) {
        for index in 0..self.slots.len() {
            if let Err(e) = self.start_worker(index) {
                warn!(kind = self.slots[index].descriptor.name, error = %e, "Failed to start worker");
            }
        }
    }

    /// Supervises workers until shutdown or a context change, then stops them all.
    pub async fn run(mut self) -> SupervisorExit {
        self.start_all();

        let mut ticker = tokio::time::interval(self.deps.config.liveness_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut shutdown = self.shutdown.clone();

        let exit = loop {
            if shutdown.guard(ticker.tick()).await.is_none() {
                info!("Shutdown requested, stopping workers");
                break SupervisorExit::Shutdown;
            }
            self.restart_stopped().await;
            if let Some(current) = self.detect_drift() {
                info!(from = %self.context, to = %current, "Kubernetes context changed");
                break SupervisorExit::ContextChanged(current);
            }
        };

        self.teardown().await;
        exit
    }

    async fn restart_stopped(&mut self) {
        let stopped: Vec<usize> = (0..self.slots.len())
            .filter(|&i| self.slots[i].is_stopped())
            .collect();
        if stopped.is_empty() || self.shutdown.is_shutdown() {
            return;
        }

        for &index in &stopped {
            let slot = &mut self.slots[index];
            if let Some(handle) = slot.handle.take() {
                match handle.await {
                    Ok(WorkerExit::Failed(e)) => {
                        warn!(kind = slot.descriptor.name, error = %e, "Worker stopped")
                    }
                    Ok(WorkerExit::Shutdown) => debug!(kind = slot.descriptor.name, "Worker stopped"),
                    Err(e) => error!(kind = slot.descriptor.name, error = %e, "Worker panicked"),
                }
            }
        }

        // Renews the login when needed before anything reconnects.
        let mut shutdown = self.shutdown.clone();
        match shutdown.guard(self.deps.credentials.connect(&self.context)).await {
            None => return,
            Some(Ok(source)) => self.source = source,
            Some(Err(e)) => {
                warn!(error = %e, "Failed to refresh credentials, retrying next cycle");
                return;
            }
        }

        for index in stopped {
            let slot = &mut self.slots[index];
            slot.restarts += 1;
            info!(kind = slot.descriptor.name, restarts = slot.restarts, "Restarting worker");
            if let Err(e) = self.start_worker(index) {
                warn!(kind = self.slots[index].descriptor.name, error = %e, "Failed to restart worker");
            }
        }
    }

    /// A namespace switch only matters when the scope follows the context.
    fn detect_drift(&self) -> Option<ClusterContext> {
        match self.deps.contexts.current() {
            Ok(current) if self.has_drifted(&current) => Some(current),
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read current context");
                None
            }
        }
    }

    /// Signals every worker and waits a bounded time for each before aborting it.
    async fn teardown(&mut self) {
        self.stop.shutdown();
        let grace = Duration::from_secs(WORKER_STOP_GRACE_SECS);
        for slot in &mut self.slots {
            let Some(mut handle) = slot.handle.take() else {
                continue;
            };
            if tokio::time::timeout(grace, &mut handle).await.is_err() {
                warn!(kind = slot.descriptor.name, "Worker did not stop in time, aborting");
                handle.abort();
            }
        }
        debug!(context = %self.context, "Supervisor stopped");
    }

    fn has_drifted(&self, current: &ClusterContext) -> bool {
        let follows_context = self.deps.config.namespace == NamespaceScope::Current;
        current.name != self.context.name
            || current.cluster != self.context.cluster
            || current.user != self.context.user
            || (follows_context && current.namespace != self.context.namespace)
    }
}

fn rebuild_backoff() -> impl Iterator<Item = Duration> {
    ExponentialBuilder::default()
        .with_min_delay(Duration::from_secs(REBUILD_MIN_DELAY_SECS))
        .with_max_delay(Duration::from_secs(REBUILD_MAX_DELAY_SECS))
        .with_max_times(usize::MAX)
        .build()
}

/// Builds and runs supervisors until shutdown, rebuilding on context changes and
/// backing off when a supervisor cannot be built.
pub async fn run_until_shutdown(deps: SyncDeps, shutdown: ShutdownRx) {
    let mut waiter = shutdown.clone();
    let mut backoff = rebuild_backoff();

    while !shutdown.is_shutdown() {
        let built = match deps.contexts.current() {
            Ok(context) => Supervisor::build(deps.clone(), context, shutdown.clone()).await,
            Err(e) => Err(e),
        };

        match built {
            Ok(None) => break,
            Ok(Some(supervisor)) => {
                backoff = rebuild_backoff();
                match supervisor.run().await {
                    SupervisorExit::Shutdown => break,
                    SupervisorExit::ContextChanged(context) => {
                        info!(context = %context, "Rebuilding supervisor");
                    }
                }
            }
            Err(e) => {
                let delay = backoff
                    .next()
                    .unwrap_or(Duration::from_secs(REBUILD_MAX_DELAY_SECS));
                error!(error = %e, ?delay, "Failed to start supervisor");
                if waiter.guard(tokio::time::sleep(delay)).await.is_none() {
                    break;
                }
            }
        }
    }
    info!("Sync stopped");
}
