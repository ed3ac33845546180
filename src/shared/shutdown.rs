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

//! Cooperative cancellation shared between the control loop, the supervisor and its workers.

use std::future::Future;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{info, warn};

#[derive(Debug, Clone)]
pub struct ShutdownTx(watch::Sender<bool>);

impl ShutdownTx {
    /// Flags shutdown. Idempotent; succeeds even when no receiver is alive.
    pub fn shutdown(&self) {
        self.0.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    pub fn subscribe(&self) -> ShutdownRx {
        ShutdownRx(self.0.subscribe())
    }
}

#[derive(Debug, Clone)]
pub struct ShutdownRx(watch::Receiver<bool>);

impl ShutdownRx {
    pub fn is_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Resolves once shutdown has been flagged or the sender is gone.
    pub async fn wait(&mut self) {
        let _ = self.0.wait_for(|flagged| *flagged).await;
    }

    /// Runs `fut` unless shutdown is flagged first, in which case `None` is returned.
    pub async fn guard<F: Future>(&mut self, fut: F) -> Option<F::Output> {
        if self.is_shutdown() {
            return None;
        }
        tokio::select! {
            _ = self.wait() => None,
            out = fut => Some(out),
        }
    }
}

pub fn create_shutdown_channel() -> (ShutdownTx, ShutdownRx) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTx(tx), ShutdownRx(rx))
}

/// Flags shutdown on SIGINT (Ctrl+C) or, on unix, SIGTERM.
pub fn listen_for_signals(tx: ShutdownTx) -> JoinHandle<()> {
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            match signal(SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = tokio::signal::ctrl_c() => info!("SIGINT (Ctrl+C) received, shutting down"),
                        _ = sigterm.recv() => info!("SIGTERM received, shutting down"),
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Failed to register SIGTERM handler");
                    wait_for_ctrl_c().await;
                }
            }
        }
        #[cfg(not(unix))]
        wait_for_ctrl_c().await;

        tx.shutdown();
    })
}

async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("SIGINT (Ctrl+C) received, shutting down"),
        Err(e) => {
            // Without a handler only SIGKILL ends the process.
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    }
}
