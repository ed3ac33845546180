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

//! Synchronization engine: change detection, watch sessions, workers and supervision

pub mod cache;
pub mod filter;
pub mod session;
pub mod supervisor;
pub mod worker;

pub use self::cache::{Change, ResourceCache};
pub use self::filter::RecordFilter;
pub use self::session::{SessionScope, WatchSession};
pub use self::supervisor::{run_until_shutdown, Supervisor, SupervisorExit, SyncDeps};
pub use self::worker::{Worker, WorkerExit, WorkerSettings, WorkerState};
