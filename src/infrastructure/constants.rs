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

/// Environment variable holding the default cache directory
pub const CACHE_DIR_ENV: &str = "KUBECTL_FZF_CACHE";

/// Resource types tracked when none are configured
pub const DEFAULT_RESOURCES: &[&str] = &[
    "Pod",
    "Deployment",
    "Service",
    "Node",
    "StatefulSet",
    "ReplicaSet",
    "ConfigMap",
    "Endpoint",
    "Pv",
    "Pvc",
    "Namespace",
];

/// Namespace scope keyword meaning "every namespace"
pub const ALL_NAMESPACES: &str = "all";

/// Namespace assumed when the kubeconfig context does not set one
pub const DEFAULT_NAMESPACE: &str = "default";

/// Poll intervals (seconds)
pub const DEFAULT_NODE_POLL_SECS: u64 = 300;
pub const DEFAULT_NAMESPACE_POLL_SECS: u64 = 600;

/// Watch retry and supervision cadence (seconds)
pub const DEFAULT_RETRY_BACKOFF_SECS: u64 = 1;
pub const DEFAULT_LIVENESS_SECS: u64 = 1;

/// Server-side watch timeout (seconds). kube rejects watch timeouts of 295s and above,
/// which keeps them under the client read timeout.
pub const DEFAULT_WATCH_TIMEOUT_SECS: u32 = 290;
pub const MAX_WATCH_TIMEOUT_SECS: u32 = 290;

/// Bounded wait for a worker to drain after being told to stop
pub const WORKER_STOP_GRACE_SECS: u64 = 1;

/// Supervisor rebuild backoff bounds (seconds)
pub const REBUILD_MIN_DELAY_SECS: u64 = 1;
pub const REBUILD_MAX_DELAY_SECS: u64 = 30;

/// Events between two progress log lines
pub const PROGRESS_LOG_EVERY: u64 = 1000;

/// Labels dropped from snapshot lines
pub const EXCLUDED_LABELS: &[&str] = &[
    "pod-template-generation",
    "app.kubernetes.io/name",
    "controller-revision-hash",
    "app.kubernetes.io/managed-by",
    "pod-template-hash",
    "statefulset.kubernetes.io/pod-name",
    "controler-uid",
];

/// Well-known node labels
pub const NODE_KIND: &str = "Node";
pub const NODE_ROLE_PREFIX: &str = "node-role.kubernetes.io/";
pub const INSTANCE_TYPE_LABELS: &[&str] = &[
    "node.kubernetes.io/instance-type",
    "beta.kubernetes.io/instance-type",
];
pub const ZONE_LABELS: &[&str] = &[
    "topology.kubernetes.io/zone",
    "failure-domain.beta.kubernetes.io/zone",
];

/// Node address type carrying the in-cluster IP
pub const ADDRESS_TYPE_INTERNAL_IP: &str = "InternalIP";

/// Waiting reason that does not override the pod phase
pub const WAITING_REASON_COMPLETED: &str = "Completed";

/// Auth provider key holding an OIDC id token
pub const ID_TOKEN_KEY: &str = "id-token";

/// Tokens this close to expiry are refreshed already (seconds)
pub const TOKEN_EXPIRY_SKEW_SECS: i64 = 300;
