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

/// Namespace and label filters applied to every list and watch call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionScope {
    pub namespace: Option<String>,
    pub selector: Option<String>,
}

impl SessionScope {
    pub fn new(namespace: Option<String>, selector: Option<String>) -> Self {
        Self {
            namespace,
            selector: selector.filter(|s| !s.trim().is_empty()),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn selector(&self) -> Option<&str> {
        self.selector.as_deref()
    }
}

/// Per-worker watch position.
///
/// A session without a resume token has to be seeded from a full listing first.
#[derive(Debug, Clone, Default)]
pub struct WatchSession {
    scope: SessionScope,
    resume_token: Option<String>,
    retries: u32,
    events: u64,
}

impl WatchSession {
    pub fn new(scope: SessionScope) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }

    pub fn scope(&self) -> &SessionScope {
        &self.scope
    }

    pub fn resume_token(&self) -> Option<&str> {
        self.resume_token.as_deref()
    }

    pub fn needs_listing(&self) -> bool {
        self.resume_token.is_none()
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    pub fn events(&self) -> u64 {
        self.events
    }

    /// Records a consumed event. Empty tokens leave the position untouched.
    pub fn advance(&mut self, token: Option<String>) {
        if let Some(token) = token.filter(|t| !t.is_empty()) {
            self.resume_token = Some(token);
        }
        self.retries = 0;
        self.events += 1;
    }

    /// Moves the position without counting an event, as bookmarks do.
    pub fn bookmark(&mut self, token: String) {
        if !token.is_empty() {
            self.resume_token = Some(token);
        }
    }

    /// Seeds the position from a listing without counting it as an event.
    pub fn seed(&mut self, token: Option<String>) {
        self.resume_token = token.filter(|t| !t.is_empty());
        self.retries = 0;
    }

    pub fn record_retry(&mut self) -> u32 {
        self.retries += 1;
        self.retries
    }

    /// Forgets the position so the next connect starts from scratch.
    pub fn reset(&mut self) {
        self.resume_token = None;
        self.retries = 0;
    }
}
