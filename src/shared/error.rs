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

use thiserror::Error;
pub type Result<T> = std::result::Result<T, SyncError>;

/// HTTP status returned when a watch resumes from a compacted resource version.
const STATUS_GONE: u16 = 410;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Kubernetes API error: {0}")]
    KubeError(String),

    #[error("Connection error: {0}")]
    Transient(String),

    #[error("Resource version expired: {0}")]
    ResumeExpired(String),

    #[error("Failed to decode {kind}: {message}")]
    Decode { kind: String, message: String },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),
}

/// How a failure is recovered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Retried in place with the same resume token.
    Transient,
    /// The watch must restart from a fresh listing.
    ResumeInvalid,
    /// The worker stops; the supervisor restarts it.
    SessionFatal,
    /// Credentials must be refreshed before a session can start.
    CredentialFatal,
}

impl From<kube::Error> for SyncError {
    fn from(err: kube::Error) -> Self {
        match err {
            kube::Error::Api(ae) if ae.code == STATUS_GONE => SyncError::ResumeExpired(ae.message),
            kube::Error::Api(ae) => SyncError::KubeError(format!("{} ({})", ae.message, ae.code)),
            kube::Error::HyperError(e) => SyncError::Transient(e.to_string()),
            kube::Error::Service(e) => SyncError::Transient(e.to_string()),
            kube::Error::ReadEvents(e) => SyncError::Transient(e.to_string()),
            other => SyncError::KubeError(other.to_string()),
        }
    }
}

impl From<kube::core::ErrorResponse> for SyncError {
    fn from(status: kube::core::ErrorResponse) -> Self {
        if status.code == STATUS_GONE {
            SyncError::ResumeExpired(status.message)
        } else {
            SyncError::KubeError(format!("{} ({})", status.message, status.code))
        }
    }
}

impl SyncError {
    pub fn config_error(context: impl Into<String>) -> Self {
        Self::ConfigError(context.into())
    }

    pub fn decode(kind: impl Into<String>, message: impl ToString) -> Self {
        Self::Decode {
            kind: kind.into(),
            message: message.to_string(),
        }
    }

    pub fn credential(context: impl Into<String>) -> Self {
        Self::Credential(context.into())
    }

    pub fn class(&self) -> ErrorClass {
        match self {
            SyncError::Transient(_) => ErrorClass::Transient,
            SyncError::ResumeExpired(_) => ErrorClass::ResumeInvalid,
            SyncError::Credential(_) => ErrorClass::CredentialFatal,
            _ => ErrorClass::SessionFatal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.class() == ErrorClass::Transient
    }

    pub fn is_resume_invalid(&self) -> bool {
        self.class() == ErrorClass::ResumeInvalid
    }
}
