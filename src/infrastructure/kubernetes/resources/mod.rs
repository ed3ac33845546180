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

//! Descriptor registry for every supported resource type

pub mod common;
pub mod configmap;
pub mod deployment;
pub mod endpoints;
pub mod namespace;
pub mod node;
pub mod pod;
pub mod pv;
pub mod pvc;
pub mod replicaset;
pub mod service;
pub mod statefulset;

use crate::domain::resource::ResourceDescriptor;
use crate::shared::error::{Result, SyncError};

pub static DESCRIPTORS: [&ResourceDescriptor; 11] = [
    &pod::DESCRIPTOR,
    &deployment::DESCRIPTOR,
    &service::DESCRIPTOR,
    &node::DESCRIPTOR,
    &statefulset::DESCRIPTOR,
    &replicaset::DESCRIPTOR,
    &configmap::DESCRIPTOR,
    &endpoints::DESCRIPTOR,
    &pv::DESCRIPTOR,
    &pvc::DESCRIPTOR,
    &namespace::DESCRIPTOR,
];

/// Finds a descriptor by type name, snapshot file name or API plural, ignoring case.
pub fn lookup(name: &str) -> Option<&'static ResourceDescriptor> {
    let name = name.trim();
    DESCRIPTORS.iter().copied().find(|d| {
        d.name.eq_ignore_ascii_case(name)
            || d.plural.eq_ignore_ascii_case(name)
            || d.file_name().eq_ignore_ascii_case(name)
    })
}

/// Resolves configured type names, keeping their order and dropping repeats.
pub fn resolve<S: AsRef<str>>(names: &[S]) -> Result<Vec<&'static ResourceDescriptor>> {
    let mut resolved: Vec<&'static ResourceDescriptor> = Vec::with_capacity(names.len());
    for name in names {
        let descriptor = lookup(name.as_ref())
            .ok_or_else(|| SyncError::UnknownResource(name.as_ref().to_string()))?;
        if !resolved.iter().any(|d| d.name == descriptor.name) {
            resolved.push(descriptor);
        }
    }
    Ok(resolved)
}
