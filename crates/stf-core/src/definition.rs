// Copyright 2025 eraflo
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

//! Defines the JSON definition stored as buffer 0 of every container.
//!
//! The definition is a flat dictionary of resources keyed by ID. Resources
//! never embed each other; they only refer to other resources and buffers by
//! ID, through type-specific fields and through the reserved reference lists
//! named by [`COMPONENTS`], [`REFERENCED_RESOURCES`] and [`REFERENCED_BUFFERS`].

use crate::report::{Severity, StfReport};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// A single resource record: a JSON object carrying at least a `type` field.
pub type JsonResource = Map<String, Value>;

/// Field holding the type tag of a resource.
pub const TYPE: &str = "type";
/// Field holding the ordered list of component resource IDs.
pub const COMPONENTS: &str = "components";
/// Field holding the resource IDs collected by a nested export context.
pub const REFERENCED_RESOURCES: &str = "referenced_resources";
/// Field holding the buffer IDs collected by a nested export context.
pub const REFERENCED_BUFFERS: &str = "referenced_buffers";

/// Creates an empty resource of the given type.
pub fn new_resource(stf_type: &str) -> JsonResource {
    let mut resource = JsonResource::new();
    resource.insert(TYPE.to_string(), Value::String(stf_type.to_string()));
    resource
}

/// Returns the type tag of a resource, if it has a string `type` field.
pub fn resource_type(resource: &JsonResource) -> Option<&str> {
    resource.get(TYPE).and_then(Value::as_str)
}

/// Iterates the string IDs stored in the array field `key` of a resource.
pub fn id_list<'a>(resource: &'a JsonResource, key: &str) -> impl Iterator<Item = &'a str> {
    resource
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .filter_map(Value::as_str)
}

/// Describes where the bytes of a buffer live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BufferDescriptor {
    /// Stored in the container, at this index among the auxiliary buffers.
    #[serde(rename = "stf.buffer.included")]
    Included {
        /// Zero-based index into the container's auxiliary buffers.
        index: usize,
    },
    /// Stored inline in the definition as an array of bytes.
    #[serde(rename = "stf.buffer.json_array")]
    JsonArray {
        /// The raw bytes.
        data: Vec<u8>,
    },
    /// Stored in an external file next to the container.
    #[serde(rename = "stf.buffer.file")]
    File {
        /// Path of the file, relative to the container.
        path: String,
    },
}

/// The format header of a definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StfMeta {
    /// Format major version.
    pub version_major: u32,
    /// Format minor version.
    pub version_minor: u32,
    /// ID of the root resource.
    pub root: String,
    /// Name of the application that produced the file.
    #[serde(default)]
    pub generator: String,
    /// Version of the producing application.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub generator_version: String,
    /// RFC 3339 timestamp of the export.
    #[serde(default)]
    pub timestamp: String,
    /// Free-form asset information such as name, author or license.
    #[serde(default)]
    pub asset_info: Map<String, Value>,
    /// Profiles the file claims to conform to.
    #[serde(default)]
    pub profiles: Vec<String>,
}

/// The root of a JSON definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StfDefinition {
    /// Format header.
    pub stf: StfMeta,
    /// All resources, keyed by ID, in registration order.
    #[serde(default)]
    pub resources: Map<String, Value>,
    /// All buffer descriptors, keyed by ID.
    #[serde(default)]
    pub buffers: BTreeMap<String, BufferDescriptor>,
}

/// The transitive outbound references of a resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dependencies {
    /// Resource IDs reachable from the starting resource, excluding itself.
    pub resources: BTreeSet<String>,
    /// Buffer IDs reachable from the starting resource.
    pub buffers: BTreeSet<String>,
}

impl StfDefinition {
    /// Parses a definition from UTF-8 JSON bytes.
    pub fn from_slice(bytes: &[u8]) -> serde_json::Result<Self> {
        serde_json::from_slice(bytes)
    }

    /// Encodes the definition as compact JSON, as stored in containers.
    pub fn to_vec(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }

    /// Encodes the definition as indented JSON, for debugging and diffing.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Looks up a resource by ID. Returns `None` for non-object entries.
    pub fn resource(&self, id: &str) -> Option<&JsonResource> {
        self.resources.get(id).and_then(Value::as_object)
    }

    /// Collects every resource and buffer transitively referenced by `id`.
    ///
    /// Only the reserved reference lists are followed, since type-specific
    /// fields are opaque to the engine.
    pub fn dependencies_of(&self, id: &str) -> Dependencies {
        let mut deps = Dependencies::default();
        let mut visited = BTreeSet::from([id.to_string()]);
        let mut queue = VecDeque::from([id.to_string()]);

        while let Some(current) = queue.pop_front() {
            let Some(resource) = self.resource(&current) else {
                continue;
            };
            let outbound = id_list(resource, COMPONENTS).chain(id_list(resource, REFERENCED_RESOURCES));
            for next in outbound {
                if visited.insert(next.to_string()) {
                    deps.resources.insert(next.to_string());
                    queue.push_back(next.to_string());
                }
            }
            deps.buffers
                .extend(id_list(resource, REFERENCED_BUFFERS).map(str::to_string));
        }

        deps
    }

    /// Structural checks over the whole definition.
    ///
    /// `included_buffers` is the number of auxiliary buffers in the container,
    /// used to bound `stf.buffer.included` indices. Returns one `Error` report
    /// per problem; an empty list means every reference resolves.
    pub fn validate_references(&self, included_buffers: usize) -> Vec<StfReport> {
        let mut reports = Vec::new();

        if !self.resources.contains_key(&self.stf.root) {
            reports.push(
                StfReport::new(Severity::Error, "root resource is not defined")
                    .with_id(self.stf.root.clone()),
            );
        }

        for (id, value) in &self.resources {
            let Some(resource) = value.as_object() else {
                reports.push(StfReport::new(Severity::Error, "resource is not a JSON object").with_id(id));
                continue;
            };
            if resource_type(resource).is_none() {
                reports.push(StfReport::new(Severity::Error, "resource has no type").with_id(id));
            }
            for target in id_list(resource, COMPONENTS).chain(id_list(resource, REFERENCED_RESOURCES)) {
                if !self.resources.contains_key(target) {
                    reports.push(
                        StfReport::new(
                            Severity::Error,
                            format!("references undefined resource '{target}'"),
                        )
                        .with_id(id),
                    );
                }
            }
            for target in id_list(resource, REFERENCED_BUFFERS) {
                if !self.buffers.contains_key(target) {
                    reports.push(
                        StfReport::new(
                            Severity::Error,
                            format!("references undefined buffer '{target}'"),
                        )
                        .with_id(id),
                    );
                }
            }
        }

        for (id, descriptor) in &self.buffers {
            if let BufferDescriptor::Included { index } = descriptor {
                if *index >= included_buffers {
                    reports.push(
                        StfReport::new(
                            Severity::Error,
                            format!("included buffer index {index} is out of range ({included_buffers} buffers)"),
                        )
                        .with_id(id),
                    );
                }
            }
        }

        reports
    }
}
