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

use super::ExportTask;
use crate::{settings::ExportSettings, tasks::TaskQueue};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap, HashSet};
use stf_core::{
    definition::COMPONENTS, new_id, BufferDescriptor, HostObject, JsonResource, ObjectIdentity,
    ReportLog, Severity, StfDefinition, StfFile, StfMeta, StfReport, StfResult,
};
use stf_core::container::{STF_VERSION_MAJOR, STF_VERSION_MINOR};

/// An exported host object and the ID it was registered under.
///
/// The handle is kept alive for the whole run so that its address, and with
/// it its identity, cannot be reused by another object.
#[derive(Debug)]
struct Exported {
    object: HostObject,
    id: String,
}

/// The mutable state of one export run.
///
/// Owns the resource store, the identity map, the buffer store, the report
/// log and the deferred task queue. Every [`ExportContext`](super::ExportContext)
/// of the run borrows it.
#[derive(Debug)]
pub struct ExportState {
    settings: ExportSettings,
    resources: Map<String, Value>,
    identities: HashMap<ObjectIdentity, Exported>,
    buffers: Vec<Vec<u8>>,
    buffer_descriptors: BTreeMap<String, BufferDescriptor>,
    root_id: Option<String>,
    pub(super) log: ReportLog,
    pub(super) tasks: TaskQueue<ExportTask>,
    pub(super) in_progress: HashSet<ObjectIdentity>,
}

impl ExportState {
    /// Creates an empty run state.
    pub fn new(settings: ExportSettings) -> Self {
        let log = ReportLog::new(settings.fail_on_severity);
        Self {
            settings,
            resources: Map::new(),
            identities: HashMap::new(),
            buffers: Vec::new(),
            buffer_descriptors: BTreeMap::new(),
            root_id: None,
            log,
            tasks: TaskQueue::new(),
            in_progress: HashSet::new(),
        }
    }

    /// Records `object` as serialized under `id` and stores its resource.
    ///
    /// The first resource registered in a run becomes its root. Callers must
    /// check [`get_resource_id`](Self::get_resource_id) first: registering the
    /// same object twice overwrites its entry.
    pub fn register_serialized_resource(
        &mut self,
        object: &HostObject,
        resource: JsonResource,
        id: impl Into<String>,
    ) {
        let id = id.into();
        self.identities.insert(
            object.identity(),
            Exported {
                object: object.clone(),
                id: id.clone(),
            },
        );
        self.register_resource(resource, id);
    }

    /// Stores a resource that has no host object of its own, such as a hook output.
    pub fn register_resource(&mut self, resource: JsonResource, id: impl Into<String>) {
        let id = id.into();
        if self.root_id.is_none() {
            log::debug!("Root resource is '{id}'");
            self.root_id = Some(id.clone());
        }
        self.resources.insert(id, Value::Object(resource));
    }

    /// Returns the ID `object` was serialized under, if it was.
    pub fn get_resource_id(&self, object: &HostObject) -> Option<String> {
        self.identities
            .get(&object.identity())
            .map(|exported| exported.id.clone())
    }

    /// Iterates every host object serialized so far, with its ID.
    pub fn exported(&self) -> impl Iterator<Item = (&HostObject, &str)> {
        self.identities
            .values()
            .map(|exported| (&exported.object, exported.id.as_str()))
    }

    /// Looks up a registered resource.
    pub fn resource(&self, id: &str) -> Option<&JsonResource> {
        self.resources.get(id).and_then(Value::as_object)
    }

    /// Looks up a registered resource for patching, typically from a deferred task.
    pub fn resource_mut(&mut self, id: &str) -> Option<&mut JsonResource> {
        self.resources.get_mut(id).and_then(Value::as_object_mut)
    }

    /// The number of registered resources.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Stores a binary payload and returns its fresh ID.
    ///
    /// Identical payloads are stored twice under two IDs.
    pub fn serialize_buffer(&mut self, bytes: Vec<u8>) -> String {
        let id = new_id();
        let index = self.buffers.len();
        self.buffers.push(bytes);
        self.buffer_descriptors
            .insert(id.clone(), BufferDescriptor::Included { index });
        id
    }

    /// The number of stored buffers.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// The ID of the first registered resource.
    pub fn root_id(&self) -> Option<&str> {
        self.root_id.as_deref()
    }

    /// Records a report, failing if it crosses the abort threshold.
    pub fn report(&mut self, report: StfReport) -> StfResult<()> {
        self.log.report(report)
    }

    /// Every report recorded so far.
    pub fn reports(&self) -> &[StfReport] {
        self.log.reports()
    }

    /// Consumes the state, returning the recorded reports.
    pub fn into_reports(self) -> Vec<StfReport> {
        self.log.into_reports()
    }

    /// Appends `component_id` to the `components` list of `owner_id`.
    pub(super) fn attach_component(&mut self, owner_id: &str, component_id: String) {
        let Some(owner) = self.resource_mut(owner_id) else {
            return;
        };
        let list = owner
            .entry(COMPONENTS)
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(ids) = list {
            ids.push(Value::String(component_id));
        }
    }

    /// Packs the collected resources and buffers into a container.
    ///
    /// The stores are moved out, so this is the last step of a run.
    ///
    /// # Errors
    /// Reports Fatal when nothing was registered, since a file without a root
    /// resource cannot be imported.
    pub fn take_file(&mut self) -> StfResult<StfFile> {
        let Some(root) = self.root_id.clone() else {
            return Err(self.log.fatal(StfReport::new(
                Severity::Fatal,
                "nothing was exported, the run has no root resource",
            )));
        };

        let definition = StfDefinition {
            stf: StfMeta {
                version_major: STF_VERSION_MAJOR,
                version_minor: STF_VERSION_MINOR,
                root,
                generator: self.settings.generator.clone(),
                generator_version: self.settings.generator_version.clone(),
                timestamp: chrono::Utc::now().to_rfc3339(),
                asset_info: self.settings.asset_info.clone(),
                profiles: self.settings.profiles.clone(),
            },
            resources: std::mem::take(&mut self.resources),
            buffers: std::mem::take(&mut self.buffer_descriptors),
        };
        let json = definition.to_vec()?;
        log::info!(
            "Packed {} resources and {} buffers into a container",
            definition.resources.len(),
            self.buffers.len()
        );

        Ok(StfFile::new(json, std::mem::take(&mut self.buffers)))
    }
}
