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

use super::ImportTask;
use crate::tasks::TaskQueue;
use std::collections::{HashMap, HashSet};
use stf_core::{
    HostObject, JsonResource, ReportLog, Severity, StfDefinition, StfReport, StfResult,
};

/// The mutable state of one import run.
///
/// Owns the parsed definition, the container's auxiliary buffers, the import
/// identity map, the report log and the deferred task queue.
#[derive(Debug)]
pub struct ImportState {
    definition: StfDefinition,
    pub(super) buffers: Vec<Vec<u8>>,
    imported: HashMap<String, HostObject>,
    pub(super) log: ReportLog,
    pub(super) tasks: TaskQueue<ImportTask>,
    pub(super) in_progress: HashSet<String>,
}

impl ImportState {
    /// Creates the state for importing `definition`, whose included buffers
    /// index into `buffers`.
    pub fn new(definition: StfDefinition, buffers: Vec<Vec<u8>>, threshold: Severity) -> Self {
        Self {
            definition,
            buffers,
            imported: HashMap::new(),
            log: ReportLog::new(threshold),
            tasks: TaskQueue::new(),
            in_progress: HashSet::new(),
        }
    }

    /// The parsed definition being imported.
    pub fn definition(&self) -> &StfDefinition {
        &self.definition
    }

    /// The declared root ID.
    pub fn root_id(&self) -> &str {
        &self.definition.stf.root
    }

    /// The number of auxiliary buffers in the container.
    pub fn buffer_count(&self) -> usize {
        self.buffers.len()
    }

    /// Looks up a raw resource by ID.
    pub fn get_json_resource(&self, id: &str) -> Option<&JsonResource> {
        self.definition.resource(id)
    }

    /// Records `object` as the reconstruction of resource `id`.
    pub fn register_imported_resource(&mut self, id: impl Into<String>, object: HostObject) {
        self.imported.insert(id.into(), object);
    }

    /// Returns the object already imported for `id`, if any.
    pub fn imported_object(&self, id: &str) -> Option<&HostObject> {
        self.imported.get(id)
    }

    /// The number of imported resources.
    pub fn imported_count(&self) -> usize {
        self.imported.len()
    }

    /// Records a report, failing if it crosses the abort threshold.
    pub fn report(&mut self, report: StfReport) -> StfResult<()> {
        self.log.report(report)
    }

    /// Every report recorded so far.
    pub fn reports(&self) -> &[StfReport] {
        self.log.reports()
    }

    /// Consumes the state, returning the import identity map and the reports.
    pub fn into_parts(self) -> (HashMap<String, HostObject>, Vec<StfReport>) {
        (self.imported, self.log.into_reports())
    }
}
