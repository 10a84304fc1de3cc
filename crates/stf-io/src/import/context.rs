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

use super::{ImportState, ImportTask};
use crate::{
    module::{HookMatch, HookOutput},
    registry::StfRegistry,
    tasks::{wave_limit_report, MAX_TASK_WAVES},
};
use serde_json::Value;
use stf_core::{
    definition::resource_type, BufferDescriptor, HostObject, JsonResource, Severity, StfError,
    StfReport, StfResult,
};

/// Where the bytes of a buffer come from, resolved before borrowing them.
enum BufferSource {
    Missing,
    Included(usize),
    Inline,
    External(String),
}

/// The view of an import run handed to modules, hooks and tasks.
pub struct ImportContext<'a> {
    state: &'a mut ImportState,
    registry: &'a StfRegistry,
    parent: Option<HostObject>,
}

impl<'a> ImportContext<'a> {
    /// Creates the root context of a run.
    pub fn new(state: &'a mut ImportState, registry: &'a StfRegistry) -> Self {
        Self {
            state,
            registry,
            parent: None,
        }
    }

    /// A root context over the same run, without an implicit parent.
    pub fn root_context(&mut self) -> ImportContext<'_> {
        ImportContext {
            state: &mut *self.state,
            registry: self.registry,
            parent: None,
        }
    }

    /// A context whose imports default to `parent` as their parent.
    pub fn with_parent(&mut self, parent: HostObject) -> ImportContext<'_> {
        ImportContext {
            state: &mut *self.state,
            registry: self.registry,
            parent: Some(parent),
        }
    }

    /// The implicit parent of resources imported through this context.
    pub fn parent_host_object(&self) -> Option<&HostObject> {
        self.parent.as_ref()
    }

    /// The declared root ID of the file.
    pub fn root_id(&self) -> &str {
        self.state.root_id()
    }

    /// Read access to the run state.
    pub fn state(&self) -> &ImportState {
        &*self.state
    }

    /// Imports resource `id` with the context's implicit parent.
    pub fn import_resource(&mut self, id: &str) -> StfResult<Option<HostObject>> {
        self.import_resource_with_parent(id, None)
    }

    /// Reconstructs resource `id` at most once.
    ///
    /// Unknown type tags are reported as warnings and yield `None`, so that
    /// files produced with newer module sets still load.
    ///
    /// # Errors
    /// A missing resource, or one without a `type`, is Fatal. Otherwise only
    /// when a report crosses the abort threshold or a module fails with an error.
    pub fn import_resource_with_parent(
        &mut self,
        id: &str,
        parent: Option<&HostObject>,
    ) -> StfResult<Option<HostObject>> {
        if let Some(object) = self.state.imported_object(id) {
            return Ok(Some(object.clone()));
        }

        let resource = match self.state.definition().resources.get(id) {
            Some(Value::Object(resource)) => resource.clone(),
            Some(_) => {
                return Err(self.fatal(
                    StfReport::new(Severity::Fatal, "resource is not a JSON object").with_id(id),
                ))
            }
            None => {
                return Err(self.fatal(
                    StfReport::new(Severity::Fatal, "resource is not defined").with_id(id),
                ))
            }
        };
        let Some(stf_type) = resource_type(&resource).map(str::to_string) else {
            return Err(self.fatal(StfReport::new(Severity::Fatal, "resource has no type").with_id(id)));
        };

        if !self.state.in_progress.insert(id.to_string()) {
            self.report(
                StfReport::new(
                    Severity::Error,
                    "resource is already being imported, cyclic references must go through add_task",
                )
                .with_id(id)
                .with_type(stf_type),
            )?;
            return Ok(None);
        }

        let parent = parent.cloned().or_else(|| self.parent.clone());
        let result = self.import_new(&resource, id, &stf_type, parent.as_ref());
        self.state.in_progress.remove(id);
        result
    }

    fn import_new(
        &mut self,
        resource: &JsonResource,
        id: &str,
        stf_type: &str,
        parent: Option<&HostObject>,
    ) -> StfResult<Option<HostObject>> {
        let registry = self.registry;

        let mut hook_outputs = Vec::new();
        for hook in registry.import_hooks(stf_type) {
            let Some(HookMatch {
                id: hook_id,
                resource: hook_resource,
            }) = hook.can_handle(resource, id)
            else {
                continue;
            };
            match hook.import(self, &hook_resource, &hook_id, parent)? {
                Some(object) => {
                    log::debug!("Import hook '{}' handled '{hook_id}'", hook.stf_type());
                    if hook_id != id {
                        self.state
                            .register_imported_resource(hook_id.clone(), object.clone());
                    }
                    hook_outputs.push(HookOutput {
                        stf_type: hook.stf_type().to_string(),
                        id: hook_id,
                        object,
                    });
                }
                None => self.report(
                    StfReport::new(Severity::Error, "import hook failed")
                        .with_id(hook_id)
                        .with_type(hook.stf_type()),
                )?,
            }
        }

        let Some(module) = registry.import_module(stf_type) else {
            self.report(
                StfReport::new(Severity::Warn, "no module registered for this type")
                    .with_id(id)
                    .with_type(stf_type),
            )?;
            return Ok(None);
        };

        match module.import(self, resource, id, parent, &hook_outputs)? {
            Some(object) => {
                log::debug!("Imported '{id}' ({stf_type}) as {}", object.type_name());
                self.state.register_imported_resource(id, object.clone());
                Ok(Some(object))
            }
            None => {
                self.report(
                    StfReport::new(Severity::Error, "import failed")
                        .with_id(id)
                        .with_type(stf_type),
                )?;
                Ok(None)
            }
        }
    }

    /// Resolves the bytes of buffer `id`.
    ///
    /// Included and inline buffers are supported. External file buffers are
    /// reported as warnings and yield `None`.
    ///
    /// # Errors
    /// An out-of-range included index is Fatal. An undefined buffer is
    /// reported at Error.
    pub fn import_buffer(&mut self, id: &str) -> StfResult<Option<&[u8]>> {
        let source = match self.state.definition().buffers.get(id) {
            None => BufferSource::Missing,
            Some(BufferDescriptor::Included { index }) => BufferSource::Included(*index),
            Some(BufferDescriptor::JsonArray { .. }) => BufferSource::Inline,
            Some(BufferDescriptor::File { path }) => BufferSource::External(path.clone()),
        };

        match source {
            BufferSource::Missing => {
                self.report(StfReport::new(Severity::Error, "buffer is not defined").with_id(id))?;
                Ok(None)
            }
            BufferSource::Included(index) => {
                if index >= self.state.buffers.len() {
                    return Err(self.fatal(
                        StfReport::new(
                            Severity::Fatal,
                            format!("included buffer index {index} is out of range"),
                        )
                        .with_id(id),
                    ));
                }
                Ok(Some(self.state.buffers[index].as_slice()))
            }
            BufferSource::Inline => match self.state.definition().buffers.get(id) {
                Some(BufferDescriptor::JsonArray { data }) => Ok(Some(data.as_slice())),
                _ => Ok(None),
            },
            BufferSource::External(path) => {
                self.report(
                    StfReport::new(
                        Severity::Warn,
                        format!("external buffer file '{path}' is not supported"),
                    )
                    .with_id(id),
                )?;
                Ok(None)
            }
        }
    }

    /// Looks up a raw resource by ID.
    pub fn get_json_resource(&self, id: &str) -> Option<&JsonResource> {
        self.state.get_json_resource(id)
    }

    /// Records `object` as the reconstruction of resource `id`.
    pub fn register_imported_resource(&mut self, id: impl Into<String>, object: HostObject) {
        self.state.register_imported_resource(id, object);
    }

    /// Returns the object already imported for `id`, if any.
    pub fn imported_object(&self, id: &str) -> Option<&HostObject> {
        self.state.imported_object(id)
    }

    /// Defers `task` until the primary walk is over.
    pub fn add_task(
        &mut self,
        task: impl for<'c> FnOnce(&mut ImportContext<'c>) -> StfResult<()> + 'static,
    ) {
        let task: ImportTask = Box::new(task);
        self.state.tasks.push(task);
    }

    /// Records a report, failing if it crosses the abort threshold.
    pub fn report(&mut self, report: StfReport) -> StfResult<()> {
        self.state.report(report)
    }

    /// Records `report` as Fatal and returns the abort error.
    pub fn fatal(&mut self, report: StfReport) -> StfError {
        self.state.log.fatal(report)
    }

    /// Drains the task queue wave by wave, as on export.
    pub fn run_tasks(&mut self) -> StfResult<()> {
        let mut waves = 0;
        while !self.state.tasks.is_empty() {
            if waves == MAX_TASK_WAVES {
                let dropped = self.state.tasks.clear();
                return self.report(wave_limit_report(dropped));
            }
            waves += 1;

            let wave = self.state.tasks.take_wave();
            log::trace!("Import task wave {waves}: {} tasks", wave.len());
            let mut root = self.root_context();
            for task in wave {
                task(&mut root)?;
            }
        }
        Ok(())
    }
}
