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

use super::{ExportState, ExportTask};
use crate::{
    module::ExportOutput,
    registry::StfRegistry,
    tasks::{wave_limit_report, MAX_TASK_WAVES},
};
use serde_json::Value;
use stf_core::{
    definition::{REFERENCED_BUFFERS, REFERENCED_RESOURCES},
    HostObject, JsonResource, Severity, StfError, StfKind, StfReport, StfResult,
};

/// Resources and buffers pulled in underneath a nested context.
#[derive(Debug, Default)]
struct References {
    resources: Vec<String>,
    buffers: Vec<String>,
}

impl References {
    fn add_resource(&mut self, id: &str) {
        if !self.resources.iter().any(|known| known == id) {
            self.resources.push(id.to_string());
        }
    }
}

/// The view of an export run handed to modules, hooks and tasks.
///
/// A root context sees the run as a whole. A nested context, obtained with
/// [`resource_context`](Self::resource_context), additionally records every
/// resource and buffer serialized through it, and [`finish`](Self::finish)
/// writes those into the resource being built.
pub struct ExportContext<'a> {
    state: &'a mut ExportState,
    registry: &'a StfRegistry,
    parent: Option<HostObject>,
    references: Option<References>,
}

impl<'a> ExportContext<'a> {
    /// Creates the root context of a run.
    pub fn new(state: &'a mut ExportState, registry: &'a StfRegistry) -> Self {
        Self {
            state,
            registry,
            parent: None,
            references: None,
        }
    }

    /// A root context over the same run: no parent, no reference tracking.
    pub fn root_context(&mut self) -> ExportContext<'_> {
        ExportContext {
            state: &mut *self.state,
            registry: self.registry,
            parent: None,
            references: None,
        }
    }

    /// A nested context for building the resource of `parent`.
    ///
    /// Objects serialized through it default to `parent` as their parent, and
    /// their IDs end up in the `referenced_*` lists written by [`finish`](Self::finish).
    pub fn resource_context(&mut self, parent: HostObject) -> ExportContext<'_> {
        ExportContext {
            state: &mut *self.state,
            registry: self.registry,
            parent: Some(parent),
            references: Some(References::default()),
        }
    }

    /// The implicit parent of objects serialized through this context.
    pub fn parent_host_object(&self) -> Option<&HostObject> {
        self.parent.as_ref()
    }

    /// The registry of this run.
    pub fn registry(&self) -> &StfRegistry {
        self.registry
    }

    /// Read access to the run state.
    pub fn state(&self) -> &ExportState {
        &*self.state
    }

    /// Serializes `object` with the context's implicit parent.
    ///
    /// See [`serialize_resource_with_parent`](Self::serialize_resource_with_parent).
    pub fn serialize_resource(&mut self, object: Option<&HostObject>) -> StfResult<Option<String>> {
        self.serialize_resource_with_parent(object, None)
    }

    /// Serializes `object` at most once and returns its resource ID.
    ///
    /// `None` is the absent optional reference and yields `None`. An object
    /// that was already serialized yields its existing ID. Objects no module
    /// claims, and modules that fail, are reported and yield `None`.
    ///
    /// # Errors
    /// Only when a report crosses the run's abort threshold, or when a module
    /// itself fails with an error.
    pub fn serialize_resource_with_parent(
        &mut self,
        object: Option<&HostObject>,
        parent: Option<&HostObject>,
    ) -> StfResult<Option<String>> {
        let Some(object) = object else {
            return Ok(None);
        };

        let id = match self.state.get_resource_id(object) {
            Some(id) => Some(id),
            None => self.serialize_new(object, parent)?,
        };
        if let (Some(id), Some(references)) = (&id, &mut self.references) {
            references.add_resource(id);
        }
        Ok(id)
    }

    fn serialize_new(
        &mut self,
        object: &HostObject,
        parent: Option<&HostObject>,
    ) -> StfResult<Option<String>> {
        let registry = self.registry;
        let Some(module) = registry.select_export_module(object) else {
            self.report(
                StfReport::new(Severity::Warn, "no module can export this object")
                    .with_object(object.clone()),
            )?;
            return Ok(None);
        };

        let identity = object.identity();
        if !self.state.in_progress.insert(identity) {
            self.report(
                StfReport::new(
                    Severity::Error,
                    "object is already being exported, cyclic references must go through add_task",
                )
                .with_type(module.stf_type())
                .with_object(object.clone()),
            )?;
            return Ok(None);
        }

        let parent = parent.cloned().or_else(|| self.parent.clone());
        let kind = module.kind();
        let result = if kind == StfKind::Data {
            module.export(&mut self.root_context(), object, parent.as_ref())
        } else {
            module.export(self, object, parent.as_ref())
        };
        self.state.in_progress.remove(&identity);

        let Some(ExportOutput { id, resource }) = result? else {
            self.report(
                StfReport::new(Severity::Error, "export failed")
                    .with_type(module.stf_type())
                    .with_object(object.clone()),
            )?;
            return Ok(None);
        };

        log::debug!("Exported {} as '{id}' ({})", object.type_name(), module.stf_type());
        self.state.register_serialized_resource(object, resource, id.clone());

        if kind != StfKind::Component {
            self.run_export_hooks(kind, object, &id)?;
            for component in module.components(object) {
                let component_id = match self.state.get_resource_id(&component) {
                    Some(existing) => Some(existing),
                    None => self.serialize_new(&component, Some(object))?,
                };
                if let Some(component_id) = component_id {
                    self.state.attach_component(&id, component_id);
                }
            }
        }

        Ok(Some(id))
    }

    /// Hooks see the same scope as the owning module: a root context for
    /// `Data` owners, the calling context otherwise. Targets other than the
    /// observed object are deduplicated by identity like any resource.
    fn run_export_hooks(
        &mut self,
        kind: StfKind,
        object: &HostObject,
        owner_id: &str,
    ) -> StfResult<()> {
        let registry = self.registry;
        for hook in registry.export_hooks(object.host_type()) {
            let Some(targets) = hook.can_handle(object) else {
                continue;
            };
            for target in targets {
                let observed = target.ptr_eq(object);
                let known = if observed {
                    None
                } else {
                    self.state.get_resource_id(&target)
                };

                let id = match known {
                    Some(id) => id,
                    None => {
                        let output = if kind == StfKind::Data {
                            hook.export(&mut self.root_context(), &target, Some(object))?
                        } else {
                            hook.export(self, &target, Some(object))?
                        };
                        let Some(ExportOutput { id, resource }) = output else {
                            self.report(
                                StfReport::new(Severity::Error, "export hook failed")
                                    .with_type(hook.stf_type())
                                    .with_object(target),
                            )?;
                            continue;
                        };
                        log::debug!("Export hook '{}' produced '{id}'", hook.stf_type());
                        // The observed object already maps to its owner's ID.
                        if observed {
                            self.state.register_resource(resource, id.clone());
                        } else {
                            self.state
                                .register_serialized_resource(&target, resource, id.clone());
                        }
                        id
                    }
                };

                if hook.kind() == StfKind::Component {
                    self.state.attach_component(owner_id, id);
                }
            }
        }
        Ok(())
    }

    /// Stores a binary payload and returns its ID.
    pub fn serialize_buffer(&mut self, bytes: Vec<u8>) -> String {
        let id = self.state.serialize_buffer(bytes);
        if let Some(references) = &mut self.references {
            references.buffers.push(id.clone());
        }
        id
    }

    /// Completes the resource built in this context.
    ///
    /// A nested context merges the resources and buffers it collected into
    /// the `referenced_resources` and `referenced_buffers` lists of `resource`.
    pub fn finish(self, id: impl Into<String>, mut resource: JsonResource) -> ExportOutput {
        if let Some(references) = self.references {
            merge_ids(&mut resource, REFERENCED_RESOURCES, references.resources);
            merge_ids(&mut resource, REFERENCED_BUFFERS, references.buffers);
        }
        ExportOutput::new(id, resource)
    }

    /// Returns the ID `object` was serialized under, if it was.
    pub fn get_resource_id(&self, object: &HostObject) -> Option<String> {
        self.state.get_resource_id(object)
    }

    /// Looks up a registered resource.
    pub fn resource(&self, id: &str) -> Option<&JsonResource> {
        self.state.resource(id)
    }

    /// Looks up a registered resource for patching.
    pub fn resource_mut(&mut self, id: &str) -> Option<&mut JsonResource> {
        self.state.resource_mut(id)
    }

    /// The ID of the first resource registered in the run.
    pub fn root_id(&self) -> Option<&str> {
        self.state.root_id()
    }

    /// Defers `task` until the primary walk is over.
    ///
    /// The queue is shared by the whole run, whichever context it is added from.
    pub fn add_task(
        &mut self,
        task: impl for<'c> FnOnce(&mut ExportContext<'c>) -> StfResult<()> + 'static,
    ) {
        let task: ExportTask = Box::new(task);
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

    /// Drains the task queue wave by wave.
    ///
    /// Tasks run with a root context and may enqueue further tasks. After
    /// [`MAX_TASK_WAVES`] waves the remaining tasks are dropped and an Error
    /// is reported.
    pub fn run_tasks(&mut self) -> StfResult<()> {
        let mut waves = 0;
        while !self.state.tasks.is_empty() {
            if waves == MAX_TASK_WAVES {
                let dropped = self.state.tasks.clear();
                return self.report(wave_limit_report(dropped));
            }
            waves += 1;

            let wave = self.state.tasks.take_wave();
            log::trace!("Export task wave {waves}: {} tasks", wave.len());
            let mut root = self.root_context();
            for task in wave {
                task(&mut root)?;
            }
        }
        Ok(())
    }
}

fn merge_ids(resource: &mut JsonResource, key: &str, ids: Vec<String>) {
    if ids.is_empty() {
        return;
    }
    let list = resource
        .entry(key)
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(existing) = list {
        for id in ids {
            let id = Value::String(id);
            if !existing.contains(&id) {
                existing.push(id);
            }
        }
    }
}
