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

//! Defines the abstract contracts implemented by per-type serialization logic.
//!
//! The engine itself never knows how a mesh or a material is encoded. It only
//! dispatches to implementations of these traits:
//!
//! - [`StfModule`]: owns exactly one type tag and converts in both directions.
//! - [`ExportHook`]: observes host objects of some types and contributes extra
//!   resources after the owning module has run.
//! - [`ImportHook`]: observes resources of some type tags and hands extra host
//!   objects to the owning module's import.

use crate::{export::ExportContext, import::ImportContext};
use std::{any::TypeId, sync::Arc};
use stf_core::{HostObject, JsonResource, StfKind, StfResult};

/// The result of exporting one resource.
#[derive(Debug, Clone)]
pub struct ExportOutput {
    /// The ID the resource is registered under.
    pub id: String,
    /// The encoded resource.
    pub resource: JsonResource,
}

impl ExportOutput {
    /// Pairs a resource with its ID.
    pub fn new(id: impl Into<String>, resource: JsonResource) -> Self {
        Self {
            id: id.into(),
            resource,
        }
    }
}

/// What an import hook decided to operate on.
///
/// A hook may narrow its attention to a part of the candidate resource, for
/// example one entry of its component list, under a different ID.
#[derive(Debug, Clone)]
pub struct HookMatch {
    /// The ID of the resource the hook will import.
    pub id: String,
    /// The resource the hook will import.
    pub resource: JsonResource,
}

/// A host object produced by an import hook, passed on to the owning module.
#[derive(Debug, Clone)]
pub struct HookOutput {
    /// Type tag of the hook that produced the object.
    pub stf_type: String,
    /// The ID the hook imported.
    pub id: String,
    /// The imported object.
    pub object: HostObject,
}

/// A type-specific import/export handler, registered against one type tag.
///
/// Modules are registered once and shared read-only by every run, hence the
/// `Send + Sync` bound.
pub trait StfModule: Send + Sync {
    /// The type tag this module owns, e.g. `"stf.mesh"`.
    fn stf_type(&self) -> &str;

    /// The kind of resource this module produces.
    fn kind(&self) -> StfKind;

    /// Type tags this module can stand in for.
    ///
    /// Declared for tooling and compatibility lookups only: import dispatch
    /// matches the exact [`stf_type`](Self::stf_type) and nothing else.
    fn like_types(&self) -> Vec<String> {
        Vec::new()
    }

    /// The host types this module can export.
    fn understood_types(&self) -> Vec<TypeId>;

    /// Orders competing modules for the same type tag on import.
    ///
    /// Higher wins. Between equal priorities the last registered module wins.
    fn priority(&self) -> i32 {
        0
    }

    /// Scores how well this module handles a particular host object.
    ///
    /// `None` opts out. Among export candidates the highest score wins, and
    /// the earliest registered module wins a tie.
    fn can_handle(&self, _object: &HostObject) -> Option<i32> {
        Some(0)
    }

    /// Reconstructs a host object from `resource`.
    ///
    /// `hooks` holds whatever the matching import hooks produced for this
    /// resource. Returning `Ok(None)` is reported as a failed import.
    fn import(
        &self,
        ctx: &mut ImportContext<'_>,
        resource: &JsonResource,
        id: &str,
        parent: Option<&HostObject>,
        hooks: &[HookOutput],
    ) -> StfResult<Option<HostObject>>;

    /// Encodes `object` into a resource.
    ///
    /// Returning `Ok(None)` is reported as a failed export.
    fn export(
        &self,
        ctx: &mut ExportContext<'_>,
        object: &HostObject,
        parent: Option<&HostObject>,
    ) -> StfResult<Option<ExportOutput>>;

    /// Enumerates the host objects to serialize as components of `object`.
    fn components(&self, _object: &HostObject) -> Vec<HostObject> {
        Vec::new()
    }
}

/// Contributes extra resources when host objects of its target types are exported.
pub trait ExportHook: Send + Sync {
    /// The type tag of the resources this hook produces.
    fn stf_type(&self) -> &str;

    /// `Component` outputs are attached to the observed resource, anything
    /// else is registered as an independent resource.
    fn kind(&self) -> StfKind;

    /// The host types this hook observes.
    fn target_types(&self) -> Vec<TypeId>;

    /// Decides whether to fire for `object`.
    ///
    /// Returns the objects to hand to [`export`](Self::export), most often
    /// just `object` itself, or `None` to stay silent.
    fn can_handle(&self, object: &HostObject) -> Option<Vec<HostObject>>;

    /// Encodes one target. `parent` is the observed object.
    fn export(
        &self,
        ctx: &mut ExportContext<'_>,
        object: &HostObject,
        parent: Option<&HostObject>,
    ) -> StfResult<Option<ExportOutput>>;
}

/// Intercepts resources of its target type tags before the owning module imports them.
pub trait ImportHook: Send + Sync {
    /// The type tag this hook is known by, for diagnostics and [`HookOutput`].
    fn stf_type(&self) -> &str;

    /// The resource type tags this hook observes.
    fn target_stf_types(&self) -> Vec<String>;

    /// Decides whether to fire for the resource `id`.
    fn can_handle(&self, resource: &JsonResource, id: &str) -> Option<HookMatch>;

    /// Imports the matched resource.
    fn import(
        &self,
        ctx: &mut ImportContext<'_>,
        resource: &JsonResource,
        id: &str,
        parent: Option<&HostObject>,
    ) -> StfResult<Option<HostObject>>;
}

/// One entry handed to [`RegistryBuilder::register`](crate::RegistryBuilder::register).
#[derive(Clone)]
pub enum Registration {
    /// A type-owning module.
    Module(Arc<dyn StfModule>),
    /// An observer of exported host objects.
    ExportHook(Arc<dyn ExportHook>),
    /// An observer of imported resources.
    ImportHook(Arc<dyn ImportHook>),
}

impl Registration {
    /// Wraps a module.
    pub fn module(module: impl StfModule + 'static) -> Self {
        Self::Module(Arc::new(module))
    }

    /// Wraps an export hook.
    pub fn export_hook(hook: impl ExportHook + 'static) -> Self {
        Self::ExportHook(Arc::new(hook))
    }

    /// Wraps an import hook.
    pub fn import_hook(hook: impl ImportHook + 'static) -> Self {
        Self::ImportHook(Arc::new(hook))
    }
}
