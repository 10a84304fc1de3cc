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

//! The module/hook registry and its dispatch tables.
//!
//! Registrations are collected by a [`RegistryBuilder`] and resolved once into
//! an immutable [`StfRegistry`], which can then be shared by any number of
//! independent runs.

use crate::module::{ExportHook, ImportHook, Registration, StfModule};
use std::{any::TypeId, collections::HashMap, sync::Arc};
use stf_core::HostObject;

/// Collects module and hook registrations in order.
#[derive(Default)]
pub struct RegistryBuilder {
    registrations: Vec<Registration>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a collection of modules and hooks, preserving their order.
    pub fn register(mut self, registrations: impl IntoIterator<Item = Registration>) -> Self {
        self.registrations.extend(registrations);
        self
    }

    /// Adds a single module.
    pub fn with_module(self, module: impl StfModule + 'static) -> Self {
        self.register([Registration::module(module)])
    }

    /// Adds a single export hook.
    pub fn with_export_hook(self, hook: impl ExportHook + 'static) -> Self {
        self.register([Registration::export_hook(hook)])
    }

    /// Adds a single import hook.
    pub fn with_import_hook(self, hook: impl ImportHook + 'static) -> Self {
        self.register([Registration::import_hook(hook)])
    }

    /// Resolves every registration into the dispatch tables.
    pub fn build(self) -> StfRegistry {
        let mut registry = StfRegistry::default();
        // (priority, module) of the current import winner per type tag.
        let mut import_winners: HashMap<String, (i32, Arc<dyn StfModule>)> = HashMap::new();

        for registration in self.registrations {
            match registration {
                Registration::Module(module) => {
                    log::debug!(
                        "StfRegistry: Registered module '{}' ({})",
                        module.stf_type(),
                        module.kind()
                    );
                    for host_type in module.understood_types() {
                        registry
                            .export_modules
                            .entry(host_type)
                            .or_default()
                            .push(module.clone());
                    }

                    let priority = module.priority();
                    match import_winners.get(module.stf_type()) {
                        // Later registrations win ties, so only a strictly
                        // lower priority keeps the previous winner.
                        Some((current, _)) if *current > priority => {}
                        _ => {
                            import_winners
                                .insert(module.stf_type().to_string(), (priority, module.clone()));
                        }
                    }
                    registry.modules.push(module);
                }
                Registration::ExportHook(hook) => {
                    log::debug!("StfRegistry: Registered export hook '{}'", hook.stf_type());
                    for host_type in hook.target_types() {
                        registry
                            .export_hooks
                            .entry(host_type)
                            .or_default()
                            .push(hook.clone());
                    }
                    registry.export_hook_count += 1;
                }
                Registration::ImportHook(hook) => {
                    log::debug!("StfRegistry: Registered import hook '{}'", hook.stf_type());
                    for stf_type in hook.target_stf_types() {
                        registry
                            .import_hooks
                            .entry(stf_type)
                            .or_default()
                            .push(hook.clone());
                    }
                    registry.import_hook_count += 1;
                }
            }
        }

        registry.import_modules = import_winners
            .into_iter()
            .map(|(stf_type, (_, module))| (stf_type, module))
            .collect();

        log::info!(
            "StfRegistry: {} modules, {} export hooks, {} import hooks",
            registry.modules.len(),
            registry.export_hook_count,
            registry.import_hook_count
        );
        registry
    }
}

/// The immutable dispatch table shared by import and export runs.
#[derive(Default)]
pub struct StfRegistry {
    modules: Vec<Arc<dyn StfModule>>,
    export_modules: HashMap<TypeId, Vec<Arc<dyn StfModule>>>,
    import_modules: HashMap<String, Arc<dyn StfModule>>,
    export_hooks: HashMap<TypeId, Vec<Arc<dyn ExportHook>>>,
    import_hooks: HashMap<String, Vec<Arc<dyn ImportHook>>>,
    export_hook_count: usize,
    import_hook_count: usize,
}

impl StfRegistry {
    /// Starts collecting registrations.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// All modules, in registration order.
    pub fn modules(&self) -> &[Arc<dyn StfModule>] {
        &self.modules
    }

    /// Returns the number of registered modules.
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Returns `true` if no modules are registered.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// The modules declaring `host_type` as understood, in registration order.
    pub fn export_candidates(&self, host_type: TypeId) -> &[Arc<dyn StfModule>] {
        self.export_modules
            .get(&host_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Picks the module that exports `object`.
    ///
    /// The candidate with the highest [`StfModule::can_handle`] score wins;
    /// the earliest registered one wins a tie.
    pub fn select_export_module(&self, object: &HostObject) -> Option<&Arc<dyn StfModule>> {
        let mut best: Option<(i32, &Arc<dyn StfModule>)> = None;
        for module in self.export_candidates(object.host_type()) {
            let Some(score) = module.can_handle(object) else {
                continue;
            };
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, module));
            }
        }
        best.map(|(_, module)| module)
    }

    /// The module owning the exact type tag `stf_type`.
    pub fn import_module(&self, stf_type: &str) -> Option<&Arc<dyn StfModule>> {
        self.import_modules.get(stf_type)
    }

    /// Every export hook observing `host_type`, in registration order.
    pub fn export_hooks(&self, host_type: TypeId) -> &[Arc<dyn ExportHook>] {
        self.export_hooks
            .get(&host_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Every import hook observing `stf_type`, in registration order.
    pub fn import_hooks(&self, stf_type: &str) -> &[Arc<dyn ImportHook>] {
        self.import_hooks
            .get(stf_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Modules declaring `alias` among their like-types.
    pub fn modules_like<'r>(
        &'r self,
        alias: &'r str,
    ) -> impl Iterator<Item = &'r Arc<dyn StfModule>> + 'r {
        self.modules
            .iter()
            .filter(move |module| module.like_types().iter().any(|like| like == alias))
    }
}
