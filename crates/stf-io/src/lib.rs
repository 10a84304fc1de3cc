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

//! # STF IO
//!
//! The resource graph dispatch and serialization engine.
//!
//! Per-type encoders implement [`StfModule`], [`ExportHook`] or [`ImportHook`]
//! and are collected once into an immutable [`StfRegistry`]. A run then walks
//! a host object graph through an [`ExportContext`], or a container through an
//! [`ImportContext`], with the engine guaranteeing that every object or
//! resource is converted at most once.
//!
//! The [`run`] module provides the top-level entry points tying everything
//! together with the binary container of `stf-core`.

#![warn(missing_docs)]

pub mod export;
pub mod import;
pub mod module;
pub mod registry;
pub mod run;
pub mod settings;
pub mod tasks;

pub use export::{ExportContext, ExportState, ExportTask};
pub use import::{ImportContext, ImportState, ImportTask};
pub use module::{ExportHook, ExportOutput, HookMatch, HookOutput, ImportHook, Registration, StfModule};
pub use registry::{RegistryBuilder, StfRegistry};
pub use run::{export_scene, import_scene, ExportOutcome, ImportOutcome, RunError};
pub use settings::{ExportSettings, ImportSettings};
pub use tasks::{TaskQueue, MAX_TASK_WAVES};
