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

//! # STF Core
//!
//! Foundational crate containing the leaf types shared by every part of the
//! STF serialization engine: the report channel, type-erased host object
//! handles, the JSON definition shape and the binary container codec.
//!
//! This crate knows nothing about modules or orchestration. Those live in
//! `stf-io`, which builds on the contracts defined here.

#![warn(missing_docs)]

pub mod container;
pub mod definition;
pub mod host;
pub mod id;
pub mod kind;
pub mod report;

pub use container::{ContainerError, StfFile, StfHeader};
pub use definition::{BufferDescriptor, Dependencies, JsonResource, StfDefinition, StfMeta};
pub use host::{HostObject, ObjectIdentity};
pub use id::new_id;
pub use kind::StfKind;
pub use report::{ReportLog, Severity, StfError, StfReport, StfResult};
