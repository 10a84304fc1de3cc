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

//! Coarse classification of STF resources.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The coarse category of a resource, declared by the module that produces it.
///
/// The kind drives orchestration: `Data` modules are handed the root context,
/// and `Component` resources never trigger hooks or sub-component enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StfKind {
    /// Standalone data such as meshes, images or whole prefabs.
    Data,
    /// An element of a scene hierarchy.
    Node,
    /// Extra information attached to another resource.
    Component,
    /// An instantiation of a data resource on a node.
    Instance,
}

impl fmt::Display for StfKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StfKind::Data => write!(f, "data"),
            StfKind::Node => write!(f, "node"),
            StfKind::Component => write!(f, "component"),
            StfKind::Instance => write!(f, "instance"),
        }
    }
}
