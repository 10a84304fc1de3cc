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

//! Import orchestration: resources and buffers back to a host object graph.

mod context;
mod state;

pub use context::ImportContext;
pub use state::ImportState;

use stf_core::StfResult;

/// A deferred import step, run after the primary walk with a root context.
pub type ImportTask = Box<dyn for<'c> FnOnce(&mut ImportContext<'c>) -> StfResult<()>>;
