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

//! Identifier minting for resources and buffers.

use uuid::Uuid;

/// Creates a new, random (version 4) identifier in its hyphenated string form.
///
/// Resource and buffer IDs are opaque strings in the definition. Modules may
/// supply their own stable IDs; this is the fallback used by the engine for
/// buffers and by modules that have nothing better.
pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}
