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

//! Type-erased handles to objects of the host application.

use std::{
    any::{type_name, Any, TypeId},
    fmt,
    sync::Arc,
};

/// A stable key for the identity of a [`HostObject`] within one run.
///
/// Two handles share an identity exactly when they point to the same
/// allocation. The engine keeps a clone of every registered handle alive for
/// the duration of a run, so an identity is never reused by a new allocation
/// while it is still in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectIdentity(usize);

/// A thread-safe, reference-counted, type-erased handle to a host object.
///
/// Cloning a handle is cheap and preserves identity. The concrete type is
/// captured at construction so dispatch never has to inspect the value.
#[derive(Clone)]
pub struct HostObject {
    inner: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl HostObject {
    /// Wraps a freshly created value into a new handle with its own identity.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self::from_arc(Arc::new(value))
    }

    /// Wraps an existing shared allocation.
    ///
    /// Handles created from clones of the same `Arc` share one identity.
    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self {
            inner: value,
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
        }
    }

    /// The `TypeId` of the wrapped value, used as the export dispatch key.
    pub fn host_type(&self) -> TypeId {
        self.type_id
    }

    /// The full Rust type name of the wrapped value, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Returns the identity of the underlying allocation.
    pub fn identity(&self) -> ObjectIdentity {
        ObjectIdentity(Arc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Returns `true` if both handles point to the same allocation.
    pub fn ptr_eq(&self, other: &HostObject) -> bool {
        self.identity() == other.identity()
    }

    /// Returns `true` if the wrapped value is a `T`.
    pub fn is<T: Any>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Borrows the wrapped value as a `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.inner.downcast_ref::<T>()
    }

    /// Recovers a typed shared handle to the wrapped value.
    pub fn downcast_arc<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.inner).downcast::<T>().ok()
    }
}

impl fmt::Debug for HostObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HostObject({} @ {:#x})", self.type_name, self.identity().0)
    }
}

impl<T: Any + Send + Sync> From<Arc<T>> for HostObject {
    fn from(value: Arc<T>) -> Self {
        Self::from_arc(value)
    }
}
