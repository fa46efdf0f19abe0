// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

use std::any::{Any, TypeId};
use std::collections::HashMap;

use super::{AnyObject, FieldReader, FieldWriter};
use crate::error::Error;

/// Serializes one value of the entry's runtime type through the encoder's
/// field interface.
pub type WriteFn = fn(&dyn Any, &mut FieldWriter<'_>) -> Result<(), Error>;

/// Reconstructs one value from the decoder's buffered field interface.
pub type ReadFn = fn(&mut FieldReader<'_>) -> Result<AnyObject, Error>;

/// One row of the closed serialization table: a runtime type, its stable
/// wire name and the pair of plain functions that move it across.
pub struct HandlerEntry {
    pub stable_name: &'static str,
    pub runtime_type: TypeId,
    pub write_fn: WriteFn,
    pub read_fn: ReadFn,
}

/// The closed registry mapping runtime types to wire handlers.
///
/// Built once at startup, immutable afterwards and shared behind an `Arc`.
/// Both lookup directions are plain hash maps keyed at registration time;
/// the runtime-type map is also the memoized answer to "which handler
/// serves this concrete value", so resolution never scans the table.
#[derive(Default)]
pub struct SerialRegistry {
    entries: Vec<HandlerEntry>,
    by_name: HashMap<&'static str, usize>,
    by_type: HashMap<TypeId, usize>,
}

impl SerialRegistry {
    pub fn new() -> SerialRegistry {
        SerialRegistry::default()
    }

    /// Registers a handler for `T` under `stable_name`.
    ///
    /// Registering the same stable name or the same runtime type twice is a
    /// startup programming error and fails fatally rather than silently
    /// shadowing the earlier entry.
    pub fn register<T: Any>(
        &mut self,
        stable_name: &'static str,
        write_fn: WriteFn,
        read_fn: ReadFn,
    ) -> Result<(), Error> {
        let runtime_type = TypeId::of::<T>();
        if self.by_name.contains_key(stable_name) {
            return Err(Error::duplicate_type(format!(
                "stable name {stable_name:?} registered twice"
            )));
        }
        if self.by_type.contains_key(&runtime_type) {
            return Err(Error::duplicate_type(format!(
                "runtime type {} registered twice",
                std::any::type_name::<T>()
            )));
        }
        let index = self.entries.len();
        self.entries.push(HandlerEntry {
            stable_name,
            runtime_type,
            write_fn,
            read_fn,
        });
        self.by_name.insert(stable_name, index);
        self.by_type.insert(runtime_type, index);
        Ok(())
    }

    pub fn resolve_by_name(&self, stable_name: &str) -> Option<&HandlerEntry> {
        self.by_name.get(stable_name).map(|&i| &self.entries[i])
    }

    pub fn resolve_by_type(&self, runtime_type: TypeId) -> Option<&HandlerEntry> {
        self.by_type.get(&runtime_type).map(|&i| &self.entries[i])
    }

    /// Resolves the handler for a concrete value behind `dyn Any`.
    pub fn resolve_value(&self, value: &dyn Any) -> Option<&HandlerEntry> {
        self.resolve_by_type(value.type_id())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
