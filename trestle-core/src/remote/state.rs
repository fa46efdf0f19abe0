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

//! Self-reported diagnostics for server connection threads.
//!
//! Each connection thread records its own phase here; an operator can
//! snapshot the table at any time without touching the threads
//! themselves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::api::Operation;

/// What a connection thread reported it was last doing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Handshake,
    /// Waiting for the next request.
    Idle,
    Dispatching(Operation),
    Streaming { sent: usize },
}

/// Table of live connections and their self-reported states.
#[derive(Default)]
pub struct ConnectionStateTable {
    next_id: AtomicU64,
    states: Mutex<HashMap<u64, ConnectionState>>,
}

impl ConnectionStateTable {
    pub fn new() -> ConnectionStateTable {
        ConnectionStateTable::default()
    }

    /// Registers a new connection, returning its table id.
    pub fn register(&self) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.states
            .lock()
            .unwrap()
            .insert(id, ConnectionState::Handshake);
        id
    }

    pub fn set(&self, id: u64, state: ConnectionState) {
        self.states.lock().unwrap().insert(id, state);
    }

    pub fn remove(&self, id: u64) {
        self.states.lock().unwrap().remove(&id);
    }

    pub fn len(&self) -> usize {
        self.states.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.lock().unwrap().is_empty()
    }

    /// A point-in-time copy of every connection's reported state.
    pub fn snapshot(&self) -> Vec<(u64, ConnectionState)> {
        let mut entries: Vec<_> = self
            .states
            .lock()
            .unwrap()
            .iter()
            .map(|(&id, state)| (id, state.clone()))
            .collect();
        entries.sort_by_key(|&(id, _)| id);
        entries
    }
}
