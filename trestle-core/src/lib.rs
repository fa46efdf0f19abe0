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

//! # Trestle Core
//!
//! Core runtime of the Trestle identity-connector framework. A connector is
//! an adapter to an external identity store; this crate provides everything
//! needed to configure, pool and invoke connectors either in-process or
//! across a network.
//!
//! ## Architecture
//!
//! The crate is organized into several key modules:
//!
//! - **`serial`**: the self-describing binary object serialization framework
//!   (type registry, encoder, decoder, constant pool)
//! - **`buffer`**: binary buffer management with Writer/Reader
//! - **`guard`**: guarded (in-memory protected) secret values and their
//!   wire obfuscation
//! - **`pool`**: the bounded blocking object pool and the keyed connector
//!   pool manager
//! - **`api`**: connector identities, configuration values and the
//!   collaborator traits a connector implementation provides
//! - **`remote`**: the remote invocation client, the connection server and
//!   the streamed-result flow-control protocol
//! - **`types`**: wire constants and frame tags
//! - **`error`**: error handling and result types
//!
//! ## Key Concepts
//!
//! ### Serial types
//!
//! Every value crossing the wire (or being deep-cloned in-process) has a
//! *stable type name*, a language-neutral string resolved through the
//! [`serial::SerialRegistry`]. The registry is a closed, immutable table
//! built once at startup; there is no reflection anywhere.
//!
//! ### Streamed results
//!
//! Search and sync operations produce many results. The remote protocol
//! streams them one message at a time and inserts a pause checkpoint every
//! [`types::PAUSE_INTERVAL`] items, blocking the producer until the
//! consumer acknowledges. This bounds how far a fast server can run ahead
//! of a slow client.
//!
//! ## Usage
//!
//! This crate is typically used through the higher-level `trestle` crate,
//! which re-exports the public API under one roof.

pub mod api;
pub mod buffer;
pub mod error;
pub mod guard;
pub mod pool;
pub mod remote;
pub mod serial;
pub mod types;

pub use error::Error;
