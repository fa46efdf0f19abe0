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

//! # Trestle
//!
//! Trestle is an identity-connector framework: connectors adapt external
//! identity and user stores behind one uniform operation API
//! (create/update/delete/search/sync/authenticate/schema), and the runtime
//! takes care of configuration, instance pooling and remote invocation.
//!
//! ## Key Pieces
//!
//! - **Binary object serialization**: a self-describing, length-prefixed
//!   format with a per-object string constant pool, used both for wire
//!   traffic and for deep-cloning configurations in-process
//! - **Object pooling**: connector instances are expensive; a bounded
//!   blocking pool with health checks and idle eviction manages them
//! - **Remote invocation**: a call either runs against an in-process
//!   connector or travels to a connector-hosting server, with streamed,
//!   flow-controlled results for search and sync
//!
//! ## Serializing a value
//!
//! ```rust
//! use std::sync::Arc;
//! use trestle::{default_registry, downcast_into, ObjectDecoder, ObjectEncoder};
//!
//! # fn main() -> Result<(), trestle::Error> {
//! let registry = Arc::new(default_registry()?);
//! let mut encoder = ObjectEncoder::new(registry.clone());
//! let bytes = encoder.encode(Some(&42i32))?;
//!
//! let mut decoder = ObjectDecoder::new(registry);
//! let value = decoder.decode(&bytes)?.expect("non-null");
//! assert_eq!(downcast_into::<i32>(value)?, 42);
//! # Ok(())
//! # }
//! ```
//!
//! ## Talking to a connector server
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use trestle::{
//!     default_registry, GuardedString, Locale, RemoteConnectionInfo, RemoteInvoker,
//! };
//!
//! # fn main() -> Result<(), trestle::Error> {
//! let registry = Arc::new(default_registry()?);
//! let invoker = RemoteInvoker::new(
//!     registry,
//!     RemoteConnectionInfo {
//!         host: "connector-host.example".to_string(),
//!         port: 8759,
//!         key: GuardedString::new("framework key".to_string()),
//!         connect_timeout: Duration::from_secs(10),
//!         locale: Locale::default(),
//!     },
//! );
//! let catalog = invoker.hello()?;
//! for info in &catalog.connector_infos {
//!     println!("available: {}", info.display_name);
//! }
//! # Ok(())
//! # }
//! ```

pub use trestle_core::api::{
    ApiConfiguration, AttributeData, ConfigurationProperties, ConfigurationProperty, Connector,
    ConnectorCatalog, ConnectorFactory, ConnectorInfoData, ConnectorKey, ConnectorObjectData,
    Operation, PoolableConnector, SyncDeltaData, Uid,
};
pub use trestle_core::error::{Error, RemoteError};
pub use trestle_core::guard::{GuardedBytes, GuardedString};
pub use trestle_core::pool::{
    ConnectorPoolManager, ObjectPool, PoolConfig, ResourceHandler,
};
pub use trestle_core::remote::message::{
    EchoMessage, HelloRequest, HelloResponse, Locale, OperationRequest,
    OperationRequestMoreData, OperationRequestStopData, OperationResponseEnd,
    OperationResponsePart, OperationResponsePause,
};
pub use trestle_core::remote::{
    ConnectionServer, ConnectionState, ConnectionStateTable, InvokeArg, OperationExecutor,
    RemoteConnectionInfo, RemoteInvoker, ResultSink, ResultsHandler, ServerConfig,
};
pub use trestle_core::serial::{
    any_eq, as_dyn, clone_object, default_registry, downcast_into, fingerprint, opt_eq, AnyList,
    AnyMap, AnyObject, AnySet, FieldReader, FieldWriter, ObjectArray, ObjectDecoder,
    ObjectEncoder, SerialRegistry, TypeName,
};
pub use trestle_core::types::{PAUSE_INTERVAL, STREAM_MAGIC, STREAM_VERSION};
