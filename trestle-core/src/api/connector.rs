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

//! Collaborator traits a connector implementation plugs into the runtime.
//!
//! The framework never discovers connectors itself; a [`ConnectorCatalog`]
//! supplies identities, default configurations and factories, and the
//! framework drives instances through the create/check/dispose triple.

use std::sync::Arc;

use super::{ConfigurationProperties, ConnectorInfoData, ConnectorKey};
use crate::error::Error;

/// A live connector instance bound to one configuration.
pub trait Connector: Send + Sync {
    /// Releases any resources the instance holds. Called exactly once,
    /// after which the instance is never used again.
    fn dispose(&self) -> Result<(), Error>;
}

/// A connector safe to keep in a pool between operations.
pub trait PoolableConnector: Connector {
    /// Cheap liveness probe run on borrow, outside the pool lock.
    fn check_alive(&self) -> Result<(), Error>;
}

// The trait object is opaque, but callers handling `Result<Arc<dyn
// PoolableConnector>, _>` need `Debug` for `unwrap`/`unwrap_err` bounds. A
// placeholder keeps that available without forcing `Debug` on every
// implementor.
impl std::fmt::Debug for dyn PoolableConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("<PoolableConnector>")
    }
}

/// Creates configured connector instances.
pub trait ConnectorFactory: Send + Sync {
    fn create(
        &self,
        properties: &ConfigurationProperties,
    ) -> Result<Arc<dyn PoolableConnector>, Error>;
}

/// The discovery collaborator: what connectors exist and how to build them.
pub trait ConnectorCatalog: Send + Sync {
    /// Catalog entries advertised to remote clients in the hello exchange.
    fn connector_infos(&self) -> Vec<ConnectorInfoData>;

    /// Factory for one connector identity, if it exists.
    fn factory(&self, key: &ConnectorKey) -> Option<Arc<dyn ConnectorFactory>>;
}
