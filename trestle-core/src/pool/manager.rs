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

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use log::{info, warn};

use super::{ObjectPool, PoolConfig, ResourceHandler};
use crate::api::{
    ApiConfiguration, ConfigurationProperties, ConnectorFactory, ConnectorKey, PoolableConnector,
};
use crate::error::Error;
use crate::serial::{as_dyn, clone_object, downcast_into, fingerprint, SerialRegistry};

/// Identity of one pool: which connector, configured how, sized how.
///
/// Configurations are compared by value: two independently built
/// configurations with equal properties share a pool. The property set is
/// captured as its canonical encoded form, which both snapshots the values
/// (no aliasing with caller state) and makes them hashable.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectorPoolKey {
    connector: ConnectorKey,
    config_snapshot: Vec<u8>,
    policy: PoolConfig,
}

struct PooledConnectorHandler {
    factory: Arc<dyn ConnectorFactory>,
    // `ConfigurationProperties` carries `AnyObject` (`Box<dyn Any + Send>`),
    // which is not `Sync`; the pool that owns this handler is shared across
    // threads, so `ResourceHandler` must be `Send + Sync`. The properties are
    // only ever read, so a mutex suffices to bridge the `Sync` bound.
    properties: Mutex<ConfigurationProperties>,
}

impl ResourceHandler<dyn PoolableConnector> for PooledConnectorHandler {
    fn create(&self) -> Result<Arc<dyn PoolableConnector>, Error> {
        self.factory.create(&self.properties.lock().unwrap())
    }

    fn check(&self, resource: &dyn PoolableConnector) -> Result<(), Error> {
        resource.check_alive()
    }

    fn dispose(&self, resource: &dyn PoolableConnector) -> Result<(), Error> {
        resource.dispose()
    }
}

/// Process-wide cache of connector pools, one per distinct
/// (connector, configuration, policy) tuple.
///
/// Constructed lazily by its owner and torn down exactly once through
/// [`ConnectorPoolManager::dispose_all`]; there is no global static.
pub struct ConnectorPoolManager {
    registry: Arc<SerialRegistry>,
    pools: Mutex<HashMap<ConnectorPoolKey, Arc<ObjectPool<dyn PoolableConnector>>>>,
}

impl ConnectorPoolManager {
    pub fn new(registry: Arc<SerialRegistry>) -> ConnectorPoolManager {
        ConnectorPoolManager {
            registry,
            pools: Mutex::new(HashMap::new()),
        }
    }

    /// Looks up or creates the pool for a configuration.
    ///
    /// Returns `None` when the configuration says pooling is unsupported;
    /// the caller then creates and disposes a connector per call. Pool
    /// construction is cheap, so it happens under the cache lock.
    pub fn get_pool(
        &self,
        config: &ApiConfiguration,
        factory: &Arc<dyn ConnectorFactory>,
    ) -> Result<Option<Arc<ObjectPool<dyn PoolableConnector>>>, Error> {
        if !config.pooling_supported {
            return Ok(None);
        }
        let key = ConnectorPoolKey {
            connector: config.connector.clone(),
            config_snapshot: self.snapshot(&config.properties)?,
            policy: config.pool_config.clone(),
        };
        let mut pools = self.pools.lock().unwrap();
        if let Some(pool) = pools.get(&key) {
            return Ok(Some(pool.clone()));
        }
        let properties = self.clone_properties(&config.properties)?;
        let handler = PooledConnectorHandler {
            factory: factory.clone(),
            properties: Mutex::new(properties),
        };
        let pool: Arc<ObjectPool<dyn PoolableConnector>> =
            Arc::new(ObjectPool::new(Box::new(handler), config.pool_config.clone())?);
        info!(
            "created connector pool for {}/{}",
            config.connector.bundle_name, config.connector.connector_name
        );
        pools.insert(key, pool.clone());
        Ok(Some(pool))
    }

    /// Shuts down every cached pool and clears the cache. Intended to run
    /// once at process shutdown; a failing pool never blocks the rest.
    pub fn dispose_all(&self) {
        let drained: Vec<_> = {
            let mut pools = self.pools.lock().unwrap();
            pools.drain().collect()
        };
        for (key, pool) in drained {
            pool.shutdown();
            if pool.active_count() > 0 {
                warn!(
                    "pool for {:?} shut down with {} objects still borrowed",
                    key.connector.connector_name,
                    pool.active_count()
                );
            }
        }
    }

    pub fn pool_count(&self) -> usize {
        self.pools.lock().unwrap().len()
    }

    /// Canonical, value-based key material for a property set. Guarded
    /// values fingerprint by cleartext digest, so two configurations with
    /// equal secrets share a pool even though their wire encodings differ.
    fn snapshot(&self, properties: &ConfigurationProperties) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        for property in &properties.properties {
            out.extend_from_slice(property.name.as_bytes());
            out.push(0);
            out.push(u8::from(property.confidential));
            fingerprint(as_dyn(&property.value), &mut out)?;
        }
        Ok(out)
    }

    fn clone_properties(
        &self,
        properties: &ConfigurationProperties,
    ) -> Result<ConfigurationProperties, Error> {
        let cloned = clone_object(&self.registry, Some(properties as &dyn Any))?;
        match cloned {
            Some(obj) => downcast_into(obj),
            None => Err(Error::invalid_state("configuration clone produced null")),
        }
    }
}
