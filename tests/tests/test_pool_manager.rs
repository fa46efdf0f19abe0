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

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use trestle::{
    default_registry, AnyObject, ApiConfiguration, ConfigurationProperties,
    ConfigurationProperty, Connector, ConnectorFactory, ConnectorKey, ConnectorPoolManager,
    Error, PoolConfig, PoolableConnector,
};

struct StubConnector;

impl Connector for StubConnector {
    fn dispose(&self) -> Result<(), Error> {
        Ok(())
    }
}

impl PoolableConnector for StubConnector {
    fn check_alive(&self) -> Result<(), Error> {
        Ok(())
    }
}

#[derive(Default)]
struct CountingFactory {
    created: AtomicUsize,
}

impl ConnectorFactory for CountingFactory {
    fn create(
        &self,
        _properties: &ConfigurationProperties,
    ) -> Result<Arc<dyn PoolableConnector>, Error> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(StubConnector))
    }
}

fn key() -> ConnectorKey {
    ConnectorKey {
        bundle_name: "com.example.demo".to_string(),
        bundle_version: "1.0".to_string(),
        connector_name: "DemoConnector".to_string(),
    }
}

fn properties(host: &str) -> ConfigurationProperties {
    ConfigurationProperties {
        properties: vec![ConfigurationProperty {
            name: "host".to_string(),
            value: Some(Box::new(host.to_string()) as AnyObject),
            confidential: false,
        }],
    }
}

fn configuration(host: &str, pooling: bool) -> ApiConfiguration {
    ApiConfiguration {
        connector: key(),
        properties: properties(host),
        pooling_supported: pooling,
        pool_config: PoolConfig {
            max_objects: 2,
            max_idle: 2,
            min_idle: 0,
            max_wait: Duration::from_millis(100),
            min_evictable_idle_time: Duration::from_secs(3600),
        },
    }
}

#[test]
fn test_pooling_unsupported_yields_no_pool() {
    let manager = ConnectorPoolManager::new(Arc::new(default_registry().unwrap()));
    let factory: Arc<dyn ConnectorFactory> = Arc::new(CountingFactory::default());
    let pool = manager
        .get_pool(&configuration("a.example", false), &factory)
        .unwrap();
    assert!(pool.is_none());
    assert_eq!(manager.pool_count(), 0);
}

#[test]
fn test_equal_configurations_share_a_pool() {
    let manager = ConnectorPoolManager::new(Arc::new(default_registry().unwrap()));
    let factory: Arc<dyn ConnectorFactory> = Arc::new(CountingFactory::default());

    let first = manager
        .get_pool(&configuration("a.example", true), &factory)
        .unwrap()
        .unwrap();
    // an independently built but equal configuration maps to the same pool
    let second = manager
        .get_pool(&configuration("a.example", true), &factory)
        .unwrap()
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(manager.pool_count(), 1);
}

#[test]
fn test_distinct_configurations_get_distinct_pools() {
    let manager = ConnectorPoolManager::new(Arc::new(default_registry().unwrap()));
    let factory: Arc<dyn ConnectorFactory> = Arc::new(CountingFactory::default());

    let first = manager
        .get_pool(&configuration("a.example", true), &factory)
        .unwrap()
        .unwrap();
    let second = manager
        .get_pool(&configuration("b.example", true), &factory)
        .unwrap()
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &second));
    assert_eq!(manager.pool_count(), 2);
}

#[test]
fn test_pool_lends_connectors() {
    let manager = ConnectorPoolManager::new(Arc::new(default_registry().unwrap()));
    let counting = Arc::new(CountingFactory::default());
    let factory: Arc<dyn ConnectorFactory> = counting.clone();

    let pool = manager
        .get_pool(&configuration("a.example", true), &factory)
        .unwrap()
        .unwrap();
    let connector = pool.borrow().unwrap();
    connector.check_alive().unwrap();
    pool.return_object(&connector).unwrap();

    // the returned connector is reused on the next borrow
    let again = pool.borrow().unwrap();
    pool.return_object(&again).unwrap();
    assert_eq!(counting.created.load(Ordering::SeqCst), 1);
}

#[test]
fn test_guarded_secrets_do_not_break_pool_sharing() {
    // guarded values encrypt with a fresh nonce per encoding, so pool keys
    // must compare them by value, not by wire bytes
    let manager = ConnectorPoolManager::new(Arc::new(default_registry().unwrap()));
    let factory: Arc<dyn ConnectorFactory> = Arc::new(CountingFactory::default());

    let with_secret = |password: &str| {
        let mut config = configuration("a.example", true);
        config.properties.properties.push(ConfigurationProperty {
            name: "password".to_string(),
            value: Some(Box::new(trestle::GuardedString::new(password.to_string()))
                as AnyObject),
            confidential: true,
        });
        config
    };

    let first = manager
        .get_pool(&with_secret("sesame"), &factory)
        .unwrap()
        .unwrap();
    let second = manager
        .get_pool(&with_secret("sesame"), &factory)
        .unwrap()
        .unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let third = manager
        .get_pool(&with_secret("different"), &factory)
        .unwrap()
        .unwrap();
    assert!(!Arc::ptr_eq(&first, &third));
}

#[test]
fn test_dispose_all_shuts_pools_down() {
    let manager = ConnectorPoolManager::new(Arc::new(default_registry().unwrap()));
    let factory: Arc<dyn ConnectorFactory> = Arc::new(CountingFactory::default());

    let pool = manager
        .get_pool(&configuration("a.example", true), &factory)
        .unwrap()
        .unwrap();
    manager.dispose_all();
    assert_eq!(manager.pool_count(), 0);
    let err = pool.borrow().unwrap_err();
    assert!(err.is("PoolShutdown"), "got {err:?}");
}
