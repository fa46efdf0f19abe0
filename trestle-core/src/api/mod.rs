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

//! Connector identities, configuration values and operation payloads.
//!
//! These are the framework-facing data types: what a connector is called,
//! how it is configured, and what its operations consume and produce.
//! Schema modeling stays with connector implementations; the framework
//! only carries objects as class name plus attribute values.

mod connector;

pub use connector::{Connector, ConnectorCatalog, ConnectorFactory, PoolableConnector};

use std::any::Any;

use crate::error::Error;
use crate::pool::PoolConfig;
use crate::serial::{
    as_dyn, required_into, AnyObject, FieldReader, FieldWriter, SerialRegistry,
};

/// Stable identity of a connector implementation inside its bundle.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectorKey {
    pub bundle_name: String,
    pub bundle_version: String,
    pub connector_name: String,
}

/// One configuration value of a connector.
///
/// Confidential properties carry guarded values; the flag travels with the
/// property so a remote peer can render it appropriately.
pub struct ConfigurationProperty {
    pub name: String,
    pub value: Option<AnyObject>,
    pub confidential: bool,
}

/// The full configuration property set of one connector instance.
#[derive(Default)]
pub struct ConfigurationProperties {
    pub properties: Vec<ConfigurationProperty>,
}

/// Everything needed to call into a connector: its identity, its
/// configuration and the pooling policy to apply.
pub struct ApiConfiguration {
    pub connector: ConnectorKey,
    pub properties: ConfigurationProperties,
    pub pooling_supported: bool,
    pub pool_config: PoolConfig,
}

/// The uniform operation set every connector is addressed through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
    Search,
    Sync,
    Authenticate,
    Schema,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::Create => "Create",
            Operation::Update => "Update",
            Operation::Delete => "Delete",
            Operation::Search => "Search",
            Operation::Sync => "Sync",
            Operation::Authenticate => "Authenticate",
            Operation::Schema => "Schema",
        }
    }

    pub fn parse(s: &str) -> Result<Operation, Error> {
        match s {
            "Create" => Ok(Operation::Create),
            "Update" => Ok(Operation::Update),
            "Delete" => Ok(Operation::Delete),
            "Search" => Ok(Operation::Search),
            "Sync" => Ok(Operation::Sync),
            "Authenticate" => Ok(Operation::Authenticate),
            "Schema" => Ok(Operation::Schema),
            other => Err(Error::invalid_data(format!("unknown operation {other:?}"))),
        }
    }

    /// Streaming operations deliver results through a results handler and
    /// use the pause/continue flow-control protocol on the wire.
    pub fn is_streaming(&self) -> bool {
        matches!(self, Operation::Search | Operation::Sync)
    }
}

/// Unique identifier of an object inside its target store.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Uid {
    pub value: String,
    pub revision: Option<String>,
}

/// A named attribute and its values.
pub struct AttributeData {
    pub name: String,
    pub values: Vec<Option<AnyObject>>,
}

/// An object read from or written to a target store: its class name plus
/// attribute values.
pub struct ConnectorObjectData {
    pub object_class: String,
    pub attributes: Vec<AttributeData>,
}

/// One change delivered by a sync operation.
pub struct SyncDeltaData {
    pub token: Option<AnyObject>,
    pub delta_type: String,
    pub object: Option<ConnectorObjectData>,
}

/// Catalog entry describing one available connector, exchanged in the
/// hello handshake.
pub struct ConnectorInfoData {
    pub key: ConnectorKey,
    pub display_name: String,
    pub default_properties: ConfigurationProperties,
}

fn write_connector_key(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let key = crate::serial::expect_ref::<ConnectorKey>(value)?;
    w.write_string("bundleName", &key.bundle_name);
    w.write_string("bundleVersion", &key.bundle_version);
    w.write_string("connectorName", &key.connector_name);
    Ok(())
}

fn read_connector_key(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(ConnectorKey {
        bundle_name: r.read_string("bundleName", "")?,
        bundle_version: r.read_string("bundleVersion", "")?,
        connector_name: r.read_string("connectorName", "")?,
    }))
}

fn write_configuration_property(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let property = crate::serial::expect_ref::<ConfigurationProperty>(value)?;
    w.write_string("name", &property.name);
    w.write_bool("confidential", property.confidential);
    w.write_object("value", as_dyn(&property.value))
}

fn read_configuration_property(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(ConfigurationProperty {
        name: r.read_string("name", "")?,
        confidential: r.read_bool("confidential", false)?,
        value: r.read_object("value")?,
    }))
}

fn write_configuration_properties(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let set = crate::serial::expect_ref::<ConfigurationProperties>(value)?;
    for property in &set.properties {
        w.write_anonymous_object(Some(property as &dyn Any))?;
    }
    Ok(())
}

fn read_configuration_properties(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let mut properties = Vec::with_capacity(r.anonymous_count());
    for i in 0..r.anonymous_count() {
        properties.push(required_into::<ConfigurationProperty>(
            r.read_anonymous(i)?,
            "configuration property",
        )?);
    }
    Ok(Box::new(ConfigurationProperties { properties }))
}

fn write_pool_config(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let config = crate::serial::expect_ref::<PoolConfig>(value)?;
    w.write_int("maxObjects", config.max_objects as i32);
    w.write_int("maxIdle", config.max_idle as i32);
    w.write_int("minIdle", config.min_idle as i32);
    w.write_long("maxWaitMillis", config.max_wait.as_millis() as i64);
    w.write_long(
        "minEvictableIdleMillis",
        config.min_evictable_idle_time.as_millis() as i64,
    );
    Ok(())
}

fn read_pool_config(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let defaults = PoolConfig::default();
    Ok(Box::new(PoolConfig {
        max_objects: r.read_int("maxObjects", defaults.max_objects as i32)? as usize,
        max_idle: r.read_int("maxIdle", defaults.max_idle as i32)? as usize,
        min_idle: r.read_int("minIdle", defaults.min_idle as i32)? as usize,
        max_wait: std::time::Duration::from_millis(
            r.read_long("maxWaitMillis", defaults.max_wait.as_millis() as i64)? as u64,
        ),
        min_evictable_idle_time: std::time::Duration::from_millis(r.read_long(
            "minEvictableIdleMillis",
            defaults.min_evictable_idle_time.as_millis() as i64,
        )? as u64),
    }))
}

fn write_api_configuration(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let config = crate::serial::expect_ref::<ApiConfiguration>(value)?;
    w.write_object("connectorKey", Some(&config.connector as &dyn Any))?;
    w.write_object("properties", Some(&config.properties as &dyn Any))?;
    w.write_bool("poolingSupported", config.pooling_supported);
    w.write_object("poolConfiguration", Some(&config.pool_config as &dyn Any))
}

fn read_api_configuration(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let pool_config = match r.read_object("poolConfiguration")? {
        Some(obj) => crate::serial::downcast_into(obj)?,
        None => PoolConfig::default(),
    };
    Ok(Box::new(ApiConfiguration {
        connector: required_into(r.read_object("connectorKey")?, "connector key")?,
        properties: required_into(r.read_object("properties")?, "configuration properties")?,
        pooling_supported: r.read_bool("poolingSupported", false)?,
        pool_config,
    }))
}

fn write_uid(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let uid = crate::serial::expect_ref::<Uid>(value)?;
    w.write_string("value", &uid.value);
    if let Some(revision) = &uid.revision {
        w.write_string("revision", revision);
    }
    Ok(())
}

fn read_uid(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(Uid {
        value: r.read_string("value", "")?,
        revision: r.read_opt_string("revision")?,
    }))
}

fn write_attribute(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let attribute = crate::serial::expect_ref::<AttributeData>(value)?;
    w.write_string("name", &attribute.name);
    for value in &attribute.values {
        w.write_anonymous_object(as_dyn(value))?;
    }
    Ok(())
}

fn read_attribute(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let mut values = Vec::with_capacity(r.anonymous_count());
    for i in 0..r.anonymous_count() {
        values.push(r.read_anonymous(i)?);
    }
    Ok(Box::new(AttributeData {
        name: r.read_string("name", "")?,
        values,
    }))
}

fn write_connector_object(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let object = crate::serial::expect_ref::<ConnectorObjectData>(value)?;
    w.write_string("objectClass", &object.object_class);
    for attribute in &object.attributes {
        w.write_anonymous_object(Some(attribute as &dyn Any))?;
    }
    Ok(())
}

fn read_connector_object(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let mut attributes = Vec::with_capacity(r.anonymous_count());
    for i in 0..r.anonymous_count() {
        attributes.push(required_into::<AttributeData>(
            r.read_anonymous(i)?,
            "attribute",
        )?);
    }
    Ok(Box::new(ConnectorObjectData {
        object_class: r.read_string("objectClass", "")?,
        attributes,
    }))
}

fn write_sync_delta(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let delta = crate::serial::expect_ref::<SyncDeltaData>(value)?;
    w.write_string("deltaType", &delta.delta_type);
    w.write_object("token", as_dyn(&delta.token))?;
    let object = delta.object.as_ref().map(|o| o as &dyn Any);
    w.write_object("object", object)
}

fn read_sync_delta(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let object = match r.read_object("object")? {
        Some(obj) => Some(crate::serial::downcast_into::<ConnectorObjectData>(obj)?),
        None => None,
    };
    Ok(Box::new(SyncDeltaData {
        token: r.read_object("token")?,
        delta_type: r.read_string("deltaType", "")?,
        object,
    }))
}

fn write_connector_info(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let info = crate::serial::expect_ref::<ConnectorInfoData>(value)?;
    w.write_object("key", Some(&info.key as &dyn Any))?;
    w.write_string("displayName", &info.display_name);
    w.write_object("properties", Some(&info.default_properties as &dyn Any))
}

fn read_connector_info(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(ConnectorInfoData {
        key: required_into(r.read_object("key")?, "connector key")?,
        display_name: r.read_string("displayName", "")?,
        default_properties: required_into(
            r.read_object("properties")?,
            "configuration properties",
        )?,
    }))
}

pub(crate) fn register_serial_types(registry: &mut SerialRegistry) -> Result<(), Error> {
    registry.register::<ConnectorKey>("ConnectorKey", write_connector_key, read_connector_key)?;
    registry.register::<ConfigurationProperty>(
        "ConfigurationProperty",
        write_configuration_property,
        read_configuration_property,
    )?;
    registry.register::<ConfigurationProperties>(
        "ConfigurationProperties",
        write_configuration_properties,
        read_configuration_properties,
    )?;
    registry.register::<PoolConfig>("ObjectPoolConfiguration", write_pool_config, read_pool_config)?;
    registry.register::<ApiConfiguration>(
        "ApiConfiguration",
        write_api_configuration,
        read_api_configuration,
    )?;
    registry.register::<Uid>("Uid", write_uid, read_uid)?;
    registry.register::<AttributeData>("Attribute", write_attribute, read_attribute)?;
    registry.register::<ConnectorObjectData>(
        "ConnectorObject",
        write_connector_object,
        read_connector_object,
    )?;
    registry.register::<SyncDeltaData>("SyncDelta", write_sync_delta, read_sync_delta)?;
    registry.register::<ConnectorInfoData>(
        "ConnectorInfo",
        write_connector_info,
        read_connector_info,
    )?;
    Ok(())
}
