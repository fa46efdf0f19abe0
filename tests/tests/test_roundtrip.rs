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
use std::sync::Arc;

use trestle::{
    any_eq, clone_object, default_registry, downcast_into, opt_eq, AnyList, AnyMap, AnyObject,
    AnySet, AttributeData, ConfigurationProperties, ConfigurationProperty, ConnectorKey,
    ConnectorObjectData, GuardedString, ObjectArray, ObjectDecoder, ObjectEncoder,
    SerialRegistry, SyncDeltaData, TypeName, Uid,
};

fn registry() -> Arc<SerialRegistry> {
    Arc::new(default_registry().unwrap())
}

fn roundtrip(value: Option<&dyn Any>) -> Option<AnyObject> {
    let registry = registry();
    let mut encoder = ObjectEncoder::new(registry.clone());
    let bytes = encoder.encode(value).unwrap();
    let mut decoder = ObjectDecoder::new(registry);
    decoder.decode(&bytes).unwrap()
}

fn roundtrip_scalar<T: Any + PartialEq + std::fmt::Debug>(value: T) {
    let decoded = roundtrip(Some(&value)).expect("non-null");
    assert_eq!(downcast_into::<T>(decoded).unwrap(), value);
}

#[test]
fn test_null() {
    assert!(roundtrip(None).is_none());
}

#[test]
fn test_booleans() {
    roundtrip_scalar(true);
    roundtrip_scalar(false);
}

#[test]
fn test_integer_boundaries() {
    for value in [0i32, 1, -1, i32::MIN, i32::MAX] {
        roundtrip_scalar(value);
    }
}

#[test]
fn test_long_boundaries() {
    for value in [0i64, 1, -1, i64::MIN, i64::MAX] {
        roundtrip_scalar(value);
    }
}

#[test]
fn test_floats_promoted_to_double() {
    for value in [0.0f32, -0.0, 1.5, f32::MIN, f32::MAX, f32::INFINITY] {
        let decoded = roundtrip(Some(&value)).expect("non-null");
        let narrowed = downcast_into::<f32>(decoded).unwrap();
        assert_eq!(narrowed.to_bits(), value.to_bits());
    }
    let nan = roundtrip(Some(&f32::NAN)).expect("non-null");
    assert!(downcast_into::<f32>(nan).unwrap().is_nan());
}

#[test]
fn test_doubles() {
    for value in [0.0f64, -2.75, f64::MIN, f64::MAX, f64::EPSILON] {
        roundtrip_scalar(value);
    }
}

#[test]
fn test_strings() {
    roundtrip_scalar(String::new());
    roundtrip_scalar("hello".to_string());
    roundtrip_scalar("úñîçø∂é ﬆrings ☂".to_string());
}

#[test]
fn test_byte_arrays() {
    roundtrip_scalar(Vec::<u8>::new());
    roundtrip_scalar(vec![0u8, 1, 2, 255, 128]);
    roundtrip_scalar(vec![7u8; 4096]);
}

#[test]
fn test_type_name() {
    roundtrip_scalar(TypeName("ConnectorObject".to_string()));
}

#[test]
fn test_empty_containers() {
    let decoded = roundtrip(Some(&AnyList(Vec::new()))).expect("non-null");
    assert!(downcast_into::<AnyList>(decoded).unwrap().0.is_empty());

    let decoded = roundtrip(Some(&AnySet(Vec::new()))).expect("non-null");
    assert!(downcast_into::<AnySet>(decoded).unwrap().0.is_empty());

    let decoded = roundtrip(Some(&AnyMap(Vec::new()))).expect("non-null");
    assert!(downcast_into::<AnyMap>(decoded).unwrap().0.is_empty());
}

#[test]
fn test_mixed_list_with_null_element() {
    let list = AnyList(vec![
        Some(Box::new(7i32) as AnyObject),
        None,
        Some(Box::new("seven".to_string()) as AnyObject),
        Some(Box::new(vec![1u8, 2, 3]) as AnyObject),
    ]);
    let decoded = roundtrip(Some(&list)).expect("non-null");
    assert!(any_eq(&list, &*decoded));
}

#[test]
fn test_deeply_nested_containers() {
    let inner = AnyList(vec![Some(Box::new(1i32) as AnyObject), None]);
    let middle = AnyList(vec![Some(Box::new(inner) as AnyObject)]);
    let outer = AnyMap(vec![(
        Some(Box::new("depths".to_string()) as AnyObject),
        Some(Box::new(middle) as AnyObject),
    )]);
    let decoded = roundtrip(Some(&outer)).expect("non-null");
    assert!(any_eq(&outer, &*decoded));
}

#[test]
fn test_object_array() {
    let array = ObjectArray {
        element_type: "String".to_string(),
        elements: vec![
            Some(Box::new("a".to_string()) as AnyObject),
            None,
            Some(Box::new("c".to_string()) as AnyObject),
        ],
    };
    let decoded = roundtrip(Some(&array)).expect("non-null");
    assert!(any_eq(&array, &*decoded));
}

#[test]
fn test_connector_key() {
    let key = ConnectorKey {
        bundle_name: "com.example.ldap".to_string(),
        bundle_version: "2.1.0".to_string(),
        connector_name: "LdapConnector".to_string(),
    };
    let decoded = roundtrip(Some(&key)).expect("non-null");
    assert_eq!(downcast_into::<ConnectorKey>(decoded).unwrap(), key);
}

#[test]
fn test_uid_with_and_without_revision() {
    let plain = Uid {
        value: "42".to_string(),
        revision: None,
    };
    let decoded = roundtrip(Some(&plain)).expect("non-null");
    assert_eq!(downcast_into::<Uid>(decoded).unwrap(), plain);

    let revised = Uid {
        value: "42".to_string(),
        revision: Some("7".to_string()),
    };
    let decoded = roundtrip(Some(&revised)).expect("non-null");
    assert_eq!(downcast_into::<Uid>(decoded).unwrap(), revised);
}

#[test]
fn test_connector_object() {
    let object = ConnectorObjectData {
        object_class: "account".to_string(),
        attributes: vec![
            AttributeData {
                name: "uid".to_string(),
                values: vec![Some(Box::new("jdoe".to_string()) as AnyObject)],
            },
            AttributeData {
                name: "groups".to_string(),
                values: vec![
                    Some(Box::new("admins".to_string()) as AnyObject),
                    Some(Box::new("users".to_string()) as AnyObject),
                ],
            },
            AttributeData {
                name: "disabled".to_string(),
                values: vec![None],
            },
        ],
    };
    let decoded = roundtrip(Some(&object)).expect("non-null");
    let decoded = downcast_into::<ConnectorObjectData>(decoded).unwrap();
    assert_eq!(decoded.object_class, "account");
    assert_eq!(decoded.attributes.len(), 3);
    assert_eq!(decoded.attributes[0].name, "uid");
    assert!(opt_eq(
        &decoded.attributes[0].values[0],
        &Some(Box::new("jdoe".to_string()) as AnyObject)
    ));
    assert_eq!(decoded.attributes[1].values.len(), 2);
    assert!(decoded.attributes[2].values[0].is_none());
}

#[test]
fn test_sync_delta() {
    let delta = SyncDeltaData {
        token: Some(Box::new(99i64) as AnyObject),
        delta_type: "CREATE_OR_UPDATE".to_string(),
        object: Some(ConnectorObjectData {
            object_class: "group".to_string(),
            attributes: Vec::new(),
        }),
    };
    let decoded = roundtrip(Some(&delta)).expect("non-null");
    let decoded = downcast_into::<SyncDeltaData>(decoded).unwrap();
    assert_eq!(decoded.delta_type, "CREATE_OR_UPDATE");
    assert!(opt_eq(&decoded.token, &Some(Box::new(99i64) as AnyObject)));
    assert_eq!(decoded.object.unwrap().object_class, "group");
}

#[test]
fn test_configuration_properties_with_guarded_value() {
    let properties = ConfigurationProperties {
        properties: vec![
            ConfigurationProperty {
                name: "host".to_string(),
                value: Some(Box::new("ldap.example.com".to_string()) as AnyObject),
                confidential: false,
            },
            ConfigurationProperty {
                name: "password".to_string(),
                value: Some(Box::new(GuardedString::new("s3cret".to_string())) as AnyObject),
                confidential: true,
            },
            ConfigurationProperty {
                name: "unset".to_string(),
                value: None,
                confidential: false,
            },
        ],
    };
    let decoded = roundtrip(Some(&properties)).expect("non-null");
    let decoded = downcast_into::<ConfigurationProperties>(decoded).unwrap();
    assert_eq!(decoded.properties.len(), 3);
    assert!(!decoded.properties[0].confidential);
    assert!(decoded.properties[1].confidential);
    let password = decoded.properties[1]
        .value
        .as_ref()
        .and_then(|v| v.downcast_ref::<GuardedString>())
        .expect("guarded password survives the trip");
    password.access(|clear| assert_eq!(clear, "s3cret"));
    assert!(decoded.properties[2].value.is_none());
}

#[test]
fn test_clone_object_is_deep() {
    let registry = registry();
    let original = ConnectorObjectData {
        object_class: "account".to_string(),
        attributes: vec![AttributeData {
            name: "cn".to_string(),
            values: vec![Some(Box::new("Jane Doe".to_string()) as AnyObject)],
        }],
    };
    let cloned = clone_object(&registry, Some(&original as &dyn Any))
        .unwrap()
        .expect("non-null");
    let cloned = downcast_into::<ConnectorObjectData>(cloned).unwrap();
    assert_eq!(cloned.object_class, original.object_class);
    assert_eq!(cloned.attributes[0].name, "cn");
}
