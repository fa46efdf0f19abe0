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

//! Constant-pool behavior: deterministic code assignment, per-object pool
//! scope, and the once-per-stream header.

use std::any::Any;
use std::sync::Arc;

use trestle::{
    default_registry, downcast_into, AnyObject, AttributeData, ConnectorObjectData,
    ObjectDecoder, ObjectEncoder, SerialRegistry, STREAM_MAGIC,
};

fn registry() -> Arc<SerialRegistry> {
    Arc::new(default_registry().unwrap())
}

fn sample_object() -> ConnectorObjectData {
    ConnectorObjectData {
        object_class: "account".to_string(),
        attributes: vec![
            AttributeData {
                name: "first".to_string(),
                values: vec![Some(Box::new("a".to_string()) as AnyObject)],
            },
            AttributeData {
                name: "second".to_string(),
                values: vec![Some(Box::new("b".to_string()) as AnyObject)],
            },
            AttributeData {
                name: "third".to_string(),
                values: vec![Some(Box::new(3i32) as AnyObject)],
            },
        ],
    }
}

#[test]
fn test_encoding_is_deterministic() {
    let first = ObjectEncoder::new(registry())
        .encode(Some(&sample_object()))
        .unwrap();
    let second = ObjectEncoder::new(registry())
        .encode(Some(&sample_object()))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_repeated_names_are_interned_once() {
    // two attributes of the same name must not enlarge the pool table, so
    // the doubled object costs less than two singles
    let single = ConnectorObjectData {
        object_class: "account".to_string(),
        attributes: vec![AttributeData {
            name: "member".to_string(),
            values: vec![Some(Box::new("x".to_string()) as AnyObject)],
        }],
    };
    let double = ConnectorObjectData {
        object_class: "account".to_string(),
        attributes: vec![
            AttributeData {
                name: "member".to_string(),
                values: vec![Some(Box::new("x".to_string()) as AnyObject)],
            },
            AttributeData {
                name: "member".to_string(),
                values: vec![Some(Box::new("x".to_string()) as AnyObject)],
            },
        ],
    };
    let single_bytes = ObjectEncoder::new(registry()).encode(Some(&single)).unwrap();
    let double_bytes = ObjectEncoder::new(registry()).encode(Some(&double)).unwrap();
    let attribute_cost = single_bytes.len() * 2 - double_bytes.len();
    assert!(
        attribute_cost > 0,
        "second identical attribute must reuse interned names"
    );
}

#[test]
fn test_header_written_once_per_stream() {
    let registry = registry();
    let mut encoder = ObjectEncoder::new(registry.clone());
    let mut stream = Vec::new();
    encoder.write_object(&mut stream, Some(&1i32)).unwrap();
    let after_first = stream.len();
    encoder.write_object(&mut stream, Some(&2i32)).unwrap();
    let second_len = stream.len() - after_first;

    assert_eq!(&stream[0..4], &STREAM_MAGIC.to_be_bytes());
    // the second object must not repeat the 8-byte header
    assert_eq!(second_len, after_first - 8);

    let mut decoder = ObjectDecoder::new(registry);
    let mut input: &[u8] = &stream;
    let first = decoder.read_object(&mut input).unwrap().unwrap();
    let second = decoder.read_object(&mut input).unwrap().unwrap();
    assert_eq!(downcast_into::<i32>(first).unwrap(), 1);
    assert_eq!(downcast_into::<i32>(second).unwrap(), 2);
    assert!(input.is_empty());
}

#[test]
fn test_pool_resets_between_top_level_objects() {
    // the same object twice through one encoder: the second copy must
    // re-flush its pool table (same bytes as the first, header aside)
    let registry = registry();
    let mut encoder = ObjectEncoder::new(registry.clone());
    let mut stream = Vec::new();
    encoder.write_object(&mut stream, Some(&sample_object())).unwrap();
    let first_end = stream.len();
    encoder.write_object(&mut stream, Some(&sample_object())).unwrap();

    assert_eq!(&stream[8..first_end], &stream[first_end..]);

    let mut decoder = ObjectDecoder::new(registry);
    let mut input: &[u8] = &stream;
    for _ in 0..2 {
        let decoded = decoder.read_object(&mut input).unwrap().unwrap();
        let object = downcast_into::<ConnectorObjectData>(decoded).unwrap();
        assert_eq!(object.attributes.len(), 3);
    }
}

#[test]
fn test_clone_shares_no_state_with_source() {
    let registry = registry();
    let source = sample_object();
    let cloned = trestle::clone_object(&registry, Some(&source as &dyn Any))
        .unwrap()
        .unwrap();
    drop(source);
    let cloned = downcast_into::<ConnectorObjectData>(cloned).unwrap();
    assert_eq!(cloned.object_class, "account");
    assert_eq!(cloned.attributes.len(), 3);
}
