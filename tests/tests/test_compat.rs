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

//! Schema evolution: payloads written by one side of a version skew must
//! keep decoding on the other side.

use std::any::Any;
use std::sync::Arc;

use trestle::{
    AnyObject, Error, FieldReader, FieldWriter, ObjectDecoder, ObjectEncoder, SerialRegistry,
};

#[derive(Debug, PartialEq)]
struct WidgetV1 {
    count: i32,
}

#[derive(Debug, PartialEq)]
struct WidgetV2 {
    count: i32,
    label: String,
    ratio: f64,
}

fn write_v1(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let widget = value.downcast_ref::<WidgetV1>().unwrap();
    w.write_int("count", widget.count);
    Ok(())
}

fn read_v1(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(WidgetV1 {
        count: r.read_int("count", -1)?,
    }))
}

fn write_v2(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let widget = value.downcast_ref::<WidgetV2>().unwrap();
    w.write_int("count", widget.count);
    w.write_string("label", &widget.label);
    w.write_double("ratio", widget.ratio);
    Ok(())
}

fn read_v2(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(WidgetV2 {
        count: r.read_int("count", -1)?,
        label: r.read_string("label", "unlabeled")?,
        ratio: r.read_double("ratio", 2.5)?,
    }))
}

fn v1_registry() -> Arc<SerialRegistry> {
    let mut registry = SerialRegistry::new();
    registry.register::<WidgetV1>("Widget", write_v1, read_v1).unwrap();
    Arc::new(registry)
}

fn v2_registry() -> Arc<SerialRegistry> {
    let mut registry = SerialRegistry::new();
    registry.register::<WidgetV2>("Widget", write_v2, read_v2).unwrap();
    Arc::new(registry)
}

#[test]
fn test_unknown_fields_are_ignored() {
    // a V2 peer writes extra fields an old decoder has never heard of
    let mut encoder = ObjectEncoder::new(v2_registry());
    let bytes = encoder
        .encode(Some(&WidgetV2 {
            count: 12,
            label: "gadget".to_string(),
            ratio: 0.25,
        }))
        .unwrap();

    let mut decoder = ObjectDecoder::new(v1_registry());
    let decoded = decoder.decode(&bytes).unwrap().expect("non-null");
    let widget = decoded.downcast::<WidgetV1>().unwrap();
    assert_eq!(*widget, WidgetV1 { count: 12 });
}

#[test]
fn test_unknown_fields_decode_same_as_without_them() {
    let mut old_encoder = ObjectEncoder::new(v1_registry());
    let old_bytes = old_encoder.encode(Some(&WidgetV1 { count: 12 })).unwrap();

    let mut new_encoder = ObjectEncoder::new(v2_registry());
    let new_bytes = new_encoder
        .encode(Some(&WidgetV2 {
            count: 12,
            label: "extra".to_string(),
            ratio: 9.0,
        }))
        .unwrap();

    let mut decoder = ObjectDecoder::new(v1_registry());
    let from_old = decoder.decode(&old_bytes).unwrap().unwrap();
    let mut decoder = ObjectDecoder::new(v1_registry());
    let from_new = decoder.decode(&new_bytes).unwrap().unwrap();
    assert_eq!(
        from_old.downcast::<WidgetV1>().unwrap(),
        from_new.downcast::<WidgetV1>().unwrap()
    );
}

#[test]
fn test_missing_fields_yield_defaults() {
    // an old V1 payload decoded by a V2 peer fills in the defaults
    let mut encoder = ObjectEncoder::new(v1_registry());
    let bytes = encoder.encode(Some(&WidgetV1 { count: 3 })).unwrap();

    let mut decoder = ObjectDecoder::new(v2_registry());
    let decoded = decoder.decode(&bytes).unwrap().expect("non-null");
    let widget = decoded.downcast::<WidgetV2>().unwrap();
    assert_eq!(widget.count, 3);
    assert_eq!(widget.label, "unlabeled");
    assert_eq!(widget.ratio, 2.5);
}

#[test]
fn test_unknown_stable_name_is_fatal() {
    let mut encoder = ObjectEncoder::new(v1_registry());
    let bytes = encoder.encode(Some(&WidgetV1 { count: 1 })).unwrap();

    let mut decoder = ObjectDecoder::new(Arc::new(SerialRegistry::new()));
    let err = decoder.decode(&bytes).unwrap_err();
    assert!(err.is("UnknownType"), "got {err:?}");
}

#[test]
fn test_unregistered_runtime_type_is_fatal() {
    struct NeverRegistered;
    let mut encoder = ObjectEncoder::new(v1_registry());
    let err = encoder.encode(Some(&NeverRegistered)).unwrap_err();
    assert!(err.is("UnregisteredType"), "got {err:?}");
}

#[test]
fn test_duplicate_stable_name_is_fatal() {
    let mut registry = SerialRegistry::new();
    registry.register::<WidgetV1>("Widget", write_v1, read_v1).unwrap();
    let err = registry
        .register::<WidgetV2>("Widget", write_v2, read_v2)
        .unwrap_err();
    assert!(err.is("DuplicateType"), "got {err:?}");
}

#[test]
fn test_duplicate_runtime_type_is_fatal() {
    let mut registry = SerialRegistry::new();
    registry.register::<WidgetV1>("Widget", write_v1, read_v1).unwrap();
    let err = registry
        .register::<WidgetV1>("OtherWidget", write_v1, read_v1)
        .unwrap_err();
    assert!(err.is("DuplicateType"), "got {err:?}");
}

#[test]
fn test_bad_magic_is_fatal() {
    let mut encoder = ObjectEncoder::new(v1_registry());
    let mut bytes = encoder.encode(Some(&WidgetV1 { count: 1 })).unwrap();
    bytes[0] ^= 0xFF;

    let mut decoder = ObjectDecoder::new(v1_registry());
    let err = decoder.decode(&bytes).unwrap_err();
    assert!(err.is("BadMagic"), "got {err:?}");
}

#[test]
fn test_version_mismatch_is_fatal() {
    let mut encoder = ObjectEncoder::new(v1_registry());
    let mut bytes = encoder.encode(Some(&WidgetV1 { count: 1 })).unwrap();
    // bump the version field that follows the 4-byte magic
    bytes[4..8].copy_from_slice(&99u32.to_be_bytes());

    let mut decoder = ObjectDecoder::new(v1_registry());
    let err = decoder.decode(&bytes).unwrap_err();
    assert!(err.is("VersionMismatch"), "got {err:?}");
}

#[test]
fn test_truncated_stream_is_fatal() {
    let mut encoder = ObjectEncoder::new(v1_registry());
    let bytes = encoder.encode(Some(&WidgetV1 { count: 1 })).unwrap();

    for cut in [bytes.len() - 1, bytes.len() / 2, 9] {
        let mut decoder = ObjectDecoder::new(v1_registry());
        let err = decoder.decode(&bytes[..cut]).unwrap_err();
        assert!(err.is("TruncatedStream"), "cut at {cut}: got {err:?}");
    }
}
