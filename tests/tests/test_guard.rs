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

//! Guarded values: wire obfuscation, redaction and codec round-trips.

use std::sync::Arc;

use trestle::{
    default_registry, downcast_into, GuardedBytes, GuardedString, ObjectDecoder, ObjectEncoder,
    SerialRegistry,
};

fn registry() -> Arc<SerialRegistry> {
    Arc::new(default_registry().unwrap())
}

#[test]
fn test_guarded_string_roundtrip() {
    let registry = registry();
    let secret = GuardedString::new("correct horse battery staple".to_string());
    let bytes = ObjectEncoder::new(registry.clone())
        .encode(Some(&secret))
        .unwrap();
    let decoded = ObjectDecoder::new(registry)
        .decode(&bytes)
        .unwrap()
        .expect("non-null");
    let decoded = downcast_into::<GuardedString>(decoded).unwrap();
    decoded.access(|clear| assert_eq!(clear, "correct horse battery staple"));
    assert_eq!(decoded, secret);
}

#[test]
fn test_guarded_bytes_roundtrip() {
    let registry = registry();
    let secret = GuardedBytes::new(vec![0u8, 1, 2, 3, 254, 255]);
    let bytes = ObjectEncoder::new(registry.clone())
        .encode(Some(&secret))
        .unwrap();
    let decoded = ObjectDecoder::new(registry)
        .decode(&bytes)
        .unwrap()
        .expect("non-null");
    let decoded = downcast_into::<GuardedBytes>(decoded).unwrap();
    decoded.access(|clear| assert_eq!(clear, &[0u8, 1, 2, 3, 254, 255]));
}

#[test]
fn test_empty_guarded_values() {
    let registry = registry();
    let secret = GuardedBytes::new(Vec::new());
    let bytes = ObjectEncoder::new(registry.clone())
        .encode(Some(&secret))
        .unwrap();
    let decoded = ObjectDecoder::new(registry)
        .decode(&bytes)
        .unwrap()
        .expect("non-null");
    downcast_into::<GuardedBytes>(decoded)
        .unwrap()
        .access(|clear| assert!(clear.is_empty()));
}

#[test]
fn test_cleartext_never_on_the_wire() {
    let registry = registry();
    let secret = GuardedString::new("super-secret-password".to_string());
    let bytes = ObjectEncoder::new(registry)
        .encode(Some(&secret))
        .unwrap();
    let needle = b"super-secret-password";
    let leaked = bytes
        .windows(needle.len())
        .any(|window| window == needle);
    assert!(!leaked, "guarded cleartext leaked into the encoded stream");
}

#[test]
fn test_obfuscation_is_randomized_per_encoding() {
    // a fresh nonce per encryption keeps equal secrets from producing
    // recognizable equal blobs
    let registry = registry();
    let secret = GuardedString::new("same secret".to_string());
    let first = ObjectEncoder::new(registry.clone())
        .encode(Some(&secret))
        .unwrap();
    let second = ObjectEncoder::new(registry)
        .encode(Some(&secret))
        .unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_debug_output_is_redacted() {
    let guarded_string = GuardedString::new("hunter2".to_string());
    let text = format!("{guarded_string:?}");
    assert!(!text.contains("hunter2"));

    let guarded_bytes = GuardedBytes::new(b"hunter2".to_vec());
    let text = format!("{guarded_bytes:?}");
    assert!(!text.contains("hunter2"));
}

#[test]
fn test_corrupted_wire_blob_fails_decode() {
    let registry = registry();
    let secret = GuardedString::new("secret".to_string());
    let mut bytes = ObjectEncoder::new(registry.clone())
        .encode(Some(&secret))
        .unwrap();
    // flip a bit near the end, inside the ciphertext payload
    let index = bytes.len() - 2;
    bytes[index] ^= 0x01;
    let err = ObjectDecoder::new(registry).decode(&bytes).unwrap_err();
    assert!(err.is("Guarded"), "got {err:?}");
}
