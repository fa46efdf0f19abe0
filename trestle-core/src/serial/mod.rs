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

//! The binary object serialization framework.
//!
//! Values move through the framework as `Box<dyn Any + Send>` (the
//! [`AnyObject`] alias). Each concrete type that may appear in a stream is
//! registered once in a [`SerialRegistry`] under a *stable type name*; the
//! encoder resolves a value's runtime type to its handler, the decoder
//! resolves the stable name read from the stream.
//!
//! Dynamic containers come as a small closed set of shapes — [`AnyList`],
//! [`AnySet`], [`AnyMap`] — whose elements recurse through the registry,
//! plus the structural [`ObjectArray`] form handled by the codec itself
//! rather than by a registered handler.

mod decode;
mod encode;
mod handlers;
mod registry;

pub use decode::{FieldReader, ObjectDecoder};
pub use encode::{FieldWriter, ObjectEncoder};
pub use handlers::default_registry;
pub(crate) use handlers::expect_ref;
pub use registry::{HandlerEntry, ReadFn, SerialRegistry, WriteFn};

use std::any::Any;
use std::sync::Arc;

use crate::error::Error;

/// The dynamic value currency of the serialization framework.
pub type AnyObject = Box<dyn Any + Send>;

/// A dynamically-typed list; stable name `"List"`. Elements may be null.
pub struct AnyList(pub Vec<Option<AnyObject>>);

/// A dynamically-typed set; stable name `"Set"`.
///
/// Dynamic values have no total order or hash, so the set is represented
/// by its elements in encounter order; deduplication is the producer's
/// responsibility.
pub struct AnySet(pub Vec<Option<AnyObject>>);

/// A dynamically-typed map; stable name `"Map"`.
///
/// Entries are insertion-ordered key/value pairs, which keeps encoding
/// deterministic for identical inputs.
pub struct AnyMap(pub Vec<(Option<AnyObject>, Option<AnyObject>)>);

/// A homogeneous array of a registered element type, encoded structurally
/// with the array marker rather than through a handler of its own.
pub struct ObjectArray {
    /// Stable name of the element type; must resolve in the registry.
    pub element_type: String,
    pub elements: Vec<Option<AnyObject>>,
}

/// A reference to a serial type itself; stable name `"Class"`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeName(pub String);

/// Borrows an optional boxed value as the `&dyn Any` the encoder consumes.
pub fn as_dyn(obj: &Option<AnyObject>) -> Option<&dyn Any> {
    obj.as_ref().map(|b| &**b as &dyn Any)
}

/// Unboxes a decoded object into a concrete type.
pub fn downcast_into<T: Any>(obj: AnyObject) -> Result<T, Error> {
    obj.downcast::<T>().map(|b| *b).map_err(|_| {
        Error::type_error(format!(
            "decoded object is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Unboxes a decoded object that must be present.
pub fn required_into<T: Any>(obj: Option<AnyObject>, what: &str) -> Result<T, Error> {
    match obj {
        Some(value) => downcast_into(value),
        None => Err(Error::type_error(format!("missing required {what}"))),
    }
}

/// Deep-clones a value by passing it through the codec in memory.
///
/// This is the in-process use of the wire format: configuration snapshots
/// handed to pools must not alias the caller's mutable state.
pub fn clone_object(
    registry: &Arc<SerialRegistry>,
    obj: Option<&dyn Any>,
) -> Result<Option<AnyObject>, Error> {
    let mut encoder = ObjectEncoder::new(registry.clone());
    let bytes = encoder.encode(obj)?;
    let mut decoder = ObjectDecoder::new(registry.clone());
    decoder.decode(&bytes)
}

/// Structural equality over the closed dynamic type set.
///
/// Returns false for any type outside the set; callers comparing domain
/// structs directly should downcast and use `==` instead.
pub fn any_eq(a: &dyn Any, b: &dyn Any) -> bool {
    fn prim<T: Any + PartialEq>(a: &dyn Any, b: &dyn Any) -> Option<bool> {
        match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
            (Some(x), Some(y)) => Some(x == y),
            _ => None,
        }
    }
    if let Some(eq) = prim::<bool>(a, b) {
        return eq;
    }
    if let Some(eq) = prim::<i32>(a, b) {
        return eq;
    }
    if let Some(eq) = prim::<i64>(a, b) {
        return eq;
    }
    if let Some(eq) = prim::<f32>(a, b) {
        return eq;
    }
    if let Some(eq) = prim::<f64>(a, b) {
        return eq;
    }
    if let Some(eq) = prim::<String>(a, b) {
        return eq;
    }
    if let Some(eq) = prim::<Vec<u8>>(a, b) {
        return eq;
    }
    if let Some(eq) = prim::<TypeName>(a, b) {
        return eq;
    }
    if let (Some(x), Some(y)) = (
        a.downcast_ref::<crate::guard::GuardedString>(),
        b.downcast_ref::<crate::guard::GuardedString>(),
    ) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (
        a.downcast_ref::<crate::guard::GuardedBytes>(),
        b.downcast_ref::<crate::guard::GuardedBytes>(),
    ) {
        return x == y;
    }
    if let (Some(x), Some(y)) = (a.downcast_ref::<AnyList>(), b.downcast_ref::<AnyList>()) {
        return slice_eq(&x.0, &y.0);
    }
    if let (Some(x), Some(y)) = (a.downcast_ref::<AnySet>(), b.downcast_ref::<AnySet>()) {
        return slice_eq(&x.0, &y.0);
    }
    if let (Some(x), Some(y)) = (a.downcast_ref::<AnyMap>(), b.downcast_ref::<AnyMap>()) {
        return x.0.len() == y.0.len()
            && x.0
                .iter()
                .zip(y.0.iter())
                .all(|((ka, va), (kb, vb))| opt_eq(ka, kb) && opt_eq(va, vb));
    }
    if let (Some(x), Some(y)) = (
        a.downcast_ref::<ObjectArray>(),
        b.downcast_ref::<ObjectArray>(),
    ) {
        return x.element_type == y.element_type && slice_eq(&x.elements, &y.elements);
    }
    false
}

/// Appends a canonical byte fingerprint of a dynamic value.
///
/// Used to compare and key configuration snapshots. Guarded values
/// contribute a digest of their cleartext, so equal secrets fingerprint
/// equally even though their wire form is randomized per encryption.
/// Values outside the closed dynamic type set cannot be fingerprinted.
pub fn fingerprint(value: Option<&dyn Any>, out: &mut Vec<u8>) -> Result<(), Error> {
    fn lengthed(out: &mut Vec<u8>, tag: u8, bytes: &[u8]) {
        out.push(tag);
        out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(bytes);
    }
    let value = match value {
        None => {
            out.push(b'0');
            return Ok(());
        }
        Some(v) => v,
    };
    if let Some(v) = value.downcast_ref::<bool>() {
        out.push(b'b');
        out.push(u8::from(*v));
    } else if let Some(v) = value.downcast_ref::<i32>() {
        out.push(b'i');
        out.extend_from_slice(&v.to_be_bytes());
    } else if let Some(v) = value.downcast_ref::<i64>() {
        out.push(b'l');
        out.extend_from_slice(&v.to_be_bytes());
    } else if let Some(v) = value.downcast_ref::<f32>() {
        out.push(b'f');
        out.extend_from_slice(&f64::from(*v).to_bits().to_be_bytes());
    } else if let Some(v) = value.downcast_ref::<f64>() {
        out.push(b'd');
        out.extend_from_slice(&v.to_bits().to_be_bytes());
    } else if let Some(v) = value.downcast_ref::<String>() {
        lengthed(out, b's', v.as_bytes());
    } else if let Some(v) = value.downcast_ref::<Vec<u8>>() {
        lengthed(out, b'B', v);
    } else if let Some(v) = value.downcast_ref::<TypeName>() {
        lengthed(out, b'c', v.0.as_bytes());
    } else if let Some(v) = value.downcast_ref::<crate::guard::GuardedString>() {
        lengthed(out, b'G', &v.digest());
    } else if let Some(v) = value.downcast_ref::<crate::guard::GuardedBytes>() {
        lengthed(out, b'g', &v.digest());
    } else if let Some(v) = value.downcast_ref::<AnyList>() {
        out.push(b'L');
        out.extend_from_slice(&(v.0.len() as u32).to_be_bytes());
        for element in &v.0 {
            fingerprint(as_dyn(element), out)?;
        }
    } else if let Some(v) = value.downcast_ref::<AnySet>() {
        out.push(b'S');
        out.extend_from_slice(&(v.0.len() as u32).to_be_bytes());
        for element in &v.0 {
            fingerprint(as_dyn(element), out)?;
        }
    } else if let Some(v) = value.downcast_ref::<AnyMap>() {
        out.push(b'M');
        out.extend_from_slice(&(v.0.len() as u32).to_be_bytes());
        for (key, val) in &v.0 {
            fingerprint(as_dyn(key), out)?;
            fingerprint(as_dyn(val), out)?;
        }
    } else if let Some(v) = value.downcast_ref::<ObjectArray>() {
        lengthed(out, b'A', v.element_type.as_bytes());
        out.extend_from_slice(&(v.elements.len() as u32).to_be_bytes());
        for element in &v.elements {
            fingerprint(as_dyn(element), out)?;
        }
    } else {
        return Err(Error::invalid_argument(
            "value type cannot be fingerprinted",
        ));
    }
    Ok(())
}

/// [`any_eq`] lifted over nullable slots.
pub fn opt_eq(a: &Option<AnyObject>, b: &Option<AnyObject>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => any_eq(&**x, &**y),
        _ => false,
    }
}

fn slice_eq(a: &[Option<AnyObject>], b: &[Option<AnyObject>]) -> bool {
    a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| opt_eq(x, y))
}
