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

//! Handlers for primitive values, container shapes and guarded values,
//! plus assembly of the full default registry.

use std::any::Any;

use super::{as_dyn, AnyList, AnyMap, AnyObject, AnySet, TypeName};
use super::{FieldReader, FieldWriter, SerialRegistry};
use crate::error::Error;
use crate::guard::{GuardedBytes, GuardedString};

/// Borrow-downcasts a handler argument, failing with a type error that
/// names the expected type.
pub(crate) fn expect_ref<T: Any>(value: &dyn Any) -> Result<&T, Error> {
    value.downcast_ref::<T>().ok_or_else(|| {
        Error::type_error(format!(
            "handler invoked with a value that is not a {}",
            std::any::type_name::<T>()
        ))
    })
}

macro_rules! scalar_handler {
    ($ty:ty, $write:ident, $read:ident, $write_content:ident, $read_content:ident) => {
        fn $write(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
            w.$write_content(*expect_ref::<$ty>(value)?);
            Ok(())
        }

        fn $read(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
            Ok(Box::new(r.$read_content()?))
        }
    };
}

scalar_handler!(bool, write_bool, read_bool, write_bool_content, read_bool_content);
scalar_handler!(i32, write_int, read_int, write_int_content, read_int_content);
scalar_handler!(i64, write_long, read_long, write_long_content, read_long_content);
scalar_handler!(f32, write_float, read_float, write_float_content, read_float_content);
scalar_handler!(f64, write_double, read_double, write_double_content, read_double_content);

fn write_string(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    w.write_string_content(expect_ref::<String>(value)?);
    Ok(())
}

fn read_string(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(r.read_string_content()?))
}

fn write_byte_array(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    w.write_bytes_content(expect_ref::<Vec<u8>>(value)?);
    Ok(())
}

fn read_byte_array(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(r.read_bytes_content()?))
}

fn write_type_name(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    w.write_string_content(&expect_ref::<TypeName>(value)?.0);
    Ok(())
}

fn read_type_name(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(TypeName(r.read_string_content()?)))
}

fn write_elements(elements: &[Option<AnyObject>], w: &mut FieldWriter<'_>) -> Result<(), Error> {
    for element in elements {
        w.write_anonymous_object(as_dyn(element))?;
    }
    Ok(())
}

fn read_elements(r: &mut FieldReader<'_>) -> Result<Vec<Option<AnyObject>>, Error> {
    let mut elements = Vec::with_capacity(r.anonymous_count());
    for i in 0..r.anonymous_count() {
        elements.push(r.read_anonymous(i)?);
    }
    Ok(elements)
}

fn write_list(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    write_elements(&expect_ref::<AnyList>(value)?.0, w)
}

fn read_list(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(AnyList(read_elements(r)?)))
}

fn write_set(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    write_elements(&expect_ref::<AnySet>(value)?.0, w)
}

fn read_set(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(AnySet(read_elements(r)?)))
}

// Map entries flatten into alternating key/value positional frames.
fn write_map(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let map = expect_ref::<AnyMap>(value)?;
    for (key, val) in &map.0 {
        w.write_anonymous_object(as_dyn(key))?;
        w.write_anonymous_object(as_dyn(val))?;
    }
    Ok(())
}

fn read_map(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let flat = read_elements(r)?;
    if flat.len() % 2 != 0 {
        return Err(Error::invalid_data("map frame holds an odd element count"));
    }
    let mut entries = Vec::with_capacity(flat.len() / 2);
    let mut iter = flat.into_iter();
    while let (Some(key), Some(value)) = (iter.next(), iter.next()) {
        entries.push((key, value));
    }
    Ok(Box::new(AnyMap(entries)))
}

fn write_guarded_string(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let blob = expect_ref::<GuardedString>(value)?.to_wire()?;
    w.write_bytes_content(&blob);
    Ok(())
}

fn read_guarded_string(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let blob = r.read_bytes_content()?;
    Ok(Box::new(GuardedString::from_wire(&blob)?))
}

fn write_guarded_bytes(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let blob = expect_ref::<GuardedBytes>(value)?.to_wire()?;
    w.write_bytes_content(&blob);
    Ok(())
}

fn read_guarded_bytes(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let blob = r.read_bytes_content()?;
    Ok(Box::new(GuardedBytes::from_wire(&blob)?))
}

/// Builds the complete closed registry: primitives, container shapes,
/// guarded values, domain objects and protocol messages.
pub fn default_registry() -> Result<SerialRegistry, Error> {
    let mut registry = SerialRegistry::new();
    registry.register::<bool>("Boolean", write_bool, read_bool)?;
    registry.register::<i32>("Integer", write_int, read_int)?;
    registry.register::<i64>("Long", write_long, read_long)?;
    registry.register::<f32>("Float", write_float, read_float)?;
    registry.register::<f64>("Double", write_double, read_double)?;
    registry.register::<String>("String", write_string, read_string)?;
    registry.register::<Vec<u8>>("ByteArray", write_byte_array, read_byte_array)?;
    registry.register::<TypeName>("Class", write_type_name, read_type_name)?;
    registry.register::<AnyList>("List", write_list, read_list)?;
    registry.register::<AnySet>("Set", write_set, read_set)?;
    registry.register::<AnyMap>("Map", write_map, read_map)?;
    registry.register::<GuardedString>("GuardedString", write_guarded_string, read_guarded_string)?;
    registry.register::<GuardedBytes>(
        "GuardedByteArray",
        write_guarded_bytes,
        read_guarded_bytes,
    )?;
    crate::api::register_serial_types(&mut registry)?;
    crate::remote::message::register_serial_types(&mut registry)?;
    Ok(registry)
}
