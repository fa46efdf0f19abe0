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
use std::io::Write;
use std::sync::Arc;

use super::registry::SerialRegistry;
use super::ObjectArray;
use crate::buffer::Writer;
use crate::error::Error;
use crate::types::{FrameTag, TypeMarker, STREAM_MAGIC, STREAM_VERSION};

/// Per-top-level-object string interning table.
///
/// Codes are assigned in first-seen order, which makes the byte output of
/// a given object deterministic.
#[derive(Default)]
struct ConstantPool {
    codes: HashMap<String, i32>,
    order: Vec<String>,
}

impl ConstantPool {
    fn intern(&mut self, s: &str) -> i32 {
        if let Some(&code) = self.codes.get(s) {
            return code;
        }
        let code = self.order.len() as i32;
        self.codes.insert(s.to_string(), code);
        self.order.push(s.to_string());
        code
    }

    fn clear(&mut self) {
        self.codes.clear();
        self.order.clear();
    }
}

/// Streaming encoder for the self-describing binary object format.
///
/// Frames are built depth-first into temporary buffers so every frame can
/// be length-prefixed without a second pass; the interning table
/// accumulated while building a top-level object is flushed to the output
/// *before* the object's bytes, letting the decoder resolve name codes in
/// a single forward pass.
pub struct ObjectEncoder {
    registry: Arc<SerialRegistry>,
    pool: ConstantPool,
    header_written: bool,
}

impl ObjectEncoder {
    pub fn new(registry: Arc<SerialRegistry>) -> ObjectEncoder {
        ObjectEncoder {
            registry,
            pool: ConstantPool::default(),
            header_written: false,
        }
    }

    /// Writes one complete top-level object to the output.
    ///
    /// The first call on this encoder also writes the stream header.
    pub fn write_object(
        &mut self,
        out: &mut dyn Write,
        obj: Option<&dyn Any>,
    ) -> Result<(), Error> {
        let mut body = Writer::default();
        self.write_frame(&mut body, obj)?;

        let mut prefix = Writer::default();
        if !self.header_written {
            prefix.write_u32(STREAM_MAGIC);
            prefix.write_u32(STREAM_VERSION);
            self.header_written = true;
        }
        prefix.write_i32(self.pool.order.len() as i32);
        for (code, name) in self.pool.order.iter().enumerate() {
            prefix.write_string(name);
            prefix.write_i32(code as i32);
        }
        self.pool.clear();

        out.write_all(prefix.as_bytes())?;
        out.write_all(body.as_bytes())?;
        out.flush()?;
        Ok(())
    }

    /// Encodes one object into a fresh in-memory stream, header included.
    pub fn encode(&mut self, obj: Option<&dyn Any>) -> Result<Vec<u8>, Error> {
        let mut out = Vec::new();
        self.write_object(&mut out, obj)?;
        Ok(out)
    }

    fn write_frame(&mut self, buf: &mut Writer, obj: Option<&dyn Any>) -> Result<(), Error> {
        let value = match obj {
            None => {
                buf.write_u8(TypeMarker::Null.into());
                return Ok(());
            }
            Some(v) => v,
        };

        // Structural array path: resolved by shape, not by a handler.
        if let Some(array) = value.downcast_ref::<ObjectArray>() {
            if self.registry.resolve_by_name(&array.element_type).is_none() {
                return Err(Error::unregistered_type(format!(
                    "array element type {:?}",
                    array.element_type
                )));
            }
            buf.write_u8(TypeMarker::Array.into());
            let code = self.pool.intern(&array.element_type);
            buf.write_i32(code);
            for element in &array.elements {
                let mut nested = Writer::default();
                self.write_frame(&mut nested, super::as_dyn(element))?;
                buf.write_u8(FrameTag::Anonymous.into());
                buf.write_len_bytes(nested.as_bytes());
            }
            buf.write_u8(FrameTag::End.into());
            return Ok(());
        }

        let (stable_name, write_fn) = match self.registry.resolve_value(value) {
            Some(entry) => (entry.stable_name, entry.write_fn),
            None => {
                return Err(Error::unregistered_type(format!(
                    "{:?}",
                    value.type_id()
                )))
            }
        };
        buf.write_u8(TypeMarker::Typed.into());
        let code = self.pool.intern(stable_name);
        buf.write_i32(code);
        let mut fields = FieldWriter {
            enc: &mut *self,
            buf: &mut *buf,
        };
        write_fn(value, &mut fields)?;
        buf.write_u8(FrameTag::End.into());
        Ok(())
    }
}

/// The field-level interface a serialization handler writes through.
///
/// Every field becomes a self-contained, length-prefixed sub-frame in the
/// enclosing object frame, so decoders can skip unknown fields and read
/// known ones in any order.
pub struct FieldWriter<'a> {
    enc: &'a mut ObjectEncoder,
    buf: &'a mut Writer,
}

impl FieldWriter<'_> {
    fn named_field(&mut self, name: &str, payload: &[u8]) {
        self.buf.write_u8(FrameTag::Named.into());
        let code = self.enc.pool.intern(name);
        self.buf.write_i32(code);
        self.buf.write_len_bytes(payload);
    }

    fn anonymous_field(&mut self, payload: &[u8]) {
        self.buf.write_u8(FrameTag::Anonymous.into());
        self.buf.write_len_bytes(payload);
    }

    pub fn write_bool(&mut self, name: &str, value: bool) {
        self.named_field(name, &[u8::from(value)]);
    }

    pub fn write_int(&mut self, name: &str, value: i32) {
        let mut w = Writer::default();
        w.write_i32(value);
        self.named_field(name, w.as_bytes());
    }

    pub fn write_long(&mut self, name: &str, value: i64) {
        let mut w = Writer::default();
        w.write_i64(value);
        self.named_field(name, w.as_bytes());
    }

    /// Floats are promoted to doubles on the wire.
    pub fn write_float(&mut self, name: &str, value: f32) {
        self.write_double(name, f64::from(value));
    }

    pub fn write_double(&mut self, name: &str, value: f64) {
        let mut w = Writer::default();
        w.write_f64(value);
        self.named_field(name, w.as_bytes());
    }

    pub fn write_string(&mut self, name: &str, value: &str) {
        let mut w = Writer::default();
        w.write_string(value);
        self.named_field(name, w.as_bytes());
    }

    pub fn write_byte_array(&mut self, name: &str, value: &[u8]) {
        let mut w = Writer::default();
        w.write_len_bytes(value);
        self.named_field(name, w.as_bytes());
    }

    /// Writes a nested object under a field name.
    pub fn write_object(&mut self, name: &str, obj: Option<&dyn Any>) -> Result<(), Error> {
        let mut nested = Writer::default();
        self.enc.write_frame(&mut nested, obj)?;
        self.named_field(name, nested.as_bytes());
        Ok(())
    }

    /// Writes a nested object as the next positional field.
    pub fn write_anonymous_object(&mut self, obj: Option<&dyn Any>) -> Result<(), Error> {
        let mut nested = Writer::default();
        self.enc.write_frame(&mut nested, obj)?;
        self.anonymous_field(nested.as_bytes());
        Ok(())
    }

    pub fn write_bool_content(&mut self, value: bool) {
        self.anonymous_field(&[u8::from(value)]);
    }

    pub fn write_int_content(&mut self, value: i32) {
        let mut w = Writer::default();
        w.write_i32(value);
        self.anonymous_field(w.as_bytes());
    }

    pub fn write_long_content(&mut self, value: i64) {
        let mut w = Writer::default();
        w.write_i64(value);
        self.anonymous_field(w.as_bytes());
    }

    pub fn write_float_content(&mut self, value: f32) {
        self.write_double_content(f64::from(value));
    }

    pub fn write_double_content(&mut self, value: f64) {
        let mut w = Writer::default();
        w.write_f64(value);
        self.anonymous_field(w.as_bytes());
    }

    pub fn write_string_content(&mut self, value: &str) {
        let mut w = Writer::default();
        w.write_string(value);
        self.anonymous_field(w.as_bytes());
    }

    pub fn write_bytes_content(&mut self, value: &[u8]) {
        let mut w = Writer::default();
        w.write_len_bytes(value);
        self.anonymous_field(w.as_bytes());
    }
}
