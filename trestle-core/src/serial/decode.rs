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

use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use super::registry::SerialRegistry;
use super::{AnyObject, ObjectArray};
use crate::buffer::Reader;
use crate::error::Error;
use crate::types::{FrameTag, TypeMarker, STREAM_MAGIC, STREAM_VERSION};

/// The interning table read ahead of each top-level object's body.
struct PoolTable {
    by_code: HashMap<i32, String>,
}

impl PoolTable {
    fn read(r: &mut dyn Read) -> Result<PoolTable, Error> {
        let count = read_i32(r)?;
        if count < 0 {
            return Err(Error::invalid_data(format!(
                "negative constant pool size {count}"
            )));
        }
        let mut by_code = HashMap::with_capacity(count as usize);
        for _ in 0..count {
            let name = read_string(r)?;
            let code = read_i32(r)?;
            by_code.insert(code, name);
        }
        Ok(PoolTable { by_code })
    }

    fn resolve(&self, code: i32) -> Result<&str, Error> {
        self.by_code
            .get(&code)
            .map(String::as_str)
            .ok_or_else(|| Error::invalid_data(format!("unknown constant pool code {code}")))
    }
}

fn fill(r: &mut dyn Read, buf: &mut [u8]) -> Result<(), Error> {
    r.read_exact(buf).map_err(|e| {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            Error::truncated_stream(format!("needed {} bytes", buf.len()))
        } else {
            Error::Connection(e)
        }
    })
}

fn read_u8(r: &mut dyn Read) -> Result<u8, Error> {
    let mut b = [0u8; 1];
    fill(r, &mut b)?;
    Ok(b[0])
}

fn read_u32(r: &mut dyn Read) -> Result<u32, Error> {
    let mut b = [0u8; 4];
    fill(r, &mut b)?;
    Ok(u32::from_be_bytes(b))
}

fn read_i32(r: &mut dyn Read) -> Result<i32, Error> {
    let mut b = [0u8; 4];
    fill(r, &mut b)?;
    Ok(i32::from_be_bytes(b))
}

fn read_payload(r: &mut dyn Read) -> Result<Vec<u8>, Error> {
    let len = read_i32(r)?;
    if len < 0 {
        return Err(Error::invalid_data(format!("negative payload length {len}")));
    }
    let mut buf = vec![0u8; len as usize];
    if len > 0 {
        fill(r, &mut buf)?;
    }
    Ok(buf)
}

fn read_string(r: &mut dyn Read) -> Result<String, Error> {
    let bytes = read_payload(r)?;
    String::from_utf8(bytes).map_err(|_| Error::invalid_data("string payload is not valid UTF-8"))
}

/// Streaming decoder for the self-describing binary object format.
///
/// Decoding is strictly forward-only: the constant pool table arrives
/// before the object body, field sub-frames are buffered by name or
/// position, and handlers pull what they recognize. Unknown named fields
/// are ignored; absent ones fall back to caller-supplied defaults, which
/// is what makes old and new peers interoperate.
pub struct ObjectDecoder {
    registry: Arc<SerialRegistry>,
    header_read: bool,
}

impl ObjectDecoder {
    pub fn new(registry: Arc<SerialRegistry>) -> ObjectDecoder {
        ObjectDecoder {
            registry,
            header_read: false,
        }
    }

    /// Reads one complete top-level object from the input.
    ///
    /// The first call on this decoder also consumes and verifies the
    /// stream header.
    pub fn read_object(&mut self, input: &mut dyn Read) -> Result<Option<AnyObject>, Error> {
        if !self.header_read {
            let magic = read_u32(input)?;
            if magic != STREAM_MAGIC {
                return Err(Error::BadMagic(magic));
            }
            let version = read_u32(input)?;
            if version != STREAM_VERSION {
                return Err(Error::VersionMismatch {
                    expected: STREAM_VERSION,
                    actual: version,
                });
            }
            self.header_read = true;
        }
        let pool = PoolTable::read(input)?;
        self.read_frame(input, &pool)
    }

    /// Decodes one object from an in-memory stream produced by
    /// [`super::ObjectEncoder::encode`].
    pub fn decode(&mut self, bytes: &[u8]) -> Result<Option<AnyObject>, Error> {
        let mut input: &[u8] = bytes;
        self.read_object(&mut input)
    }

    fn read_frame(
        &self,
        r: &mut dyn Read,
        pool: &PoolTable,
    ) -> Result<Option<AnyObject>, Error> {
        let marker_byte = read_u8(r)?;
        let marker = TypeMarker::try_from(marker_byte)
            .map_err(|_| Error::invalid_data(format!("bad type marker {marker_byte:#04x}")))?;
        match marker {
            TypeMarker::Null => Ok(None),
            TypeMarker::Array => {
                let element_type = pool.resolve(read_i32(r)?)?.to_string();
                if self.registry.resolve_by_name(&element_type).is_none() {
                    return Err(Error::unknown_type(element_type));
                }
                let mut elements = Vec::new();
                loop {
                    let tag_byte = read_u8(r)?;
                    let tag = FrameTag::try_from(tag_byte).map_err(|_| {
                        Error::invalid_data(format!("bad frame tag {tag_byte:#04x}"))
                    })?;
                    match tag {
                        FrameTag::End => break,
                        FrameTag::Anonymous => {
                            let payload = read_payload(r)?;
                            elements.push(self.read_frame(&mut &payload[..], pool)?);
                        }
                        FrameTag::Named => {
                            return Err(Error::invalid_data(
                                "named field inside array frame",
                            ));
                        }
                    }
                }
                Ok(Some(Box::new(ObjectArray {
                    element_type,
                    elements,
                })))
            }
            TypeMarker::Typed => {
                let stable_name = pool.resolve(read_i32(r)?)?.to_string();
                let entry = self
                    .registry
                    .resolve_by_name(&stable_name)
                    .ok_or_else(|| Error::unknown_type(stable_name.clone()))?;
                let mut named: HashMap<String, Vec<u8>> = HashMap::new();
                let mut anon: Vec<Vec<u8>> = Vec::new();
                loop {
                    let tag_byte = read_u8(r)?;
                    let tag = FrameTag::try_from(tag_byte).map_err(|_| {
                        Error::invalid_data(format!("bad frame tag {tag_byte:#04x}"))
                    })?;
                    match tag {
                        FrameTag::End => break,
                        FrameTag::Anonymous => anon.push(read_payload(r)?),
                        FrameTag::Named => {
                            let name = pool.resolve(read_i32(r)?)?.to_string();
                            named.insert(name, read_payload(r)?);
                        }
                    }
                }
                let mut fields = FieldReader {
                    dec: self,
                    pool,
                    named,
                    anon,
                };
                (entry.read_fn)(&mut fields).map(Some)
            }
        }
    }
}

/// The field-level interface a deserialization handler reads through.
///
/// Named fields were buffered into a name-to-payload map, positional
/// fields into an ordered list; a handler may read them in any order.
/// Scalar readers take a default returned when the field is absent,
/// which is how payloads from older encoders keep decoding.
pub struct FieldReader<'a> {
    dec: &'a ObjectDecoder,
    pool: &'a PoolTable,
    named: HashMap<String, Vec<u8>>,
    anon: Vec<Vec<u8>>,
}

impl FieldReader<'_> {
    pub fn has_field(&self, name: &str) -> bool {
        self.named.contains_key(name)
    }

    pub fn read_bool(&self, name: &str, default: bool) -> Result<bool, Error> {
        match self.named.get(name) {
            None => Ok(default),
            Some(payload) => Reader::new(payload).read_bool(),
        }
    }

    pub fn read_int(&self, name: &str, default: i32) -> Result<i32, Error> {
        match self.named.get(name) {
            None => Ok(default),
            Some(payload) => Reader::new(payload).read_i32(),
        }
    }

    pub fn read_long(&self, name: &str, default: i64) -> Result<i64, Error> {
        match self.named.get(name) {
            None => Ok(default),
            Some(payload) => Reader::new(payload).read_i64(),
        }
    }

    /// Narrows the wire double back to the float it was promoted from.
    pub fn read_float(&self, name: &str, default: f32) -> Result<f32, Error> {
        match self.named.get(name) {
            None => Ok(default),
            Some(payload) => Ok(Reader::new(payload).read_f64()? as f32),
        }
    }

    pub fn read_double(&self, name: &str, default: f64) -> Result<f64, Error> {
        match self.named.get(name) {
            None => Ok(default),
            Some(payload) => Reader::new(payload).read_f64(),
        }
    }

    pub fn read_string(&self, name: &str, default: &str) -> Result<String, Error> {
        match self.named.get(name) {
            None => Ok(default.to_string()),
            Some(payload) => Reader::new(payload).read_string(),
        }
    }

    pub fn read_opt_string(&self, name: &str) -> Result<Option<String>, Error> {
        match self.named.get(name) {
            None => Ok(None),
            Some(payload) => Reader::new(payload).read_string().map(Some),
        }
    }

    pub fn read_byte_array(&self, name: &str, default: &[u8]) -> Result<Vec<u8>, Error> {
        match self.named.get(name) {
            None => Ok(default.to_vec()),
            Some(payload) => Reader::new(payload).read_len_bytes().map(|b| b.to_vec()),
        }
    }

    /// Reads a nested object field; absent and explicitly-null fields both
    /// come back as `None`.
    pub fn read_object(&self, name: &str) -> Result<Option<AnyObject>, Error> {
        match self.named.get(name) {
            None => Ok(None),
            Some(payload) => self.dec.read_frame(&mut &payload[..], self.pool),
        }
    }

    pub fn anonymous_count(&self) -> usize {
        self.anon.len()
    }

    pub fn read_anonymous(&self, index: usize) -> Result<Option<AnyObject>, Error> {
        let payload = self.anon.get(index).ok_or_else(|| {
            Error::invalid_data(format!("no anonymous field at index {index}"))
        })?;
        self.dec.read_frame(&mut &payload[..], self.pool)
    }

    fn content(&self) -> Result<&[u8], Error> {
        self.anon
            .first()
            .map(Vec::as_slice)
            .ok_or_else(|| Error::invalid_data("missing value content"))
    }

    pub fn read_bool_content(&self) -> Result<bool, Error> {
        Reader::new(self.content()?).read_bool()
    }

    pub fn read_int_content(&self) -> Result<i32, Error> {
        Reader::new(self.content()?).read_i32()
    }

    pub fn read_long_content(&self) -> Result<i64, Error> {
        Reader::new(self.content()?).read_i64()
    }

    pub fn read_float_content(&self) -> Result<f32, Error> {
        Ok(Reader::new(self.content()?).read_f64()? as f32)
    }

    pub fn read_double_content(&self) -> Result<f64, Error> {
        Reader::new(self.content()?).read_f64()
    }

    pub fn read_string_content(&self) -> Result<String, Error> {
        Reader::new(self.content()?).read_string()
    }

    pub fn read_bytes_content(&self) -> Result<Vec<u8>, Error> {
        Reader::new(self.content()?).read_len_bytes().map(|b| b.to_vec())
    }
}
