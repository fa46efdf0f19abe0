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

use byteorder::{BigEndian, ByteOrder, WriteBytesExt};

use crate::error::Error;

/// Growable binary output buffer.
///
/// All multi-byte integers are big-endian; that is the wire byte order of
/// the object stream format.
#[derive(Default)]
pub struct Writer {
    bf: Vec<u8>,
}

impl Writer {
    pub fn len(&self) -> usize {
        self.bf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bf
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.bf
    }

    pub fn write_u8(&mut self, value: u8) {
        self.bf.write_u8(value).unwrap();
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(u8::from(value));
    }

    pub fn write_i32(&mut self, value: i32) {
        self.bf.write_i32::<BigEndian>(value).unwrap();
    }

    pub fn write_u32(&mut self, value: u32) {
        self.bf.write_u32::<BigEndian>(value).unwrap();
    }

    pub fn write_i64(&mut self, value: i64) {
        self.bf.write_i64::<BigEndian>(value).unwrap();
    }

    pub fn write_f64(&mut self, value: f64) {
        self.bf.write_f64::<BigEndian>(value).unwrap();
    }

    pub fn write_bytes(&mut self, v: &[u8]) {
        self.bf.extend_from_slice(v);
    }

    /// Length-prefixed byte payload. A zero-length payload writes the
    /// prefix only, never a zero-length data chunk.
    pub fn write_len_bytes(&mut self, v: &[u8]) {
        self.write_i32(v.len() as i32);
        if !v.is_empty() {
            self.write_bytes(v);
        }
    }

    /// Length-prefixed UTF-8 string.
    pub fn write_string(&mut self, s: &str) {
        self.write_len_bytes(s.as_bytes());
    }
}

/// Bounds-checked reader over a borrowed byte slice.
///
/// Running off the end of the slice produces a truncated-stream error
/// rather than a panic; a truncated frame is a peer protocol violation,
/// not a local bug.
pub struct Reader<'a> {
    bf: &'a [u8],
    cursor: usize,
}

impl<'a> Reader<'a> {
    pub fn new(bf: &'a [u8]) -> Reader<'a> {
        Reader { bf, cursor: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.bf.len() - self.cursor
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], Error> {
        if self.remaining() < n {
            return Err(Error::truncated_stream(format!(
                "needed {n} bytes, {} remain",
                self.remaining()
            )));
        }
        let slice = &self.bf[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn read_bool(&mut self) -> Result<bool, Error> {
        match self.read_u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(Error::invalid_data(format!("bad boolean byte {other:#04x}"))),
        }
    }

    pub fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(BigEndian::read_i32(self.take(4)?))
    }

    pub fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(BigEndian::read_u32(self.take(4)?))
    }

    pub fn read_i64(&mut self) -> Result<i64, Error> {
        Ok(BigEndian::read_i64(self.take(8)?))
    }

    pub fn read_f64(&mut self) -> Result<f64, Error> {
        Ok(BigEndian::read_f64(self.take(8)?))
    }

    pub fn read_bytes(&mut self, n: usize) -> Result<&'a [u8], Error> {
        self.take(n)
    }

    /// Reads a length-prefixed byte payload written by
    /// [`Writer::write_len_bytes`].
    pub fn read_len_bytes(&mut self) -> Result<&'a [u8], Error> {
        let len = self.read_i32()?;
        if len < 0 {
            return Err(Error::invalid_data(format!("negative payload length {len}")));
        }
        self.take(len as usize)
    }

    /// Reads a length-prefixed UTF-8 string.
    pub fn read_string(&mut self) -> Result<String, Error> {
        let bytes = self.read_len_bytes()?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| Error::invalid_data("string payload is not valid UTF-8"))
    }
}
