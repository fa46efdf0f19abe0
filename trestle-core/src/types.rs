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

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Magic number opening every binary object stream.
pub const STREAM_MAGIC: u32 = 0x5452_4C53;

/// Version of the binary encoding, bumped on incompatible format changes.
pub const STREAM_VERSION: u32 = 1;

/// Number of streamed result items between flow-control pause checkpoints.
///
/// Fixed policy shared by client and server; both sides must agree on it
/// for the continue/stop handshake to line up.
pub const PAUSE_INTERVAL: usize = 200;

/// Marker opening an object frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum TypeMarker {
    /// The object is null; the frame has no body.
    Null = 0x10,
    /// A registered serial type follows as an interned name code.
    Typed = 0x11,
    /// A structural array; the element type follows as an interned name
    /// code and each element is an anonymous sub-frame.
    Array = 0x12,
}

/// Tag opening each sub-frame inside an object frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum FrameTag {
    /// Positional field: length-prefixed payload only.
    Anonymous = 0x20,
    /// Named field: interned name code, then length-prefixed payload.
    Named = 0x21,
    /// Terminates the enclosing object frame.
    End = 0x22,
}
