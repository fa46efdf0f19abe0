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

//! Guarded secret values and their wire obfuscation.
//!
//! A guarded value holds password-like material whose cleartext lifetime is
//! kept as short as possible: the backing buffer is zeroed on drop and
//! `Debug` never prints it. On the wire a guarded value travels as an
//! AES-256-GCM blob under a key fixed in this module.
//!
//! The fixed key means the wire form is obfuscation against casual
//! inspection of a capture or heap dump, NOT confidentiality: anyone with
//! this source can decrypt it. Real transport secrecy is the transport
//! layer's job.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use rand::rngs::OsRng;
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::Error;

/// Length of the GCM nonce prepended to every obfuscated blob.
const NONCE_LENGTH: usize = 12;

/// Length of the GCM authentication tag appended by the cipher.
const TAG_LENGTH: usize = 16;

/// Fixed obfuscation key. Deliberately not derived from anything the
/// application controls; see the module docs.
const OBFUSCATION_KEY: [u8; 32] = [
    0x23, 0x65, 0x87, 0x22, 0x59, 0x78, 0x54, 0x43, 0x64, 0x05, 0x6d, 0x14, 0x61, 0x73, 0x72, 0x65,
    0x73, 0x74, 0x6c, 0x65, 0x0b, 0xad, 0xc0, 0xde, 0x4f, 0x62, 0x66, 0x75, 0x73, 0x63, 0x38, 0x91,
];

fn cipher() -> Result<Aes256Gcm, Error> {
    Aes256Gcm::new_from_slice(&OBFUSCATION_KEY)
        .map_err(|_| Error::guarded("failed to initialize obfuscation cipher"))
}

/// Obfuscates cleartext into a `nonce || ciphertext || tag` blob.
pub(crate) fn obfuscate(clear: &[u8]) -> Result<Vec<u8>, Error> {
    let cipher = cipher()?;
    let mut nonce_bytes = [0u8; NONCE_LENGTH];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);
    let ciphertext = cipher
        .encrypt(nonce, clear)
        .map_err(|_| Error::guarded("guarded value encryption failed"))?;
    let mut blob = Vec::with_capacity(NONCE_LENGTH + ciphertext.len());
    blob.extend_from_slice(&nonce_bytes);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Reverses [`obfuscate`]. The returned buffer zeroes itself on drop.
pub(crate) fn deobfuscate(blob: &[u8]) -> Result<Zeroizing<Vec<u8>>, Error> {
    if blob.len() < NONCE_LENGTH + TAG_LENGTH {
        return Err(Error::guarded("guarded value blob too short"));
    }
    let cipher = cipher()?;
    let (nonce_bytes, encrypted) = blob.split_at(NONCE_LENGTH);
    let nonce = Nonce::from_slice(nonce_bytes);
    let clear = cipher
        .decrypt(nonce, encrypted)
        .map_err(|_| Error::guarded("guarded value decryption failed"))?;
    Ok(Zeroizing::new(clear))
}

/// A byte-array secret whose backing storage is scrubbed on drop.
#[derive(Clone)]
pub struct GuardedBytes {
    value: Zeroizing<Vec<u8>>,
}

impl GuardedBytes {
    pub fn new(value: Vec<u8>) -> GuardedBytes {
        GuardedBytes {
            value: Zeroizing::new(value),
        }
    }

    /// Exposes the cleartext to the closure; the reference must not escape.
    pub fn access<R>(&self, f: impl FnOnce(&[u8]) -> R) -> R {
        f(&self.value)
    }

    pub(crate) fn to_wire(&self) -> Result<Vec<u8>, Error> {
        obfuscate(&self.value)
    }

    pub(crate) fn from_wire(blob: &[u8]) -> Result<GuardedBytes, Error> {
        let clear = deobfuscate(blob)?;
        // moves the zeroizing buffer straight in, no cleartext copy
        Ok(GuardedBytes { value: clear })
    }

    /// SHA-256 digest of the cleartext, for comparison without keeping
    /// cleartext around.
    pub fn digest(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(&*self.value);
        hasher.finalize().into()
    }
}

impl PartialEq for GuardedBytes {
    fn eq(&self, other: &Self) -> bool {
        *self.value == *other.value
    }
}

impl std::fmt::Debug for GuardedBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GuardedBytes(**********)")
    }
}

/// A string secret whose backing storage is scrubbed on drop.
#[derive(Clone)]
pub struct GuardedString {
    value: Zeroizing<String>,
}

impl GuardedString {
    pub fn new(value: String) -> GuardedString {
        GuardedString {
            value: Zeroizing::new(value),
        }
    }

    /// Exposes the cleartext to the closure; the reference must not escape.
    pub fn access<R>(&self, f: impl FnOnce(&str) -> R) -> R {
        f(&self.value)
    }

    pub(crate) fn to_wire(&self) -> Result<Vec<u8>, Error> {
        obfuscate(self.value.as_bytes())
    }

    pub(crate) fn from_wire(blob: &[u8]) -> Result<GuardedString, Error> {
        let clear = deobfuscate(blob)?;
        match std::str::from_utf8(&clear) {
            Ok(s) => {
                let guarded = GuardedString::new(s.to_string());
                Ok(guarded)
            }
            Err(_) => {
                // clear zeroes itself on drop; nothing else to scrub
                Err(Error::guarded("guarded string is not valid UTF-8"))
            }
        }
    }

    /// SHA-256 digest of the cleartext, for key comparison without keeping
    /// cleartext around.
    pub fn digest(&self) -> [u8; 32] {
        use sha2::{Digest, Sha256};
        let mut hasher = Sha256::new();
        hasher.update(self.value.as_bytes());
        hasher.finalize().into()
    }
}

impl PartialEq for GuardedString {
    fn eq(&self, other: &Self) -> bool {
        *self.value == *other.value
    }
}

impl std::fmt::Debug for GuardedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("GuardedString(**********)")
    }
}
