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

//! Error types for serialization, pooling and remote invocation.
//!
//! The crate uses a single [`enum@Error`] across all subsystems. Prefer the
//! static constructor functions (`Error::invalid_data(...)`,
//! `Error::unknown_type(...)`, ...) over constructing variants directly:
//! they take anything convertible into a `Cow<'static, str>` and keep
//! construction uniform across the codebase.
//!
//! Errors raised by a remote peer are reconstructed locally as
//! [`RemoteError`] values and re-thrown as [`Error::Remote`], a variant
//! distinguishable from a natively-raised error of the same kind. Callers
//! that want to match on the original kind regardless of origin use
//! [`Error::is`].

use std::borrow::Cow;

use thiserror::Error;

/// Error type for all Trestle framework operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Stream began with an unexpected magic number.
    #[error("bad stream magic: {0:#010x}")]
    BadMagic(u32),

    /// Stream version not supported by this implementation.
    #[error("unsupported stream version {actual} (expected {expected})")]
    VersionMismatch { expected: u32, actual: u32 },

    /// Stream ended before a fixed-width read could be satisfied.
    #[error("truncated stream: {0}")]
    TruncatedStream(Cow<'static, str>),

    /// A decoded stable type name has no registered handler.
    #[error("unknown serial type: {0}")]
    UnknownType(Cow<'static, str>),

    /// Two handlers were registered under the same stable name or for the
    /// same runtime type.
    #[error("duplicate serial type registration: {0}")]
    DuplicateType(Cow<'static, str>),

    /// A value of an unregistered runtime type reached the encoder.
    #[error("no serial handler for runtime type: {0}")]
    UnregisteredType(Cow<'static, str>),

    /// Malformed frame structure or field payload.
    #[error("invalid data: {0}")]
    InvalidData(Cow<'static, str>),

    /// A decoded object had an unexpected concrete type.
    #[error("type error: {0}")]
    TypeError(Cow<'static, str>),

    /// Guarded-value obfuscation or de-obfuscation failed.
    #[error("guarded value error: {0}")]
    Guarded(Cow<'static, str>),

    /// Borrowing from an object pool timed out with every slot busy.
    #[error("object pool exhausted after waiting {waited_millis}ms")]
    PoolExhausted { waited_millis: u64 },

    /// The object pool was shut down while a borrow was pending.
    #[error("object pool is shut down")]
    PoolShutdown,

    /// An operation was attempted in a state that forbids it, such as
    /// returning an object a pool never lent out.
    #[error("invalid state: {0}")]
    InvalidState(Cow<'static, str>),

    /// A caller passed arguments the API contract rejects.
    #[error("invalid argument: {0}")]
    InvalidArgument(Cow<'static, str>),

    /// A connector implementation failed to create, validate or run.
    #[error("connector error: {0}")]
    Connector(Cow<'static, str>),

    /// The underlying transport failed; the connection is unusable.
    #[error("connection broken: {0}")]
    Connection(#[source] std::io::Error),

    /// An error raised by the remote peer, reconstructed locally.
    #[error("remote error [{}]: {}", .0.kind, .0.message)]
    Remote(RemoteError),
}

impl Error {
    #[cold]
    pub fn truncated_stream<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::TruncatedStream(s.into())
    }

    #[cold]
    pub fn unknown_type<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::UnknownType(s.into())
    }

    #[cold]
    pub fn duplicate_type<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::DuplicateType(s.into())
    }

    #[cold]
    pub fn unregistered_type<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::UnregisteredType(s.into())
    }

    #[cold]
    pub fn invalid_data<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::InvalidData(s.into())
    }

    #[cold]
    pub fn type_error<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::TypeError(s.into())
    }

    #[cold]
    pub fn guarded<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::Guarded(s.into())
    }

    #[cold]
    pub fn invalid_state<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::InvalidState(s.into())
    }

    #[cold]
    pub fn invalid_argument<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::InvalidArgument(s.into())
    }

    #[cold]
    pub fn connector<S: Into<Cow<'static, str>>>(s: S) -> Self {
        Error::Connector(s.into())
    }

    /// Stable kind name for this error, used when marshaling an error to a
    /// remote peer and when matching with [`Error::is`].
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::BadMagic(_) => "BadMagic",
            Error::VersionMismatch { .. } => "VersionMismatch",
            Error::TruncatedStream(_) => "TruncatedStream",
            Error::UnknownType(_) => "UnknownType",
            Error::DuplicateType(_) => "DuplicateType",
            Error::UnregisteredType(_) => "UnregisteredType",
            Error::InvalidData(_) => "InvalidData",
            Error::TypeError(_) => "TypeError",
            Error::Guarded(_) => "Guarded",
            Error::PoolExhausted { .. } => "PoolExhausted",
            Error::PoolShutdown => "PoolShutdown",
            Error::InvalidState(_) => "InvalidState",
            Error::InvalidArgument(_) => "InvalidArgument",
            Error::Connector(_) => "Connector",
            Error::Connection(_) => "Connection",
            Error::Remote(_) => "Remote",
        }
    }

    /// Returns true when this error is of the given kind, whether it was
    /// raised natively or reconstructed from a remote peer.
    ///
    /// A remote-wrapped error never equals a native error by variant, so
    /// callers that need "was this ultimately a pool timeout?" use
    /// `err.is("PoolExhausted")` instead of matching on the enum.
    pub fn is(&self, kind: &str) -> bool {
        if self.kind_name() == kind {
            return true;
        }
        matches!(self, Error::Remote(remote) if remote.kind == kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Connection(err)
    }
}

/// An error raised on a remote peer, carried across the wire as plain data.
///
/// The original error's kind, message, cause chain and diagnostic text are
/// preserved so the client can log and match on them; the native error value
/// itself never crosses the wire.
#[derive(Clone, Debug, PartialEq)]
pub struct RemoteError {
    /// Stable kind name of the original error (see [`Error::kind_name`]).
    pub kind: String,
    /// Human-readable message of the original error.
    pub message: String,
    /// Nested cause, outermost first.
    pub cause: Option<Box<RemoteError>>,
    /// Free-form diagnostic text captured on the remote side, if any.
    pub stack_trace: Option<String>,
}

impl RemoteError {
    /// Converts a local error into its wire representation.
    ///
    /// An error that already came from a remote peer is passed through
    /// unchanged so that relaying does not stack wrapper layers.
    pub fn from_error(err: &Error) -> RemoteError {
        if let Error::Remote(remote) = err {
            return remote.clone();
        }
        let cause = std::error::Error::source(err).map(|source| {
            Box::new(RemoteError {
                kind: "Source".to_string(),
                message: source.to_string(),
                cause: None,
                stack_trace: None,
            })
        });
        RemoteError {
            kind: err.kind_name().to_string(),
            message: err.to_string(),
            cause,
            stack_trace: None,
        }
    }

    /// Matches the original error kind, walking no further than this node.
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind == kind
    }
}
