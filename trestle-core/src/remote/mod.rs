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

//! Remote invocation: the client that turns a local call into wire
//! messages, the server that dispatches them, and the flow-controlled
//! streaming protocol between the two.
//!
//! Each client call opens a fresh connection and speaks a strictly
//! ordered, non-pipelined exchange: locale, key, request, then either a
//! single response envelope or a result stream punctuated by pause
//! checkpoints.

pub mod client;
pub mod message;
pub mod server;
pub mod state;

pub use client::{InvokeArg, RemoteConnectionInfo, RemoteInvoker};
pub use server::{ConnectionServer, ResultSink, ServerConfig};
pub use state::{ConnectionState, ConnectionStateTable};

use crate::error::Error;
use crate::serial::AnyObject;
use message::OperationRequest;

/// Consumes streamed results on the client side.
///
/// Returning `false` asks the producer to stop; the stop signal travels
/// to the server at the next pause checkpoint, and nothing further is
/// delivered locally in the meantime.
pub trait ResultsHandler {
    fn handle(&mut self, object: Option<AnyObject>) -> bool;
}

/// The operation-dispatch collaborator on the server side.
///
/// The remote layer hands over the decoded request and a sink for
/// streamed results; what the operation actually does is not its concern.
/// Non-streaming operations return their single result; streaming ones
/// push through the sink and return `None`.
pub trait OperationExecutor: Send + Sync {
    fn execute(
        &self,
        request: &OperationRequest,
        results: &mut ResultSink<'_>,
    ) -> Result<Option<AnyObject>, Error>;
}
