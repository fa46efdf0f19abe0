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
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::time::Duration;

use log::debug;

use super::message::{
    EchoMessage, HelloRequest, HelloResponse, Locale, OperationRequest,
    OperationRequestMoreData, OperationRequestStopData, OperationResponseEnd,
    OperationResponsePart, OperationResponsePause,
};
use super::ResultsHandler;
use crate::api::{ConfigurationProperties, ConnectorKey, Operation};
use crate::error::{Error, RemoteError};
use crate::guard::GuardedString;
use crate::serial::{downcast_into, AnyList, AnyObject, ObjectDecoder, ObjectEncoder, SerialRegistry};

/// Where and how to reach a remote connector server.
pub struct RemoteConnectionInfo {
    pub host: String,
    pub port: u16,
    /// Shared key presented during the connection handshake.
    pub key: GuardedString,
    pub connect_timeout: Duration,
    pub locale: Locale,
}

/// One argument of a remote invocation.
///
/// At most one argument may be a results handler; the handler is consumed
/// locally and never crosses the wire.
pub enum InvokeArg<'a> {
    Object(Option<AnyObject>),
    Results(&'a mut dyn ResultsHandler),
}

/// Client side of the remote invocation protocol.
///
/// Every call opens a fresh connection, performs the locale/key handshake
/// and speaks exactly one request/response exchange; the protocol is not
/// pipelined.
pub struct RemoteInvoker {
    registry: Arc<SerialRegistry>,
    info: RemoteConnectionInfo,
}

struct ClientConnection {
    stream: TcpStream,
    encoder: ObjectEncoder,
    decoder: ObjectDecoder,
}

impl RemoteInvoker {
    pub fn new(registry: Arc<SerialRegistry>, info: RemoteConnectionInfo) -> RemoteInvoker {
        RemoteInvoker { registry, info }
    }

    /// Exchanges the hello handshake, returning the server's connector
    /// catalog.
    pub fn hello(&self) -> Result<HelloResponse, Error> {
        let mut conn = self.open()?;
        conn.write(&HelloRequest)?;
        expect_message::<HelloResponse>(conn.read_required()?)
    }

    /// Diagnostic round-trip: the object travels to the server and back
    /// through the full serialization path.
    pub fn echo(&self, object: Option<AnyObject>) -> Result<Option<AnyObject>, Error> {
        let mut conn = self.open()?;
        conn.write(&EchoMessage { object })?;
        Ok(expect_message::<EchoMessage>(conn.read_required()?)?.object)
    }

    /// Invokes one operation on a remote connector.
    ///
    /// Streaming operations require exactly one [`InvokeArg::Results`]
    /// argument; passing more than one is a programming error rejected
    /// before any I/O happens. Non-streaming calls return the single
    /// result; a remote failure is re-thrown as [`Error::Remote`].
    pub fn invoke(
        &self,
        connector_key: ConnectorKey,
        configuration: ConfigurationProperties,
        operation: Operation,
        args: Vec<InvokeArg<'_>>,
    ) -> Result<Option<AnyObject>, Error> {
        let mut handler: Option<&mut dyn ResultsHandler> = None;
        let mut objects = Vec::new();
        for arg in args {
            match arg {
                InvokeArg::Object(obj) => objects.push(obj),
                InvokeArg::Results(h) => {
                    if handler.is_some() {
                        return Err(Error::invalid_argument(
                            "more than one results handler argument",
                        ));
                    }
                    handler = Some(h);
                }
            }
        }
        if operation.is_streaming() && handler.is_none() {
            return Err(Error::invalid_argument(format!(
                "{} requires a results handler argument",
                operation.as_str()
            )));
        }
        if !operation.is_streaming() && handler.is_some() {
            return Err(Error::invalid_argument(format!(
                "{} does not stream results",
                operation.as_str()
            )));
        }

        let request = OperationRequest {
            connector_key,
            configuration,
            operation,
            arguments: AnyList(objects),
        };
        let mut conn = self.open()?;
        conn.write(&request)?;

        match handler {
            Some(handler) => self.read_stream(&mut conn, handler),
            None => {
                let part = downcast_into::<OperationResponsePart>(conn.read_required()?)?;
                match part.error {
                    Some(error) => Err(Error::Remote(error)),
                    None => Ok(part.result),
                }
            }
        }
    }

    /// Drives the streamed-response loop until the end message.
    ///
    /// Once the local handler asks to stop, parts keep arriving until the
    /// next pause checkpoint — they are drained, not delivered — and the
    /// stop control message goes out in answer to that pause.
    fn read_stream(
        &self,
        conn: &mut ClientConnection,
        handler: &mut dyn ResultsHandler,
    ) -> Result<Option<AnyObject>, Error> {
        let mut stopped = false;
        let mut failure: Option<RemoteError> = None;
        loop {
            // once a failure part arrived, the server may close instead of
            // finishing the stream; the recorded error wins over the read
            let msg = match conn.read_required() {
                Ok(msg) => msg,
                Err(read_err) => {
                    return match failure {
                        Some(error) => Err(Error::Remote(error)),
                        None => Err(read_err),
                    }
                }
            };
            let msg = match msg.downcast::<OperationResponseEnd>() {
                Ok(_) => break,
                Err(other) => other,
            };
            let msg = match msg.downcast::<OperationResponsePause>() {
                Ok(_) => {
                    if stopped {
                        conn.write(&OperationRequestStopData)?;
                    } else {
                        conn.write(&OperationRequestMoreData)?;
                    }
                    continue;
                }
                Err(other) => other,
            };
            let part = downcast_into::<OperationResponsePart>(msg)?;
            if let Some(error) = part.error {
                if failure.is_none() {
                    failure = Some(error);
                }
                stopped = true;
                continue;
            }
            if !stopped && !handler.handle(part.result) {
                debug!("results handler requested stop");
                stopped = true;
            }
        }
        match failure {
            Some(error) => Err(Error::Remote(error)),
            None => Ok(None),
        }
    }

    /// Opens a connection and performs the locale/key handshake writes.
    fn open(&self) -> Result<ClientConnection, Error> {
        let addr = (self.info.host.as_str(), self.info.port)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| {
                Error::Connection(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("could not resolve {}:{}", self.info.host, self.info.port),
                ))
            })?;
        let stream = TcpStream::connect_timeout(&addr, self.info.connect_timeout)?;
        let mut conn = ClientConnection {
            stream,
            encoder: ObjectEncoder::new(self.registry.clone()),
            decoder: ObjectDecoder::new(self.registry.clone()),
        };
        conn.write(&self.info.locale)?;
        conn.write(&self.info.key)?;
        Ok(conn)
    }
}

/// Downcasts a response to the expected message type, surfacing an error
/// part the server may have sent in its place (for example on a rejected
/// framework key).
fn expect_message<T: Any>(msg: AnyObject) -> Result<T, Error> {
    let msg = match msg.downcast::<T>() {
        Ok(expected) => return Ok(*expected),
        Err(other) => other,
    };
    match msg.downcast::<OperationResponsePart>() {
        Ok(part) => match part.error {
            Some(error) => Err(Error::Remote(error)),
            None => Err(Error::invalid_data("unexpected response message")),
        },
        Err(_) => Err(Error::invalid_data("unexpected protocol message")),
    }
}

impl ClientConnection {
    fn write(&mut self, message: &dyn Any) -> Result<(), Error> {
        let mut stream = &self.stream;
        self.encoder.write_object(&mut stream, Some(message))
    }

    fn read_required(&mut self) -> Result<AnyObject, Error> {
        let mut stream = &self.stream;
        self.decoder
            .read_object(&mut stream)?
            .ok_or_else(|| Error::invalid_data("unexpected null protocol message"))
    }
}
