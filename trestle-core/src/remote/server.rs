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

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use log::{debug, info, warn};

use super::message::{
    EchoMessage, HelloRequest, HelloResponse, Locale, OperationRequest,
    OperationRequestMoreData, OperationRequestStopData, OperationResponseEnd,
    OperationResponsePart, OperationResponsePause,
};
use super::state::{ConnectionState, ConnectionStateTable};
use super::OperationExecutor;
use crate::api::ConnectorCatalog;
use crate::error::{Error, RemoteError};
use crate::guard::GuardedString;
use crate::pool::ConnectorPoolManager;
use crate::serial::{downcast_into, AnyObject, ObjectDecoder, ObjectEncoder, SerialRegistry};
use crate::types::PAUSE_INTERVAL;

/// Configuration of one connector-hosting server.
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Shared key clients must present; only its digest is retained.
    pub key: GuardedString,
    pub catalog: Arc<dyn ConnectorCatalog>,
    pub executor: Arc<dyn OperationExecutor>,
}

struct ServerContext {
    registry: Arc<SerialRegistry>,
    key_digest: [u8; 32],
    catalog: Arc<dyn ConnectorCatalog>,
    executor: Arc<dyn OperationExecutor>,
    states: Arc<ConnectionStateTable>,
}

/// The connection server: accepts, authenticates and dispatches, one
/// thread per connection.
///
/// Requests on one connection are handled strictly in order. Streaming
/// responses insert a pause checkpoint every [`PAUSE_INTERVAL`] items and
/// block the producing thread until the client acknowledges; a hung
/// client therefore stalls only its own connection thread.
pub struct ConnectionServer {
    local_addr: SocketAddr,
    stop: Arc<AtomicBool>,
    accept_thread: Option<JoinHandle<()>>,
    states: Arc<ConnectionStateTable>,
    pool_manager: Arc<ConnectorPoolManager>,
}

impl ConnectionServer {
    /// Binds the listener and starts accepting connections.
    pub fn start(
        config: ServerConfig,
        registry: Arc<SerialRegistry>,
        pool_manager: Arc<ConnectorPoolManager>,
    ) -> Result<ConnectionServer, Error> {
        let listener = TcpListener::bind(config.bind_addr)?;
        let local_addr = listener.local_addr()?;
        let states = Arc::new(ConnectionStateTable::new());
        let context = Arc::new(ServerContext {
            registry,
            key_digest: config.key.digest(),
            catalog: config.catalog,
            executor: config.executor,
            states: states.clone(),
        });
        let stop = Arc::new(AtomicBool::new(false));
        let accept_stop = stop.clone();
        let accept_thread = thread::Builder::new()
            .name("trestle-accept".to_string())
            .spawn(move || accept_loop(listener, context, accept_stop))
            .map_err(|e| Error::Connection(e))?;
        info!("connection server listening at {local_addr}");
        Ok(ConnectionServer {
            local_addr,
            stop,
            accept_thread: Some(accept_thread),
            states,
            pool_manager,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// The self-reported state table of live connections.
    pub fn states(&self) -> Arc<ConnectionStateTable> {
        self.states.clone()
    }

    /// Stops accepting, shuts down the connector pools and waits for the
    /// accept thread. Connection threads already dispatching finish their
    /// current request on their own.
    pub fn shutdown(&mut self) {
        if self.stop.swap(true, Ordering::SeqCst) {
            return;
        }
        // wake the accept loop out of its blocking accept
        let _ = TcpStream::connect(self.local_addr);
        if let Some(handle) = self.accept_thread.take() {
            let _ = handle.join();
        }
        self.pool_manager.dispose_all();
        info!("connection server stopped");
    }
}

impl Drop for ConnectionServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn accept_loop(listener: TcpListener, context: Arc<ServerContext>, stop: Arc<AtomicBool>) {
    for stream in listener.incoming() {
        if stop.load(Ordering::SeqCst) {
            break;
        }
        match stream {
            Ok(stream) => {
                let context = context.clone();
                let spawned = thread::Builder::new()
                    .name("trestle-connection".to_string())
                    .spawn(move || {
                        let conn_id = context.states.register();
                        match handle_connection(stream, &context, conn_id) {
                            Ok(()) => debug!("connection {conn_id} closed"),
                            Err(err) => debug!("connection {conn_id} terminated: {err}"),
                        }
                        context.states.remove(conn_id);
                    });
                if let Err(err) = spawned {
                    warn!("failed to spawn connection thread: {err}");
                }
            }
            Err(err) => warn!("broken connection: {err:?}"),
        }
    }
}

struct ServerConnection {
    stream: TcpStream,
    encoder: ObjectEncoder,
    decoder: ObjectDecoder,
}

impl ServerConnection {
    fn write(&mut self, message: &dyn std::any::Any) -> Result<(), Error> {
        let mut stream = &self.stream;
        self.encoder.write_object(&mut stream, Some(message))
    }

    fn read(&mut self) -> Result<Option<AnyObject>, Error> {
        let mut stream = &self.stream;
        self.decoder.read_object(&mut stream)
    }

    fn read_required(&mut self) -> Result<AnyObject, Error> {
        self.read()?
            .ok_or_else(|| Error::invalid_data("unexpected null protocol message"))
    }
}

fn handle_connection(
    stream: TcpStream,
    context: &ServerContext,
    conn_id: u64,
) -> Result<(), Error> {
    let mut conn = ServerConnection {
        stream,
        encoder: ObjectEncoder::new(context.registry.clone()),
        decoder: ObjectDecoder::new(context.registry.clone()),
    };

    let _locale = downcast_into::<Locale>(conn.read_required()?)?;
    let key = downcast_into::<GuardedString>(conn.read_required()?)?;
    if key.digest() != context.key_digest {
        warn!("connection {conn_id} presented an invalid framework key");
        let part = OperationResponsePart {
            result: None,
            error: Some(RemoteError {
                kind: "InvalidCredential".to_string(),
                message: "remote framework key rejected".to_string(),
                cause: None,
                stack_trace: None,
            }),
        };
        conn.write(&part)?;
        return Ok(());
    }

    loop {
        context.states.set(conn_id, ConnectionState::Idle);
        let msg = match conn.read() {
            Ok(Some(msg)) => msg,
            Ok(None) => return Err(Error::invalid_data("null request message")),
            Err(err) => {
                // peer went away between requests; a normal end of life
                debug!("connection {conn_id} input ended: {err}");
                return Ok(());
            }
        };

        let msg = match msg.downcast::<HelloRequest>() {
            Ok(_) => {
                let response = HelloResponse {
                    connector_infos: context.catalog.connector_infos(),
                };
                conn.write(&response)?;
                continue;
            }
            Err(other) => other,
        };
        let msg = match msg.downcast::<EchoMessage>() {
            Ok(echo) => {
                conn.write(&*echo)?;
                continue;
            }
            Err(other) => other,
        };
        let request = downcast_into::<OperationRequest>(msg)?;
        context
            .states
            .set(conn_id, ConnectionState::Dispatching(request.operation));

        if request.operation.is_streaming() {
            let outcome = {
                let mut sink = ResultSink {
                    conn: &mut conn,
                    states: context.states.as_ref(),
                    conn_id,
                    sent: 0,
                    stopped: false,
                };
                context.executor.execute(&request, &mut sink)
            };
            if let Err(err) = outcome {
                let part = OperationResponsePart {
                    result: None,
                    error: Some(RemoteError::from_error(&err)),
                };
                conn.write(&part)?;
            }
            // the end message goes out unconditionally so the client's
            // read loop always has a termination signal
            conn.write(&OperationResponseEnd)?;
        } else {
            let outcome = {
                let mut sink = ResultSink {
                    conn: &mut conn,
                    states: context.states.as_ref(),
                    conn_id,
                    sent: 0,
                    stopped: false,
                };
                context.executor.execute(&request, &mut sink)
            };
            let part = match outcome {
                Ok(result) => OperationResponsePart {
                    result,
                    error: None,
                },
                Err(err) => OperationResponsePart {
                    result: None,
                    error: Some(RemoteError::from_error(&err)),
                },
            };
            conn.write(&part)?;
        }
    }
}

/// Where a streaming operation pushes its results.
///
/// Every [`PAUSE_INTERVAL`]-th item is followed by a pause checkpoint:
/// the sink blocks until the client answers continue or stop. `send`
/// returning `Ok(false)` tells the producer to stop; producing further
/// items is harmless but pointless.
pub struct ResultSink<'a> {
    conn: &'a mut ServerConnection,
    states: &'a ConnectionStateTable,
    conn_id: u64,
    sent: usize,
    stopped: bool,
}

impl ResultSink<'_> {
    pub fn send(&mut self, object: Option<AnyObject>) -> Result<bool, Error> {
        if self.stopped {
            return Ok(false);
        }
        let part = OperationResponsePart {
            result: object,
            error: None,
        };
        self.conn.write(&part)?;
        self.sent += 1;
        self.states
            .set(self.conn_id, ConnectionState::Streaming { sent: self.sent });
        if self.sent % PAUSE_INTERVAL == 0 {
            self.conn.write(&OperationResponsePause)?;
            let reply = self.conn.read_required()?;
            let reply = match reply.downcast::<OperationRequestMoreData>() {
                Ok(_) => return Ok(true),
                Err(other) => other,
            };
            if reply.downcast::<OperationRequestStopData>().is_ok() {
                debug!("client requested stream stop on connection {}", self.conn_id);
                self.stopped = true;
                return Ok(false);
            }
            return Err(Error::invalid_data("unexpected flow-control message"));
        }
        Ok(true)
    }

    pub fn sent(&self) -> usize {
        self.sent
    }

    pub fn stopped(&self) -> bool {
        self.stopped
    }
}
