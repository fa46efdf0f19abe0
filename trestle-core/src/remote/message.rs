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

//! The wire message set and its serial handlers.
//!
//! Every message is an ordinary registered serial type; the protocol
//! layers above only ever write and read whole top-level objects.

use std::any::Any;

use crate::api::{ConfigurationProperties, ConnectorInfoData, ConnectorKey, Operation};
use crate::error::{Error, RemoteError};
use crate::serial::{
    as_dyn, downcast_into, expect_ref, required_into, AnyList, AnyObject, FieldReader,
    FieldWriter, SerialRegistry,
};

/// Locale of the calling side, sent first on every connection.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Locale {
    pub language: String,
    pub country: String,
}

impl Default for Locale {
    fn default() -> Self {
        Locale {
            language: "en".to_string(),
            country: String::new(),
        }
    }
}

/// Asks the server for its connector catalog.
pub struct HelloRequest;

/// The server's catalog of available connectors.
pub struct HelloResponse {
    pub connector_infos: Vec<ConnectorInfoData>,
}

// `ConnectorInfoData` transitively carries `AnyObject` (`Box<dyn Any + Send>`),
// which has no `Debug`, so the struct cannot derive it. Callers that only need
// `Debug` for a `Result::unwrap_err` bound are served by a summary form.
impl std::fmt::Debug for HelloResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelloResponse")
            .field("connector_infos", &self.connector_infos.len())
            .finish()
    }
}

/// Diagnostic round-trip: the server reflects the message back unchanged.
pub struct EchoMessage {
    pub object: Option<AnyObject>,
}

/// One operation invocation addressed to a connector.
pub struct OperationRequest {
    pub connector_key: ConnectorKey,
    pub configuration: ConfigurationProperties,
    pub operation: Operation,
    pub arguments: AnyList,
}

/// One result envelope: a value, a streamed item, or a marshaled error.
pub struct OperationResponsePart {
    pub result: Option<AnyObject>,
    pub error: Option<RemoteError>,
}

/// Flow control: the server pauses until the client answers with
/// [`OperationRequestMoreData`] or [`OperationRequestStopData`].
pub struct OperationResponsePause;

/// Terminates a streamed response. Always sent, even after early stop.
pub struct OperationResponseEnd;

/// Client acknowledgment: keep streaming.
pub struct OperationRequestMoreData;

/// Client acknowledgment: stop producing results.
pub struct OperationRequestStopData;

fn write_locale(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let locale = expect_ref::<Locale>(value)?;
    w.write_string("language", &locale.language);
    w.write_string("country", &locale.country);
    Ok(())
}

fn read_locale(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(Locale {
        language: r.read_string("language", "")?,
        country: r.read_string("country", "")?,
    }))
}

fn write_remote_error(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let error = expect_ref::<RemoteError>(value)?;
    w.write_string("kind", &error.kind);
    w.write_string("message", &error.message);
    if let Some(trace) = &error.stack_trace {
        w.write_string("stackTrace", trace);
    }
    let cause = error.cause.as_deref().map(|c| c as &dyn Any);
    w.write_object("cause", cause)
}

fn read_remote_error(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let cause = match r.read_object("cause")? {
        Some(obj) => Some(Box::new(downcast_into::<RemoteError>(obj)?)),
        None => None,
    };
    Ok(Box::new(RemoteError {
        kind: r.read_string("kind", "")?,
        message: r.read_string("message", "")?,
        cause,
        stack_trace: r.read_opt_string("stackTrace")?,
    }))
}

fn write_hello_request(_value: &dyn Any, _w: &mut FieldWriter<'_>) -> Result<(), Error> {
    Ok(())
}

fn read_hello_request(_r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(HelloRequest))
}

fn write_hello_response(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let response = expect_ref::<HelloResponse>(value)?;
    for info in &response.connector_infos {
        w.write_anonymous_object(Some(info as &dyn Any))?;
    }
    Ok(())
}

fn read_hello_response(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let mut connector_infos = Vec::with_capacity(r.anonymous_count());
    for i in 0..r.anonymous_count() {
        connector_infos.push(required_into::<ConnectorInfoData>(
            r.read_anonymous(i)?,
            "connector info",
        )?);
    }
    Ok(Box::new(HelloResponse { connector_infos }))
}

fn write_echo(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let echo = expect_ref::<EchoMessage>(value)?;
    w.write_object("object", as_dyn(&echo.object))
}

fn read_echo(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    Ok(Box::new(EchoMessage {
        object: r.read_object("object")?,
    }))
}

fn write_operation_request(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let request = expect_ref::<OperationRequest>(value)?;
    w.write_object("connectorKey", Some(&request.connector_key as &dyn Any))?;
    w.write_object("configuration", Some(&request.configuration as &dyn Any))?;
    w.write_string("operation", request.operation.as_str());
    w.write_object("arguments", Some(&request.arguments as &dyn Any))
}

fn read_operation_request(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let operation = Operation::parse(&r.read_string("operation", "")?)?;
    let arguments = match r.read_object("arguments")? {
        Some(obj) => downcast_into::<AnyList>(obj)?,
        None => AnyList(Vec::new()),
    };
    Ok(Box::new(OperationRequest {
        connector_key: required_into(r.read_object("connectorKey")?, "connector key")?,
        configuration: required_into(
            r.read_object("configuration")?,
            "configuration properties",
        )?,
        operation,
        arguments,
    }))
}

fn write_response_part(value: &dyn Any, w: &mut FieldWriter<'_>) -> Result<(), Error> {
    let part = expect_ref::<OperationResponsePart>(value)?;
    let error = part.error.as_ref().map(|e| e as &dyn Any);
    w.write_object("error", error)?;
    w.write_object("result", as_dyn(&part.result))
}

fn read_response_part(r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
    let error = match r.read_object("error")? {
        Some(obj) => Some(downcast_into::<RemoteError>(obj)?),
        None => None,
    };
    Ok(Box::new(OperationResponsePart {
        result: r.read_object("result")?,
        error,
    }))
}

macro_rules! empty_message_handler {
    ($ty:ty, $write:ident, $read:ident) => {
        fn $write(_value: &dyn Any, _w: &mut FieldWriter<'_>) -> Result<(), Error> {
            Ok(())
        }

        fn $read(_r: &mut FieldReader<'_>) -> Result<AnyObject, Error> {
            Ok(Box::new(<$ty>::default()))
        }
    };
}

impl Default for OperationResponsePause {
    fn default() -> Self {
        OperationResponsePause
    }
}

impl Default for OperationResponseEnd {
    fn default() -> Self {
        OperationResponseEnd
    }
}

impl Default for OperationRequestMoreData {
    fn default() -> Self {
        OperationRequestMoreData
    }
}

impl Default for OperationRequestStopData {
    fn default() -> Self {
        OperationRequestStopData
    }
}

empty_message_handler!(OperationResponsePause, write_pause, read_pause);
empty_message_handler!(OperationResponseEnd, write_end, read_end);
empty_message_handler!(OperationRequestMoreData, write_more_data, read_more_data);
empty_message_handler!(OperationRequestStopData, write_stop_data, read_stop_data);

pub(crate) fn register_serial_types(registry: &mut SerialRegistry) -> Result<(), Error> {
    registry.register::<Locale>("Locale", write_locale, read_locale)?;
    registry.register::<RemoteError>("RemoteError", write_remote_error, read_remote_error)?;
    registry.register::<HelloRequest>("HelloRequest", write_hello_request, read_hello_request)?;
    registry.register::<HelloResponse>("HelloResponse", write_hello_response, read_hello_response)?;
    registry.register::<EchoMessage>("EchoMessage", write_echo, read_echo)?;
    registry.register::<OperationRequest>(
        "OperationRequest",
        write_operation_request,
        read_operation_request,
    )?;
    registry.register::<OperationResponsePart>(
        "OperationResponsePart",
        write_response_part,
        read_response_part,
    )?;
    registry.register::<OperationResponsePause>(
        "OperationResponsePause",
        write_pause,
        read_pause,
    )?;
    registry.register::<OperationResponseEnd>("OperationResponseEnd", write_end, read_end)?;
    registry.register::<OperationRequestMoreData>(
        "OperationRequestMoreData",
        write_more_data,
        read_more_data,
    )?;
    registry.register::<OperationRequestStopData>(
        "OperationRequestStopData",
        write_stop_data,
        read_stop_data,
    )?;
    Ok(())
}
