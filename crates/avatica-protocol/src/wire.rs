use crate::messages::WireMessage;
use crate::requests::*;
use crate::responses::*;
use avatica_core::{AvaticaError, Result};
use prost::Message;

pub const REQUEST_NAMESPACE: &str = "org.apache.calcite.avatica.proto.Requests";
pub const RESPONSE_NAMESPACE: &str = "org.apache.calcite.avatica.proto.Responses";

pub trait AvaticaResponse: Message + Default {
    /// Fully qualified envelope name, `Responses$<TypeName>`.
    const WIRE_NAME: &'static str;
}

pub trait AvaticaRequest: Message + Default {
    /// Fully qualified envelope name, `Requests$<TypeName>`.
    const WIRE_NAME: &'static str;
    type Response: AvaticaResponse;
}

macro_rules! avatica_responses {
    ($($response:ident),* $(,)?) => {
        $(
            impl AvaticaResponse for $response {
                const WIRE_NAME: &'static str = concat!(
                    "org.apache.calcite.avatica.proto.Responses$",
                    stringify!($response)
                );
            }
        )*
    };
}

macro_rules! avatica_requests {
    ($($request:ident => $response:ident),* $(,)?) => {
        $(
            impl AvaticaRequest for $request {
                const WIRE_NAME: &'static str = concat!(
                    "org.apache.calcite.avatica.proto.Requests$",
                    stringify!($request)
                );
                type Response = $response;
            }
        )*
    };
}

avatica_responses!(
    ResultSetResponse,
    ExecuteResponse,
    PrepareResponse,
    FetchResponse,
    CreateStatementResponse,
    CloseStatementResponse,
    OpenConnectionResponse,
    CloseConnectionResponse,
    ConnectionSyncResponse,
    DatabasePropertyResponse,
    ErrorResponse,
    SyncResultsResponse,
    CommitResponse,
    RollbackResponse,
    ExecuteBatchResponse,
);

avatica_requests!(
    CatalogsRequest => ResultSetResponse,
    SchemasRequest => ResultSetResponse,
    TablesRequest => ResultSetResponse,
    TableTypesRequest => ResultSetResponse,
    ColumnsRequest => ResultSetResponse,
    TypeInfoRequest => ResultSetResponse,
    DatabasePropertyRequest => DatabasePropertyResponse,
    PrepareAndExecuteRequest => ExecuteResponse,
    PrepareRequest => PrepareResponse,
    ExecuteRequest => ExecuteResponse,
    FetchRequest => FetchResponse,
    CreateStatementRequest => CreateStatementResponse,
    CloseStatementRequest => CloseStatementResponse,
    OpenConnectionRequest => OpenConnectionResponse,
    CloseConnectionRequest => CloseConnectionResponse,
    ConnectionSyncRequest => ConnectionSyncResponse,
    SyncResultsRequest => SyncResultsResponse,
    CommitRequest => CommitResponse,
    RollbackRequest => RollbackResponse,
    ExecuteBatchRequest => ExecuteBatchResponse,
);

pub fn encode_request<R: AvaticaRequest>(request: &R) -> Vec<u8> {
    wrap(R::WIRE_NAME, request.encode_to_vec())
}

pub fn encode_response<R: AvaticaResponse>(response: &R) -> Vec<u8> {
    wrap(R::WIRE_NAME, response.encode_to_vec())
}

fn wrap(name: &str, payload: Vec<u8>) -> Vec<u8> {
    WireMessage {
        name: name.to_string(),
        wrapped_message: payload,
    }
    .encode_to_vec()
}

pub fn decode_envelope(body: &[u8]) -> Result<WireMessage> {
    WireMessage::decode(body)
        .map_err(|err| AvaticaError::interface(format!("malformed wire message: {err}")))
}

/// Decodes a response body, rejecting envelopes that carry another message type.
pub fn decode_response<R: AvaticaResponse>(body: &[u8]) -> Result<R> {
    unwrap_named(body, R::WIRE_NAME)
}

pub fn decode_request<R: AvaticaRequest>(body: &[u8]) -> Result<R> {
    unwrap_named(body, R::WIRE_NAME)
}

fn unwrap_named<M: Message + Default>(body: &[u8], expected: &str) -> Result<M> {
    let envelope = decode_envelope(body)?;
    if envelope.name != expected {
        return Err(AvaticaError::interface(format!(
            "unexpected message type \"{}\" expected \"{}\"",
            envelope.name, expected
        )));
    }
    M::decode(envelope.wrapped_message.as_slice()).map_err(|err| {
        AvaticaError::interface(format!("malformed {expected} payload: {err}"))
    })
}
