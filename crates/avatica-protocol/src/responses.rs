//! Server-to-client messages (`responses.proto`).

use crate::messages::{
    ConnectionProperties, DatabaseProperty, Frame, Severity, Signature, StatementHandle,
    TypedValue,
};
use prost::Message;

#[derive(Clone, PartialEq, Message)]
pub struct RpcMetadata {
    #[prost(string, tag = "1")]
    pub server_address: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ResultSetResponse {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(bool, tag = "3")]
    pub own_statement: bool,
    #[prost(message, optional, tag = "4")]
    pub signature: Option<Signature>,
    #[prost(message, optional, tag = "5")]
    pub first_frame: Option<Frame>,
    /// `u64::MAX` when the count does not apply.
    #[prost(uint64, tag = "6")]
    pub update_count: u64,
    #[prost(message, optional, tag = "7")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExecuteResponse {
    #[prost(message, repeated, tag = "1")]
    pub results: Vec<ResultSetResponse>,
    #[prost(bool, tag = "2")]
    pub missing_statement: bool,
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrepareResponse {
    #[prost(message, optional, tag = "1")]
    pub statement: Option<StatementHandle>,
    #[prost(message, optional, tag = "2")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FetchResponse {
    #[prost(message, optional, tag = "1")]
    pub frame: Option<Frame>,
    #[prost(bool, tag = "2")]
    pub missing_statement: bool,
    #[prost(bool, tag = "3")]
    pub missing_results: bool,
    #[prost(message, optional, tag = "4")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CreateStatementResponse {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CloseStatementResponse {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct OpenConnectionResponse {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CloseConnectionResponse {
    #[prost(message, optional, tag = "1")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ConnectionSyncResponse {
    #[prost(message, optional, tag = "1")]
    pub conn_props: Option<ConnectionProperties>,
    #[prost(message, optional, tag = "2")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DatabasePropertyElement {
    #[prost(message, optional, tag = "1")]
    pub key: Option<DatabaseProperty>,
    #[prost(message, optional, tag = "2")]
    pub value: Option<TypedValue>,
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct DatabasePropertyResponse {
    #[prost(message, repeated, tag = "1")]
    pub props: Vec<DatabasePropertyElement>,
    #[prost(message, optional, tag = "2")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ErrorResponse {
    #[prost(string, repeated, tag = "1")]
    pub exceptions: Vec<String>,
    #[prost(bool, tag = "7")]
    pub has_exceptions: bool,
    #[prost(string, tag = "2")]
    pub error_message: String,
    #[prost(enumeration = "Severity", tag = "3")]
    pub severity: i32,
    #[prost(uint32, tag = "4")]
    pub error_code: u32,
    #[prost(string, tag = "5")]
    pub sql_state: String,
    #[prost(message, optional, tag = "6")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct SyncResultsResponse {
    #[prost(bool, tag = "1")]
    pub missing_statement: bool,
    #[prost(bool, tag = "2")]
    pub more_results: bool,
    #[prost(message, optional, tag = "3")]
    pub metadata: Option<RpcMetadata>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CommitResponse {}

#[derive(Clone, PartialEq, Message)]
pub struct RollbackResponse {}

#[derive(Clone, PartialEq, Message)]
pub struct ExecuteBatchResponse {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(uint64, repeated, tag = "3")]
    pub update_counts: Vec<u64>,
    #[prost(bool, tag = "4")]
    pub missing_statement: bool,
    #[prost(message, optional, tag = "5")]
    pub metadata: Option<RpcMetadata>,
}
