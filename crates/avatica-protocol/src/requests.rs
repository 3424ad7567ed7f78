//! Client-to-server messages (`requests.proto`).

use crate::messages::{ConnectionProperties, QueryState, StatementHandle, TypedValue};
use prost::Message;
use std::collections::HashMap;

#[derive(Clone, PartialEq, Message)]
pub struct CatalogsRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct DatabasePropertyRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SchemasRequest {
    #[prost(string, tag = "1")]
    pub catalog: String,
    #[prost(string, tag = "2")]
    pub schema_pattern: String,
    #[prost(string, tag = "3")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct TablesRequest {
    #[prost(string, tag = "1")]
    pub catalog: String,
    #[prost(string, tag = "2")]
    pub schema_pattern: String,
    #[prost(string, tag = "3")]
    pub table_name_pattern: String,
    #[prost(string, repeated, tag = "4")]
    pub type_list: Vec<String>,
    #[prost(bool, tag = "6")]
    pub has_type_list: bool,
    #[prost(string, tag = "7")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct TableTypesRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ColumnsRequest {
    #[prost(string, tag = "1")]
    pub catalog: String,
    #[prost(string, tag = "2")]
    pub schema_pattern: String,
    #[prost(string, tag = "3")]
    pub table_name_pattern: String,
    #[prost(string, tag = "4")]
    pub column_name_pattern: String,
    #[prost(string, tag = "5")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct TypeInfoRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrepareAndExecuteRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(string, tag = "2")]
    pub sql: String,
    #[prost(uint64, tag = "3")]
    pub max_row_count: u64,
    #[prost(uint32, tag = "4")]
    pub statement_id: u32,
    #[prost(int64, tag = "5")]
    pub max_rows_total: i64,
    #[prost(int32, tag = "6")]
    pub first_frame_max_size: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct PrepareRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(string, tag = "2")]
    pub sql: String,
    #[prost(uint64, tag = "3")]
    pub max_row_count: u64,
    #[prost(int64, tag = "4")]
    pub max_rows_total: i64,
}

#[derive(Clone, PartialEq, Message)]
pub struct FetchRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(uint64, tag = "3")]
    pub offset: u64,
    #[prost(uint32, tag = "4")]
    pub fetch_max_row_count: u32,
    #[prost(int32, tag = "5")]
    pub frame_max_size: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct CreateStatementRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct CloseStatementRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
}

#[derive(Clone, PartialEq, Message)]
pub struct OpenConnectionRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(map = "string, string", tag = "2")]
    pub info: HashMap<String, String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct CloseConnectionRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct ConnectionSyncRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(message, optional, tag = "2")]
    pub conn_props: Option<ConnectionProperties>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExecuteRequest {
    #[prost(message, optional, tag = "1")]
    pub statement_handle: Option<StatementHandle>,
    #[prost(message, repeated, tag = "2")]
    pub parameter_values: Vec<TypedValue>,
    #[prost(uint64, tag = "3")]
    pub deprecated_first_frame_max_size: u64,
    #[prost(bool, tag = "4")]
    pub has_parameter_values: bool,
    #[prost(int32, tag = "5")]
    pub first_frame_max_size: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct SyncResultsRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(message, optional, tag = "3")]
    pub state: Option<QueryState>,
    #[prost(uint64, tag = "4")]
    pub offset: u64,
}

#[derive(Clone, PartialEq, Message)]
pub struct CommitRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct RollbackRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct UpdateBatch {
    #[prost(message, repeated, tag = "1")]
    pub parameter_values: Vec<TypedValue>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ExecuteBatchRequest {
    #[prost(string, tag = "1")]
    pub connection_id: String,
    #[prost(uint32, tag = "2")]
    pub statement_id: u32,
    #[prost(message, repeated, tag = "3")]
    pub updates: Vec<UpdateBatch>,
}
