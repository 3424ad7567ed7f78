//! HTTP transport for the Avatica protobuf protocol.
//!
//! Every call POSTs one `WireMessage` envelope to the server URL and decodes
//! the matching response envelope. Connection failures and `503` answers are
//! retried with a fixed delay, other non-200 answers are turned into
//! categorized errors.

use crate::config::{parse_url, AuthConfig, ClientConfig, TlsVerify};
use avatica_core::{AvaticaError, Result, SqlErrorInfo};
use avatica_protocol::fault::{is_error_page, parse_error_envelope, parse_error_page};
use avatica_protocol::messages::{
    ConnectionProperties, Frame, QueryState, Signature, StatementHandle, TypedValue,
};
use avatica_protocol::requests::*;
use avatica_protocol::responses::{
    DatabasePropertyElement, ResultSetResponse, SyncResultsResponse,
};
use avatica_protocol::wire::{decode_response, encode_request, AvaticaRequest};
use bytes::Bytes;
use metrics::counter;
use parking_lot::Mutex;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{StatusCode, Url};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, warn};

pub const PROTOBUF_CONTENT_TYPE: &str = "application/x-google-protobuf";

pub struct AvaticaClient {
    url: Url,
    http: Mutex<Option<reqwest::Client>>,
    auth: Option<AuthConfig>,
    max_retries: u32,
    retry_delay: Duration,
}

impl AvaticaClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let url = parse_url(&config.url)?;
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(PROTOBUF_CONTENT_TYPE));
        for (name, value) in &config.extra_headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| AvaticaError::interface(format!("invalid header {name}: {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| AvaticaError::interface(format!("invalid header value: {err}")))?;
            headers.insert(name, value);
        }

        let mut builder = reqwest::Client::builder().default_headers(headers);
        match &config.verify {
            TlsVerify::Enabled(true) => {}
            TlsVerify::Enabled(false) => builder = builder.danger_accept_invalid_certs(true),
            TlsVerify::CaFile(path) => {
                let pem = std::fs::read(path).map_err(|err| {
                    AvaticaError::interface(format!("failed to read {}: {err}", path.display()))
                })?;
                let certificate = reqwest::Certificate::from_pem(&pem)
                    .map_err(|err| AvaticaError::interface(format!("invalid ca file: {err}")))?;
                builder = builder.add_root_certificate(certificate);
            }
        }
        let http = builder
            .build()
            .map_err(|err| AvaticaError::interface(format!("failed to build http client: {err}")))?;

        Ok(Self {
            url,
            http: Mutex::new(Some(http)),
            auth: config.auth.clone(),
            max_retries: config.effective_max_retries(),
            retry_delay: config.retry_delay(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn is_closed(&self) -> bool {
        self.http.lock().is_none()
    }

    /// Releases the HTTP client. Later calls fail with an interface error.
    pub fn close(&self) -> Result<()> {
        match self.http.lock().take() {
            Some(_) => Ok(()),
            None => Err(AvaticaError::programming("The transport is already closed.")),
        }
    }

    /// Sends one request and decodes the response type paired with it.
    pub async fn send<R: AvaticaRequest>(&self, request: &R) -> Result<R::Response> {
        let name = short_name(R::WIRE_NAME);
        debug!(request = name, "sending avatica request");
        counter!("avatica_request_total").increment(1);

        let body = Bytes::from(encode_request(request));
        let response = self.post(body, name).await?;
        let status = response.status();
        let payload = response.bytes().await.map_err(|err| AvaticaError::Interface {
            message: format!("failed to read response body: {err}"),
            status: Some(status.as_u16()),
        })?;

        if status != StatusCode::OK {
            counter!("avatica_request_error_total").increment(1);
            debug!(request = name, status = status.as_u16(), "avatica request failed");
            return Err(error_for_status(status, &payload));
        }
        decode_response::<R::Response>(&payload)
    }

    async fn post(&self, body: Bytes, name: &str) -> Result<reqwest::Response> {
        let http = self
            .http
            .lock()
            .clone()
            .ok_or_else(|| AvaticaError::interface("transport is closed"))?;
        let mut last_failure = String::new();
        for attempt in 1..=self.max_retries {
            let mut request = http.post(self.url.clone()).body(body.clone());
            if let Some(auth) = &self.auth {
                request = request.basic_auth(&auth.username, Some(&auth.password));
            }
            match request.send().await {
                Ok(response) if response.status() != StatusCode::SERVICE_UNAVAILABLE => {
                    return Ok(response)
                }
                Ok(_) => {
                    last_failure = "service unavailable".to_string();
                    warn!(request = name, attempt, "server unavailable, retrying");
                }
                Err(err) => {
                    warn!(request = name, attempt, "request failed: {err}");
                    last_failure = err.to_string();
                }
            }
            counter!("avatica_request_retry_total").increment(1);
            if attempt < self.max_retries {
                tokio::time::sleep(self.retry_delay).await;
            }
        }
        counter!("avatica_request_error_total").increment(1);
        Err(AvaticaError::MaxRetries(format!(
            "{name} failed after {} attempts: {last_failure}",
            self.max_retries
        )))
    }

    pub async fn open_connection(
        &self,
        connection_id: &str,
        info: HashMap<String, String>,
    ) -> Result<()> {
        self.send(&OpenConnectionRequest {
            connection_id: connection_id.to_string(),
            info,
        })
        .await?;
        Ok(())
    }

    pub async fn close_connection(&self, connection_id: &str) -> Result<()> {
        self.send(&CloseConnectionRequest {
            connection_id: connection_id.to_string(),
        })
        .await?;
        Ok(())
    }

    /// Pushes session properties and returns the server's view of them.
    pub async fn connection_sync(
        &self,
        connection_id: &str,
        properties: ConnectionProperties,
    ) -> Result<Option<ConnectionProperties>> {
        let response = self
            .send(&ConnectionSyncRequest {
                connection_id: connection_id.to_string(),
                conn_props: Some(properties),
            })
            .await?;
        Ok(response.conn_props)
    }

    pub async fn database_properties(
        &self,
        connection_id: &str,
    ) -> Result<Vec<DatabasePropertyElement>> {
        let response = self
            .send(&DatabasePropertyRequest {
                connection_id: connection_id.to_string(),
            })
            .await?;
        Ok(response.props)
    }

    pub async fn get_catalogs(&self, connection_id: &str) -> Result<ResultSetResponse> {
        self.send(&CatalogsRequest {
            connection_id: connection_id.to_string(),
        })
        .await
    }

    pub async fn get_schemas(
        &self,
        connection_id: &str,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
    ) -> Result<ResultSetResponse> {
        self.send(&SchemasRequest {
            connection_id: connection_id.to_string(),
            catalog: catalog.unwrap_or_default().to_string(),
            schema_pattern: schema_pattern.unwrap_or_default().to_string(),
        })
        .await
    }

    pub async fn get_tables(
        &self,
        connection_id: &str,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_name_pattern: Option<&str>,
        type_list: Option<&[&str]>,
    ) -> Result<ResultSetResponse> {
        self.send(&TablesRequest {
            connection_id: connection_id.to_string(),
            catalog: catalog.unwrap_or_default().to_string(),
            schema_pattern: schema_pattern.unwrap_or_default().to_string(),
            table_name_pattern: table_name_pattern.unwrap_or_default().to_string(),
            type_list: type_list
                .map(|types| types.iter().map(|t| t.to_string()).collect())
                .unwrap_or_default(),
            has_type_list: type_list.is_some(),
        })
        .await
    }

    pub async fn get_columns(
        &self,
        connection_id: &str,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_name_pattern: Option<&str>,
        column_name_pattern: Option<&str>,
    ) -> Result<ResultSetResponse> {
        self.send(&ColumnsRequest {
            connection_id: connection_id.to_string(),
            catalog: catalog.unwrap_or_default().to_string(),
            schema_pattern: schema_pattern.unwrap_or_default().to_string(),
            table_name_pattern: table_name_pattern.unwrap_or_default().to_string(),
            column_name_pattern: column_name_pattern.unwrap_or_default().to_string(),
        })
        .await
    }

    pub async fn get_table_types(&self, connection_id: &str) -> Result<ResultSetResponse> {
        self.send(&TableTypesRequest {
            connection_id: connection_id.to_string(),
        })
        .await
    }

    pub async fn get_type_info(&self, connection_id: &str) -> Result<ResultSetResponse> {
        self.send(&TypeInfoRequest {
            connection_id: connection_id.to_string(),
        })
        .await
    }

    pub async fn create_statement(&self, connection_id: &str) -> Result<u32> {
        let response = self
            .send(&CreateStatementRequest {
                connection_id: connection_id.to_string(),
            })
            .await?;
        Ok(response.statement_id)
    }

    pub async fn close_statement(&self, connection_id: &str, statement_id: u32) -> Result<()> {
        self.send(&CloseStatementRequest {
            connection_id: connection_id.to_string(),
            statement_id,
        })
        .await?;
        Ok(())
    }

    pub async fn prepare_and_execute(
        &self,
        connection_id: &str,
        statement_id: u32,
        sql: &str,
        max_rows_total: Option<i64>,
        first_frame_max_size: Option<i32>,
    ) -> Result<Vec<ResultSetResponse>> {
        let response = self
            .send(&PrepareAndExecuteRequest {
                connection_id: connection_id.to_string(),
                statement_id,
                sql: sql.to_string(),
                max_row_count: 0,
                max_rows_total: max_rows_total.unwrap_or_default(),
                first_frame_max_size: first_frame_max_size.unwrap_or_default(),
            })
            .await?;
        if response.missing_statement {
            return Err(missing("PrepareAndExecute reported missing statement"));
        }
        Ok(response.results)
    }

    pub async fn prepare(
        &self,
        connection_id: &str,
        sql: &str,
        max_rows_total: Option<i64>,
    ) -> Result<StatementHandle> {
        let response = self
            .send(&PrepareRequest {
                connection_id: connection_id.to_string(),
                sql: sql.to_string(),
                max_row_count: 0,
                max_rows_total: max_rows_total.unwrap_or_default(),
            })
            .await?;
        response
            .statement
            .ok_or_else(|| AvaticaError::interface("prepare response carried no statement"))
    }

    /// `parameter_values` of `None` leaves `has_parameter_values` unset.
    pub async fn execute(
        &self,
        connection_id: &str,
        statement_id: u32,
        signature: Option<Signature>,
        parameter_values: Option<Vec<TypedValue>>,
        first_frame_max_size: Option<i32>,
    ) -> Result<Vec<ResultSetResponse>> {
        let has_parameter_values = parameter_values.is_some();
        let first_frame_max_size = first_frame_max_size.unwrap_or_default();
        let response = self
            .send(&ExecuteRequest {
                statement_handle: Some(StatementHandle {
                    connection_id: connection_id.to_string(),
                    id: statement_id,
                    signature,
                }),
                parameter_values: parameter_values.unwrap_or_default(),
                has_parameter_values,
                deprecated_first_frame_max_size: first_frame_max_size.max(0) as u64,
                first_frame_max_size,
            })
            .await?;
        if response.missing_statement {
            return Err(missing("Execute reported missing statement"));
        }
        Ok(response.results)
    }

    pub async fn execute_batch(
        &self,
        connection_id: &str,
        statement_id: u32,
        rows: Vec<Vec<TypedValue>>,
    ) -> Result<Vec<u64>> {
        let response = self
            .send(&ExecuteBatchRequest {
                connection_id: connection_id.to_string(),
                statement_id,
                updates: rows
                    .into_iter()
                    .map(|parameter_values| UpdateBatch { parameter_values })
                    .collect(),
            })
            .await?;
        if response.missing_statement {
            return Err(missing("ExecuteBatch reported missing statement"));
        }
        Ok(response.update_counts)
    }

    pub async fn fetch(
        &self,
        connection_id: &str,
        statement_id: u32,
        offset: u64,
        frame_max_size: Option<i32>,
    ) -> Result<Frame> {
        let response = self
            .send(&FetchRequest {
                connection_id: connection_id.to_string(),
                statement_id,
                offset,
                fetch_max_row_count: 0,
                frame_max_size: frame_max_size.unwrap_or_default(),
            })
            .await?;
        if response.missing_statement {
            return Err(missing("Fetch reported missing statement"));
        }
        if response.missing_results {
            return Err(missing("Fetch reported missing results"));
        }
        response
            .frame
            .ok_or_else(|| AvaticaError::interface("fetch response carried no frame"))
    }

    pub async fn sync_results(
        &self,
        connection_id: &str,
        statement_id: u32,
        state: QueryState,
        offset: u64,
    ) -> Result<SyncResultsResponse> {
        let response = self
            .send(&SyncResultsRequest {
                connection_id: connection_id.to_string(),
                statement_id,
                state: Some(state),
                offset,
            })
            .await?;
        if response.missing_statement {
            return Err(missing("SyncResults reported missing statement"));
        }
        Ok(response)
    }

    pub async fn commit(&self, connection_id: &str) -> Result<()> {
        self.send(&CommitRequest {
            connection_id: connection_id.to_string(),
        })
        .await?;
        Ok(())
    }

    pub async fn rollback(&self, connection_id: &str) -> Result<()> {
        self.send(&RollbackRequest {
            connection_id: connection_id.to_string(),
        })
        .await?;
        Ok(())
    }
}

fn missing(message: &str) -> AvaticaError {
    AvaticaError::Database(SqlErrorInfo::message(message))
}

fn short_name(wire_name: &str) -> &str {
    wire_name.rsplit('$').next().unwrap_or(wire_name)
}

/// HTML error page first, then an `ErrorResponse` envelope, then the bare status.
fn error_for_status(status: StatusCode, body: &[u8]) -> AvaticaError {
    let parsed = if is_error_page(body) {
        parse_error_page(&String::from_utf8_lossy(body))
    } else {
        parse_error_envelope(body)
    };
    parsed.unwrap_or_else(|| AvaticaError::Interface {
        message: "RPC request returned invalid status code".to_string(),
        status: Some(status.as_u16()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use avatica_core::ErrorCategory;

    #[test]
    fn short_names_strip_namespace() {
        assert_eq!(short_name(CommitRequest::WIRE_NAME), "CommitRequest");
        assert_eq!(short_name("plain"), "plain");
    }

    #[test]
    fn unknown_failure_bodies_keep_status() {
        let err = error_for_status(StatusCode::INTERNAL_SERVER_ERROR, b"oops");
        assert_eq!(err.status(), Some(500));
        assert_eq!(err.to_string(), "interface error: RPC request returned invalid status code");
    }

    #[test]
    fn html_bodies_go_through_page_parser() {
        let page = b"<html><body><h2>HTTP ERROR: 500</h2><p><pre>ERROR 1012 (42M03): \
                     Table undefined. -&gt; x</pre></p></body></html>";
        let err = error_for_status(StatusCode::INTERNAL_SERVER_ERROR, page);
        assert_eq!(err.category(), Some(ErrorCategory::Programming));
    }

    #[test]
    fn closing_twice_is_a_programming_error() {
        let client = AvaticaClient::new(&ClientConfig::new("localhost")).expect("client");
        assert_eq!(client.url().as_str(), "http://localhost:8765/");
        client.close().expect("close");
        assert!(client.is_closed());
        let err = client.close().expect_err("second close");
        assert_eq!(err.category(), Some(ErrorCategory::Programming));
    }
}
