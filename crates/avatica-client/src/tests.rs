#[cfg(test)]
mod tests {
    use crate::{connect, ClientConfig, Connection, ErrorCategory, Value};
    use avatica_core::AvaticaError;
    use avatica_protocol::messages::{
        AvaticaParameter, AvaticaType, ColumnMetaData, ColumnValue, ConnectionProperties, Frame,
        MetaDataOperation, Rep, Row, Signature, StatementHandle, TypedValue, WireMessage,
    };
    use avatica_protocol::requests::*;
    use avatica_protocol::responses::*;
    use avatica_protocol::wire::{encode_response, AvaticaRequest, AvaticaResponse};
    use axum::body::Bytes;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::Router;
    use parking_lot::Mutex;
    use prost::Message;
    use std::collections::HashMap;
    use std::net::SocketAddr;
    use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
    use std::sync::Arc;

    type Reply = (StatusCode, Vec<u8>);
    type Script = dyn Fn(&str, &[u8]) -> Option<Reply> + Send + Sync;

    struct FakeState {
        requests: Mutex<Vec<WireMessage>>,
        script: Box<Script>,
    }

    /// Query server stand-in: answers from a script and records every envelope.
    struct FakeServer {
        addr: SocketAddr,
        state: Arc<FakeState>,
    }

    impl FakeServer {
        async fn start(
            script: impl Fn(&str, &[u8]) -> Option<Reply> + Send + Sync + 'static,
        ) -> Self {
            let state = Arc::new(FakeState {
                requests: Mutex::new(Vec::new()),
                script: Box::new(script),
            });
            let app = Router::new()
                .route("/", post(handle))
                .with_state(state.clone());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
                .await
                .expect("bind");
            let addr = listener.local_addr().expect("addr");
            tokio::spawn(async move {
                axum::serve(listener, app).await.expect("serve");
            });
            Self { addr, state }
        }

        fn config(&self) -> ClientConfig {
            let mut config = ClientConfig::new(format!("http://{}/", self.addr));
            config.retry_delay_ms = 1;
            config
        }

        fn names(&self) -> Vec<String> {
            self.state
                .requests
                .lock()
                .iter()
                .map(|envelope| short(&envelope.name).to_string())
                .collect()
        }

        fn count(&self, name: &str) -> usize {
            self.names().iter().filter(|n| *n == name).count()
        }

        fn decoded<R: AvaticaRequest>(&self) -> Vec<R> {
            self.state
                .requests
                .lock()
                .iter()
                .filter(|envelope| envelope.name == R::WIRE_NAME)
                .map(|envelope| R::decode(envelope.wrapped_message.as_slice()).expect("decode"))
                .collect()
        }
    }

    async fn handle(State(state): State<Arc<FakeState>>, body: Bytes) -> Reply {
        let envelope = WireMessage::decode(body.as_ref()).expect("envelope");
        state.requests.lock().push(envelope.clone());
        let name = short(&envelope.name).to_string();
        (state.script)(&name, &envelope.wrapped_message)
            .unwrap_or_else(|| default_reply(&name, &envelope.wrapped_message))
    }

    fn short(name: &str) -> &str {
        name.rsplit('$').next().unwrap_or(name)
    }

    fn ok<R: AvaticaResponse>(response: R) -> Option<Reply> {
        Some((StatusCode::OK, encode_response(&response)))
    }

    fn default_reply(name: &str, payload: &[u8]) -> Reply {
        let reply = match name {
            "OpenConnectionRequest" => ok(OpenConnectionResponse::default()),
            "CloseConnectionRequest" => ok(CloseConnectionResponse::default()),
            "ConnectionSyncRequest" => {
                let request = ConnectionSyncRequest::decode(payload).expect("sync");
                ok(ConnectionSyncResponse {
                    conn_props: request.conn_props,
                    metadata: None,
                })
            }
            "CreateStatementRequest" => ok(CreateStatementResponse {
                statement_id: 1,
                ..Default::default()
            }),
            "CloseStatementRequest" => ok(CloseStatementResponse::default()),
            "CommitRequest" => ok(CommitResponse {}),
            "RollbackRequest" => ok(RollbackResponse {}),
            _ => None,
        };
        reply.unwrap_or((StatusCode::NOT_IMPLEMENTED, b"unscripted".to_vec()))
    }

    fn no_script(_: &str, _: &[u8]) -> Option<Reply> {
        None
    }

    async fn open(server: &FakeServer) -> Connection {
        connect(&server.config()).await.expect("connect")
    }

    fn column(name: &str, jdbc: i32, type_name: &str) -> ColumnMetaData {
        ColumnMetaData {
            column_name: name.to_string(),
            label: name.to_string(),
            nullable: 1,
            r#type: Some(AvaticaType {
                id: jdbc as u32,
                name: type_name.to_string(),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn int_value(value: i64) -> ColumnValue {
        ColumnValue {
            scalar_value: Some(TypedValue {
                r#type: Rep::Integer as i32,
                number_value: value,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn string_value(value: Option<&str>) -> ColumnValue {
        let typed = match value {
            Some(text) => TypedValue {
                r#type: Rep::String as i32,
                string_value: text.to_string(),
                ..Default::default()
            },
            None => TypedValue::null(),
        };
        ColumnValue {
            scalar_value: Some(typed),
            ..Default::default()
        }
    }

    fn user_row(id: i64, name: &str) -> Row {
        Row {
            value: vec![int_value(id), string_value(Some(name))],
        }
    }

    fn users_result(first_frame: Frame) -> ResultSetResponse {
        ResultSetResponse {
            statement_id: 1,
            own_statement: true,
            signature: Some(Signature {
                columns: vec![
                    column("ID", 4, "INTEGER"),
                    column("NAME", 12, "VARCHAR"),
                ],
                ..Default::default()
            }),
            first_frame: Some(first_frame),
            update_count: u64::MAX,
            ..Default::default()
        }
    }

    fn update_result(statement_id: u32, count: u64) -> ExecuteResponse {
        ExecuteResponse {
            results: vec![ResultSetResponse {
                statement_id,
                update_count: count,
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn sql_message(err: &AvaticaError) -> &str {
        err.sql_info().map(|info| info.message.as_str()).unwrap_or_default()
    }

    #[tokio::test]
    async fn connect_sends_phoenix_info_and_syncs_session() {
        let server = FakeServer::start(no_script).await;
        let config = server
            .config()
            .with_property("autocommit", "true")
            .with_property("phoenix.query.timeoutMs", "60000");
        let conn = connect(&config).await.expect("connect");

        assert_eq!(server.names(), ["OpenConnectionRequest", "ConnectionSyncRequest"]);
        let open = &server.decoded::<OpenConnectionRequest>()[0];
        assert_eq!(open.connection_id, conn.id());
        assert_eq!(
            open.info,
            HashMap::from([("phoenix.query.timeoutMs".to_string(), "60000".to_string())])
        );
        let sync = &server.decoded::<ConnectionSyncRequest>()[0];
        let props = sync.conn_props.as_ref().expect("props");
        assert!(props.has_auto_commit && props.auto_commit);
        assert!(props.has_read_only && !props.read_only);
        assert!(conn.autocommit());
        assert!(!conn.readonly());
    }

    #[tokio::test]
    async fn connect_without_session_properties_still_syncs() {
        let server = FakeServer::start(|name, _| match name {
            "ConnectionSyncRequest" => ok(ConnectionSyncResponse {
                conn_props: Some(ConnectionProperties {
                    auto_commit: true,
                    has_auto_commit: true,
                    has_read_only: true,
                    transaction_isolation: 8,
                    catalog: "SYSTEM".into(),
                    schema: "APP".into(),
                    ..Default::default()
                }),
                metadata: None,
            }),
            _ => None,
        })
        .await;
        let conn = open(&server).await;

        assert_eq!(server.names(), ["OpenConnectionRequest", "ConnectionSyncRequest"]);
        let sync = &server.decoded::<ConnectionSyncRequest>()[0];
        let props = sync.conn_props.as_ref().expect("props");
        assert!(props.has_auto_commit && !props.auto_commit);
        assert!(props.has_read_only && !props.read_only);

        assert!(conn.autocommit());
        assert!(!conn.readonly());
        assert_eq!(conn.transaction_isolation(), 8);
        assert_eq!(conn.catalog(), "SYSTEM");
        assert_eq!(conn.schema(), "APP");
    }

    #[tokio::test]
    async fn toggling_one_flag_keeps_the_other() {
        let server = FakeServer::start(no_script).await;
        let config = server.config().with_property("readOnly", "true");
        let conn = connect(&config).await.expect("connect");
        conn.set_autocommit(true).await.expect("autocommit");

        let syncs = server.decoded::<ConnectionSyncRequest>();
        assert_eq!(syncs.len(), 2);
        let props = syncs[1].conn_props.as_ref().expect("props");
        assert!(props.auto_commit);
        assert!(props.read_only);
        assert!(conn.autocommit() && conn.readonly());

        conn.set_transaction_isolation(2).await.expect("isolation");
        assert_eq!(conn.transaction_isolation(), 2);
        assert!(conn.autocommit());
    }

    #[tokio::test]
    async fn fetchall_follows_continuation_frames() {
        let server = FakeServer::start(|name, _| match name {
            "PrepareAndExecuteRequest" => ok(ExecuteResponse {
                results: vec![users_result(Frame {
                    offset: 0,
                    done: false,
                    rows: vec![user_row(1, "a"), user_row(2, "b")],
                })],
                ..Default::default()
            }),
            "FetchRequest" => ok(FetchResponse {
                frame: Some(Frame {
                    offset: 2,
                    done: true,
                    rows: vec![user_row(3, "c")],
                }),
                ..Default::default()
            }),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        cursor.execute("SELECT id, name FROM users").await.expect("execute");

        assert_eq!(cursor.rowcount(), -1);
        assert_eq!(cursor.rownumber(), Some(0));
        let description = cursor.description().expect("description");
        assert_eq!(description[1].name, "NAME");
        assert_eq!(description[1].type_name, "VARCHAR");
        assert_eq!(description[1].nullability.null_ok(), Some(true));

        let rows = cursor.fetchall().await.expect("fetchall");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2], vec![Value::Int(3), Value::String("c".into())]);
        assert_eq!(cursor.fetchone().await.expect("exhausted"), None);

        assert_eq!(
            server.names(),
            [
                "OpenConnectionRequest",
                "ConnectionSyncRequest",
                "CreateStatementRequest",
                "PrepareAndExecuteRequest",
                "FetchRequest",
            ]
        );
        let execute = &server.decoded::<PrepareAndExecuteRequest>()[0];
        assert_eq!(execute.statement_id, 1);
        assert_eq!(execute.first_frame_max_size, 2000);
        let fetch = &server.decoded::<FetchRequest>()[0];
        assert_eq!(fetch.statement_id, 1);
        assert_eq!(fetch.offset, 2);
        assert_eq!(fetch.frame_max_size, 2000);
    }

    #[tokio::test]
    async fn fetch_helpers_respect_sizes_and_labels() {
        let server = FakeServer::start(|name, _| match name {
            "PrepareAndExecuteRequest" => ok(ExecuteResponse {
                results: vec![users_result(Frame {
                    offset: 0,
                    done: true,
                    rows: vec![user_row(1, "a"), user_row(2, "b"), user_row(3, "c")],
                })],
                ..Default::default()
            }),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        cursor.execute("SELECT id, name FROM users").await.expect("execute");

        assert_eq!(cursor.fetchmany(None).await.expect("default size").len(), 1);
        cursor.set_arraysize(5);
        let row = cursor.fetchone_map().await.expect("map").expect("row");
        assert_eq!(row["ID"], Value::Int(2));
        assert_eq!(row["NAME"], Value::from("b"));
        assert_eq!(cursor.fetchmany_maps(None).await.expect("rest").len(), 1);
        assert!(cursor.fetchmany(Some(2)).await.expect("empty").is_empty());
    }

    #[tokio::test]
    async fn empty_unfinished_frame_is_internal_error() {
        let server = FakeServer::start(|name, _| match name {
            "PrepareAndExecuteRequest" => ok(ExecuteResponse {
                results: vec![users_result(Frame {
                    offset: 0,
                    done: false,
                    rows: Vec::new(),
                })],
                ..Default::default()
            }),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        let err = cursor.execute("SELECT 1").await.expect_err("empty frame");
        assert_eq!(err.category(), Some(ErrorCategory::Internal));
        assert_eq!(
            sql_message(&err),
            "Got an empty frame, but the statement is not done yet."
        );
    }

    #[tokio::test]
    async fn update_count_is_reported_as_rowcount() {
        let server = FakeServer::start(|name, _| match name {
            "PrepareAndExecuteRequest" => ok(update_result(1, 5)),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        assert_eq!(cursor.rowcount(), -1);
        cursor.execute("UPSERT INTO t VALUES (1)").await.expect("execute");
        assert_eq!(cursor.rowcount(), 5);
        assert!(cursor.description().is_none());

        let err = cursor.fetchone().await.expect_err("no result set");
        assert_eq!(err.category(), Some(ErrorCategory::Programming));
        assert_eq!(sql_message(&err), "No select statement was executed.");
    }

    #[tokio::test]
    async fn zero_update_count_is_zero_rowcount() {
        let server = FakeServer::start(|name, _| match name {
            "PrepareAndExecuteRequest" => ok(update_result(1, 0)),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        cursor.execute("DELETE FROM t WHERE 1 = 0").await.expect("execute");
        assert_eq!(cursor.rowcount(), 0);
    }

    #[tokio::test]
    async fn server_error_page_maps_to_integrity_error() {
        const PAGE: &str = "<html>\n<head>\n<title>Error 500 </title>\n</head>\n<body>\n\
            <h2>HTTP ERROR: 500</h2>\n<p>Problem accessing /. Reason:\n<pre>    \
            java.lang.RuntimeException: ERROR 1205 (23000): Duplicate key -&gt; x</pre></p>\n\
            </body>\n</html>\n";
        let server = FakeServer::start(|name, _| match name {
            "PrepareAndExecuteRequest" => {
                Some((StatusCode::INTERNAL_SERVER_ERROR, PAGE.as_bytes().to_vec()))
            }
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        let err = cursor.execute("UPSERT INTO t VALUES (1)").await.expect_err("500");
        assert_eq!(err.category(), Some(ErrorCategory::Integrity));
        let info = err.sql_info().expect("info");
        assert_eq!(info.code, 1205);
        assert_eq!(info.sqlstate.as_deref(), Some("23000"));
        assert_eq!(info.message, "Duplicate key");
    }

    #[tokio::test]
    async fn error_envelope_is_classified_by_sqlstate() {
        let server = FakeServer::start(|name, _| match name {
            "CommitRequest" => Some((
                StatusCode::INTERNAL_SERVER_ERROR,
                encode_response(&ErrorResponse {
                    error_message: "region server went away".into(),
                    error_code: 101,
                    sql_state: "08001".into(),
                    ..Default::default()
                }),
            )),
            "RollbackRequest" => Some((StatusCode::BAD_REQUEST, b"bad request".to_vec())),
            _ => None,
        })
        .await;
        let conn = open(&server).await;

        let err = conn.commit().await.expect_err("commit");
        assert_eq!(err.category(), Some(ErrorCategory::Operational));
        assert_eq!(err.sql_info().map(|info| info.code), Some(101));

        let err = conn.rollback().await.expect_err("rollback");
        match err {
            AvaticaError::Interface { message, status } => {
                assert_eq!(message, "RPC request returned invalid status code");
                assert_eq!(status, Some(400));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn unavailable_server_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let seen = attempts.clone();
        let server = FakeServer::start(move |name, _| match name {
            "CommitRequest" if seen.fetch_add(1, Ordering::SeqCst) < 2 => {
                Some((StatusCode::SERVICE_UNAVAILABLE, Vec::new()))
            }
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        conn.commit().await.expect("third attempt succeeds");
        assert_eq!(server.count("CommitRequest"), 3);
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn retries_are_bounded() {
        let server = FakeServer::start(|name, _| match name {
            "CommitRequest" => Some((StatusCode::SERVICE_UNAVAILABLE, Vec::new())),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let err = conn.commit().await.expect_err("unavailable");
        assert!(matches!(err, AvaticaError::MaxRetries(_)));
        assert_eq!(server.count("CommitRequest"), 3);
    }

    #[tokio::test]
    async fn unreachable_server_exhausts_retries() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        drop(listener);
        let mut config = ClientConfig::new(format!("http://{addr}/"));
        config.retry_delay_ms = 1;
        let err = connect(&config).await.err().expect("refused");
        assert!(matches!(err, AvaticaError::MaxRetries(_)));
    }

    #[tokio::test]
    async fn closing_connection_twice_is_rejected_locally() {
        let server = FakeServer::start(no_script).await;
        let conn = open(&server).await;
        conn.close().await.expect("close");
        assert!(conn.is_closed());
        let sent = server.names().len();

        let err = conn.close().await.expect_err("second close");
        assert_eq!(err.category(), Some(ErrorCategory::Programming));
        assert_eq!(sql_message(&err), "The connection is already closed.");
        assert!(conn.cursor().is_err());
        assert!(conn.meta().is_err());
        assert!(conn.commit().await.is_err());
        assert_eq!(server.names().len(), sent);
    }

    #[tokio::test]
    async fn closing_cursor_twice_is_rejected_locally() {
        let server = FakeServer::start(|name, _| match name {
            "PrepareAndExecuteRequest" => ok(update_result(1, 1)),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        cursor.execute("DELETE FROM t").await.expect("execute");
        cursor.close().await.expect("close");
        assert!(cursor.is_closed());

        let err = cursor.close().await.expect_err("second close");
        assert_eq!(sql_message(&err), "The cursor is already closed.");
        let err = cursor.execute("DELETE FROM t").await.expect_err("closed");
        assert_eq!(err.category(), Some(ErrorCategory::Programming));
        assert_eq!(server.count("CloseStatementRequest"), 1);
    }

    #[tokio::test]
    async fn connection_close_releases_cursor_statements() {
        let next_id = Arc::new(AtomicU32::new(1));
        let server = FakeServer::start(move |name, _| match name {
            "CreateStatementRequest" => ok(CreateStatementResponse {
                statement_id: next_id.fetch_add(1, Ordering::SeqCst),
                ..Default::default()
            }),
            "PrepareAndExecuteRequest" => ok(update_result(0, 1)),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut kept = conn.cursor().expect("cursor");
        kept.execute("DELETE FROM a").await.expect("execute");
        {
            let mut dropped = conn.cursor().expect("cursor");
            dropped.execute("DELETE FROM b").await.expect("execute");
        }
        let idle = conn.cursor().expect("idle cursor");

        conn.close().await.expect("close");
        let mut closed: Vec<u32> = server
            .decoded::<CloseStatementRequest>()
            .iter()
            .map(|request| request.statement_id)
            .collect();
        closed.sort_unstable();
        assert_eq!(closed, [1, 2]);
        assert_eq!(
            server.names().last().map(String::as_str),
            Some("CloseConnectionRequest")
        );

        assert!(kept.is_closed() && idle.is_closed());
        let err = kept.fetchone().await.expect_err("closed cursor");
        assert_eq!(sql_message(&err), "The cursor is already closed.");
    }

    #[tokio::test]
    async fn dropped_cursor_statement_is_released_by_next_operation() {
        let next_id = Arc::new(AtomicU32::new(1));
        let server = FakeServer::start(move |name, _| match name {
            "CreateStatementRequest" => ok(CreateStatementResponse {
                statement_id: next_id.fetch_add(1, Ordering::SeqCst),
                ..Default::default()
            }),
            "PrepareAndExecuteRequest" => ok(update_result(0, 1)),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        {
            let mut dropped = conn.cursor().expect("cursor");
            dropped.execute("DELETE FROM a").await.expect("execute");
        }
        assert_eq!(server.count("CloseStatementRequest"), 0);

        conn.commit().await.expect("commit");
        let names = server.names();
        assert_eq!(
            names[names.len() - 2..],
            ["CloseStatementRequest", "CommitRequest"]
        );
        assert_eq!(server.decoded::<CloseStatementRequest>()[0].statement_id, 1);

        let mut cursor = conn.cursor().expect("cursor");
        cursor.execute("DELETE FROM b").await.expect("execute");
        conn.rollback().await.expect("rollback");
        assert_eq!(server.count("CloseStatementRequest"), 1);
        assert!(!conn.is_closed());
    }

    fn prepared(statement_id: u32, parameters: Vec<AvaticaParameter>) -> Option<Reply> {
        ok(PrepareResponse {
            statement: Some(StatementHandle {
                id: statement_id,
                signature: Some(Signature {
                    parameters,
                    ..Default::default()
                }),
                ..Default::default()
            }),
            metadata: None,
        })
    }

    fn parameter(jdbc: i32, type_name: &str) -> AvaticaParameter {
        AvaticaParameter {
            parameter_type: jdbc as u32,
            type_name: type_name.to_string(),
            ..Default::default()
        }
    }

    fn upsert_script(name: &str, _: &[u8]) -> Option<Reply> {
        match name {
            "PrepareRequest" => prepared(
                7,
                vec![parameter(4, "INTEGER"), parameter(3012, "VARCHAR ARRAY")],
            ),
            "ExecuteRequest" => ok(update_result(7, 1)),
            _ => None,
        }
    }

    #[tokio::test]
    async fn parameters_are_bound_against_prepared_signature() {
        let server = FakeServer::start(upsert_script).await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        let tags = Value::Array(vec![Value::from("x"), Value::Null]);
        cursor
            .execute_with_params("UPSERT INTO t VALUES (?, ?)", &[Value::Int(5), tags])
            .await
            .expect("execute");

        assert_eq!(cursor.rowcount(), 1);
        assert_eq!(cursor.statement_id(), Some(7));
        assert_eq!(server.count("CreateStatementRequest"), 0);
        let execute = &server.decoded::<ExecuteRequest>()[0];
        assert_eq!(execute.statement_handle.as_ref().map(|h| h.id), Some(7));
        assert!(execute.has_parameter_values);
        assert_eq!(execute.first_frame_max_size, 2000);
        let values = &execute.parameter_values;
        assert_eq!(values[0].r#type, Rep::Integer as i32);
        assert_eq!(values[0].number_value, 5);
        assert_eq!(values[1].r#type, Rep::Array as i32);
        assert_eq!(values[1].component_type, Rep::String as i32);
        assert_eq!(values[1].array_value[0].string_value, "x");
        assert!(values[1].array_value[1].null);
    }

    #[tokio::test]
    async fn wrong_parameter_count_never_executes() {
        let server = FakeServer::start(upsert_script).await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        let err = cursor
            .execute_with_params("UPSERT INTO t VALUES (?, ?)", &[Value::Int(5)])
            .await
            .expect_err("count");
        assert_eq!(err.category(), Some(ErrorCategory::Programming));
        assert_eq!(server.count("ExecuteRequest"), 0);

        let err = cursor
            .execute_with_params("UPSERT INTO t VALUES (?, ?)", &[Value::Int(5), Value::Int(6)])
            .await
            .expect_err("scalar for array");
        assert_eq!(sql_message(&err), "Scalar value specified for array parameter.");
    }

    #[tokio::test]
    async fn replacing_a_statement_closes_the_previous_one() {
        let next_id = Arc::new(AtomicU32::new(7));
        let server = FakeServer::start(move |name, _| match name {
            "PrepareRequest" => prepared(next_id.fetch_add(1, Ordering::SeqCst), Vec::new()),
            "ExecuteRequest" => ok(update_result(0, 1)),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        cursor.execute_with_params("DELETE FROM a", &[]).await.expect("first");
        cursor.execute_with_params("DELETE FROM b", &[]).await.expect("second");

        let closed: Vec<u32> = server
            .decoded::<CloseStatementRequest>()
            .iter()
            .map(|request| request.statement_id)
            .collect();
        assert_eq!(closed, [7]);
        assert_eq!(cursor.statement_id(), Some(8));
    }

    #[tokio::test]
    async fn executemany_sends_one_batch() {
        let server = FakeServer::start(|name, _| match name {
            "PrepareRequest" => prepared(3, vec![parameter(4, "INTEGER")]),
            "ExecuteBatchRequest" => ok(ExecuteBatchResponse {
                statement_id: 3,
                update_counts: vec![1, 1],
                ..Default::default()
            }),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        let counts = cursor
            .executemany(
                "UPSERT INTO t VALUES (?)",
                &[vec![Value::Int(1)], vec![Value::Null]],
            )
            .await
            .expect("batch");
        assert_eq!(counts, [1, 1]);

        let batch = &server.decoded::<ExecuteBatchRequest>()[0];
        assert_eq!(batch.statement_id, 3);
        assert_eq!(batch.updates.len(), 2);
        assert_eq!(batch.updates[0].parameter_values[0].number_value, 1);
        assert!(batch.updates[1].parameter_values[0].null);
        assert_eq!(server.decoded::<PrepareRequest>()[0].max_rows_total, 0);
    }

    #[tokio::test]
    async fn executemany_reports_missing_statement() {
        let server = FakeServer::start(|name, _| match name {
            "PrepareRequest" => prepared(3, vec![parameter(4, "INTEGER")]),
            "ExecuteBatchRequest" => ok(ExecuteBatchResponse {
                missing_statement: true,
                ..Default::default()
            }),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let mut cursor = conn.cursor().expect("cursor");
        let err = cursor
            .executemany("UPSERT INTO t VALUES (?)", &[vec![Value::Int(1)]])
            .await
            .expect_err("missing");
        assert_eq!(err.category(), Some(ErrorCategory::Database));
        let info = err.sql_info().expect("info");
        assert_eq!(info.message, "ExecuteBatch reported missing statement");
        assert_eq!(info.code, -1);
    }

    #[tokio::test]
    async fn empty_schema_filter_keeps_rows_without_schema() {
        let server = FakeServer::start(|name, _| match name {
            "TablesRequest" => ok(ResultSetResponse {
                statement_id: 4,
                own_statement: true,
                signature: Some(Signature {
                    columns: vec![
                        column("TABLE_CAT", 12, "VARCHAR"),
                        column("TABLE_SCHEM", 12, "VARCHAR"),
                        column("TABLE_NAME", 12, "VARCHAR"),
                    ],
                    ..Default::default()
                }),
                first_frame: Some(Frame {
                    offset: 0,
                    done: true,
                    rows: vec![
                        Row {
                            value: vec![
                                string_value(None),
                                string_value(None),
                                string_value(Some("A")),
                            ],
                        },
                        Row {
                            value: vec![
                                string_value(None),
                                string_value(Some("S")),
                                string_value(Some("B")),
                            ],
                        },
                    ],
                }),
                update_count: u64::MAX,
                ..Default::default()
            }),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let tables = conn
            .meta()
            .expect("meta")
            .tables(None, Some(""), None, Some(&["TABLE"]))
            .await
            .expect("tables");

        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0]["TABLE_NAME"], Value::from("A"));
        assert_eq!(tables[0]["TABLE_SCHEM"], Value::from(""));
        assert_eq!(tables[0]["TABLE_CAT"], Value::from(""));

        let request = &server.decoded::<TablesRequest>()[0];
        assert!(request.has_type_list);
        assert_eq!(request.type_list, ["TABLE"]);
        assert_eq!(request.connection_id, conn.id());
        let closed = &server.decoded::<CloseStatementRequest>()[0];
        assert_eq!(closed.statement_id, 4);
    }

    #[tokio::test]
    async fn primary_keys_are_read_through_sync_results() {
        let server = FakeServer::start(|name, _| match name {
            "SyncResultsRequest" => ok(SyncResultsResponse {
                more_results: true,
                ..Default::default()
            }),
            "FetchRequest" => {
                let value = vec![
                    string_value(None),
                    string_value(Some("S")),
                    string_value(Some("T")),
                    string_value(Some("ID")),
                    int_value(1),
                    string_value(Some("PK")),
                    string_value(Some("A")),
                    int_value(4),
                    string_value(Some("INTEGER")),
                    int_value(0),
                    int_value(4),
                    string_value(None),
                ];
                ok(FetchResponse {
                    frame: Some(Frame {
                        offset: 0,
                        done: true,
                        rows: vec![Row { value }],
                    }),
                    ..Default::default()
                })
            }
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let keys = conn
            .meta()
            .expect("meta")
            .primary_keys(None, Some("S"), Some("T"))
            .await
            .expect("primary keys");

        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0]["COLUMN_NAME"], Value::from("ID"));
        assert_eq!(keys[0]["KEY_SEQ"], Value::Int(1));
        assert_eq!(keys[0]["TABLE_CAT"], Value::Null);

        let sync = &server.decoded::<SyncResultsRequest>()[0];
        let state = sync.state.as_ref().expect("state");
        assert_eq!(state.op, MetaDataOperation::GetPrimaryKeys as i32);
        assert_eq!(state.args.len(), 3);
        assert_eq!(state.args[1].string_value, "S");
        let fetch = &server.decoded::<FetchRequest>()[0];
        assert_eq!(fetch.offset, 0);
        assert_eq!(fetch.statement_id, sync.statement_id);
    }

    #[tokio::test]
    async fn index_info_without_results_is_empty() {
        let server = FakeServer::start(|name, _| match name {
            "SyncResultsRequest" => ok(SyncResultsResponse::default()),
            _ => None,
        })
        .await;
        let conn = open(&server).await;
        let indexes = conn
            .meta()
            .expect("meta")
            .index_info(None, Some("S"), Some("T"), false, true)
            .await
            .expect("index info");
        assert!(indexes.is_empty());
        assert_eq!(server.count("FetchRequest"), 0);
        let state = server.decoded::<SyncResultsRequest>()[0]
            .state
            .clone()
            .expect("state");
        assert_eq!(state.op, MetaDataOperation::GetIndexInfo as i32);
        assert_eq!(state.args.len(), 5);
        assert!(state.args[4].bool_value);
    }
}
