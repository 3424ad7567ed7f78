//! Database metadata queries, returned as rows keyed by column name.

use crate::connection::Connection;
use crate::cursor::{Cursor, RowMap};
use avatica_core::{Result, Value};
use avatica_protocol::messages::{
    AvaticaType, ColumnMetaData, MetaDataOperation, MetaDataOperationArgument, QueryState,
    Signature,
};
use avatica_protocol::responses::ResultSetResponse;

const VARCHAR: i32 = 12;
const SMALLINT: i32 = 5;
const BOOLEAN: i32 = 16;

const PRIMARY_KEY_COLUMNS: &[(&str, i32)] = &[
    ("TABLE_CAT", VARCHAR),
    ("TABLE_SCHEM", VARCHAR),
    ("TABLE_NAME", VARCHAR),
    ("COLUMN_NAME", VARCHAR),
    ("KEY_SEQ", SMALLINT),
    ("PK_NAME", VARCHAR),
    ("ASC_OR_DESC", VARCHAR),
    ("DATA_TYPE", SMALLINT),
    ("TYPE_NAME", VARCHAR),
    ("COLUMN_SIZE", SMALLINT),
    ("TYPE_ID", SMALLINT),
    ("VIEW_CONSTANT", VARCHAR),
];

const INDEX_INFO_COLUMNS: &[(&str, i32)] = &[
    ("TABLE_CAT", VARCHAR),
    ("TABLE_SCHEM", VARCHAR),
    ("TABLE_NAME", VARCHAR),
    ("NON_UNIQUE", BOOLEAN),
    ("INDEX_QUALIFIER", VARCHAR),
    ("INDEX_NAME", VARCHAR),
    ("TYPE", SMALLINT),
    ("ORDINAL_POSITION", SMALLINT),
    ("COLUMN_NAME", VARCHAR),
    ("ASC_OR_DESC", VARCHAR),
    ("CARDINALITY", SMALLINT),
    ("PAGES", SMALLINT),
    ("FILTER_CONDITION", VARCHAR),
    ("DATA_TYPE", SMALLINT),
    ("TYPE_NAME", VARCHAR),
    ("TYPE_ID", SMALLINT),
    ("COLUMN_FAMILY", VARCHAR),
    ("COLUMN_SIZE", SMALLINT),
    ("ARRAY_SIZE", SMALLINT),
];

fn type_name(jdbc_code: i32) -> &'static str {
    match jdbc_code {
        VARCHAR => "VARCHAR",
        SMALLINT => "SMALLINT",
        BOOLEAN => "BOOLEAN",
        _ => "",
    }
}

/// Signature for result sets the server does not describe itself.
fn synthetic_signature(columns: &[(&str, i32)]) -> Signature {
    Signature {
        columns: columns
            .iter()
            .enumerate()
            .map(|(ordinal, (name, jdbc_code))| ColumnMetaData {
                ordinal: ordinal as u32 + 1,
                column_name: name.to_string(),
                nullable: 2,
                r#type: Some(AvaticaType {
                    id: *jdbc_code as u32,
                    name: type_name(*jdbc_code).to_string(),
                    ..Default::default()
                }),
                ..Default::default()
            })
            .collect(),
        ..Default::default()
    }
}

/// An empty-string filter means "objects without a catalog/schema": rows with
/// a non-null value are dropped. Remaining nulls are reported as empty strings.
fn fix_default(mut rows: Vec<RowMap>, catalog: Option<&str>, schema_pattern: Option<&str>) -> Vec<RowMap> {
    if schema_pattern == Some("") {
        rows.retain(|row| row.get("TABLE_SCHEM").map_or(true, Value::is_null));
    }
    if catalog == Some("") {
        rows.retain(|row| {
            row.get("TABLE_CAT")
                .or_else(|| row.get("TABLE_CATALOG"))
                .map_or(true, Value::is_null)
        });
    }
    for row in &mut rows {
        for value in row.values_mut() {
            blank_nulls(value);
        }
    }
    rows
}

fn blank_nulls(value: &mut Value) {
    match value {
        Value::Null => *value = Value::String(String::new()),
        Value::Array(items) => items.iter_mut().for_each(blank_nulls),
        _ => {}
    }
}

pub struct Meta<'a> {
    connection: &'a Connection,
}

impl<'a> Meta<'a> {
    pub(crate) fn new(connection: &'a Connection) -> Self {
        Self { connection }
    }

    fn connection_id(&self) -> &str {
        self.connection.id()
    }

    /// Reads every row of a metadata result through a short-lived cursor.
    async fn collect(&self, result: ResultSetResponse) -> Result<Vec<RowMap>> {
        let mut cursor = self.connection.cursor()?;
        let rows: Result<Vec<RowMap>> = async {
            cursor.process_result(result).await?;
            cursor.fetchall_maps().await
        }
        .await;
        finish(cursor, rows).await
    }

    pub async fn catalogs(&self) -> Result<Vec<RowMap>> {
        let session = self.connection.session();
        session.ensure_open()?;
        let result = session.client.get_catalogs(self.connection_id()).await?;
        self.collect(result).await
    }

    pub async fn schemas(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
    ) -> Result<Vec<RowMap>> {
        let session = self.connection.session();
        session.ensure_open()?;
        let result = session
            .client
            .get_schemas(self.connection_id(), catalog, schema_pattern)
            .await?;
        let rows = self.collect(result).await?;
        Ok(fix_default(rows, catalog, schema_pattern))
    }

    pub async fn tables(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_name_pattern: Option<&str>,
        type_list: Option<&[&str]>,
    ) -> Result<Vec<RowMap>> {
        let session = self.connection.session();
        session.ensure_open()?;
        let result = session
            .client
            .get_tables(
                self.connection_id(),
                catalog,
                schema_pattern,
                table_name_pattern,
                type_list,
            )
            .await?;
        let rows = self.collect(result).await?;
        Ok(fix_default(rows, catalog, schema_pattern))
    }

    pub async fn columns(
        &self,
        catalog: Option<&str>,
        schema_pattern: Option<&str>,
        table_name_pattern: Option<&str>,
        column_name_pattern: Option<&str>,
    ) -> Result<Vec<RowMap>> {
        let session = self.connection.session();
        session.ensure_open()?;
        let result = session
            .client
            .get_columns(
                self.connection_id(),
                catalog,
                schema_pattern,
                table_name_pattern,
                column_name_pattern,
            )
            .await?;
        let rows = self.collect(result).await?;
        Ok(fix_default(rows, catalog, schema_pattern))
    }

    pub async fn table_types(&self) -> Result<Vec<RowMap>> {
        let session = self.connection.session();
        session.ensure_open()?;
        let result = session.client.get_table_types(self.connection_id()).await?;
        self.collect(result).await
    }

    pub async fn type_info(&self) -> Result<Vec<RowMap>> {
        let session = self.connection.session();
        session.ensure_open()?;
        let result = session.client.get_type_info(self.connection_id()).await?;
        self.collect(result).await
    }

    pub async fn primary_keys(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
    ) -> Result<Vec<RowMap>> {
        let state = QueryState::metadata(
            MetaDataOperation::GetPrimaryKeys,
            vec![
                MetaDataOperationArgument::string(catalog),
                MetaDataOperationArgument::string(schema),
                MetaDataOperationArgument::string(table),
            ],
        );
        self.synced(state, PRIMARY_KEY_COLUMNS).await
    }

    pub async fn index_info(
        &self,
        catalog: Option<&str>,
        schema: Option<&str>,
        table: Option<&str>,
        unique: bool,
        approximate: bool,
    ) -> Result<Vec<RowMap>> {
        let state = QueryState::metadata(
            MetaDataOperation::GetIndexInfo,
            vec![
                MetaDataOperationArgument::string(catalog),
                MetaDataOperationArgument::string(schema),
                MetaDataOperationArgument::string(table),
                MetaDataOperationArgument::boolean(Some(unique)),
                MetaDataOperationArgument::boolean(Some(approximate)),
            ],
        );
        self.synced(state, INDEX_INFO_COLUMNS).await
    }

    /// Metadata operations without a dedicated request go through `SyncResults`.
    async fn synced(&self, state: QueryState, columns: &[(&str, i32)]) -> Result<Vec<RowMap>> {
        let mut cursor = self.connection.cursor()?;
        let rows: Result<Vec<RowMap>> = async {
            let response = cursor.sync_results(state).await?;
            if !response.more_results {
                return Ok(Vec::new());
            }
            cursor.fetch_with_signature(synthetic_signature(columns)).await?;
            cursor.fetchall_maps().await
        }
        .await;
        finish(cursor, rows).await
    }
}

/// Closes the helper cursor, reporting the query error first.
async fn finish(mut cursor: Cursor, rows: Result<Vec<RowMap>>) -> Result<Vec<RowMap>> {
    let closed = cursor.close().await;
    let rows = rows?;
    closed?;
    Ok(rows)
}
