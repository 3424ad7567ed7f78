use crate::connection::{Session, StatementSlot};
use crate::marshal::{decode_row, encode_parameters, ParameterType, ValueType};
use avatica_core::{AvaticaError, DataRow, Result, Value};
use avatica_protocol::messages::{ColumnMetaData, Frame, QueryState, Signature};
use avatica_protocol::responses::{ResultSetResponse, SyncResultsResponse};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// A row keyed by column label.
pub type RowMap = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Nullability {
    NoNulls,
    Nullable,
    Unknown,
}

impl Nullability {
    fn from_wire(nullable: u32) -> Self {
        match nullable {
            0 => Nullability::NoNulls,
            1 => Nullability::Nullable,
            _ => Nullability::Unknown,
        }
    }

    pub fn null_ok(self) -> Option<bool> {
        match self {
            Nullability::NoNulls => Some(false),
            Nullability::Nullable => Some(true),
            Nullability::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescription {
    pub name: String,
    pub type_name: String,
    pub display_size: u32,
    /// Never reported by the server.
    pub internal_size: Option<u32>,
    pub precision: u32,
    pub scale: u32,
    pub nullability: Nullability,
}

impl ColumnDescription {
    fn from_column(column: &ColumnMetaData) -> Self {
        Self {
            name: column_key(column),
            type_name: column
                .r#type
                .as_ref()
                .map(|ty| ty.name.clone())
                .unwrap_or_default(),
            display_size: column.display_size,
            internal_size: None,
            precision: column.precision,
            scale: column.scale,
            nullability: Nullability::from_wire(column.nullable),
        }
    }
}

fn column_key(column: &ColumnMetaData) -> String {
    if column.label.is_empty() {
        column.column_name.clone()
    } else {
        column.label.clone()
    }
}

/// Executes statements and walks their result frames.
///
/// A cursor owns at most one server-side statement at a time. Dropping an
/// unclosed cursor hands its statement to the connection, which releases it
/// on close.
pub struct Cursor {
    session: Arc<Session>,
    key: u64,
    slot: Arc<StatementSlot>,
    signature: Option<Signature>,
    columns: Vec<ValueType>,
    parameters: Vec<ParameterType>,
    frame: Option<Frame>,
    /// Index of the next row in `frame`. `None` once the result is exhausted.
    pos: Option<usize>,
    update_count: Option<u64>,
    arraysize: usize,
    itersize: u32,
}

impl Cursor {
    pub(crate) fn new(session: Arc<Session>) -> Self {
        let slot = Arc::new(StatementSlot::default());
        let key = session.register(&slot);
        let arraysize = session.cursor_config.arraysize.max(1);
        let itersize = session.cursor_config.itersize;
        Self {
            session,
            key,
            slot,
            signature: None,
            columns: Vec::new(),
            parameters: Vec::new(),
            frame: None,
            pos: None,
            update_count: None,
            arraysize,
            itersize,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.slot.is_closed()
    }

    pub fn statement_id(&self) -> Option<u32> {
        self.slot.statement_id()
    }

    pub fn arraysize(&self) -> usize {
        self.arraysize
    }

    pub fn set_arraysize(&mut self, size: usize) {
        self.arraysize = size.max(1);
    }

    pub fn itersize(&self) -> u32 {
        self.itersize
    }

    pub fn set_itersize(&mut self, size: u32) {
        self.itersize = size.max(1);
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.slot.is_closed() {
            return Err(AvaticaError::programming("The cursor is already closed."));
        }
        self.session.ensure_open()
    }

    fn frame_size(&self) -> i32 {
        i32::try_from(self.itersize).unwrap_or(i32::MAX)
    }

    /// Closes the cursor and its statement. A second close is an error.
    pub async fn close(&mut self) -> Result<()> {
        if self.slot.is_closed() {
            return Err(AvaticaError::programming("The cursor is already closed."));
        }
        self.session.ensure_open()?;
        let statement_id = self.slot.close()?;
        self.session.deregister(self.key);
        self.reset();
        if let Some(statement_id) = statement_id {
            debug!(connection_id = %self.session.id, statement_id, "closing statement");
            self.session
                .client
                .close_statement(&self.session.id, statement_id)
                .await?;
        }
        Ok(())
    }

    fn reset(&mut self) {
        self.signature = None;
        self.columns.clear();
        self.parameters.clear();
        self.frame = None;
        self.pos = None;
        self.update_count = None;
    }

    async fn set_statement_id(&mut self, statement_id: u32) -> Result<()> {
        if let Some(previous) = self.slot.replace(statement_id) {
            debug!(
                connection_id = %self.session.id,
                statement_id = previous,
                "closing replaced statement"
            );
            self.session
                .client
                .close_statement(&self.session.id, previous)
                .await?;
        }
        Ok(())
    }

    async fn ensure_statement(&mut self) -> Result<u32> {
        if let Some(statement_id) = self.slot.statement_id() {
            return Ok(statement_id);
        }
        let statement_id = self.session.client.create_statement(&self.session.id).await?;
        self.set_statement_id(statement_id).await?;
        Ok(statement_id)
    }

    fn current_statement(&self) -> Result<u32> {
        self.slot
            .statement_id()
            .ok_or_else(|| AvaticaError::programming("No statement is open on this cursor."))
    }

    fn set_signature(&mut self, signature: Option<Signature>) -> Result<()> {
        let (columns, parameters) = match &signature {
            Some(signature) => (
                signature
                    .columns
                    .iter()
                    .map(ValueType::for_column)
                    .collect::<Result<Vec<_>>>()?,
                signature
                    .parameters
                    .iter()
                    .map(ParameterType::for_parameter)
                    .collect::<Result<Vec<_>>>()?,
            ),
            None => (Vec::new(), Vec::new()),
        };
        self.signature = signature;
        self.columns = columns;
        self.parameters = parameters;
        Ok(())
    }

    fn set_frame(&mut self, frame: Option<Frame>) -> Result<()> {
        self.pos = None;
        if let Some(frame) = &frame {
            if !frame.rows.is_empty() {
                self.pos = Some(0);
            } else if !frame.done {
                self.frame = None;
                return Err(AvaticaError::internal(
                    "Got an empty frame, but the statement is not done yet.",
                ));
            }
        }
        self.frame = frame;
        Ok(())
    }

    pub(crate) async fn process_result(&mut self, result: ResultSetResponse) -> Result<()> {
        if result.own_statement {
            self.set_statement_id(result.statement_id).await?;
        }
        self.set_signature(result.signature)?;
        self.set_frame(result.first_frame)?;
        self.update_count = Some(result.update_count);
        Ok(())
    }

    async fn process_results(&mut self, results: Vec<ResultSetResponse>) -> Result<()> {
        // Only the first result set is exposed.
        if let Some(result) = results.into_iter().next() {
            self.process_result(result).await?;
        }
        Ok(())
    }

    /// Runs `sql` without parameters in one `PrepareAndExecute` round trip.
    pub async fn execute(&mut self, sql: &str) -> Result<()> {
        self.ensure_usable()?;
        self.session.release_orphans().await?;
        self.reset();
        let statement_id = self.ensure_statement().await?;
        let results = self
            .session
            .client
            .prepare_and_execute(
                &self.session.id,
                statement_id,
                sql,
                None,
                Some(self.frame_size()),
            )
            .await?;
        self.process_results(results).await
    }

    /// Prepares `sql`, binds `parameters` against the server's signature and executes it.
    pub async fn execute_with_params(&mut self, sql: &str, parameters: &[Value]) -> Result<()> {
        self.ensure_usable()?;
        self.session.release_orphans().await?;
        self.reset();
        let handle = self.session.client.prepare(&self.session.id, sql, None).await?;
        self.set_statement_id(handle.id).await?;
        let signature = handle.signature.unwrap_or_default();
        self.set_signature(Some(signature.clone()))?;
        let values = encode_parameters(parameters, &self.parameters)?;
        let results = self
            .session
            .client
            .execute(
                &self.session.id,
                handle.id,
                Some(signature),
                Some(values),
                Some(self.frame_size()),
            )
            .await?;
        self.process_results(results).await
    }

    /// Executes `sql` once per parameter row in a single batch and returns the update counts.
    pub async fn executemany(&mut self, sql: &str, rows: &[Vec<Value>]) -> Result<Vec<u64>> {
        self.ensure_usable()?;
        self.session.release_orphans().await?;
        self.reset();
        let handle = self
            .session
            .client
            .prepare(&self.session.id, sql, Some(0))
            .await?;
        self.set_statement_id(handle.id).await?;
        self.set_signature(handle.signature)?;
        let batch = rows
            .iter()
            .map(|row| encode_parameters(row, &self.parameters))
            .collect::<Result<Vec<_>>>()?;
        self.session
            .client
            .execute_batch(&self.session.id, handle.id, batch)
            .await
    }

    /// Re-synchronizes the statement's results with `state`, creating a statement first if needed.
    pub async fn sync_results(&mut self, state: QueryState) -> Result<SyncResultsResponse> {
        self.ensure_usable()?;
        self.session.release_orphans().await?;
        let statement_id = self.ensure_statement().await?;
        self.session
            .client
            .sync_results(&self.session.id, statement_id, state, 0)
            .await
    }

    /// Fetches the statement's results from offset zero using a caller-supplied signature.
    pub async fn fetch_with_signature(&mut self, signature: Signature) -> Result<()> {
        self.ensure_usable()?;
        let statement_id = self.current_statement()?;
        self.update_count = None;
        self.set_signature(Some(signature))?;
        let frame = self
            .session
            .client
            .fetch(&self.session.id, statement_id, 0, Some(self.frame_size()))
            .await?;
        self.set_frame(Some(frame))
    }

    async fn fetch_next_frame(&mut self) -> Result<()> {
        let Some(frame) = &self.frame else {
            return Ok(());
        };
        let offset = frame.offset + frame.rows.len() as u64;
        let statement_id = self.current_statement()?;
        debug!(connection_id = %self.session.id, statement_id, offset, "fetching next frame");
        let next = self
            .session
            .client
            .fetch(&self.session.id, statement_id, offset, Some(self.frame_size()))
            .await?;
        self.set_frame(Some(next))
    }

    /// Next row, or `None` once the result is exhausted.
    pub async fn fetchone(&mut self) -> Result<Option<DataRow>> {
        self.ensure_usable()?;
        let Some(frame) = &self.frame else {
            return Err(AvaticaError::programming("No select statement was executed."));
        };
        let Some(pos) = self.pos else {
            return Ok(None);
        };
        let row = frame
            .rows
            .get(pos)
            .ok_or_else(|| AvaticaError::internal("frame position out of range"))?;
        let values = decode_row(row, &self.columns)?;
        let has_more = pos + 1 < frame.rows.len();
        let done = frame.done;

        if has_more {
            self.pos = Some(pos + 1);
        } else if done {
            self.pos = None;
        } else {
            self.fetch_next_frame().await?;
        }
        Ok(Some(values))
    }

    pub async fn fetchmany(&mut self, size: Option<usize>) -> Result<Vec<DataRow>> {
        let size = size.unwrap_or(self.arraysize);
        let mut rows = Vec::with_capacity(size.min(self.itersize as usize));
        while rows.len() < size {
            match self.fetchone().await? {
                Some(row) => rows.push(row),
                None => break,
            }
        }
        Ok(rows)
    }

    pub async fn fetchall(&mut self) -> Result<Vec<DataRow>> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetchone().await? {
            rows.push(row);
        }
        Ok(rows)
    }

    fn to_map(&self, row: DataRow) -> RowMap {
        let names = self
            .signature
            .as_ref()
            .map(|signature| signature.columns.as_slice())
            .unwrap_or_default();
        names.iter().map(column_key).zip(row).collect()
    }

    pub async fn fetchone_map(&mut self) -> Result<Option<RowMap>> {
        Ok(self.fetchone().await?.map(|row| self.to_map(row)))
    }

    pub async fn fetchmany_maps(&mut self, size: Option<usize>) -> Result<Vec<RowMap>> {
        let rows = self.fetchmany(size).await?;
        Ok(rows.into_iter().map(|row| self.to_map(row)).collect())
    }

    pub async fn fetchall_maps(&mut self) -> Result<Vec<RowMap>> {
        let rows = self.fetchall().await?;
        Ok(rows.into_iter().map(|row| self.to_map(row)).collect())
    }

    /// Affected rows of the last statement, `-1` when unknown or not applicable.
    pub fn rowcount(&self) -> i64 {
        match self.update_count {
            None | Some(u64::MAX) => -1,
            Some(count) => i64::try_from(count).unwrap_or(i64::MAX),
        }
    }

    /// Absolute index of the next row in the result set.
    pub fn rownumber(&self) -> Option<u64> {
        match (&self.frame, self.pos) {
            (Some(frame), Some(pos)) => Some(frame.offset + pos as u64),
            _ => None,
        }
    }

    pub fn description(&self) -> Option<Vec<ColumnDescription>> {
        let signature = self.signature.as_ref()?;
        Some(
            signature
                .columns
                .iter()
                .map(ColumnDescription::from_column)
                .collect(),
        )
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        self.session.deregister(self.key);
        if let Ok(Some(statement_id)) = self.slot.close() {
            debug!(connection_id = %self.session.id, statement_id, "cursor dropped while open");
            self.session.orphan(statement_id);
        }
    }
}
