use crate::config::{ClientConfig, CursorConfig};
use crate::cursor::Cursor;
use crate::meta::Meta;
use crate::transport::AvaticaClient;
use avatica_core::{AvaticaError, Result};
use avatica_protocol::messages::ConnectionProperties;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Property keys handled through `ConnectionSync` rather than `OpenConnection`.
/// Lowercase `autocommit` and `readonly` are accepted aliases.
pub const AVATICA_PROPERTIES: &[&str] = &[
    "autoCommit",
    "autocommit",
    "readOnly",
    "readonly",
    "transactionIsolation",
    "catalog",
    "schema",
];

/// Last known session state, as reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionProperties {
    pub auto_commit: bool,
    pub read_only: bool,
    pub transaction_isolation: u32,
    pub catalog: String,
    pub schema: String,
}

impl SessionProperties {
    fn from_wire(props: &ConnectionProperties) -> Self {
        Self {
            auto_commit: props.auto_commit,
            read_only: props.read_only,
            transaction_isolation: props.transaction_isolation,
            catalog: props.catalog.clone(),
            schema: props.schema.clone(),
        }
    }
}

/// Requested session changes. `None` leaves the setting alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionUpdate {
    pub auto_commit: Option<bool>,
    pub read_only: Option<bool>,
    pub transaction_isolation: Option<u32>,
    pub catalog: Option<String>,
    pub schema: Option<String>,
}

impl SessionUpdate {
    pub fn auto_commit(mut self, value: bool) -> Self {
        self.auto_commit = Some(value);
        self
    }

    pub fn read_only(mut self, value: bool) -> Self {
        self.read_only = Some(value);
        self
    }

    pub fn transaction_isolation(mut self, value: u32) -> Self {
        self.transaction_isolation = Some(value);
        self
    }

    pub fn catalog(mut self, value: impl Into<String>) -> Self {
        self.catalog = Some(value.into());
        self
    }

    pub fn schema(mut self, value: impl Into<String>) -> Self {
        self.schema = Some(value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Both boolean flags are always sent, falling back to the current state
    /// so an unrelated update cannot reset them.
    fn to_wire(&self, current: &SessionProperties) -> ConnectionProperties {
        ConnectionProperties {
            is_dirty: true,
            has_auto_commit: true,
            auto_commit: self.auto_commit.unwrap_or(current.auto_commit),
            has_read_only: true,
            read_only: self.read_only.unwrap_or(current.read_only),
            transaction_isolation: self.transaction_isolation.unwrap_or_default(),
            catalog: self.catalog.clone().unwrap_or_default(),
            schema: self.schema.clone().unwrap_or_default(),
        }
    }

    fn apply_to(&self, current: &SessionProperties) -> SessionProperties {
        SessionProperties {
            auto_commit: self.auto_commit.unwrap_or(current.auto_commit),
            read_only: self.read_only.unwrap_or(current.read_only),
            transaction_isolation: self
                .transaction_isolation
                .unwrap_or(current.transaction_isolation),
            catalog: self.catalog.clone().unwrap_or_else(|| current.catalog.clone()),
            schema: self.schema.clone().unwrap_or_else(|| current.schema.clone()),
        }
    }
}

/// Splits connection properties into the Phoenix `info` map sent on open and
/// the session settings applied afterwards. A legacy lowercase alias wins
/// over its camel-case form.
pub fn split_properties(
    properties: &HashMap<String, String>,
) -> Result<(HashMap<String, String>, SessionUpdate)> {
    let mut update = SessionUpdate::default();
    let info = properties
        .iter()
        .filter(|(key, _)| !AVATICA_PROPERTIES.contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    let pick = |camel: &str, legacy: &str| {
        properties
            .get(legacy)
            .map(|value| (legacy.to_string(), value))
            .or_else(|| properties.get(camel).map(|value| (camel.to_string(), value)))
    };
    if let Some((key, value)) = pick("autoCommit", "autocommit") {
        update.auto_commit = Some(parse_bool(&key, value)?);
    }
    if let Some((key, value)) = pick("readOnly", "readonly") {
        update.read_only = Some(parse_bool(&key, value)?);
    }
    if let Some(value) = properties.get("transactionIsolation") {
        let level = value.trim().parse::<u32>().map_err(|_| {
            AvaticaError::programming(format!("invalid transactionIsolation value {value:?}"))
        })?;
        update.transaction_isolation = Some(level);
    }
    update.catalog = properties.get("catalog").cloned();
    update.schema = properties.get("schema").cloned();
    Ok((info, update))
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" | "" => Ok(false),
        _ => Err(AvaticaError::programming(format!(
            "invalid boolean value {value:?} for {key}"
        ))),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ConnectionState {
    Unopened,
    Open,
    Closed,
}

/// Statement slot shared between a cursor and the connection registry.
#[derive(Debug, Default)]
pub(crate) struct StatementSlot {
    inner: Mutex<SlotState>,
}

#[derive(Debug, Default)]
struct SlotState {
    statement_id: Option<u32>,
    closed: bool,
}

impl StatementSlot {
    pub(crate) fn statement_id(&self) -> Option<u32> {
        self.inner.lock().statement_id
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.lock().closed
    }

    /// Stores a new id and returns the previous one when it differs.
    pub(crate) fn replace(&self, statement_id: u32) -> Option<u32> {
        let mut inner = self.inner.lock();
        match inner.statement_id.replace(statement_id) {
            Some(previous) if previous != statement_id => Some(previous),
            _ => None,
        }
    }

    /// Marks the slot closed and hands back the statement still to release.
    pub(crate) fn close(&self) -> Result<Option<u32>> {
        let mut inner = self.inner.lock();
        if inner.closed {
            return Err(AvaticaError::programming("The cursor is already closed."));
        }
        inner.closed = true;
        Ok(inner.statement_id.take())
    }
}

/// State shared by a connection and all of its cursors.
pub(crate) struct Session {
    pub(crate) id: String,
    pub(crate) client: AvaticaClient,
    pub(crate) cursor_config: CursorConfig,
    state: Mutex<ConnectionState>,
    properties: Mutex<SessionProperties>,
    cursors: Mutex<HashMap<u64, Weak<StatementSlot>>>,
    orphans: Mutex<Vec<u32>>,
    next_cursor: AtomicU64,
}

impl Session {
    pub(crate) fn ensure_open(&self) -> Result<()> {
        if *self.state.lock() == ConnectionState::Closed {
            return Err(AvaticaError::programming("The connection is already closed."));
        }
        Ok(())
    }

    pub(crate) fn register(&self, slot: &Arc<StatementSlot>) -> u64 {
        let key = self.next_cursor.fetch_add(1, Ordering::Relaxed);
        self.cursors.lock().insert(key, Arc::downgrade(slot));
        key
    }

    pub(crate) fn deregister(&self, key: u64) {
        self.cursors.lock().remove(&key);
    }

    /// Records a statement whose cursor went away without closing it.
    pub(crate) fn orphan(&self, statement_id: u32) {
        if *self.state.lock() != ConnectionState::Closed {
            self.orphans.lock().push(statement_id);
        }
    }

    /// Closes statements left behind by dropped cursors. Ids not yet sent are
    /// kept for the next attempt when a close fails.
    pub(crate) async fn release_orphans(&self) -> Result<()> {
        let mut pending = std::mem::take(&mut *self.orphans.lock());
        while let Some(statement_id) = pending.pop() {
            debug!(connection_id = %self.id, statement_id, "closing orphaned statement");
            if let Err(err) = self.client.close_statement(&self.id, statement_id).await {
                self.orphans.lock().extend(pending);
                return Err(err);
            }
        }
        Ok(())
    }

    fn live_slots(&self) -> Vec<Arc<StatementSlot>> {
        let mut cursors = self.cursors.lock();
        cursors.retain(|_, slot| slot.strong_count() > 0);
        cursors.values().filter_map(Weak::upgrade).collect()
    }
}

pub struct Connection {
    session: Arc<Session>,
    info: HashMap<String, String>,
    initial: SessionUpdate,
}

impl Connection {
    /// Builds an unopened connection. Nothing is sent until [`Connection::connect`].
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let client = AvaticaClient::new(config)?;
        Self::with_client(client, &config.properties, config.cursor.clone())
    }

    pub fn with_client(
        client: AvaticaClient,
        properties: &HashMap<String, String>,
        cursor_config: CursorConfig,
    ) -> Result<Self> {
        let (info, initial) = split_properties(properties)?;
        let session = Session {
            id: Uuid::new_v4().to_string(),
            client,
            cursor_config,
            state: Mutex::new(ConnectionState::Unopened),
            properties: Mutex::new(SessionProperties::default()),
            cursors: Mutex::new(HashMap::new()),
            orphans: Mutex::new(Vec::new()),
            next_cursor: AtomicU64::new(0),
        };
        Ok(Self {
            session: Arc::new(session),
            info,
            initial,
        })
    }

    pub fn id(&self) -> &str {
        &self.session.id
    }

    pub fn is_closed(&self) -> bool {
        *self.session.state.lock() == ConnectionState::Closed
    }

    /// Opens the server-side connection, then always syncs session properties so
    /// the local view reflects what the server reports.
    pub async fn connect(&self) -> Result<()> {
        self.open().await?;
        self.set_session(self.initial.clone()).await
    }

    pub async fn open(&self) -> Result<()> {
        match *self.session.state.lock() {
            ConnectionState::Unopened => {}
            ConnectionState::Open => {
                return Err(AvaticaError::programming("The connection is already open."))
            }
            ConnectionState::Closed => {
                return Err(AvaticaError::programming("The connection is already closed."))
            }
        }
        self.session
            .client
            .open_connection(&self.session.id, self.info.clone())
            .await?;
        *self.session.state.lock() = ConnectionState::Open;
        info!(
            connection_id = %self.session.id,
            url = %self.session.client.url(),
            "opened avatica connection"
        );
        Ok(())
    }

    /// Closes every open cursor statement, then the connection and its transport.
    pub async fn close(&self) -> Result<()> {
        self.session.ensure_open()?;
        let session = &self.session;
        for slot in session.live_slots() {
            if let Ok(Some(statement_id)) = slot.close() {
                debug!(connection_id = %session.id, statement_id, "closing cursor statement");
                session.client.close_statement(&session.id, statement_id).await?;
            }
        }
        session.release_orphans().await?;
        session.client.close_connection(&session.id).await?;
        if let Err(err) = session.client.close() {
            warn!(connection_id = %session.id, "transport close failed: {err}");
        }
        *session.state.lock() = ConnectionState::Closed;
        session.cursors.lock().clear();
        info!(connection_id = %session.id, "closed avatica connection");
        Ok(())
    }

    pub async fn commit(&self) -> Result<()> {
        self.session.ensure_open()?;
        self.session.release_orphans().await?;
        self.session.client.commit(&self.session.id).await
    }

    pub async fn rollback(&self) -> Result<()> {
        self.session.ensure_open()?;
        self.session.release_orphans().await?;
        self.session.client.rollback(&self.session.id).await
    }

    pub fn cursor(&self) -> Result<Cursor> {
        self.session.ensure_open()?;
        Ok(Cursor::new(self.session.clone()))
    }

    pub fn meta(&self) -> Result<Meta<'_>> {
        self.session.ensure_open()?;
        Ok(Meta::new(self))
    }

    /// Pushes session settings with `ConnectionSync` and records what the server reports.
    pub async fn set_session(&self, update: SessionUpdate) -> Result<()> {
        self.session.ensure_open()?;
        self.session.release_orphans().await?;
        let current = self.session.properties.lock().clone();
        let reported = self
            .session
            .client
            .connection_sync(&self.session.id, update.to_wire(&current))
            .await?;
        let properties = match reported {
            Some(props) => SessionProperties::from_wire(&props),
            None => update.apply_to(&current),
        };
        debug!(connection_id = %self.session.id, ?properties, "session properties synced");
        *self.session.properties.lock() = properties;
        Ok(())
    }

    pub fn session_properties(&self) -> SessionProperties {
        self.session.properties.lock().clone()
    }

    pub fn autocommit(&self) -> bool {
        self.session.properties.lock().auto_commit
    }

    pub async fn set_autocommit(&self, value: bool) -> Result<()> {
        self.set_session(SessionUpdate::default().auto_commit(value)).await
    }

    pub fn readonly(&self) -> bool {
        self.session.properties.lock().read_only
    }

    pub async fn set_readonly(&self, value: bool) -> Result<()> {
        self.set_session(SessionUpdate::default().read_only(value)).await
    }

    pub fn transaction_isolation(&self) -> u32 {
        self.session.properties.lock().transaction_isolation
    }

    pub async fn set_transaction_isolation(&self, level: u32) -> Result<()> {
        self.set_session(SessionUpdate::default().transaction_isolation(level))
            .await
    }

    pub fn catalog(&self) -> String {
        self.session.properties.lock().catalog.clone()
    }

    pub fn schema(&self) -> String {
        self.session.properties.lock().schema.clone()
    }

    /// Server capabilities as reported by `DatabasePropertyRequest`.
    pub async fn database_properties(
        &self,
    ) -> Result<Vec<avatica_protocol::responses::DatabasePropertyElement>> {
        self.session.ensure_open()?;
        self.session.client.database_properties(&self.session.id).await
    }

    pub(crate) fn session(&self) -> &Arc<Session> {
        &self.session
    }
}
