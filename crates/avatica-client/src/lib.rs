pub mod config;
pub mod connection;
pub mod cursor;
pub mod marshal;
pub mod meta;
pub mod transport;

pub use config::{AuthConfig, ClientConfig, CursorConfig, TlsVerify};
pub use connection::{Connection, SessionProperties, SessionUpdate};
pub use cursor::{ColumnDescription, Cursor, Nullability, RowMap};
pub use meta::Meta;
pub use transport::AvaticaClient;

pub use avatica_core::{AvaticaError, DataRow, ErrorCategory, Result, Value};

/// Opens a connection to the query server described by `config` and applies
/// its session properties.
pub async fn connect(config: &ClientConfig) -> Result<Connection> {
    let connection = Connection::new(config)?;
    connection.connect().await?;
    Ok(connection)
}

#[cfg(test)]
mod tests;
