//! Scoped connections.

use std::fmt::Display;

/// Opens connections to a database.
pub trait Connector: Send + Sync {
    /// An open connection. Dropping it closes it.
    type Connection;

    /// Failure to connect.
    type Error: Display;

    /// Opens a new connection.
    fn open(&self) -> Result<Self::Connection, Self::Error>;
}

/// Opens a connection, lends it to `op` and closes it afterwards, whether `op` failed or not.
pub fn with_connection<C, T, E, F>(connector: &C, op: F) -> Result<T, E>
where
    C: Connector,
    E: From<C::Error>,
    F: FnOnce(&mut C::Connection) -> Result<T, E>,
{
    log::debug!("Opening database connection");

    let mut connection = connector.open()?;
    let result = op(&mut connection);

    drop(connection);
    log::debug!("Connection closed");

    result
}
