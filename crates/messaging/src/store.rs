//! In-process relational store with optimistic transactions.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use unit_of_work::{Connector, Transactional};
use uuid::Uuid;

use crate::error::StoreError;
use crate::model::{Conversation, Message, MessageHistory, Notification, User};

/// All rows. Messages, history and notifications are kept in insertion order.
#[derive(Debug, Clone, Default)]
pub struct Tables {
    pub users: BTreeMap<Uuid, User>,
    pub conversations: BTreeMap<Uuid, Conversation>,
    pub messages: Vec<Message>,
    pub history: Vec<MessageHistory>,
    pub notifications: Vec<Notification>,
}

impl Tables {
    pub fn user(&self, id: Uuid) -> Result<&User, StoreError> {
        self.users.get(&id).ok_or_else(|| StoreError::not_found("User", id))
    }

    pub fn user_by_name(&self, username: &str) -> Option<&User> {
        self.users.values().find(|user| user.username == username)
    }

    pub fn conversation(&self, id: Uuid) -> Result<&Conversation, StoreError> {
        self.conversations
            .get(&id)
            .ok_or_else(|| StoreError::not_found("Conversation", id))
    }

    pub fn message(&self, id: Uuid) -> Result<&Message, StoreError> {
        self.messages
            .iter()
            .find(|message| message.id == id)
            .ok_or_else(|| StoreError::not_found("Message", id))
    }

    pub fn message_mut(&mut self, id: Uuid) -> Result<&mut Message, StoreError> {
        self.messages
            .iter_mut()
            .find(|message| message.id == id)
            .ok_or_else(|| StoreError::not_found("Message", id))
    }
}

struct Shared {
    version: u64,
    tables: Arc<Tables>,
    closed: bool,
}

/// The database. Cloning it yields another handle to the same data.
#[derive(Clone)]
pub struct Database {
    shared: Arc<Mutex<Shared>>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

impl Database {
    /// An empty database.
    pub fn new() -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                version: 0,
                tables: Arc::default(),
                closed: false,
            })),
        }
    }

    /// Number of committed write transactions.
    pub fn version(&self) -> u64 {
        self.lock().version
    }

    /// Whether [`Database::close`] was called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Stops accepting connections. Open connections fail on their next commit.
    pub fn close(&self) {
        self.lock().closed = true;
        log::debug!("Database closed");
    }

    /// Opens a connection with a transaction already begun.
    pub fn connect(&self) -> Result<Connection, StoreError> {
        let shared = self.lock();

        if shared.closed {
            return Err(StoreError::Closed);
        }

        Ok(Connection {
            database: self.clone(),
            base_version: shared.version,
            staged: shared.tables.clone(),
            dirty: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for Database {
    type Connection = Connection;
    type Error = StoreError;

    fn open(&self) -> Result<Connection, StoreError> {
        self.connect()
    }
}

/// A connection working on its own copy of the tables.
///
/// Changes stay private to the connection until committed. A commit fails with
/// [`StoreError::Conflict`] if another connection committed changes after this
/// transaction began.
pub struct Connection {
    database: Database,
    base_version: u64,
    staged: Arc<Tables>,
    dirty: bool,
}

impl Connection {
    /// The tables as seen by the current transaction.
    pub fn tables(&self) -> &Tables {
        &self.staged
    }

    /// The tables for writing. The first call in a transaction copies them.
    pub fn tables_mut(&mut self) -> &mut Tables {
        self.dirty = true;
        Arc::make_mut(&mut self.staged)
    }

    fn refresh(&mut self) {
        let shared = self.database.lock();

        self.base_version = shared.version;
        self.staged = shared.tables.clone();
        self.dirty = false;
    }
}

impl Transactional for Connection {
    type Error = StoreError;

    fn begin(&mut self) -> Result<(), StoreError> {
        self.refresh();
        Ok(())
    }

    fn commit(&mut self) -> Result<(), StoreError> {
        if !self.dirty {
            return Ok(());
        }

        let mut shared = self.database.lock();

        if shared.closed {
            return Err(StoreError::Closed);
        }

        if shared.version != self.base_version {
            log::debug!(
                "Commit based on version {} rejected, database is at {}",
                self.base_version,
                shared.version
            );

            return Err(StoreError::Conflict);
        }

        shared.version += 1;
        shared.tables = self.staged.clone();

        self.base_version = shared.version;
        self.dirty = false;

        Ok(())
    }

    fn rollback(&mut self) -> Result<(), StoreError> {
        self.refresh();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use config::Role;
    use jiff::Timestamp;

    use super::*;

    fn user(name: &str) -> User {
        User {
            id: Uuid::new_v4(),
            username: name.to_string(),
            email: None,
            role: Role::Member,
            created_at: Timestamp::now(),
        }
    }

    fn insert(connection: &mut Connection, user: User) {
        connection.tables_mut().users.insert(user.id, user);
    }

    #[test]
    fn uncommitted_changes_are_private() {
        let database = Database::new();
        let mut writer = database.connect().unwrap();
        let reader = database.connect().unwrap();

        insert(&mut writer, user("alice"));

        assert_eq!(writer.tables().users.len(), 1);
        assert!(reader.tables().users.is_empty());
        assert_eq!(database.version(), 0);
    }

    #[test]
    fn commit_publishes() {
        let database = Database::new();
        let mut connection = database.connect().unwrap();

        insert(&mut connection, user("alice"));
        connection.commit().unwrap();

        let fresh = database.connect().unwrap();
        assert!(fresh.tables().user_by_name("alice").is_some());
        assert_eq!(database.version(), 1);
    }

    #[test]
    fn rollback_discards() {
        let database = Database::new();
        let mut connection = database.connect().unwrap();

        insert(&mut connection, user("alice"));
        connection.rollback().unwrap();

        assert!(connection.tables().users.is_empty());
        assert_eq!(database.version(), 0);
    }

    #[test]
    fn concurrent_writers_conflict() {
        let database = Database::new();
        let mut first = database.connect().unwrap();
        let mut second = database.connect().unwrap();

        insert(&mut first, user("alice"));
        insert(&mut second, user("bob"));

        first.commit().unwrap();
        assert_eq!(second.commit(), Err(StoreError::Conflict));

        // A new transaction sees the winner's data and can commit on top of it.
        second.begin().unwrap();
        insert(&mut second, user("bob"));
        second.commit().unwrap();

        assert_eq!(database.connect().unwrap().tables().users.len(), 2);
    }

    #[test]
    fn read_only_transactions_never_conflict() {
        let database = Database::new();
        let mut reader = database.connect().unwrap();
        let mut writer = database.connect().unwrap();

        insert(&mut writer, user("alice"));
        writer.commit().unwrap();

        assert!(reader.tables().users.is_empty());
        reader.commit().unwrap();
    }

    #[test]
    fn closed_database_refuses_connections() {
        let database = Database::new();
        let mut open = database.connect().unwrap();

        database.close();

        assert!(database.is_closed());
        assert!(matches!(database.connect(), Err(StoreError::Closed)));

        insert(&mut open, user("alice"));
        assert_eq!(open.commit(), Err(StoreError::Closed));
    }
}
