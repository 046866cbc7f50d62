//! Users, conversations and messages with notification and edit-history hooks, stored in
//! an in-process database with optimistic transactions.

mod error;
mod hooks;
mod model;
mod query;
mod service;
mod store;

pub use error::StoreError;
pub use model::{Conversation, Message, MessageHistory, NewMessage, NewUser, Notification, Thread, User};
pub use query::{MessageFilter, PAGE_SIZE, Page};
pub use service::MessagingService;
pub use store::{Connection, Database, Tables};
