//! Filtering and pagination of message listings.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::Message;

/// Messages returned per page.
pub const PAGE_SIZE: usize = 20;

/// Restricts a message listing. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MessageFilter {
    /// Only messages of this conversation.
    pub conversation: Option<Uuid>,
    /// Only messages this user sent or received.
    pub participant: Option<Uuid>,
    /// Only messages created at or after this instant.
    pub created_after: Option<Timestamp>,
    /// Only messages created at or before this instant.
    pub created_before: Option<Timestamp>,
}

impl MessageFilter {
    pub fn matches(&self, message: &Message) -> bool {
        self.conversation.is_none_or(|id| message.conversation_id == id)
            && self.participant.is_none_or(|user| message.involves(user))
            && self.created_after.is_none_or(|after| message.created_at >= after)
            && self.created_before.is_none_or(|before| message.created_at <= before)
    }
}

/// One page of a listing, counted from 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub per_page: usize,
    pub total: usize,
}

impl<T> Page<T> {
    /// Cuts page `page` out of `all`. Page 0 is treated as page 1.
    pub fn of(all: Vec<T>, page: usize) -> Self {
        let page = page.max(1);
        let total = all.len();

        let items = all.into_iter().skip((page - 1).saturating_mul(PAGE_SIZE)).take(PAGE_SIZE).collect();

        Self {
            items,
            page,
            per_page: PAGE_SIZE,
            total,
        }
    }

    /// Whether a later page has items.
    pub fn has_next(&self) -> bool {
        self.page.saturating_mul(self.per_page) < self.total
    }
}
