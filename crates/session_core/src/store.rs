use std::sync::Arc;

use chrono::Utc;
use shared::{
    domain::{MessageId, Sender},
    protocol::ChatMessage,
};

use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageDraft {
    pub sender: Sender,
    pub content: String,
    pub has_attachable_data: bool,
}

impl MessageDraft {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            sender: Sender::User,
            content: content.into(),
            has_attachable_data: false,
        }
    }

    pub fn assistant(content: impl Into<String>, has_attachable_data: bool) -> Self {
        Self {
            sender: Sender::Assistant,
            content: content.into(),
            has_attachable_data,
        }
    }
}

/// Read-only view of the log at a point in time. Later appends are never
/// visible through an existing snapshot.
#[derive(Debug, Clone, Default)]
pub struct StoreSnapshot {
    messages: Arc<Vec<ChatMessage>>,
}

impl StoreSnapshot {
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }
}

/// Append-only message log. Ids come from a single counter regardless of sender.
#[derive(Debug)]
pub struct MessageStore {
    messages: Arc<Vec<ChatMessage>>,
    next_id: Option<MessageId>,
    last_id: Option<MessageId>,
}

impl MessageStore {
    pub fn new() -> Self {
        Self::starting_at(MessageId::FIRST)
    }

    pub(crate) fn starting_at(first: MessageId) -> Self {
        Self {
            messages: Arc::new(Vec::new()),
            next_id: Some(first),
            last_id: None,
        }
    }

    /// Store holding only `seed`, which always receives the first id.
    pub fn seeded(seed: MessageDraft) -> Self {
        let mut store = Self::new();
        let first = ChatMessage {
            id: MessageId::FIRST,
            sender: seed.sender,
            content: seed.content,
            created_at: Utc::now(),
            has_attachable_data: seed.has_attachable_data,
        };
        Arc::make_mut(&mut store.messages).push(first);
        store.last_id = Some(MessageId::FIRST);
        store.next_id = MessageId::FIRST.checked_next();
        store
    }

    pub fn push(&mut self, draft: MessageDraft) -> Result<&ChatMessage, StoreError> {
        let id = self.next_id.ok_or(StoreError::IdSpaceExhausted {
            last: self.last_id.unwrap_or(MessageId(u64::MAX)),
        })?;
        let message = ChatMessage {
            id,
            sender: draft.sender,
            content: draft.content,
            created_at: Utc::now(),
            has_attachable_data: draft.has_attachable_data,
        };

        let messages = Arc::make_mut(&mut self.messages);
        messages.push(message);
        self.last_id = Some(id);
        self.next_id = id.checked_next();

        Ok(&messages[messages.len() - 1])
    }

    pub fn append(&mut self, draft: MessageDraft) -> Result<StoreSnapshot, StoreError> {
        self.push(draft)?;
        Ok(self.snapshot())
    }

    pub fn all(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            messages: Arc::clone(&self.messages),
        }
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
