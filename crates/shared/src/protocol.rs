use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{DataAction, MessageId, Sender};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub content: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub has_attachable_data: bool,
}

impl ChatMessage {
    pub fn is_user(&self) -> bool {
        self.sender == Sender::User
    }

    /// Wall-clock time in the local zone, for display only.
    pub fn display_time(&self) -> String {
        self.created_at
            .with_timezone(&Local)
            .format("%-I:%M:%S %p")
            .to_string()
    }

    pub fn data_actions(&self) -> &'static [DataAction] {
        if self.has_attachable_data {
            &DataAction::ALL
        } else {
            &[]
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryReply {
    pub content: String,
    #[serde(default)]
    pub has_attachable_data: bool,
}
