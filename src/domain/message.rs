use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::chat::UserSnapshot;

/// Prefix for locally generated ids of not-yet-confirmed entities.
pub const TEMP_ID_PREFIX: &str = "temp-";

/// Generates a fresh temporary id for an unconfirmed message or reaction.
pub fn temporary_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageType {
    Text,
    Image,
    Video,
    Audio,
    File,
    Call,
    Link,
}

impl MessageType {
    /// Returns a display label for non-text content, or None for plain text.
    pub fn display_label(&self) -> Option<&'static str> {
        match self {
            MessageType::Text => None,
            MessageType::Image => Some("[Image]"),
            MessageType::Video => Some("[Video]"),
            MessageType::Audio => Some("[Audio]"),
            MessageType::File => Some("[File]"),
            MessageType::Call => Some("[Call]"),
            MessageType::Link => Some("[Link]"),
        }
    }
}

/// Delivery lifecycle of a message. Transitions are monotonic per message;
/// resend creates a new temporary message instead of rewinding a failed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageStatus {
    Sending,
    Sent,
    Delivered,
    Seen,
    Failed,
    Edited,
}

impl MessageStatus {
    /// True while the send round-trip has not resolved yet.
    pub fn is_in_flight(self) -> bool {
        matches!(self, MessageStatus::Sending)
    }

    /// Only failed messages may be resent.
    pub fn can_resend(self) -> bool {
        matches!(self, MessageStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttachmentKind {
    Image,
    Video,
    Audio,
    Document,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub id: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: AttachmentKind,
    pub message_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReactionKind {
    Like,
    Love,
    Laugh,
    Sad,
    Angry,
}

/// At most one reaction exists per (user, message) pair; reacting again with
/// the same kind removes it, a different kind replaces it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ReactionKind,
    pub user_id: String,
    #[serde(default)]
    pub user: Option<UserSnapshot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceipt {
    pub user_id: String,
    #[serde(default)]
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub content: Option<String>,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    pub status: MessageStatus,
    pub sender_id: String,
    pub chat_id: String,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub deleted_for_everyone: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub sender: Option<UserSnapshot>,
    #[serde(default, rename = "attachment")]
    pub attachments: Vec<Attachment>,
    #[serde(default)]
    pub reactions: Vec<Reaction>,
    #[serde(default)]
    pub read_receipts: Vec<ReadReceipt>,
    #[serde(default)]
    pub is_pinned: bool,
}

impl Message {
    /// True for locally created placeholders the server has not confirmed.
    pub fn is_temporary(&self) -> bool {
        self.id.starts_with(TEMP_ID_PREFIX)
    }

    /// Returns the current user's reaction on this message, if any.
    pub fn reaction_of(&self, user_id: &str) -> Option<&Reaction> {
        self.reactions.iter().find(|r| r.user_id == user_id)
    }

    /// True when the given user has a completed read receipt on this message.
    pub fn has_read_receipt_from(&self, user_id: &str) -> bool {
        self.read_receipts
            .iter()
            .any(|r| r.user_id == user_id && r.read_at.is_some())
    }

    /// Turns the message into a delete-for-everyone tombstone: no content,
    /// no renderable attachments.
    pub fn tombstone(&mut self) {
        self.deleted_for_everyone = true;
        self.content = None;
        self.attachments.clear();
    }

    /// Returns the display content: media label + text, a deletion notice,
    /// or just the text.
    pub fn display_content(&self) -> String {
        if self.deleted_for_everyone {
            return "(message deleted)".to_owned();
        }

        let text = self.content.as_deref().unwrap_or("");
        match (self.message_type.display_label(), text.is_empty()) {
            (Some(label), true) => label.to_owned(),
            (Some(label), false) => format!("{} {}", label, text),
            (None, _) => text.to_owned(),
        }
    }
}
