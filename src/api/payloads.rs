use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::message::{AttachmentKind, MessageType, Reaction, ReactionKind};

/// A message the user asked to send, before the server has assigned it an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub chat_id: String,
    pub parent_id: Option<String>,
    pub content: OutgoingContent,
}

/// Where media bytes come from: a local file to upload, or a link the server
/// already hosts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    Path(PathBuf),
    Url(String),
}

impl MediaSource {
    /// Classifies a raw reference: an http(s) scheme means the server (or a
    /// CDN) already hosts the bytes, anything else is a local file to upload.
    pub fn from_reference(raw: &str) -> Self {
        if raw.starts_with("http://") || raw.starts_with("https://") {
            MediaSource::Url(raw.to_owned())
        } else {
            MediaSource::Path(PathBuf::from(raw))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingContent {
    Text { body: String },
    Image { source: MediaSource, caption: Option<String> },
    Video { source: MediaSource, caption: Option<String> },
    Audio { source: MediaSource },
    File { source: MediaSource, caption: Option<String> },
}

impl OutgoingContent {
    pub fn message_type(&self) -> MessageType {
        match self {
            OutgoingContent::Text { .. } => MessageType::Text,
            OutgoingContent::Image { .. } => MessageType::Image,
            OutgoingContent::Video { .. } => MessageType::Video,
            OutgoingContent::Audio { .. } => MessageType::Audio,
            OutgoingContent::File { .. } => MessageType::File,
        }
    }

    pub fn attachment_kind(&self) -> Option<AttachmentKind> {
        match self {
            OutgoingContent::Text { .. } => None,
            OutgoingContent::Image { .. } => Some(AttachmentKind::Image),
            OutgoingContent::Video { .. } => Some(AttachmentKind::Video),
            OutgoingContent::Audio { .. } => Some(AttachmentKind::Audio),
            OutgoingContent::File { .. } => Some(AttachmentKind::Document),
        }
    }

    /// Text the message carries alongside its media, if any.
    pub fn caption(&self) -> Option<&str> {
        match self {
            OutgoingContent::Text { body } => Some(body.as_str()),
            OutgoingContent::Image { caption, .. }
            | OutgoingContent::Video { caption, .. }
            | OutgoingContent::File { caption, .. } => caption.as_deref(),
            OutgoingContent::Audio { .. } => None,
        }
    }

    pub fn media_source(&self) -> Option<&MediaSource> {
        match self {
            OutgoingContent::Text { .. } => None,
            OutgoingContent::Image { source, .. }
            | OutgoingContent::Video { source, .. }
            | OutgoingContent::Audio { source }
            | OutgoingContent::File { source, .. } => Some(source),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTextRequest<'a> {
    pub chat_id: &'a str,
    pub content: &'a str,
    #[serde(rename = "type")]
    pub message_type: MessageType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub struct EditRequest<'a> {
    pub content: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PinRequest {
    pub is_pinned: bool,
}

#[derive(Debug, Serialize)]
pub struct ReactRequest {
    #[serde(rename = "type")]
    pub kind: ReactionKind,
}

/// Toggle endpoint answers with the surviving reaction, or nothing when the
/// toggle removed it.
#[derive(Debug, Deserialize)]
pub struct ReactResponse {
    #[serde(default)]
    pub reaction: Option<Reaction>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddParticipantsRequest<'a> {
    pub user_ids: &'a [String],
}
