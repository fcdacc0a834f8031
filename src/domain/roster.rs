use chrono::Utc;

use super::chat::{Chat, ChatParticipant, UserSnapshot};

/// Display name used for optimistic placeholder entries until the
/// corrective chat re-fetch delivers real user data.
const PLACEHOLDER_FULLNAME: &str = "Loading...";

/// Membership state of the open chat. Pure state: authorization gating
/// lives in the roster use case, server truth arrives via `apply_server`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    chat_id: String,
    is_group: bool,
    admin_id: Option<String>,
    participants: Vec<ChatParticipant>,
}

impl Roster {
    pub fn from_chat(chat: &Chat) -> Self {
        Self {
            chat_id: chat.id.clone(),
            is_group: chat.is_group,
            admin_id: chat.admin_id.clone(),
            participants: chat.users.clone(),
        }
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn is_group(&self) -> bool {
        self.is_group
    }

    pub fn admin_id(&self) -> Option<&str> {
        self.admin_id.as_deref()
    }

    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_id.as_deref() == Some(user_id)
    }

    pub fn participants(&self) -> &[ChatParticipant] {
        &self.participants
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p.user_id == user_id)
    }

    /// Replaces the roster with the server-authoritative chat record.
    pub fn apply_server(&mut self, chat: &Chat) {
        self.chat_id = chat.id.clone();
        self.is_group = chat.is_group;
        self.admin_id = chat.admin_id.clone();
        self.participants = chat.users.clone();
    }

    /// Optimistically appends placeholder entries for users being added;
    /// real denormalized user data arrives with the next chat re-fetch.
    pub fn add_placeholders(&mut self, user_ids: &[String]) {
        let joined_at = Utc::now();
        for user_id in user_ids {
            if self.contains(user_id) {
                continue;
            }

            self.participants.push(ChatParticipant {
                user_id: user_id.clone(),
                chat_id: self.chat_id.clone(),
                joined_at,
                user: UserSnapshot {
                    id: user_id.clone(),
                    fullname: PLACEHOLDER_FULLNAME.to_owned(),
                    profile_photo: None,
                },
            });
        }
    }

    /// Optimistically removes a participant, returning the removed entry so
    /// callers can revert via re-fetch on failure.
    pub fn remove(&mut self, user_id: &str) -> Option<ChatParticipant> {
        let index = self.participants.iter().position(|p| p.user_id == user_id)?;
        Some(self.participants.remove(index))
    }
}
