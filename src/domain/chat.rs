use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Denormalized user data carried on participants, senders and reactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSnapshot {
    pub id: String,
    pub fullname: String,
    #[serde(default)]
    pub profile_photo: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatParticipant {
    pub user_id: String,
    pub chat_id: String,
    pub joined_at: DateTime<Utc>,
    pub user: UserSnapshot,
}

/// A conversation. Non-group chats have exactly two participants and no
/// admin; group chats have an admin who alone may mutate the roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub is_group: bool,
    #[serde(default)]
    pub admin_id: Option<String>,
    #[serde(default)]
    pub users: Vec<ChatParticipant>,
}

impl Chat {
    pub fn is_admin(&self, user_id: &str) -> bool {
        self.admin_id.as_deref() == Some(user_id)
    }

    /// The peer in a one-to-one chat, seen from `user_id`.
    pub fn other_participant(&self, user_id: &str) -> Option<&ChatParticipant> {
        self.users.iter().find(|p| p.user_id != user_id)
    }

    /// Group name for groups, peer name otherwise, with generic fallbacks.
    pub fn display_name(&self, current_user_id: &str) -> String {
        if self.is_group {
            return self.name.clone().unwrap_or_else(|| "Group Chat".to_owned());
        }

        self.other_participant(current_user_id)
            .map(|p| p.user.fullname.clone())
            .unwrap_or_else(|| "Chat".to_owned())
    }
}
