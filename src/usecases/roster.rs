//! Participant roster management for group chats.

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::{
    api::{ApiError, ChatApi},
    domain::{events::SessionEvent, roster::Roster},
    usecases::{context::SessionContext, emit},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RosterError {
    /// Membership changes only apply to group chats.
    NotGroupChat,
    /// Only the chat admin may change membership.
    NotAdmin,
    /// The admin cannot remove themselves through the roster.
    CannotRemoveSelf,
    /// Nothing to do: every requested user is already a participant.
    NoNewParticipants,
    /// Server rejected the credential.
    Unauthorized,
    /// Chat no longer exists.
    ChatNotFound,
    /// Service is temporarily unavailable.
    TemporarilyUnavailable,
}

/// Adds users to a group chat. Admin gating happens before any network
/// traffic; placeholder entries show immediately and the corrective chat
/// re-fetch delivers real user data (or reverts the change on failure).
pub async fn add_participants(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    roster: &mut Roster,
    events: &UnboundedSender<SessionEvent>,
    user_ids: &[String],
) -> Result<(), RosterError> {
    gate_admin(roster, ctx)?;

    let new_ids: Vec<String> = user_ids
        .iter()
        .filter(|id| !roster.contains(id))
        .cloned()
        .collect();
    if new_ids.is_empty() {
        return Err(RosterError::NoNewParticipants);
    }

    roster.add_placeholders(&new_ids);
    emit(events, SessionEvent::RosterUpdated);

    let chat_id = roster.chat_id().to_owned();
    let result = api.add_participants(ctx, &chat_id, &new_ids).await;

    // Success and failure both end in a re-fetch: it either fills in the
    // placeholder user data or reverts the optimistic entries.
    refetch(api, ctx, roster, events).await;

    result.map_err(map_api_error)
}

/// Removes a participant from a group chat. Same gating and corrective
/// re-fetch discipline as `add_participants`.
pub async fn remove_participant(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    roster: &mut Roster,
    events: &UnboundedSender<SessionEvent>,
    user_id: &str,
) -> Result<(), RosterError> {
    gate_admin(roster, ctx)?;
    if user_id == ctx.user_id {
        return Err(RosterError::CannotRemoveSelf);
    }

    if roster.remove(user_id).is_none() {
        return Ok(());
    }
    emit(events, SessionEvent::RosterUpdated);

    let chat_id = roster.chat_id().to_owned();
    let result = api.remove_participant(ctx, &chat_id, user_id).await;

    if result.is_err() {
        refetch(api, ctx, roster, events).await;
    }

    result.map_err(map_api_error)
}

/// Deletes the whole chat. Admin-gated for groups; either participant may
/// delete a direct chat.
pub async fn delete_chat(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    roster: &Roster,
) -> Result<(), RosterError> {
    if roster.is_group() && !roster.is_admin(&ctx.user_id) {
        return Err(RosterError::NotAdmin);
    }

    api.delete_chat(ctx, roster.chat_id())
        .await
        .map_err(map_api_error)
}

fn gate_admin(roster: &Roster, ctx: &SessionContext) -> Result<(), RosterError> {
    if !roster.is_group() {
        return Err(RosterError::NotGroupChat);
    }
    if !roster.is_admin(&ctx.user_id) {
        return Err(RosterError::NotAdmin);
    }
    Ok(())
}

async fn refetch(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    roster: &mut Roster,
    events: &UnboundedSender<SessionEvent>,
) {
    match api.fetch_chat(ctx, roster.chat_id()).await {
        Ok(chat) => {
            roster.apply_server(&chat);
            emit(events, SessionEvent::RosterUpdated);
        }
        Err(error) => {
            warn!(code = "ROSTER_REFETCH_FAILED", chat_id = roster.chat_id(), ?error, "corrective chat fetch failed");
        }
    }
}

fn map_api_error(error: ApiError) -> RosterError {
    match error {
        ApiError::Unauthorized => RosterError::Unauthorized,
        ApiError::NotFound => RosterError::ChatNotFound,
        ApiError::Unavailable | ApiError::InvalidData => RosterError::TemporarilyUnavailable,
    }
}
