//! Reaction toggling and read-receipt reporting.

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::{
    api::{ApiError, ChatApi},
    domain::{
        events::SessionEvent,
        message::{temporary_id, Message, Reaction, ReactionKind},
        message_store::MessageStore,
    },
    usecases::{context::SessionContext, emit},
};

/// What an optimistic toggle did to the user's reaction on a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Replaced,
    Removed,
}

/// Applies the toggle semantics locally: same kind removes the reaction, a
/// different kind replaces it, none adds a temporary one.
pub fn toggle_reaction(message: &mut Message, user_id: &str, kind: ReactionKind) -> ToggleOutcome {
    match message.reaction_of(user_id).map(|r| r.kind) {
        Some(existing) if existing == kind => {
            message.reactions.retain(|r| r.user_id != user_id);
            ToggleOutcome::Removed
        }
        Some(_) => {
            for reaction in &mut message.reactions {
                if reaction.user_id == user_id {
                    reaction.id = temporary_id();
                    reaction.kind = kind;
                }
            }
            ToggleOutcome::Replaced
        }
        None => {
            message.reactions.push(Reaction {
                id: temporary_id(),
                kind,
                user_id: user_id.to_owned(),
                user: None,
            });
            ToggleOutcome::Added
        }
    }
}

/// Toggles the current user's reaction optimistically, then confirms against
/// the server. On confirmation the temporary reaction is swapped for the
/// server record; on failure the caller is expected to refresh the chat so
/// local state snaps back to server truth.
pub async fn react(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    store: &mut MessageStore,
    events: &UnboundedSender<SessionEvent>,
    message_id: &str,
    kind: ReactionKind,
) -> Result<(), ApiError> {
    let mut outcome = None;
    store.update(message_id, |m| {
        outcome = Some(toggle_reaction(m, &ctx.user_id, kind));
    });
    let Some(outcome) = outcome else {
        debug!(code = "REACTION_TARGET_MISSING", message_id, "message not in store");
        return Ok(());
    };
    emit(events, SessionEvent::MessagesUpdated);

    match api.react(ctx, message_id, kind).await {
        Ok(server_reaction) => {
            store.update(message_id, |m| {
                m.reactions.retain(|r| r.user_id != ctx.user_id);
                if let Some(reaction) = server_reaction {
                    m.reactions.push(reaction);
                }
            });
            emit(events, SessionEvent::MessagesUpdated);
            Ok(())
        }
        Err(error) => {
            warn!(code = "REACTION_CONFIRM_FAILED", message_id, ?outcome, ?error, "reaction toggle rejected");
            Err(error)
        }
    }
}

/// Removes the current user's reaction. The local strip happens first; a
/// server failure is logged and left for the next poll to reconcile.
pub async fn remove_reaction(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    store: &mut MessageStore,
    events: &UnboundedSender<SessionEvent>,
    message_id: &str,
) {
    let reaction_id = store
        .get(message_id)
        .and_then(|m| m.reaction_of(&ctx.user_id))
        .map(|r| r.id.clone());
    let Some(reaction_id) = reaction_id else {
        return;
    };

    store.update(message_id, |m| {
        m.reactions.retain(|r| r.user_id != ctx.user_id);
    });
    emit(events, SessionEvent::MessagesUpdated);

    // A temporary reaction never reached the server; nothing to delete there.
    if reaction_id.starts_with(crate::domain::message::TEMP_ID_PREFIX) {
        return;
    }

    if let Err(error) = api.remove_reaction(ctx, &reaction_id).await {
        warn!(code = "REACTION_REMOVE_FAILED", reaction_id, ?error, "reaction removal rejected");
    }
}

/// Reports read receipts for every confirmed message from another sender the
/// current user has not read yet. Best effort: failures are logged and
/// retried implicitly on the next sweep.
pub async fn mark_unread_as_read(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    messages: &[Message],
) {
    for message in messages {
        if message.is_temporary()
            || message.sender_id == ctx.user_id
            || message.has_read_receipt_from(&ctx.user_id)
        {
            continue;
        }

        if let Err(error) = api.mark_read(ctx, &message.id).await {
            warn!(code = "READ_RECEIPT_FAILED", message_id = %message.id, ?error, "read receipt rejected");
        }
    }
}
