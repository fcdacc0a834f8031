//! Pin, edit, and delete pipelines over the open chat's message store.

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::{
    api::{ApiError, ChatApi},
    domain::{events::SessionEvent, message::MessageStatus, message_store::MessageStore},
    usecases::emit,
};

use super::context::SessionContext;

/// Pins or unpins a message. The flag flips optimistically and is reverted
/// in place when the server rejects the change.
pub async fn set_pinned(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    store: &mut MessageStore,
    events: &UnboundedSender<SessionEvent>,
    message_id: &str,
    pinned: bool,
) -> Result<(), ApiError> {
    if !store.update(message_id, |m| m.is_pinned = pinned) {
        return Ok(());
    }
    emit(events, SessionEvent::MessagesUpdated);

    match api.set_pinned(ctx, message_id, pinned).await {
        Ok(()) => Ok(()),
        Err(error) => {
            warn!(code = "MESSAGE_PIN_FAILED", message_id, pinned, ?error, "pin change rejected");
            store.update(message_id, |m| m.is_pinned = !pinned);
            emit(events, SessionEvent::MessagesUpdated);
            Err(error)
        }
    }
}

/// Edits a message's text. The new content shows immediately with an
/// `Edited` status; the server's record replaces the optimistic one on
/// success. On failure the caller refreshes the chat to restore the original.
pub async fn edit(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    store: &mut MessageStore,
    events: &UnboundedSender<SessionEvent>,
    message_id: &str,
    content: &str,
) -> Result<(), ApiError> {
    let updated = store.update(message_id, |m| {
        m.content = Some(content.to_owned());
        m.status = MessageStatus::Edited;
    });
    if !updated {
        return Ok(());
    }
    emit(events, SessionEvent::MessagesUpdated);

    match api.edit_message(ctx, message_id, content).await {
        Ok(server_message) => {
            store.upsert(server_message);
            emit(events, SessionEvent::MessagesUpdated);
            Ok(())
        }
        Err(error) => {
            warn!(code = "MESSAGE_EDIT_FAILED", message_id, ?error, "edit rejected");
            Err(error)
        }
    }
}

/// Deletes a message. Delete-for-everyone leaves a tombstone every
/// participant sees; delete-for-me only drops the local copy. On failure the
/// caller refreshes the chat to restore the original.
pub async fn delete(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    store: &mut MessageStore,
    events: &UnboundedSender<SessionEvent>,
    message_id: &str,
    for_everyone: bool,
) -> Result<(), ApiError> {
    let changed = if for_everyone {
        store.update(message_id, |m| m.tombstone())
    } else {
        store.remove(message_id).is_some()
    };
    if !changed {
        return Ok(());
    }
    emit(events, SessionEvent::MessagesUpdated);

    match api.delete_message(ctx, message_id, for_everyone).await {
        Ok(()) => Ok(()),
        Err(error) => {
            warn!(code = "MESSAGE_DELETE_FAILED", message_id, for_everyone, ?error, "delete rejected");
            Err(error)
        }
    }
}
