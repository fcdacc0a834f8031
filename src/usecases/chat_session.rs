//! Open-chat session: owns the store and roster, routes every operation
//! through its pipeline, and reconciles poll results.

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::{
    api::{ApiError, ChatApi},
    domain::{
        chat::Chat, events::SessionEvent, message::ReactionKind, message_store::MessageStore,
        roster::Roster,
    },
    usecases::{
        context::SessionContext,
        emit, message_ops, reactions,
        roster::{self as roster_ops, RosterError},
        send_message::{self, ResendError, SendMessageCommand, SendMessageError},
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenChatError {
    Unauthorized,
    ChatNotFound,
    TemporarilyUnavailable,
    /// Server answered with data that violates the wire contract.
    DataContractViolation,
}

/// One open chat. All state mutation goes through this facade; the
/// presentation layer only consumes `SessionEvent`s and read accessors.
pub struct ChatSession {
    context: SessionContext,
    api: Arc<dyn ChatApi>,
    chat: Chat,
    store: MessageStore,
    roster: Roster,
    events: UnboundedSender<SessionEvent>,
}

impl ChatSession {
    /// Opens a chat: fetches the chat record and the full message history,
    /// reports read receipts for anything unread, and builds local state.
    pub async fn open(
        api: Arc<dyn ChatApi>,
        context: SessionContext,
        events: UnboundedSender<SessionEvent>,
        chat_id: &str,
    ) -> Result<Self, OpenChatError> {
        let chat = api
            .fetch_chat(&context, chat_id)
            .await
            .map_err(map_open_error)?;

        let mut session = Self {
            roster: Roster::from_chat(&chat),
            store: MessageStore::new(chat.id.clone()),
            chat,
            context,
            api,
            events,
        };

        let messages = session
            .api
            .list_messages(&session.context, chat_id)
            .await
            .map_err(map_open_error)?;
        reactions::mark_unread_as_read(session.api.as_ref(), &session.context, &messages).await;
        session.store.replace_all(messages);

        emit(&session.events, SessionEvent::MessagesUpdated);
        emit(&session.events, SessionEvent::RosterUpdated);
        Ok(session)
    }

    pub fn context(&self) -> &SessionContext {
        &self.context
    }

    pub fn store(&self) -> &MessageStore {
        &self.store
    }

    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// The chat record as fetched at open time. The roster, not this record,
    /// tracks membership changes.
    pub fn chat(&self) -> &Chat {
        &self.chat
    }

    /// One poll cycle: fetch the chat's messages and merge them into the
    /// store. Returns false when the result was discarded (fetch failure or
    /// a response that no longer matches the open chat); the store is never
    /// cleared on a failed cycle.
    pub async fn refresh(&mut self) -> bool {
        let requested = self.store.chat_id().to_owned();

        let messages = match self.api.list_messages(&self.context, &requested).await {
            Ok(messages) => messages,
            Err(error) => {
                warn!(code = "POLL_FETCH_FAILED", chat_id = %requested, ?error, "poll cycle failed");
                return false;
            }
        };

        let stale = self.store.chat_id() != requested
            || messages.iter().any(|m| m.chat_id != requested);
        if stale {
            debug!(code = "STALE_FETCH_DISCARDED", chat_id = %requested, "discarding response for a different chat");
            return false;
        }

        reactions::mark_unread_as_read(self.api.as_ref(), &self.context, &messages).await;
        self.store.replace_all(messages);
        emit(&self.events, SessionEvent::MessagesUpdated);
        true
    }

    /// Replaces the open chat with another one. In-flight sends of the old
    /// chat keep resolving against the server; their placeholders are simply
    /// dropped with the old store.
    pub async fn switch_chat(&mut self, chat_id: &str) -> Result<(), OpenChatError> {
        let next = Self::open(
            Arc::clone(&self.api),
            self.context.clone(),
            self.events.clone(),
            chat_id,
        )
        .await?;

        self.chat = next.chat;
        self.store = next.store;
        self.roster = next.roster;
        Ok(())
    }

    pub async fn send(&mut self, command: SendMessageCommand) -> Result<(), SendMessageError> {
        send_message::send_message(
            self.api.as_ref(),
            &self.context,
            &mut self.store,
            &self.events,
            command,
        )
        .await
    }

    pub async fn resend(&mut self, message_id: &str) -> Result<(), ResendError> {
        send_message::resend_message(
            self.api.as_ref(),
            &self.context,
            &mut self.store,
            &self.events,
            message_id,
        )
        .await
    }

    /// Toggles a reaction. A rejected toggle refreshes the chat so local
    /// state snaps back to server truth.
    pub async fn react(&mut self, message_id: &str, kind: ReactionKind) {
        let result = reactions::react(
            self.api.as_ref(),
            &self.context,
            &mut self.store,
            &self.events,
            message_id,
            kind,
        )
        .await;

        if result.is_err() {
            emit(&self.events, SessionEvent::OperationFailed { code: "REACTION_FAILED" });
            self.refresh().await;
        }
    }

    pub async fn remove_reaction(&mut self, message_id: &str) {
        reactions::remove_reaction(
            self.api.as_ref(),
            &self.context,
            &mut self.store,
            &self.events,
            message_id,
        )
        .await;
    }

    pub async fn set_pinned(&mut self, message_id: &str, pinned: bool) {
        let result = message_ops::set_pinned(
            self.api.as_ref(),
            &self.context,
            &mut self.store,
            &self.events,
            message_id,
            pinned,
        )
        .await;

        // Pin reverts in place, no refresh needed.
        if result.is_err() {
            emit(&self.events, SessionEvent::OperationFailed { code: "MESSAGE_PIN_FAILED" });
        }
    }

    pub async fn edit(&mut self, message_id: &str, content: &str) {
        let result = message_ops::edit(
            self.api.as_ref(),
            &self.context,
            &mut self.store,
            &self.events,
            message_id,
            content,
        )
        .await;

        if result.is_err() {
            emit(&self.events, SessionEvent::OperationFailed { code: "MESSAGE_EDIT_FAILED" });
            self.refresh().await;
        }
    }

    pub async fn delete(&mut self, message_id: &str, for_everyone: bool) {
        let result = message_ops::delete(
            self.api.as_ref(),
            &self.context,
            &mut self.store,
            &self.events,
            message_id,
            for_everyone,
        )
        .await;

        if result.is_err() {
            emit(&self.events, SessionEvent::OperationFailed { code: "MESSAGE_DELETE_FAILED" });
            self.refresh().await;
        }
    }

    pub async fn add_participants(&mut self, user_ids: &[String]) -> Result<(), RosterError> {
        roster_ops::add_participants(
            self.api.as_ref(),
            &self.context,
            &mut self.roster,
            &self.events,
            user_ids,
        )
        .await
    }

    pub async fn remove_participant(&mut self, user_id: &str) -> Result<(), RosterError> {
        roster_ops::remove_participant(
            self.api.as_ref(),
            &self.context,
            &mut self.roster,
            &self.events,
            user_id,
        )
        .await
    }

    pub async fn delete_chat(&mut self) -> Result<(), RosterError> {
        roster_ops::delete_chat(self.api.as_ref(), &self.context, &self.roster).await
    }
}

fn map_open_error(error: ApiError) -> OpenChatError {
    match error {
        ApiError::Unauthorized => OpenChatError::Unauthorized,
        ApiError::NotFound => OpenChatError::ChatNotFound,
        ApiError::Unavailable => OpenChatError::TemporarilyUnavailable,
        ApiError::InvalidData => OpenChatError::DataContractViolation,
    }
}
