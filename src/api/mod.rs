//! REST collaborator boundary: the `ChatApi` seam and its implementations.

pub mod payloads;
pub mod rest;

use async_trait::async_trait;

use crate::{
    domain::{
        chat::Chat,
        message::{Message, Reaction, ReactionKind},
    },
    usecases::context::SessionContext,
};

use payloads::OutgoingMessage;

/// Source-level failures of the REST collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiError {
    /// Credential rejected or operation forbidden.
    Unauthorized,
    /// Target entity does not exist (stale reference included).
    NotFound,
    /// Network failure or server-side error; treated as transient.
    Unavailable,
    /// Response did not match the wire contract.
    InvalidData,
}

/// Logical operations of the chat backend. Every call carries the explicit
/// session context; transport framing is the implementation's concern.
#[async_trait]
pub trait ChatApi: Send + Sync {
    async fn fetch_chat(&self, ctx: &SessionContext, chat_id: &str) -> Result<Chat, ApiError>;

    async fn list_messages(
        &self,
        ctx: &SessionContext,
        chat_id: &str,
    ) -> Result<Vec<Message>, ApiError>;

    async fn send_message(
        &self,
        ctx: &SessionContext,
        outgoing: &OutgoingMessage,
    ) -> Result<Message, ApiError>;

    async fn edit_message(
        &self,
        ctx: &SessionContext,
        message_id: &str,
        content: &str,
    ) -> Result<Message, ApiError>;

    async fn delete_message(
        &self,
        ctx: &SessionContext,
        message_id: &str,
        for_everyone: bool,
    ) -> Result<(), ApiError>;

    async fn mark_read(&self, ctx: &SessionContext, message_id: &str) -> Result<(), ApiError>;

    async fn set_pinned(
        &self,
        ctx: &SessionContext,
        message_id: &str,
        pinned: bool,
    ) -> Result<(), ApiError>;

    /// Returns the server-side reaction when one exists after the call;
    /// None means the toggle removed the reaction.
    async fn react(
        &self,
        ctx: &SessionContext,
        message_id: &str,
        kind: ReactionKind,
    ) -> Result<Option<Reaction>, ApiError>;

    async fn remove_reaction(
        &self,
        ctx: &SessionContext,
        reaction_id: &str,
    ) -> Result<(), ApiError>;

    async fn add_participants(
        &self,
        ctx: &SessionContext,
        chat_id: &str,
        user_ids: &[String],
    ) -> Result<(), ApiError>;

    async fn remove_participant(
        &self,
        ctx: &SessionContext,
        chat_id: &str,
        user_id: &str,
    ) -> Result<(), ApiError>;

    async fn delete_chat(&self, ctx: &SessionContext, chat_id: &str) -> Result<(), ApiError>;
}

/// Returns the api module name for smoke checks.
pub fn module_name() -> &'static str {
    "api"
}
