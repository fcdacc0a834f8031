//! Optimistic send pipeline: placeholder insert, dispatch, reconciliation.

use chrono::Utc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, warn};

use crate::{
    api::{
        payloads::{MediaSource, OutgoingContent, OutgoingMessage},
        ChatApi,
    },
    domain::{
        events::SessionEvent,
        message::{temporary_id, Attachment, Message, MessageStatus, MessageType},
        message_store::MessageStore,
    },
    usecases::{context::SessionContext, emit},
};

/// A user request to send one message into the open chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendMessageCommand {
    pub reply_to: Option<String>,
    pub content: OutgoingContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendMessageError {
    /// Text content is empty after trimming whitespace.
    EmptyMessage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendError {
    /// No message with that id is in the store.
    UnknownMessage,
    /// Only failed messages may be resent.
    NotFailed,
    /// The failed record carries neither text nor a reusable media
    /// reference.
    MissingContent,
}

/// Sends a message through the optimistic pipeline: a temporary placeholder
/// appears immediately, then is swapped for the server record or marked
/// failed. Delivery failure is reported through the message status, not as an
/// error; only pre-network validation can fail this function.
pub async fn send_message(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    store: &mut MessageStore,
    events: &UnboundedSender<SessionEvent>,
    command: SendMessageCommand,
) -> Result<(), SendMessageError> {
    let outgoing = validate(store.chat_id(), command)?;

    let placeholder = build_placeholder(ctx, &outgoing);
    let temp_id = placeholder.id.clone();

    store.push(placeholder);
    store.mark_pending(&temp_id);
    emit(events, SessionEvent::MessagesUpdated);
    emit(events, SessionEvent::ScrollToLatest);

    dispatch(api, ctx, store, events, &temp_id, &outgoing).await;
    Ok(())
}

/// Retries a failed message: drops the failed placeholder and runs the send
/// pipeline again with a fresh temporary id, reusing the original text or
/// media reference.
pub async fn resend_message(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    store: &mut MessageStore,
    events: &UnboundedSender<SessionEvent>,
    message_id: &str,
) -> Result<(), ResendError> {
    let failed = store.get(message_id).ok_or(ResendError::UnknownMessage)?;
    if !failed.status.can_resend() {
        return Err(ResendError::NotFailed);
    }

    let content = rebuild_content(failed).ok_or(ResendError::MissingContent)?;
    let outgoing = OutgoingMessage {
        chat_id: store.chat_id().to_owned(),
        parent_id: failed.parent_id.clone(),
        content,
    };

    store.remove(message_id);

    let placeholder = build_placeholder(ctx, &outgoing);
    let temp_id = placeholder.id.clone();

    store.push(placeholder);
    store.mark_pending(&temp_id);
    emit(events, SessionEvent::MessagesUpdated);
    emit(events, SessionEvent::ScrollToLatest);

    dispatch(api, ctx, store, events, &temp_id, &outgoing).await;
    Ok(())
}

/// Rebuilds the outgoing content from a failed placeholder. The placeholder
/// keeps the original media reference in its attachment, so a media resend
/// re-dispatches the same upload or link.
fn rebuild_content(failed: &Message) -> Option<OutgoingContent> {
    let caption = failed.content.clone();
    match failed.message_type {
        MessageType::Text => Some(OutgoingContent::Text { body: caption? }),
        MessageType::Image => Some(OutgoingContent::Image {
            source: media_reference(failed)?,
            caption,
        }),
        MessageType::Video => Some(OutgoingContent::Video {
            source: media_reference(failed)?,
            caption,
        }),
        MessageType::Audio => Some(OutgoingContent::Audio {
            source: media_reference(failed)?,
        }),
        MessageType::File => Some(OutgoingContent::File {
            source: media_reference(failed)?,
            caption,
        }),
        MessageType::Call | MessageType::Link => None,
    }
}

fn media_reference(failed: &Message) -> Option<MediaSource> {
    failed
        .attachments
        .first()
        .map(|attachment| MediaSource::from_reference(&attachment.url))
}

fn validate(
    chat_id: &str,
    command: SendMessageCommand,
) -> Result<OutgoingMessage, SendMessageError> {
    let content = match command.content {
        OutgoingContent::Text { body } => {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                return Err(SendMessageError::EmptyMessage);
            }
            OutgoingContent::Text {
                body: trimmed.to_owned(),
            }
        }
        media => media,
    };

    Ok(OutgoingMessage {
        chat_id: chat_id.to_owned(),
        parent_id: command.reply_to,
        content,
    })
}

/// Builds the temporary message rendered while the send is in flight.
fn build_placeholder(ctx: &SessionContext, outgoing: &OutgoingMessage) -> Message {
    let id = temporary_id();
    let now = Utc::now();

    let attachments = match (outgoing.content.attachment_kind(), outgoing.content.media_source()) {
        (Some(kind), Some(source)) => vec![Attachment {
            id: temporary_id(),
            url: match source {
                MediaSource::Url(url) => url.clone(),
                MediaSource::Path(path) => path.to_string_lossy().into_owned(),
            },
            kind,
            message_id: id.clone(),
        }],
        _ => Vec::new(),
    };

    Message {
        id,
        content: outgoing.content.caption().map(str::to_owned),
        message_type: outgoing.content.message_type(),
        status: MessageStatus::Sending,
        sender_id: ctx.user_id.clone(),
        chat_id: outgoing.chat_id.clone(),
        parent_id: outgoing.parent_id.clone(),
        deleted_for_everyone: false,
        created_at: now,
        updated_at: now,
        sender: None,
        attachments,
        reactions: Vec::new(),
        read_receipts: Vec::new(),
        is_pinned: false,
    }
}

async fn dispatch(
    api: &dyn ChatApi,
    ctx: &SessionContext,
    store: &mut MessageStore,
    events: &UnboundedSender<SessionEvent>,
    temp_id: &str,
    outgoing: &OutgoingMessage,
) {
    match api.send_message(ctx, outgoing).await {
        Ok(confirmed) => {
            debug!(code = "MESSAGE_SEND_CONFIRMED", message_id = %confirmed.id, "send confirmed");
            store.replace_temporary(temp_id, confirmed);
            emit(events, SessionEvent::MessagesUpdated);
            emit(events, SessionEvent::ScrollToLatest);
        }
        Err(error) => {
            warn!(code = "MESSAGE_SEND_FAILED", temp_id, ?error, "send did not resolve");
            store.clear_pending(temp_id);
            store.update(temp_id, |m| m.status = MessageStatus::Failed);
            emit(events, SessionEvent::MessagesUpdated);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        api::ApiError,
        domain::message::MessageType,
        infra::stubs::{RecordedCall, ScriptedChatApi},
    };

    fn ctx() -> SessionContext {
        SessionContext::new("u1", "tok")
    }

    fn confirmed(id: &str, content: &str) -> Message {
        let at = Utc.timestamp_opt(1_000, 0).unwrap();
        Message {
            id: id.to_owned(),
            content: Some(content.to_owned()),
            message_type: MessageType::Text,
            status: MessageStatus::Sent,
            sender_id: "u1".to_owned(),
            chat_id: "c1".to_owned(),
            parent_id: None,
            deleted_for_everyone: false,
            created_at: at,
            updated_at: at,
            sender: None,
            attachments: Vec::new(),
            reactions: Vec::new(),
            read_receipts: Vec::new(),
            is_pinned: false,
        }
    }

    fn text_command(body: &str) -> SendMessageCommand {
        SendMessageCommand {
            reply_to: None,
            content: OutgoingContent::Text {
                body: body.to_owned(),
            },
        }
    }

    fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut collected = Vec::new();
        while let Ok(event) = events.try_recv() {
            collected.push(event);
        }
        collected
    }

    #[tokio::test]
    async fn rejects_empty_text_before_any_network_call() {
        let api = ScriptedChatApi::new();
        let mut store = MessageStore::new("c1");
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = send_message(&api, &ctx(), &mut store, &tx, text_command("  \n ")).await;

        assert_eq!(result, Err(SendMessageError::EmptyMessage));
        assert!(api.recorded().is_empty());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn swaps_placeholder_for_confirmed_record() {
        let api = ScriptedChatApi::new();
        api.send_results
            .lock()
            .unwrap()
            .push_back(Ok(confirmed("m1", "hello")));
        let mut store = MessageStore::new("c1");
        let (tx, mut rx) = mpsc::unbounded_channel();

        send_message(&api, &ctx(), &mut store, &tx, text_command("  hello  "))
            .await
            .expect("send must resolve");

        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].id, "m1");
        assert_eq!(store.messages()[0].status, MessageStatus::Sent);

        let events = drain(&mut rx);
        assert_eq!(
            events,
            vec![
                SessionEvent::MessagesUpdated,
                SessionEvent::ScrollToLatest,
                SessionEvent::MessagesUpdated,
                SessionEvent::ScrollToLatest,
            ]
        );

        match &api.recorded()[0] {
            RecordedCall::SendMessage { outgoing } => {
                assert_eq!(outgoing.chat_id, "c1");
                assert_eq!(
                    outgoing.content,
                    OutgoingContent::Text {
                        body: "hello".to_owned()
                    }
                );
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn marks_placeholder_failed_when_dispatch_fails() {
        let api = ScriptedChatApi::new();
        api.send_results
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Unavailable));
        let mut store = MessageStore::new("c1");
        let (tx, _rx) = mpsc::unbounded_channel();

        send_message(&api, &ctx(), &mut store, &tx, text_command("hello"))
            .await
            .expect("failure surfaces via status, not Err");

        assert_eq!(store.len(), 1);
        let placeholder = &store.messages()[0];
        assert!(placeholder.is_temporary());
        assert_eq!(placeholder.status, MessageStatus::Failed);
        assert!(!store.is_pending(&placeholder.id));
    }

    #[tokio::test]
    async fn placeholder_carries_reply_parent_and_sender() {
        let api = ScriptedChatApi::new();
        api.send_results
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Unavailable));
        let mut store = MessageStore::new("c1");
        let (tx, _rx) = mpsc::unbounded_channel();

        send_message(
            &api,
            &ctx(),
            &mut store,
            &tx,
            SendMessageCommand {
                reply_to: Some("m7".to_owned()),
                content: OutgoingContent::Text {
                    body: "sure".to_owned(),
                },
            },
        )
        .await
        .expect("send must resolve");

        let placeholder = &store.messages()[0];
        assert_eq!(placeholder.parent_id.as_deref(), Some("m7"));
        assert_eq!(placeholder.sender_id, "u1");
        assert_eq!(placeholder.chat_id, "c1");
    }

    #[tokio::test]
    async fn media_placeholder_gets_a_renderable_attachment() {
        let api = ScriptedChatApi::new();
        api.send_results
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Unavailable));
        let mut store = MessageStore::new("c1");
        let (tx, _rx) = mpsc::unbounded_channel();

        send_message(
            &api,
            &ctx(),
            &mut store,
            &tx,
            SendMessageCommand {
                reply_to: None,
                content: OutgoingContent::Image {
                    source: MediaSource::Url("https://files.example/p.png".to_owned()),
                    caption: Some("look".to_owned()),
                },
            },
        )
        .await
        .expect("send must resolve");

        let placeholder = &store.messages()[0];
        assert_eq!(placeholder.message_type, MessageType::Image);
        assert_eq!(placeholder.attachments.len(), 1);
        assert_eq!(placeholder.attachments[0].url, "https://files.example/p.png");
    }

    #[tokio::test]
    async fn resend_replaces_failed_message_with_fresh_attempt() {
        let api = ScriptedChatApi::new();
        api.send_results
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Unavailable));
        api.send_results
            .lock()
            .unwrap()
            .push_back(Ok(confirmed("m1", "hello")));
        let mut store = MessageStore::new("c1");
        let (tx, _rx) = mpsc::unbounded_channel();

        send_message(&api, &ctx(), &mut store, &tx, text_command("hello"))
            .await
            .expect("first send must resolve");
        let failed_id = store.messages()[0].id.clone();

        resend_message(&api, &ctx(), &mut store, &tx, &failed_id)
            .await
            .expect("resend must resolve");

        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].id, "m1");
        assert_eq!(api.recorded().len(), 2);
    }

    #[tokio::test]
    async fn resend_reuses_the_media_reference_of_a_failed_image() {
        let api = ScriptedChatApi::new();
        api.send_results
            .lock()
            .unwrap()
            .push_back(Err(ApiError::Unavailable));
        let mut server = confirmed("m1", "look");
        server.message_type = MessageType::Image;
        api.send_results.lock().unwrap().push_back(Ok(server));
        let mut store = MessageStore::new("c1");
        let (tx, _rx) = mpsc::unbounded_channel();

        send_message(
            &api,
            &ctx(),
            &mut store,
            &tx,
            SendMessageCommand {
                reply_to: None,
                content: OutgoingContent::Image {
                    source: MediaSource::Url("https://files.example/p.png".to_owned()),
                    caption: Some("look".to_owned()),
                },
            },
        )
        .await
        .expect("first send must resolve");
        let failed_id = store.messages()[0].id.clone();
        assert_eq!(store.messages()[0].status, MessageStatus::Failed);

        resend_message(&api, &ctx(), &mut store, &tx, &failed_id)
            .await
            .expect("media resend must resolve");

        assert_eq!(store.len(), 1);
        assert_eq!(store.messages()[0].id, "m1");
        match &api.recorded()[1] {
            RecordedCall::SendMessage { outgoing } => {
                assert_eq!(
                    outgoing.content,
                    OutgoingContent::Image {
                        source: MediaSource::Url("https://files.example/p.png".to_owned()),
                        caption: Some("look".to_owned()),
                    }
                );
            }
            other => panic!("unexpected call: {other:?}"),
        }
    }

    #[tokio::test]
    async fn resend_rejects_media_record_without_a_reference() {
        let api = ScriptedChatApi::new();
        let mut store = MessageStore::new("c1");
        let mut failed = confirmed("temp-1", "look");
        failed.message_type = MessageType::Image;
        failed.status = MessageStatus::Failed;
        failed.attachments.clear();
        store.push(failed);
        let (tx, _rx) = mpsc::unbounded_channel();

        let result = resend_message(&api, &ctx(), &mut store, &tx, "temp-1").await;

        assert_eq!(result, Err(ResendError::MissingContent));
        assert!(api.recorded().is_empty());
    }

    #[tokio::test]
    async fn resend_rejects_non_failed_and_unknown_messages() {
        let api = ScriptedChatApi::new();
        let mut store = MessageStore::new("c1");
        store.push(confirmed("m1", "hello"));
        let (tx, _rx) = mpsc::unbounded_channel();

        assert_eq!(
            resend_message(&api, &ctx(), &mut store, &tx, "m1").await,
            Err(ResendError::NotFailed)
        );
        assert_eq!(
            resend_message(&api, &ctx(), &mut store, &tx, "m9").await,
            Err(ResendError::UnknownMessage)
        );
        assert!(api.recorded().is_empty());
    }
}
