//! Scripted `ChatApi` stub shared by the operation pipeline tests.

use std::{
    collections::VecDeque,
    sync::Mutex,
};

use async_trait::async_trait;

use crate::{
    api::{payloads::OutgoingMessage, ApiError, ChatApi},
    domain::{
        chat::Chat,
        message::{Message, Reaction, ReactionKind},
    },
    usecases::context::SessionContext,
};

/// One recorded call with the arguments the pipeline passed in.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedCall {
    FetchChat { chat_id: String },
    ListMessages { chat_id: String },
    SendMessage { outgoing: OutgoingMessage },
    EditMessage { message_id: String, content: String },
    DeleteMessage { message_id: String, for_everyone: bool },
    MarkRead { message_id: String },
    SetPinned { message_id: String, pinned: bool },
    React { message_id: String, kind: ReactionKind },
    RemoveReaction { reaction_id: String },
    AddParticipants { chat_id: String, user_ids: Vec<String> },
    RemoveParticipant { chat_id: String, user_id: String },
    DeleteChat { chat_id: String },
}

/// `ChatApi` double: answers from scripted queues and records every call.
/// Empty queues fall back to the `default_*` results.
pub struct ScriptedChatApi {
    pub calls: Mutex<Vec<RecordedCall>>,
    pub chat_results: Mutex<VecDeque<Result<Chat, ApiError>>>,
    pub list_results: Mutex<VecDeque<Result<Vec<Message>, ApiError>>>,
    pub send_results: Mutex<VecDeque<Result<Message, ApiError>>>,
    pub edit_results: Mutex<VecDeque<Result<Message, ApiError>>>,
    pub react_results: Mutex<VecDeque<Result<Option<Reaction>, ApiError>>>,
    pub unit_result: Mutex<Result<(), ApiError>>,
}

impl ScriptedChatApi {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            chat_results: Mutex::new(VecDeque::new()),
            list_results: Mutex::new(VecDeque::new()),
            send_results: Mutex::new(VecDeque::new()),
            edit_results: Mutex::new(VecDeque::new()),
            react_results: Mutex::new(VecDeque::new()),
            unit_result: Mutex::new(Ok(())),
        }
    }

    pub fn failing_units(error: ApiError) -> Self {
        let stub = Self::new();
        *stub.unit_result.lock().unwrap() = Err(error);
        stub
    }

    pub fn recorded(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: RecordedCall) {
        self.calls.lock().unwrap().push(call);
    }

    fn unit(&self) -> Result<(), ApiError> {
        self.unit_result.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatApi for ScriptedChatApi {
    async fn fetch_chat(&self, _ctx: &SessionContext, chat_id: &str) -> Result<Chat, ApiError> {
        self.record(RecordedCall::FetchChat {
            chat_id: chat_id.to_owned(),
        });
        self.chat_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::NotFound))
    }

    async fn list_messages(
        &self,
        _ctx: &SessionContext,
        chat_id: &str,
    ) -> Result<Vec<Message>, ApiError> {
        self.record(RecordedCall::ListMessages {
            chat_id: chat_id.to_owned(),
        });
        self.list_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(Vec::new()))
    }

    async fn send_message(
        &self,
        _ctx: &SessionContext,
        outgoing: &OutgoingMessage,
    ) -> Result<Message, ApiError> {
        self.record(RecordedCall::SendMessage {
            outgoing: outgoing.clone(),
        });
        self.send_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::Unavailable))
    }

    async fn edit_message(
        &self,
        _ctx: &SessionContext,
        message_id: &str,
        content: &str,
    ) -> Result<Message, ApiError> {
        self.record(RecordedCall::EditMessage {
            message_id: message_id.to_owned(),
            content: content.to_owned(),
        });
        self.edit_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(ApiError::Unavailable))
    }

    async fn delete_message(
        &self,
        _ctx: &SessionContext,
        message_id: &str,
        for_everyone: bool,
    ) -> Result<(), ApiError> {
        self.record(RecordedCall::DeleteMessage {
            message_id: message_id.to_owned(),
            for_everyone,
        });
        self.unit()
    }

    async fn mark_read(&self, _ctx: &SessionContext, message_id: &str) -> Result<(), ApiError> {
        self.record(RecordedCall::MarkRead {
            message_id: message_id.to_owned(),
        });
        self.unit()
    }

    async fn set_pinned(
        &self,
        _ctx: &SessionContext,
        message_id: &str,
        pinned: bool,
    ) -> Result<(), ApiError> {
        self.record(RecordedCall::SetPinned {
            message_id: message_id.to_owned(),
            pinned,
        });
        self.unit()
    }

    async fn react(
        &self,
        _ctx: &SessionContext,
        message_id: &str,
        kind: ReactionKind,
    ) -> Result<Option<Reaction>, ApiError> {
        self.record(RecordedCall::React {
            message_id: message_id.to_owned(),
            kind,
        });
        self.react_results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Ok(None))
    }

    async fn remove_reaction(
        &self,
        _ctx: &SessionContext,
        reaction_id: &str,
    ) -> Result<(), ApiError> {
        self.record(RecordedCall::RemoveReaction {
            reaction_id: reaction_id.to_owned(),
        });
        self.unit()
    }

    async fn add_participants(
        &self,
        _ctx: &SessionContext,
        chat_id: &str,
        user_ids: &[String],
    ) -> Result<(), ApiError> {
        self.record(RecordedCall::AddParticipants {
            chat_id: chat_id.to_owned(),
            user_ids: user_ids.to_vec(),
        });
        self.unit()
    }

    async fn remove_participant(
        &self,
        _ctx: &SessionContext,
        chat_id: &str,
        user_id: &str,
    ) -> Result<(), ApiError> {
        self.record(RecordedCall::RemoveParticipant {
            chat_id: chat_id.to_owned(),
            user_id: user_id.to_owned(),
        });
        self.unit()
    }

    async fn delete_chat(&self, _ctx: &SessionContext, chat_id: &str) -> Result<(), ApiError> {
        self.record(RecordedCall::DeleteChat {
            chat_id: chat_id.to_owned(),
        });
        self.unit()
    }
}
