use async_trait::async_trait;
use reqwest::{
    multipart::{Form, Part},
    Client, RequestBuilder, Response, StatusCode,
};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::{
    api::{
        payloads::{
            AddParticipantsRequest, EditRequest, MediaSource, OutgoingContent, OutgoingMessage,
            PinRequest, ReactRequest, ReactResponse, SendTextRequest,
        },
        ApiError, ChatApi,
    },
    domain::{
        chat::Chat,
        message::{Message, Reaction, ReactionKind},
    },
    infra::{config::ServerConfig, error::AppError},
    usecases::context::SessionContext,
};

/// `ChatApi` over the backend's REST surface.
pub struct RestChatApi {
    client: Client,
    base_url: String,
}

impl RestChatApi {
    pub fn new(config: &ServerConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_millis(config.request_timeout_ms))
            .build()
            .map_err(AppError::HttpClient)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<Response, ApiError> {
        let response = request.send().await.map_err(|error| {
            warn!(code = "API_TRANSPORT_FAILED", %error, "request did not reach the server");
            ApiError::Unavailable
        })?;

        map_status(response.status())?;
        Ok(response)
    }

    async fn execute_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = self.execute(request).await?;

        response.json::<T>().await.map_err(|error| {
            warn!(code = "API_CONTRACT_VIOLATED", %error, "response body did not match the contract");
            ApiError::InvalidData
        })
    }

    async fn media_form(
        &self,
        outgoing: &OutgoingMessage,
        source: &MediaSource,
    ) -> Result<Form, ApiError> {
        let mut form = Form::new()
            .text("chatId", outgoing.chat_id.clone())
            .text(
                "type",
                wire_enum_name(&outgoing.content.message_type())?,
            );

        if let Some(caption) = outgoing.content.caption() {
            form = form.text("content", caption.to_owned());
        }

        if let Some(parent_id) = &outgoing.parent_id {
            form = form.text("parentId", parent_id.clone());
        }

        match source {
            MediaSource::Url(url) => Ok(form.text("url", url.clone())),
            MediaSource::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|error| {
                    warn!(code = "API_MEDIA_READ_FAILED", %error, "could not read media file");
                    ApiError::InvalidData
                })?;

                let file_name = path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "attachment".to_owned());
                let mime = mime_by_extension(path.extension().and_then(|e| e.to_str()));

                let part = Part::bytes(bytes)
                    .file_name(file_name)
                    .mime_str(mime)
                    .map_err(|_| ApiError::InvalidData)?;

                Ok(form.part("file", part))
            }
        }
    }
}

#[async_trait]
impl ChatApi for RestChatApi {
    async fn fetch_chat(&self, ctx: &SessionContext, chat_id: &str) -> Result<Chat, ApiError> {
        debug!(code = "API_FETCH_CHAT", chat_id, "fetching chat");
        let request = self
            .client
            .get(self.url(&format!("/chats/{chat_id}")))
            .bearer_auth(&ctx.access_token);

        self.execute_json(request).await
    }

    async fn list_messages(
        &self,
        ctx: &SessionContext,
        chat_id: &str,
    ) -> Result<Vec<Message>, ApiError> {
        let request = self
            .client
            .get(self.url(&format!("/messages/chat/{chat_id}")))
            .bearer_auth(&ctx.access_token);

        self.execute_json(request).await
    }

    async fn send_message(
        &self,
        ctx: &SessionContext,
        outgoing: &OutgoingMessage,
    ) -> Result<Message, ApiError> {
        let url = self.url("/messages");

        let request = match (&outgoing.content, outgoing.content.media_source()) {
            (OutgoingContent::Text { body }, _) => self
                .client
                .post(url)
                .bearer_auth(&ctx.access_token)
                .json(&SendTextRequest {
                    chat_id: &outgoing.chat_id,
                    content: body,
                    message_type: outgoing.content.message_type(),
                    parent_id: outgoing.parent_id.as_deref(),
                }),
            (_, Some(source)) => {
                let form = self.media_form(outgoing, source).await?;
                self.client
                    .post(url)
                    .bearer_auth(&ctx.access_token)
                    .multipart(form)
            }
            (_, None) => return Err(ApiError::InvalidData),
        };

        self.execute_json(request).await
    }

    async fn edit_message(
        &self,
        ctx: &SessionContext,
        message_id: &str,
        content: &str,
    ) -> Result<Message, ApiError> {
        let request = self
            .client
            .patch(self.url(&format!("/messages/{message_id}")))
            .bearer_auth(&ctx.access_token)
            .json(&EditRequest { content });

        self.execute_json(request).await
    }

    async fn delete_message(
        &self,
        ctx: &SessionContext,
        message_id: &str,
        for_everyone: bool,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(&format!("/messages/{message_id}")))
            .query(&[("forEveryone", for_everyone)])
            .bearer_auth(&ctx.access_token);

        self.execute(request).await.map(drop)
    }

    async fn mark_read(&self, ctx: &SessionContext, message_id: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url(&format!("/messages/read/{message_id}")))
            .bearer_auth(&ctx.access_token);

        self.execute(request).await.map(drop)
    }

    async fn set_pinned(
        &self,
        ctx: &SessionContext,
        message_id: &str,
        pinned: bool,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .patch(self.url(&format!("/messages/{message_id}/pin")))
            .bearer_auth(&ctx.access_token)
            .json(&PinRequest { is_pinned: pinned });

        self.execute(request).await.map(drop)
    }

    async fn react(
        &self,
        ctx: &SessionContext,
        message_id: &str,
        kind: ReactionKind,
    ) -> Result<Option<Reaction>, ApiError> {
        let request = self
            .client
            .post(self.url(&format!("/reactions/message/{message_id}")))
            .bearer_auth(&ctx.access_token)
            .json(&ReactRequest { kind });

        let response: ReactResponse = self.execute_json(request).await?;
        Ok(response.reaction)
    }

    async fn remove_reaction(
        &self,
        ctx: &SessionContext,
        reaction_id: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(&format!("/reactions/{reaction_id}")))
            .bearer_auth(&ctx.access_token);

        self.execute(request).await.map(drop)
    }

    async fn add_participants(
        &self,
        ctx: &SessionContext,
        chat_id: &str,
        user_ids: &[String],
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .post(self.url(&format!("/chats/{chat_id}/participants")))
            .bearer_auth(&ctx.access_token)
            .json(&AddParticipantsRequest { user_ids });

        self.execute(request).await.map(drop)
    }

    async fn remove_participant(
        &self,
        ctx: &SessionContext,
        chat_id: &str,
        user_id: &str,
    ) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(&format!("/chats/{chat_id}/participants/{user_id}")))
            .bearer_auth(&ctx.access_token);

        self.execute(request).await.map(drop)
    }

    async fn delete_chat(&self, ctx: &SessionContext, chat_id: &str) -> Result<(), ApiError> {
        let request = self
            .client
            .delete(self.url(&format!("/chats/{chat_id}")))
            .bearer_auth(&ctx.access_token);

        self.execute(request).await.map(drop)
    }
}

fn map_status(status: StatusCode) -> Result<(), ApiError> {
    if status.is_success() {
        return Ok(());
    }

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ApiError::Unauthorized),
        StatusCode::NOT_FOUND => Err(ApiError::NotFound),
        _ => Err(ApiError::Unavailable),
    }
}

/// Wire name for an enum serialized with SCREAMING_SNAKE_CASE.
fn wire_enum_name<T: serde::Serialize>(value: &T) -> Result<String, ApiError> {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(name)) => Ok(name),
        _ => Err(ApiError::InvalidData),
    }
}

fn mime_by_extension(extension: Option<&str>) -> &'static str {
    match extension.map(str::to_ascii_lowercase).as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("mp4") => "video/mp4",
        Some("webm") => "video/webm",
        Some("mp3") => "audio/mpeg",
        Some("ogg") => "audio/ogg",
        Some("wav") => "audio/wav",
        Some("pdf") => "application/pdf",
        _ => "application/octet-stream",
    }
}
