//! Minimal Telegram Bot API client.
//!
//! Covers exactly the methods the bot needs: long polling, plain and inline
//! keyboard messages, file download, and custom emoji set creation. Every call
//! is a POST to `{api_url}/bot{token}/{method}`; file downloads use
//! `{api_url}/file/bot{token}/{file_path}`.
//!
//! The token is part of every URL, so URLs are never logged.

use crate::config::TelegramConfig;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum TelegramError {
    #[error("HTTP error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{method} rejected ({code}): {description}")]
    Api {
        method: &'static str,
        code: i64,
        description: String,
    },
    #[error("File {0} has no download path")]
    MissingFilePath(String),
    #[error("Bot account has no username")]
    MissingUsername,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TelegramError>;

// ============================================================================
// Wire types
// ============================================================================

/// Envelope every Bot API response is wrapped in.
#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    error_code: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<User>,
    pub chat: Chat,
    pub text: Option<String>,
    pub photo: Option<Vec<PhotoSize>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct User {
    pub id: i64,
    #[serde(default)]
    pub is_bot: bool,
    pub username: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    pub file_id: String,
    pub width: u32,
    pub height: u32,
    pub file_size: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: User,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct File {
    pub file_id: String,
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct InlineKeyboardMarkup {
    pub inline_keyboard: Vec<Vec<InlineKeyboardButton>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InlineKeyboardButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineKeyboardButton {
    pub fn callback(text: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: data.into(),
        }
    }
}

/// One sticker of a new set, uploaded as a multipart attachment.
#[derive(Debug, Clone, PartialEq)]
pub struct StickerUpload {
    pub file_name: String,
    pub png: Vec<u8>,
    pub emoji: String,
}

/// Arguments of `createNewStickerSet` for a static custom emoji set.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStickerSet {
    pub user_id: i64,
    pub name: String,
    pub title: String,
    pub stickers: Vec<StickerUpload>,
}

impl Message {
    /// The largest photo size attached to the message, if any.
    pub fn largest_photo(&self) -> Option<&PhotoSize> {
        self.photo
            .as_deref()?
            .iter()
            .max_by_key(|p| (u64::from(p.width) * u64::from(p.height), p.file_size))
    }
}

// ============================================================================
// Client
// ============================================================================

/// Bot API client. Cheap to share behind an `Arc`.
pub struct TelegramClient {
    token: String,
    api_url: String,
    client: reqwest::Client,
}

impl TelegramClient {
    pub fn new(config: &TelegramConfig) -> Self {
        Self {
            token: config.token.clone(),
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.token, method)
    }

    fn file_url(&self, file_path: &str) -> String {
        format!("{}/file/bot{}/{}", self.api_url, self.token, file_path)
    }

    /// Unwrap the `{ok, result}` envelope of a Bot API response.
    async fn decode<T: DeserializeOwned>(
        method: &'static str,
        response: reqwest::Response,
    ) -> Result<T> {
        let status = response.status();
        let body: ApiResponse<T> = response.json().await?;
        match (body.ok, body.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(TelegramError::Api {
                method,
                code: body
                    .error_code
                    .unwrap_or_else(|| i64::from(status.as_u16())),
                description: body
                    .description
                    .unwrap_or_else(|| "no description".to_string()),
            }),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: &'static str,
        body: &serde_json::Value,
    ) -> Result<T> {
        tracing::trace!(method, "bot api call");
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        Self::decode(method, response).await
    }

    /// Identity of the bot owning the token.
    pub async fn get_me(&self) -> Result<User> {
        self.call("getMe", &json!({})).await
    }

    /// Long-poll for updates after `offset`.
    pub async fn get_updates(&self, offset: Option<i64>, timeout_secs: u64) -> Result<Vec<Update>> {
        let mut body = json!({
            "timeout": timeout_secs,
            "allowed_updates": ["message", "callback_query"],
        });
        if let Some(offset) = offset {
            body["offset"] = json!(offset);
        }
        self.call("getUpdates", &body).await
    }

    pub async fn send_message(
        &self,
        chat_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<Message> {
        let mut body = json!({ "chat_id": chat_id, "text": text });
        if let Some(markup) = keyboard {
            body["reply_markup"] = serde_json::to_value(markup).unwrap_or_default();
        }
        self.call("sendMessage", &body).await
    }

    /// Replace the text (and keyboard) of a message the bot sent earlier.
    pub async fn edit_message_text(
        &self,
        chat_id: i64,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboardMarkup>,
    ) -> Result<()> {
        let mut body = json!({ "chat_id": chat_id, "message_id": message_id, "text": text });
        if let Some(markup) = keyboard {
            body["reply_markup"] = serde_json::to_value(markup).unwrap_or_default();
        }
        // Result is the edited Message, or `true` for inline messages.
        let _: serde_json::Value = self.call("editMessageText", &body).await?;
        Ok(())
    }

    pub async fn answer_callback_query(&self, callback_query_id: &str) -> Result<()> {
        let _: bool = self
            .call(
                "answerCallbackQuery",
                &json!({ "callback_query_id": callback_query_id }),
            )
            .await?;
        Ok(())
    }

    pub async fn get_file(&self, file_id: &str) -> Result<File> {
        self.call("getFile", &json!({ "file_id": file_id })).await
    }

    /// Resolve `file_id` and save its content to `dest`.
    pub async fn download_file(&self, file_id: &str, dest: &Path) -> Result<u64> {
        let file = self.get_file(file_id).await?;
        let file_path = file
            .file_path
            .ok_or_else(|| TelegramError::MissingFilePath(file.file_id.clone()))?;

        let bytes = self
            .client
            .get(self.file_url(&file_path))
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        tokio::fs::write(dest, &bytes).await?;

        tracing::debug!(file_id, bytes = bytes.len(), "downloaded file");
        Ok(bytes.len() as u64)
    }

    /// Create a static custom emoji set, uploading every sticker as a part.
    pub async fn create_new_sticker_set(&self, set: &NewStickerSet) -> Result<()> {
        let stickers: Vec<serde_json::Value> = set
            .stickers
            .iter()
            .enumerate()
            .map(|(i, s)| {
                json!({
                    "sticker": format!("attach://sticker{i}"),
                    "format": "static",
                    "emoji_list": [s.emoji],
                })
            })
            .collect();

        let mut form = reqwest::multipart::Form::new()
            .text("user_id", set.user_id.to_string())
            .text("name", set.name.clone())
            .text("title", set.title.clone())
            .text("sticker_type", "custom_emoji")
            .text("stickers", serde_json::Value::Array(stickers).to_string());

        for (i, sticker) in set.stickers.iter().enumerate() {
            let part = reqwest::multipart::Part::bytes(sticker.png.clone())
                .file_name(sticker.file_name.clone())
                .mime_str("image/png")?;
            form = form.part(format!("sticker{i}"), part);
        }

        let response = self
            .client
            .post(self.method_url("createNewStickerSet"))
            .multipart(form)
            .send()
            .await?;
        let _: bool = Self::decode("createNewStickerSet", response).await?;

        tracing::debug!(name = %set.name, stickers = set.stickers.len(), "sticker set created");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(api_url: &str) -> TelegramClient {
        TelegramClient::new(&TelegramConfig {
            token: "123:abc".to_string(),
            api_url: api_url.to_string(),
            ..TelegramConfig::default()
        })
    }

    #[test]
    fn urls_embed_token() {
        let c = client("https://api.telegram.org/");
        assert_eq!(
            c.method_url("getMe"),
            "https://api.telegram.org/bot123:abc/getMe"
        );
        assert_eq!(
            c.file_url("photos/file_1.jpg"),
            "https://api.telegram.org/file/bot123:abc/photos/file_1.jpg"
        );
    }

    #[test]
    fn parse_photo_update() {
        let json = r#"{
            "update_id": 7,
            "message": {
                "message_id": 3,
                "from": {"id": 42, "is_bot": false, "first_name": "A"},
                "chat": {"id": 42, "type": "private"},
                "date": 0,
                "photo": [
                    {"file_id": "small", "file_unique_id": "s", "width": 90, "height": 60, "file_size": 900},
                    {"file_id": "big", "file_unique_id": "b", "width": 1280, "height": 853, "file_size": 90000},
                    {"file_id": "mid", "file_unique_id": "m", "width": 320, "height": 213}
                ]
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let message = update.message.unwrap();
        assert_eq!(message.chat.id, 42);
        assert_eq!(message.largest_photo().unwrap().file_id, "big");
    }

    #[test]
    fn parse_callback_update() {
        let json = r#"{
            "update_id": 8,
            "callback_query": {
                "id": "cb1",
                "from": {"id": 42, "is_bot": false, "first_name": "A"},
                "chat_instance": "x",
                "data": "grid_6x3",
                "message": {"message_id": 5, "chat": {"id": 42, "type": "private"}, "date": 0, "text": "pick"}
            }
        }"#;

        let update: Update = serde_json::from_str(json).unwrap();
        let query = update.callback_query.unwrap();
        assert_eq!(query.data.as_deref(), Some("grid_6x3"));
        assert_eq!(query.message.unwrap().message_id, 5);
    }

    #[test]
    fn message_without_photo_has_no_largest() {
        let json = r#"{"message_id": 1, "chat": {"id": 1}, "text": "/start"}"#;
        let message: Message = serde_json::from_str(json).unwrap();
        assert!(message.largest_photo().is_none());
    }

    #[test]
    fn keyboard_serializes_to_bot_api_shape() {
        let markup = InlineKeyboardMarkup {
            inline_keyboard: vec![vec![InlineKeyboardButton::callback("Help", "cmd_help")]],
        };
        assert_eq!(
            serde_json::to_value(&markup).unwrap(),
            json!({"inline_keyboard": [[{"text": "Help", "callback_data": "cmd_help"}]]})
        );
    }

    #[test]
    fn api_error_display_includes_code() {
        let err = TelegramError::Api {
            method: "getMe",
            code: 401,
            description: "Unauthorized".into(),
        };
        assert_eq!(err.to_string(), "getMe rejected (401): Unauthorized");
    }
}
