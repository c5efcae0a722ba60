//! Custom emoji pack publishing.
//!
//! Turns an ordered list of tiles into a Telegram custom emoji set. The set
//! name has to be unique and, per Bot API rules, end in `_by_<bot username>`:
//!
//! ```text
//! emoji_{owner_id}_{unix_timestamp}_by_{bot_username}
//! ```
//!
//! Uniqueness rests on the timestamp: one owner cannot publish twice in the
//! same second through the sequential conversation flow. Creation is not
//! idempotent, so a failed publish is reported, never retried.

use crate::imaging::EmojiTile;
use crate::telegram::{NewStickerSet, StickerUpload, TelegramClient, TelegramError};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::Instrument;

/// Emoji every tile is registered under until the owner edits the pack.
pub const DEFAULT_PLACEHOLDER: &str = "😀";

#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Refusing to publish an empty emoji pack")]
    EmptyPack,
    #[error("Emoji pack {name} was not created: {source}")]
    Rejected {
        name: String,
        source: TelegramError,
    },
}

/// Capability that creates sticker sets on the platform.
#[async_trait]
pub trait StickerApi: Send + Sync {
    async fn create_sticker_set(&self, set: &NewStickerSet) -> Result<(), TelegramError>;
}

#[async_trait]
impl StickerApi for TelegramClient {
    async fn create_sticker_set(&self, set: &NewStickerSet) -> Result<(), TelegramError> {
        self.create_new_sticker_set(set).await
    }
}

#[async_trait]
impl<T: StickerApi + ?Sized> StickerApi for Arc<T> {
    async fn create_sticker_set(&self, set: &NewStickerSet) -> Result<(), TelegramError> {
        (**self).create_sticker_set(set).await
    }
}

/// A published pack. Only the link is shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmojiCollection {
    pub name: String,
    pub title: String,
    pub tile_count: usize,
    pub share_link: String,
}

pub fn pack_name(owner_id: i64, timestamp: i64, bot_username: &str) -> String {
    format!("emoji_{owner_id}_{timestamp}_by_{bot_username}")
}

pub fn default_title(timestamp: i64) -> String {
    format!("Emoji Pack {timestamp}")
}

pub fn share_link(name: &str) -> String {
    format!("https://t.me/addemoji/{name}")
}

/// Publishes tile sets as custom emoji packs owned by a user.
pub struct PackPublisher<A> {
    api: A,
    bot_username: String,
    placeholder: String,
    span: tracing::Span,
}

impl<A: StickerApi> PackPublisher<A> {
    pub fn new(api: A, bot_username: impl Into<String>) -> Self {
        Self {
            api,
            bot_username: bot_username.into(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
            span: tracing::Span::none(),
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = placeholder.into();
        self
    }

    /// Emit this publisher's events inside `span`.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    /// Publish stamped with the current time.
    pub async fn publish(
        &self,
        owner_id: i64,
        tiles: Vec<EmojiTile>,
        title: Option<&str>,
    ) -> Result<EmojiCollection, PublishError> {
        self.publish_at(owner_id, tiles, title, chrono::Utc::now().timestamp())
            .await
    }

    /// Publish with an explicit creation timestamp (seconds since epoch).
    pub async fn publish_at(
        &self,
        owner_id: i64,
        tiles: Vec<EmojiTile>,
        title: Option<&str>,
        timestamp: i64,
    ) -> Result<EmojiCollection, PublishError> {
        if tiles.is_empty() {
            return Err(PublishError::EmptyPack);
        }

        let name = pack_name(owner_id, timestamp, &self.bot_username);
        let title = match title {
            Some(t) if !t.trim().is_empty() => t.trim().to_string(),
            _ => default_title(timestamp),
        };
        let tile_count = tiles.len();

        let set = NewStickerSet {
            user_id: owner_id,
            name: name.clone(),
            title: title.clone(),
            stickers: tiles
                .into_iter()
                .map(|tile| StickerUpload {
                    file_name: tile.file_name(),
                    png: tile.png,
                    emoji: self.placeholder.clone(),
                })
                .collect(),
        };

        let result = self
            .api
            .create_sticker_set(&set)
            .instrument(self.span.clone())
            .await;
        if let Err(source) = result {
            self.span.in_scope(|| {
                tracing::warn!(owner_id, name = %name, error = %source, "emoji pack rejected");
            });
            return Err(PublishError::Rejected { name, source });
        }

        self.span.in_scope(|| {
            tracing::info!(owner_id, name = %name, tiles = tile_count, "emoji pack published");
        });
        Ok(EmojiCollection {
            share_link: share_link(&name),
            name,
            title,
            tile_count,
        })
    }
}
