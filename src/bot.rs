//! Long-polling bot runner.
//!
//! Polls `getUpdates`, spawns one task per update, and serializes each user's
//! updates behind a per-user lock so a conversation never runs two steps at
//! once. Independent users are served concurrently.

use crate::config::BotConfig;
use crate::flow::{EmojiCropper, FlowError, Reply, UserId};
use crate::imaging::{Padding, RustBackend};
use crate::keyboards::{Callback, MenuCommand};
use crate::pack::PackPublisher;
use crate::strings;
use crate::telegram::{CallbackQuery, Message, PhotoSize, TelegramClient, TelegramError, Update};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::Instrument;

/// Pause before polling again after a failed `getUpdates`.
const POLL_RETRY_DELAY: Duration = Duration::from_secs(3);

/// State kept for a user only while one of their updates is in flight or
/// queued.
#[derive(Debug, Default)]
struct UserSlot {
    /// Message whose padding step already ran to a final reply.
    finished_message: Option<i64>,
}

type SlotLock = Arc<tokio::sync::Mutex<UserSlot>>;

/// One async mutex per user, dropped once nobody holds or waits for it.
#[derive(Default)]
struct UserLocks {
    locks: Mutex<HashMap<UserId, SlotLock>>,
}

impl UserLocks {
    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, SlotLock>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn acquire(&self, user: UserId) -> UserGuard<'_> {
        let lock = Arc::clone(self.map().entry(user).or_default());
        UserGuard {
            locks: self,
            user,
            slot: lock.lock_owned().await,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.map().len()
    }
}

/// Exclusive access to one user's slot; prunes the entry on release.
struct UserGuard<'a> {
    locks: &'a UserLocks,
    user: UserId,
    slot: tokio::sync::OwnedMutexGuard<UserSlot>,
}

impl std::ops::Deref for UserGuard<'_> {
    type Target = UserSlot;

    fn deref(&self) -> &UserSlot {
        &self.slot
    }
}

impl std::ops::DerefMut for UserGuard<'_> {
    fn deref_mut(&mut self) -> &mut UserSlot {
        &mut self.slot
    }
}

impl Drop for UserGuard<'_> {
    fn drop(&mut self) {
        let mut map = self.locks.map();
        // The map and this guard hold one reference each; waiters hold more
        let mine = tokio::sync::OwnedMutexGuard::mutex(&self.slot);
        if map
            .get(&self.user)
            .is_some_and(|lock| Arc::ptr_eq(lock, mine) && Arc::strong_count(lock) == 2)
        {
            map.remove(&self.user);
        }
    }
}

/// A chat message the bot can edit in place.
#[derive(Debug, Clone, Copy)]
struct MessageRef {
    chat_id: i64,
    message_id: i64,
}

pub struct Bot {
    client: Arc<TelegramClient>,
    flow: EmojiCropper<RustBackend, Arc<TelegramClient>>,
    locks: UserLocks,
    poll_timeout_secs: u64,
    span: tracing::Span,
}

impl Bot {
    pub fn new(client: Arc<TelegramClient>, bot_username: &str, config: &BotConfig) -> Self {
        let span = tracing::info_span!("bot", username = %bot_username);
        let publisher = PackPublisher::new(Arc::clone(&client), bot_username)
            .with_placeholder(config.emoji.placeholder.clone())
            .with_span(span.clone());
        let flow = EmojiCropper::new(
            Arc::new(RustBackend::new()),
            publisher,
            config.storage.clone(),
            config.emoji.tile_size,
        )
        .with_span(span.clone());

        Self {
            client,
            flow,
            locks: UserLocks::default(),
            poll_timeout_secs: config.telegram.poll_timeout_secs,
            span,
        }
    }

    /// Look up the bot's username and build a bot for it.
    pub async fn connect(config: &BotConfig) -> Result<Self, TelegramError> {
        let client = Arc::new(TelegramClient::new(&config.telegram));
        let me = client.get_me().await?;
        let username = me.username.ok_or(TelegramError::MissingUsername)?;
        tracing::info!(bot_id = me.id, username = %username, "connected to Bot API");
        Ok(Self::new(client, &username, config))
    }

    /// Poll for updates until Ctrl-C.
    ///
    /// Transient polling failures are retried after a pause; an unauthorized
    /// token stops the loop. Idle sessions are swept after every poll.
    pub async fn run(self: Arc<Self>) -> Result<(), TelegramError> {
        let mut offset: Option<i64> = None;
        self.span.in_scope(|| tracing::info!("polling for updates"));

        loop {
            let polled = tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    self.span.in_scope(|| tracing::info!("shutting down"));
                    return Ok(());
                }
                polled = self.client.get_updates(offset, self.poll_timeout_secs) => polled,
            };

            let updates = match polled {
                Ok(updates) => updates,
                Err(e @ TelegramError::Api { code: 401, .. }) => return Err(e),
                Err(e) => {
                    self.span
                        .in_scope(|| tracing::warn!(error = %e, "getUpdates failed, retrying"));
                    tokio::time::sleep(POLL_RETRY_DELAY).await;
                    continue;
                }
            };

            self.flow.expire_idle_sessions(Instant::now());

            for update in updates {
                offset = Some(update.update_id + 1);
                let bot = Arc::clone(&self);
                tokio::spawn(async move { bot.handle_update(update).await });
            }
        }
    }

    /// Dispatch one update. Failures are logged and reported to the user.
    pub async fn handle_update(&self, update: Update) {
        let span = tracing::info_span!(parent: &self.span, "update", update_id = update.update_id);
        async move {
            if let Some(query) = update.callback_query {
                let mut slot = self.locks.acquire(query.from.id).await;
                self.handle_callback(query, &mut slot).await;
            } else if let Some(message) = update.message {
                let user = message.from.as_ref().map_or(message.chat.id, |u| u.id);
                let _guard = self.locks.acquire(user).await;
                self.handle_message(user, message).await;
            }
        }
        .instrument(span)
        .await
    }

    async fn handle_message(&self, user: UserId, message: Message) {
        let chat_id = message.chat.id;

        if let Some(photo) = message.largest_photo() {
            tracing::info!(user_id = user, width = photo.width, height = photo.height, "photo received");
            let reply = match self.receive_photo(user, photo).await {
                Ok(reply) => reply,
                Err(e) => {
                    self.flow.report_failure(user, &e);
                    Reply::failure(&e)
                }
            };
            self.send(chat_id, &reply).await;
            return;
        }

        let reply = match message.text.as_deref().and_then(command_name) {
            Some("start") => Reply::main_menu(),
            Some("help") => Reply::help(),
            Some("emoji_cropper") => Reply::send_photo(),
            _ => Reply::text(strings::UNSUPPORTED_MESSAGE),
        };
        tracing::info!(user_id = user, text = ?message.text, "message received");
        self.send(chat_id, &reply).await;
    }

    async fn receive_photo(&self, user: UserId, photo: &PhotoSize) -> Result<Reply, FlowError> {
        let work_dir = self.flow.prepare_work_dir(user)?;
        self.client
            .download_file(&photo.file_id, &work_dir.input_path())
            .await
            .map_err(FlowError::Download)?;
        self.flow.accept_photo(user, work_dir)
    }

    async fn handle_callback(&self, query: CallbackQuery, slot: &mut UserSlot) {
        let user = query.from.id;
        if let Err(e) = self.client.answer_callback_query(&query.id).await {
            tracing::warn!(user_id = user, error = %e, "answerCallbackQuery failed");
        }

        let Some(target) = query.message.as_ref().map(|m| MessageRef {
            chat_id: m.chat.id,
            message_id: m.message_id,
        }) else {
            tracing::debug!(user_id = user, "callback without message ignored");
            return;
        };

        let callback = match query.data.as_deref().unwrap_or_default().parse::<Callback>() {
            Ok(callback) => callback,
            Err(e) => {
                let err = FlowError::from(e);
                self.flow.report_failure(user, &err);
                self.edit(target, &Reply::failure(&err)).await;
                return;
            }
        };
        tracing::info!(user_id = user, callback = %callback, "button pressed");

        let result = match callback {
            Callback::Menu(MenuCommand::Start) => Ok(Reply::main_menu()),
            Callback::Menu(MenuCommand::Help) => Ok(Reply::help()),
            Callback::Menu(MenuCommand::EmojiCropper) => Ok(Reply::send_photo()),
            Callback::Grid(grid) => self.flow.select_grid(user, grid),
            Callback::Padding(padding) => {
                // A second tap on the same keyboard must not overwrite the result
                if slot.finished_message == Some(target.message_id)
                    && !self.flow.sessions().contains(user)
                {
                    tracing::info!(user_id = user, "repeated padding tap ignored");
                    return;
                }
                let result = self.build_pack(user, target, padding).await;
                slot.finished_message = Some(target.message_id);
                result
            }
        };

        let reply = result.unwrap_or_else(|e| {
            self.flow.report_failure(user, &e);
            Reply::failure(&e)
        });
        self.edit(target, &reply).await;
    }

    /// Crop and publish, keeping the user informed in `target`.
    async fn build_pack(
        &self,
        user: UserId,
        target: MessageRef,
        padding: Padding,
    ) -> Result<Reply, FlowError> {
        let job = self.flow.begin_crop(user, padding)?;
        self.edit(target, &Reply::text(strings::PROCESSING)).await;
        let tiles = self.flow.crop(&job).await?;
        self.edit(target, &Reply::text(strings::CREATING_PACK)).await;
        let pack = self.flow.publish(job, tiles).await?;
        Ok(Reply::success(&pack))
    }

    async fn send(&self, chat_id: i64, reply: &Reply) {
        if let Err(e) = self
            .client
            .send_message(chat_id, &reply.text, reply.keyboard.as_ref())
            .await
        {
            tracing::warn!(chat_id, error = %e, "sendMessage failed");
        }
    }

    async fn edit(&self, target: MessageRef, reply: &Reply) {
        if let Err(e) = self
            .client
            .edit_message_text(
                target.chat_id,
                target.message_id,
                &reply.text,
                reply.keyboard.as_ref(),
            )
            .await
        {
            tracing::warn!(chat_id = target.chat_id, error = %e, "editMessageText failed");
        }
    }
}

/// `"/start@my_bot extra"` → `"start"`.
fn command_name(text: &str) -> Option<&str> {
    let word = text.trim().strip_prefix('/')?.split_whitespace().next()?;
    Some(word.split('@').next().unwrap_or(word))
}

/// Connect and poll until Ctrl-C.
pub async fn run(config: &BotConfig) -> Result<(), TelegramError> {
    let bot = Arc::new(Bot::connect(config).await?);
    bot.run().await
}
