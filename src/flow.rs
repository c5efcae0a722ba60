//! Conversation flow for turning a photo into an emoji pack.
//!
//! Each user walks through the same sequence:
//!
//! ```text
//! photo ──► accept_photo ──► select_grid ──► begin_crop ──► crop ──► publish
//!            (suggest)         (store)        (take session)  (tiles)  (link)
//! ```
//!
//! Per-user state lives in a [`SessionStore`] keyed by user id. A session owns
//! the user's [`WorkDir`], so the directory disappears whenever the session
//! does: after publishing, after a failure, when a new photo replaces it, or
//! when the session sits idle past `storage.session_ttl_secs`.
//!
//! The flow is transport-agnostic. The bot layer downloads the photo into the
//! work dir and renders [`Reply`] values; everything here is testable with the
//! mock image backend and a mock sticker API.

use crate::config::StorageConfig;
use crate::imaging::{
    BackendError, CropError, Dimensions, EmojiTile, GridSize, ImageBackend, Padding,
    crop_to_grid, suggest_for_image,
};
use crate::keyboards::{self, CallbackError};
use crate::pack::{EmojiCollection, PackPublisher, PublishError, StickerApi};
use crate::strings;
use crate::telegram::{InlineKeyboardMarkup, TelegramError};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

pub type UserId = i64;

/// File name of the downloaded photo inside a work dir.
pub const INPUT_FILE_NAME: &str = "input.jpg";

/// What went wrong, independent of where.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or unreadable image, malformed choice, padding too large for the cells.
    Input,
    /// Bitmap codec or Bot API failure.
    External,
    /// A step was reached before the steps it depends on.
    State,
}

/// Which failure message the user sees.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    ProcessingFailed,
    PackCreationFailed,
}

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("No photo received yet")]
    NoPhoto,
    #[error("No grid selected yet")]
    NoGrid,
    #[error(transparent)]
    Callback(#[from] CallbackError),
    #[error(transparent)]
    Crop(#[from] CropError),
    #[error(transparent)]
    Publish(#[from] PublishError),
    #[error("Photo download failed: {0}")]
    Download(#[source] TelegramError),
    #[error("Work directory error: {0}")]
    Storage(#[from] io::Error),
    #[error("Crop worker stopped: {0}")]
    Worker(String),
}

impl FlowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FlowError::NoPhoto | FlowError::NoGrid => ErrorKind::State,
            FlowError::Callback(_) => ErrorKind::Input,
            FlowError::Crop(err) => match err {
                CropError::Param(_) | CropError::DegenerateCell { .. } => ErrorKind::Input,
                CropError::Backend(BackendError::Io(_)) => ErrorKind::Input,
                CropError::Backend(BackendError::ProcessingFailed(_)) => ErrorKind::External,
                CropError::WriteTile { .. } => ErrorKind::External,
            },
            FlowError::Publish(PublishError::EmptyPack) => ErrorKind::Input,
            FlowError::Publish(PublishError::Rejected { .. }) => ErrorKind::External,
            FlowError::Download(_) | FlowError::Storage(_) | FlowError::Worker(_) => {
                ErrorKind::External
            }
        }
    }

    pub fn outcome(&self) -> Outcome {
        match self {
            FlowError::Publish(_) => Outcome::PackCreationFailed,
            _ => Outcome::ProcessingFailed,
        }
    }
}

/// Text plus optional keyboard, ready to send or edit in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Reply {
    pub text: String,
    pub keyboard: Option<InlineKeyboardMarkup>,
}

impl Reply {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            keyboard: None,
        }
    }

    fn with_keyboard(text: impl Into<String>, keyboard: InlineKeyboardMarkup) -> Self {
        Self {
            text: text.into(),
            keyboard: Some(keyboard),
        }
    }

    pub fn main_menu() -> Self {
        Self::with_keyboard(strings::START, keyboards::main_menu())
    }

    pub fn help() -> Self {
        Self::with_keyboard(strings::HELP, keyboards::back_to_menu())
    }

    pub fn send_photo() -> Self {
        Self::with_keyboard(strings::SEND_PHOTO, keyboards::back_to_menu())
    }

    pub fn success(pack: &EmojiCollection) -> Self {
        Self::with_keyboard(strings::success(&pack.share_link), keyboards::back_to_menu())
    }

    /// Generic failure text; details stay in the logs.
    pub fn failure(err: &FlowError) -> Self {
        let text = match err.outcome() {
            Outcome::ProcessingFailed => strings::ERROR_PROCESSING,
            Outcome::PackCreationFailed => strings::ERROR_CREATING_PACK,
        };
        Self::with_keyboard(text, keyboards::back_to_menu())
    }
}

// =========================================================================
// Work directories and sessions
// =========================================================================

/// A per-user scratch directory, removed on drop.
#[derive(Debug)]
pub struct WorkDir {
    path: PathBuf,
}

impl WorkDir {
    /// Create `{temp_root}/{prefix}{user}`, discarding anything left there.
    pub fn create(storage: &StorageConfig, user: UserId) -> io::Result<Self> {
        let path = storage.work_dir_for(user);
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e),
        }
        std::fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Where the downloaded photo is stored.
    pub fn input_path(&self) -> PathBuf {
        self.path.join(INPUT_FILE_NAME)
    }
}

impl Drop for WorkDir {
    fn drop(&mut self) {
        match std::fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "failed to remove work dir")
            }
        }
    }
}

#[derive(Debug)]
pub struct Session {
    pub work_dir: WorkDir,
    pub image_path: PathBuf,
    pub dims: Dimensions,
    pub grid: Option<GridSize>,
    /// Last time the user advanced this session.
    pub touched: Instant,
}

/// Sessions keyed by user id.
///
/// The lock is held only for map operations. Sessions are always moved out
/// before they are dropped, so work dirs are never deleted under the lock.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<UserId, Session>>,
}

impl SessionStore {
    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<UserId, Session>> {
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Store a session, returning the one it replaced.
    pub fn insert(&self, user: UserId, session: Session) -> Option<Session> {
        self.map().insert(user, session)
    }

    pub fn take(&self, user: UserId) -> Option<Session> {
        self.map().remove(&user)
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.map().contains_key(&user)
    }

    /// Run `f` on the user's session, if there is one.
    pub fn update<T>(&self, user: UserId, f: impl FnOnce(&mut Session) -> T) -> Option<T> {
        self.map().get_mut(&user).map(f)
    }

    /// Remove every session untouched for longer than `max_idle` as of `now`.
    pub fn take_idle(&self, max_idle: Duration, now: Instant) -> Vec<(UserId, Session)> {
        let mut map = self.map();
        let idle: Vec<UserId> = map
            .iter()
            .filter(|(_, s)| now.saturating_duration_since(s.touched) > max_idle)
            .map(|(user, _)| *user)
            .collect();
        idle.into_iter()
            .filter_map(|user| map.remove(&user).map(|s| (user, s)))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A session that has left the store and is being turned into a pack.
///
/// Dropping the job releases the work dir.
#[derive(Debug)]
pub struct CropJob {
    pub user: UserId,
    pub grid: GridSize,
    pub padding: Padding,
    session: Session,
}

impl CropJob {
    pub fn image_path(&self) -> &Path {
        &self.session.image_path
    }
}

// =========================================================================
// The flow
// =========================================================================

/// Photo to emoji pack conversation, shared by all users.
pub struct EmojiCropper<B, A> {
    backend: Arc<B>,
    publisher: PackPublisher<A>,
    sessions: SessionStore,
    storage: StorageConfig,
    tile_size: u32,
    span: tracing::Span,
}

impl<B, A> EmojiCropper<B, A>
where
    B: ImageBackend + Send + 'static,
    A: StickerApi,
{
    pub fn new(
        backend: Arc<B>,
        publisher: PackPublisher<A>,
        storage: StorageConfig,
        tile_size: u32,
    ) -> Self {
        Self {
            backend,
            publisher,
            sessions: SessionStore::default(),
            storage,
            tile_size,
            span: tracing::Span::none(),
        }
    }

    /// Emit flow events inside `span`.
    pub fn with_span(mut self, span: tracing::Span) -> Self {
        self.span = span;
        self
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Drop any previous session and hand out a fresh, empty work dir.
    ///
    /// The old session must go first: it owns the same directory path.
    pub fn prepare_work_dir(&self, user: UserId) -> Result<WorkDir, FlowError> {
        drop(self.sessions.take(user));
        Ok(WorkDir::create(&self.storage, user)?)
    }

    /// Identify the downloaded photo and offer grid choices.
    ///
    /// On failure `work_dir` is dropped and removed.
    pub fn accept_photo(&self, user: UserId, work_dir: WorkDir) -> Result<Reply, FlowError> {
        let image_path = work_dir.input_path();
        let (dims, grids) = suggest_for_image(self.backend.as_ref(), &image_path)?;

        self.span.in_scope(|| {
            tracing::info!(
                user_id = user,
                width = dims.width,
                height = dims.height,
                suggestions = grids.len(),
                "photo accepted"
            );
        });

        let replaced = self.sessions.insert(
            user,
            Session {
                work_dir,
                image_path,
                dims,
                grid: None,
                touched: Instant::now(),
            },
        );
        drop(replaced);

        Ok(Reply::with_keyboard(
            strings::ask_grid(dims),
            keyboards::grid_selection(&grids),
        ))
    }

    /// Remember the chosen grid and ask for padding.
    pub fn select_grid(&self, user: UserId, grid: GridSize) -> Result<Reply, FlowError> {
        self.sessions
            .update(user, |session| {
                session.grid = Some(grid);
                session.touched = Instant::now();
            })
            .ok_or(FlowError::NoPhoto)?;
        self.span
            .in_scope(|| tracing::info!(user_id = user, grid = %grid, "grid selected"));
        Ok(Reply::with_keyboard(
            strings::ASK_PADDING,
            keyboards::padding_selection(),
        ))
    }

    /// Take the user's session out of the store for processing.
    ///
    /// The session is consumed whether or not a grid was chosen.
    pub fn begin_crop(&self, user: UserId, padding: Padding) -> Result<CropJob, FlowError> {
        let session = self.sessions.take(user).ok_or(FlowError::NoPhoto)?;
        let grid = session.grid.ok_or(FlowError::NoGrid)?;
        self.span.in_scope(|| {
            tracing::info!(user_id = user, grid = %grid, padding = padding.level(), "crop started")
        });
        Ok(CropJob {
            user,
            grid,
            padding,
            session,
        })
    }

    /// Cut the job's image into tiles on the blocking pool.
    pub async fn crop(&self, job: &CropJob) -> Result<Vec<EmojiTile>, FlowError> {
        let backend = Arc::clone(&self.backend);
        let source = job.session.image_path.clone();
        let (grid, padding, tile_size) = (job.grid, job.padding, self.tile_size);
        let span = self.span.clone();

        let tiles = tokio::task::spawn_blocking(move || {
            span.in_scope(|| crop_to_grid(backend.as_ref(), &source, grid, padding, tile_size))
        })
        .await
        .map_err(|e| FlowError::Worker(e.to_string()))??;

        self.span.in_scope(|| {
            tracing::info!(user_id = job.user, tiles = tiles.len(), "crop finished")
        });
        Ok(tiles)
    }

    /// Publish the tiles as the job owner's pack. Consumes the job.
    pub async fn publish(
        &self,
        job: CropJob,
        tiles: Vec<EmojiTile>,
    ) -> Result<EmojiCollection, FlowError> {
        let pack = self.publisher.publish(job.user, tiles, None).await?;
        Ok(pack)
    }

    /// Crop and publish in one go.
    pub async fn run_job(&self, job: CropJob) -> Result<EmojiCollection, FlowError> {
        let tiles = self.crop(&job).await?;
        self.publish(job, tiles).await
    }

    /// Drop sessions idle past the configured TTL, removing their work dirs.
    ///
    /// Returns how many were dropped.
    pub fn expire_idle_sessions(&self, now: Instant) -> usize {
        let Some(ttl) = self.storage.session_ttl() else {
            return 0;
        };
        let expired = self.sessions.take_idle(ttl, now);
        for (user, _) in &expired {
            self.span
                .in_scope(|| tracing::info!(user_id = *user, "idle session expired"));
        }
        expired.len()
    }

    /// Log a failed step for `user` with its classification.
    pub fn report_failure(&self, user: UserId, err: &FlowError) {
        let kind = err.kind();
        self.span.in_scope(|| match kind {
            ErrorKind::External => {
                tracing::error!(user_id = user, kind = ?kind, error = %err, "emoji flow failed")
            }
            _ => tracing::warn!(user_id = user, kind = ?kind, error = %err, "emoji flow failed"),
        });
    }
}
