//! # emoji-grid
//!
//! Turns a picture into a grid of Telegram custom emoji. A user sends a photo
//! to the bot, picks one of a few suggested grid sizes and a padding level, and
//! receives a link to a freshly published emoji pack. Typed in order, row by
//! row, the emoji rebuild the picture.
//!
//! # Architecture
//!
//! ```text
//! photo ─► imaging::suggest_grid_sizes ─► user picks grid + padding
//!       ─► imaging::crop_to_grid (tiles) ─► pack::PackPublisher ─► share link
//! ```
//!
//! The pixel work and the platform calls sit behind traits
//! ([`imaging::ImageBackend`], [`pack::StickerApi`]), so the conversation logic
//! in [`flow`] is tested with mocks and no network.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`imaging`] | Grid suggestion, crop planning, tile cutting with the `image` crate |
//! | [`pack`] | Custom emoji pack naming and publishing |
//! | [`flow`] | Per-user conversation state, work directories, error classification |
//! | [`keyboards`] | Inline keyboards and callback data |
//! | [`strings`] | User-visible texts |
//! | [`telegram`] | Minimal Bot API client |
//! | [`bot`] | Long-polling runner dispatching updates into the flow |
//! | [`config`] | `config.toml` + environment configuration |
//! | [`output`] | CLI output formatting for the offline commands |
//!
//! # Design Decisions
//!
//! ## Near-Square Cells
//!
//! Custom emoji are square. A grid whose cells are far from square squashes
//! the picture, so [`imaging::suggest_grid_sizes`] derives each candidate from
//! a target tile count and the image's aspect ratio, then corrects the column
//! count when the resulting cells drift too far from square.
//!
//! ## Scratch Space Owned by the Session
//!
//! The downloaded photo lives in a per-user directory owned by an RAII guard
//! ([`flow::WorkDir`]) inside the user's session. Whatever ends the session
//! (a published pack, a failure, a new photo) also deletes the directory.
//!
//! ## No Retries on Publish
//!
//! Creating a sticker set is not idempotent. A failed publish is reported to
//! the user once and never retried automatically.

pub mod bot;
pub mod config;
pub mod flow;
pub mod imaging;
pub mod keyboards;
pub mod output;
pub mod pack;
pub mod strings;
pub mod telegram;

#[cfg(test)]
pub(crate) mod test_helpers;
