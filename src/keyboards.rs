//! Inline keyboards and the callback data they carry.
//!
//! Callback data is a short ASCII tag (Telegram limits it to 64 bytes):
//!
//! | Prefix | Example | Meaning |
//! |---|---|---|
//! | `cmd_` | `cmd_help` | Menu navigation |
//! | `grid_` | `grid_6x3` | Grid choice |
//! | `padding_` | `padding_2` | Padding choice |

use crate::imaging::{GridSize, Padding, ParamError};
use crate::telegram::{InlineKeyboardButton, InlineKeyboardMarkup};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallbackError {
    #[error("Unknown callback data '{0}'")]
    Unknown(String),
    #[error(transparent)]
    Param(#[from] ParamError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuCommand {
    Start,
    Help,
    EmojiCropper,
}

impl MenuCommand {
    fn tag(self) -> &'static str {
        match self {
            MenuCommand::Start => "start",
            MenuCommand::Help => "help",
            MenuCommand::EmojiCropper => "emoji_cropper",
        }
    }
}

/// A decoded button press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Callback {
    Menu(MenuCommand),
    Grid(GridSize),
    Padding(Padding),
}

impl fmt::Display for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Callback::Menu(cmd) => write!(f, "cmd_{}", cmd.tag()),
            Callback::Grid(grid) => write!(f, "grid_{grid}"),
            Callback::Padding(padding) => write!(f, "padding_{}", padding.level()),
        }
    }
}

impl FromStr for Callback {
    type Err = CallbackError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        if let Some(cmd) = data.strip_prefix("cmd_") {
            let cmd = match cmd {
                "start" => MenuCommand::Start,
                "help" => MenuCommand::Help,
                "emoji_cropper" => MenuCommand::EmojiCropper,
                _ => return Err(CallbackError::Unknown(data.to_string())),
            };
            return Ok(Callback::Menu(cmd));
        }
        if let Some(grid) = data.strip_prefix("grid_") {
            return Ok(Callback::Grid(grid.parse()?));
        }
        if let Some(level) = data.strip_prefix("padding_") {
            return Ok(Callback::Padding(level.parse()?));
        }
        Err(CallbackError::Unknown(data.to_string()))
    }
}

fn button(text: impl Into<String>, callback: Callback) -> Vec<InlineKeyboardButton> {
    vec![InlineKeyboardButton::callback(text, callback.to_string())]
}

pub fn main_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![
            button("✂️ Crop an image into emoji", Callback::Menu(MenuCommand::EmojiCropper)),
            button("❓ Help", Callback::Menu(MenuCommand::Help)),
        ],
    }
}

pub fn back_to_menu() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: vec![button("⬅️ Main menu", Callback::Menu(MenuCommand::Start))],
    }
}

/// One row per suggested grid, labelled with its tile count.
pub fn grid_selection(grids: &[GridSize]) -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: grids
            .iter()
            .map(|&grid| {
                button(
                    format!("{grid} ({} emoji)", grid.cell_count()),
                    Callback::Grid(grid),
                )
            })
            .collect(),
    }
}

pub fn padding_label(padding: Padding) -> &'static str {
    match padding.level() {
        1 => "Minimal",
        2 => "Small",
        3 => "Medium",
        4 => "Large",
        _ => "Maximum",
    }
}

pub fn padding_selection() -> InlineKeyboardMarkup {
    InlineKeyboardMarkup {
        inline_keyboard: Padding::all()
            .map(|p| {
                button(
                    format!("{} - {}", p.level(), padding_label(p)),
                    Callback::Padding(p),
                )
            })
            .collect(),
    }
}
