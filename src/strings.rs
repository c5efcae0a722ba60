//! User-visible message texts.

use crate::imaging::Dimensions;

pub const START: &str = "👋 Hi! I turn a picture into a grid of custom emoji.\n\n\
Pick an option below to get started.";

pub const HELP: &str = "How it works:\n\n\
1. Tap \"Crop an image into emoji\" or send /emoji_cropper.\n\
2. Send a photo.\n\
3. Choose a grid size. More cells means smaller pieces.\n\
4. Choose how much padding to trim around each piece.\n\n\
I will publish the pieces as a custom emoji pack and send you the link. \
Type them in order, row by row, to rebuild the picture.";

pub const SEND_PHOTO: &str = "📷 Send me the photo you want to turn into emoji.";

pub const UNSUPPORTED_MESSAGE: &str =
    "I only understand photos and the commands /start, /help and /emoji_cropper.";

pub const ASK_PADDING: &str =
    "Choose the padding trimmed around every emoji. Larger padding leaves visible gaps \
between the pieces.";

pub const PROCESSING: &str = "⏳ Cropping your image...";

pub const CREATING_PACK: &str = "📦 Creating your emoji pack...";

pub const ERROR_PROCESSING: &str =
    "❌ Something went wrong while processing the image. Please send the photo again.";

pub const ERROR_CREATING_PACK: &str =
    "❌ The emoji pack could not be created. Please try again later.";

pub fn ask_grid(dims: Dimensions) -> String {
    format!(
        "Image size: {}x{} px.\n\nChoose a grid. Each cell becomes one emoji.",
        dims.width, dims.height
    )
}

pub fn success(link: &str) -> String {
    format!("✅ Your emoji pack is ready!\n\n{link}")
}
