pub mod embed;

pub use embed::{FrameMessage, YouTubeEmbed};
