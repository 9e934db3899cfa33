// File: src/platforms/mod.rs

pub mod embed;
pub mod twitch;
pub mod youtube;

pub use embed::{EmbedHooks, EmbedSignal};
