// File: src/platforms/twitch/mod.rs

pub mod client;
pub mod embed;
pub mod rate_limiter;
pub mod requests;

pub use client::TwitchHelixClient;
pub use embed::{PlayerCommand, PlayerEvent, TwitchEmbed};
pub use rate_limiter::RateLimiter;
