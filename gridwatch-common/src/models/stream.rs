// File: gridwatch-common/src/models/stream.rs

use std::fmt;
use std::str::FromStr;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StreamId = Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, Eq, PartialEq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitch,
    YouTube,
}

impl Platform {
    /// Whether the metadata poller can refresh live status for this platform.
    pub fn has_metadata(&self) -> bool {
        matches!(self, Platform::Twitch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Twitch => write!(f, "twitch"),
            Platform::YouTube => write!(f, "youtube"),
        }
    }
}

impl FromStr for Platform {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "twitch" => Ok(Platform::Twitch),
            "youtube" | "yt" => Ok(Platform::YouTube),
            _ => Err(format!("Unknown platform: {}", s)),
        }
    }
}

/// One embedded stream in the session.
///
/// `is_live`/`viewer_count` come from the poller, `muted` mirrors the mute
/// coordinator and `slot_index` mirrors the current layout plan. Only the
/// session controller writes these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamEntry {
    pub id: StreamId,
    pub platform: Platform,
    /// Login name for Twitch, video id for YouTube.
    pub channel_ref: String,
    pub is_live: bool,
    pub viewer_count: u32,
    pub muted: bool,
    pub slot_index: Option<usize>,
    pub title: Option<String>,
    /// Set when the last poll for this entry failed; last-known data is kept.
    pub stale: bool,
    pub last_refreshed: Option<DateTime<Utc>>,
}

impl StreamEntry {
    pub fn new(platform: Platform, channel_ref: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            platform,
            channel_ref: normalize_channel(platform, channel_ref),
            is_live: false,
            viewer_count: 0,
            muted: true,
            slot_index: None,
            title: None,
            stale: false,
            last_refreshed: None,
        }
    }
}

/// Twitch logins are case-insensitive; YouTube ids are not.
pub fn normalize_channel(platform: Platform, channel_ref: &str) -> String {
    let trimmed = channel_ref.trim();
    match platform {
        Platform::Twitch => trimmed.to_lowercase(),
        Platform::YouTube => trimmed.to_string(),
    }
}
