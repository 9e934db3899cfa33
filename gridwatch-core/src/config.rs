// File: gridwatch-core/src/config.rs
//
// Environment-driven configuration. Call `GridwatchConfig::from_env()` after
// `dotenv::dotenv()` so a local `.env` file is honoured.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::Error;

pub const DEFAULT_TOKEN_URL: &str = "https://id.twitch.tv/oauth2/token";
pub const DEFAULT_API_BASE: &str = "https://api.twitch.tv/helix";

/// How the token cache reaches the OAuth endpoint.
#[derive(Debug, Clone)]
pub struct TokenCacheConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    /// A credential is refreshed once it has less than this left.
    pub safety_margin: Duration,
}

#[derive(Debug, Clone, Copy)]
pub struct RateLimiterConfig {
    pub limit: u32,
    pub window: Duration,
    /// Added on top of `reset_at` before a suspended caller resumes.
    pub resume_buffer: Duration,
    /// Transparent retries after a 429 before giving up.
    pub quota_retries: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit: 800,
            window: Duration::from_secs(60),
            resume_buffer: Duration::from_millis(100),
            quota_retries: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub api_base: String,
    pub client_id: String,
    pub request_timeout: Duration,
    /// Identifiers per request; the API rejects more than 100.
    pub batch_size: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct PollerConfig {
    pub interval: Duration,
    pub max_backoff: Duration,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            max_backoff: Duration::from_secs(600),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
    pub max_streams: usize,
    /// Order live streams before offline ones when building the layout.
    pub offline_last: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_streams: 16,
            offline_last: false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GridwatchConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_base: String,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub token_safety_margin: Duration,
    pub rate_limit: u32,
    pub rate_window: Duration,
    pub max_streams: usize,
    pub layout_file: Option<PathBuf>,
}

impl GridwatchConfig {
    pub fn from_env() -> Result<Self, Error> {
        Ok(Self {
            client_id: required("TWITCH_CLIENT_ID")?,
            client_secret: required("TWITCH_CLIENT_SECRET")?,
            token_url: optional("GRIDWATCH_TOKEN_URL")
                .unwrap_or_else(|| DEFAULT_TOKEN_URL.to_string()),
            api_base: optional("GRIDWATCH_API_BASE")
                .unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            poll_interval: Duration::from_secs(parsed("GRIDWATCH_POLL_INTERVAL_SECS", 60)?),
            request_timeout: Duration::from_secs(parsed("GRIDWATCH_REQUEST_TIMEOUT_SECS", 10)?),
            token_safety_margin: Duration::from_secs(parsed(
                "GRIDWATCH_TOKEN_SAFETY_MARGIN_SECS",
                300,
            )?),
            rate_limit: parsed("GRIDWATCH_RATE_LIMIT", 800)?,
            rate_window: Duration::from_secs(parsed("GRIDWATCH_RATE_WINDOW_SECS", 60)?),
            max_streams: parsed("GRIDWATCH_MAX_STREAMS", 16)?,
            layout_file: optional("GRIDWATCH_LAYOUT_FILE").map(PathBuf::from),
        })
    }

    pub fn token_cache(&self) -> TokenCacheConfig {
        TokenCacheConfig {
            token_url: self.token_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            safety_margin: self.token_safety_margin,
        }
    }

    pub fn rate_limiter(&self) -> RateLimiterConfig {
        RateLimiterConfig {
            limit: self.rate_limit,
            window: self.rate_window,
            ..RateLimiterConfig::default()
        }
    }

    pub fn upstream(&self) -> UpstreamConfig {
        UpstreamConfig {
            api_base: self.api_base.trim_end_matches('/').to_string(),
            client_id: self.client_id.clone(),
            request_timeout: self.request_timeout,
            batch_size: 100,
        }
    }

    pub fn poller(&self) -> PollerConfig {
        PollerConfig {
            interval: self.poll_interval,
            ..PollerConfig::default()
        }
    }

    pub fn session(&self) -> SessionConfig {
        SessionConfig {
            max_streams: self.max_streams,
            ..SessionConfig::default()
        }
    }
}

fn optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn required(key: &str) -> Result<String, Error> {
    optional(key).ok_or_else(|| Error::Config(format!("{} must be set", key)))
}

fn parsed<T>(key: &str, default: T) -> Result<T, Error>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| Error::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
        None => Ok(default),
    }
}
