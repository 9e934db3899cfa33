//! gridwatch-server/src/context.rs
//!
//! Builds the one-per-session upstream identity (token cache + rate limiter)
//! and the session controller on top of it.

use std::sync::Arc;
use tracing::info;

use gridwatch_core::auth::TokenCache;
use gridwatch_core::config::{GridwatchConfig, SessionConfig};
use gridwatch_core::http::{DefaultHttpClient, HttpClient};
use gridwatch_core::platforms::twitch::{RateLimiter, TwitchHelixClient};
use gridwatch_core::repositories::JsonFileLayoutStore;
use gridwatch_core::services::SessionController;
use gridwatch_core::Error;

use crate::Args;

pub struct SessionContext {
    pub config: GridwatchConfig,
    pub client: Arc<TwitchHelixClient>,
    pub session: Arc<SessionController>,
}

impl SessionContext {
    pub async fn new(args: &Args) -> Result<Self, Error> {
        let mut config = GridwatchConfig::from_env()?;
        if let Some(path) = &args.layout_file {
            config.layout_file = Some(path.into());
        }

        // 1) Shared upstream identity
        let http: Arc<dyn HttpClient> = Arc::new(DefaultHttpClient::new(config.request_timeout)?);
        let tokens = Arc::new(TokenCache::new(http.clone(), config.token_cache()));
        let limiter = Arc::new(RateLimiter::new(config.rate_limiter()));
        let client = Arc::new(TwitchHelixClient::new(
            http,
            tokens,
            limiter,
            config.upstream(),
        ));

        // 2) Layout persistence
        let store = match &config.layout_file {
            Some(path) => JsonFileLayoutStore::new(path),
            None => JsonFileLayoutStore::default_location()?,
        };
        info!("Layout file: {}", store.path().display());

        // 3) Session
        let session_config = SessionConfig {
            offline_last: args.offline_last,
            ..config.session()
        };
        let session = SessionController::new(client.clone(), session_config)
            .with_layout_store(Arc::new(store));
        session.restore_layout().await;
        if let Some(mode) = args.mode {
            session.set_mode(mode);
        }
        if let Some(viewport) = args.viewport {
            session.set_viewport(viewport);
        }

        Ok(Self {
            config,
            client,
            session: Arc::new(session),
        })
    }
}
