// File: gridwatch-core/src/auth/token_cache.rs

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde::Deserialize;
use tracing::{debug, error, info};

use gridwatch_common::models::Credential;
use crate::config::TokenCacheConfig;
use crate::http::HttpClient;
use crate::Error;

/// Matches the JSON from the token endpoint. Extra fields are ignored.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Refresh future shared by every caller that arrives while it is pending.
type RefreshFuture = Shared<BoxFuture<'static, Result<Credential, String>>>;

#[derive(Default)]
struct TokenState {
    current: Option<Credential>,
    in_flight: Option<RefreshFuture>,
}

/// Holds the single app access token for a session.
///
/// `get_valid_token` returns the cached credential until it is within
/// `safety_margin` of expiry, then performs a client-credentials exchange.
/// Concurrent callers during a refresh all await the same request.
pub struct TokenCache {
    http: Arc<dyn HttpClient>,
    config: TokenCacheConfig,
    state: Arc<Mutex<TokenState>>,
}

impl TokenCache {
    pub fn new(http: Arc<dyn HttpClient>, config: TokenCacheConfig) -> Self {
        Self {
            http,
            config,
            state: Arc::new(Mutex::new(TokenState::default())),
        }
    }

    pub fn safety_margin(&self) -> Duration {
        self.config.safety_margin
    }

    /// Never returns an expired or soon-to-expire credential. A failed
    /// refresh is reported once; the next call starts a new attempt.
    pub async fn get_valid_token(&self) -> Result<Credential, Error> {
        let refresh = {
            let mut state = self.state.lock();
            if let Some(cred) = &state.current {
                if !cred.needs_refresh(self.config.safety_margin) {
                    return Ok(cred.clone());
                }
            }
            match &state.in_flight {
                Some(pending) => {
                    debug!("Joining in-flight token refresh");
                    pending.clone()
                }
                None => {
                    let pending = self.start_refresh();
                    state.in_flight = Some(pending.clone());
                    pending
                }
            }
        };

        refresh.await.map_err(Error::Credential)
    }

    /// Drops the cached credential, e.g. after the API rejected it with 401.
    pub fn invalidate(&self) {
        let mut state = self.state.lock();
        if state.current.take().is_some() {
            info!("Cached app token invalidated; next call will refresh.");
        }
    }

    fn start_refresh(&self) -> RefreshFuture {
        let http = self.http.clone();
        let config = self.config.clone();
        // Weak so the stored future does not keep its own owner alive.
        let state = Arc::downgrade(&self.state);

        async move {
            let result = request_token(http.as_ref(), &config).await;
            if let Some(state) = state.upgrade() {
                let mut state = state.lock();
                state.in_flight = None;
                match &result {
                    Ok(cred) => state.current = Some(cred.clone()),
                    Err(_) => state.current = None,
                }
            }
            result
        }
        .boxed()
        .shared()
    }
}

/// Client-credentials exchange against the OAuth endpoint.
async fn request_token(
    http: &dyn HttpClient,
    config: &TokenCacheConfig,
) -> Result<Credential, String> {
    let body = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("client_id", &config.client_id)
        .append_pair("client_secret", &config.client_secret)
        .append_pair("grant_type", "client_credentials")
        .finish();
    let headers = vec![(
        "Content-Type".to_string(),
        "application/x-www-form-urlencoded".to_string(),
    )];

    let resp = http
        .post(config.token_url.clone(), headers, body)
        .await
        .map_err(|e| {
            error!("Token endpoint unreachable: {}", e);
            format!("token endpoint unreachable: {e}")
        })?;

    if !resp.is_success() {
        error!("Token endpoint returned HTTP {}", resp.status);
        return Err(format!("token endpoint returned HTTP {} => {}", resp.status, resp.body));
    }

    let parsed: TokenResponse = serde_json::from_str(&resp.body)
        .map_err(|e| format!("Parse error on token JSON: {e}"))?;

    let cred = Credential::new(
        parsed.access_token,
        parsed.token_type,
        Duration::from_secs(parsed.expires_in),
    );
    info!("Obtained app token, expires in {}s", parsed.expires_in);
    Ok(cred)
}
