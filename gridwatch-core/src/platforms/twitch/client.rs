// File: gridwatch-core/src/platforms/twitch/client.rs

use std::sync::Arc;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::time::timeout;
use tracing::{debug, warn};

use gridwatch_common::models::{ChannelSearchData, StreamData, UserData};
use gridwatch_common::traits::api::StreamMetadataApi;
use crate::auth::TokenCache;
use crate::config::UpstreamConfig;
use crate::http::HttpClient;
use crate::platforms::twitch::rate_limiter::RateLimiter;
use crate::Error;

/// Hard ceiling the API puts on identifiers per request.
pub const MAX_BATCH: usize = 100;

/// Entry point for all Helix metadata reads.
///
/// Every request takes a token from the shared [`TokenCache`] and is
/// admitted by the shared [`RateLimiter`]; the endpoint helpers live in
/// `requests::*`.
pub struct TwitchHelixClient {
    http: Arc<dyn HttpClient>,
    tokens: Arc<TokenCache>,
    limiter: Arc<RateLimiter>,
    config: UpstreamConfig,
}

impl TwitchHelixClient {
    pub fn new(
        http: Arc<dyn HttpClient>,
        tokens: Arc<TokenCache>,
        limiter: Arc<RateLimiter>,
        config: UpstreamConfig,
    ) -> Self {
        Self {
            http,
            tokens,
            limiter,
            config,
        }
    }

    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    /// Identifiers per request, never above [`MAX_BATCH`].
    pub fn batch_size(&self) -> usize {
        self.config.batch_size.clamp(1, MAX_BATCH)
    }

    /// GET `{api_base}/{path}?{query}` and decode the JSON body.
    ///
    /// Query pairs may repeat a key (`user_login=a&user_login=b`).
    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, Error> {
        let url = self.build_url(path, query);
        debug!("Helix GET {}", url);

        let result = self
            .limiter
            .execute(|| {
                let url = url.clone();
                async move {
                    let cred = self.tokens.get_valid_token().await?;
                    let headers = vec![
                        ("Client-Id".to_string(), self.config.client_id.clone()),
                        ("Authorization".to_string(), cred.authorization_header()),
                    ];
                    timeout(self.config.request_timeout, self.http.get(url, headers)).await?
                }
            })
            .await;

        let resp = match result {
            Ok(resp) => resp,
            Err(Error::UpstreamHttp { status: 401, body }) => {
                warn!("Helix rejected the app token; invalidating it");
                self.tokens.invalidate();
                return Err(Error::UpstreamHttp { status: 401, body });
            }
            Err(e) => return Err(e),
        };

        Ok(serde_json::from_str(&resp.body)?)
    }

    fn build_url(&self, path: &str, query: &[(&str, String)]) -> String {
        let base = self.config.api_base.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if query.is_empty() {
            return format!("{}/{}", base, path);
        }
        let qs = query
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}/{}?{}", base, path, qs)
    }
}

#[async_trait]
impl StreamMetadataApi for TwitchHelixClient {
    async fn get_live_streams(&self, logins: &[String]) -> Result<Vec<StreamData>, Error> {
        self.fetch_live_streams(logins).await
    }

    async fn get_users(&self, logins: &[String]) -> Result<Vec<UserData>, Error> {
        self.fetch_users(logins).await
    }

    async fn search_channels(
        &self,
        query: &str,
        live_only: bool,
        first: u32,
    ) -> Result<Vec<ChannelSearchData>, Error> {
        self.fetch_channel_search(query, live_only, first).await
    }

    async fn get_top_streams(&self, first: u32) -> Result<Vec<StreamData>, Error> {
        self.fetch_top_streams(first).await
    }
}
