// File: gridwatch-core/tests/test_utils/helpers.rs
//
// Scripted doubles for the HTTP transport, the metadata API and embed
// adapters.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use http::{HeaderMap, HeaderName, HeaderValue, StatusCode};
use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::time::Instant;

use gridwatch_common::models::{ChannelSearchData, Platform, Slot, StreamData, UserData};
use gridwatch_common::traits::api::StreamMetadataApi;
use gridwatch_common::traits::embed_traits::{EmbedAdapter, EmbedCallback};
use gridwatch_core::config::{RateLimiterConfig, TokenCacheConfig, UpstreamConfig};
use gridwatch_core::http::{HttpClient, HttpResponse};
use gridwatch_core::Error;

pub const TOKEN_URL: &str = "https://id.example.test/oauth2/token";
pub const API_BASE: &str = "https://api.example.test/helix";

pub fn token_config() -> TokenCacheConfig {
    TokenCacheConfig {
        token_url: TOKEN_URL.to_string(),
        client_id: "cid".to_string(),
        client_secret: "secret".to_string(),
        safety_margin: Duration::from_secs(300),
    }
}

pub fn limiter_config(limit: u32, window: Duration) -> RateLimiterConfig {
    RateLimiterConfig {
        limit,
        window,
        resume_buffer: Duration::from_millis(100),
        quota_retries: 1,
    }
}

pub fn upstream_config() -> UpstreamConfig {
    UpstreamConfig {
        api_base: API_BASE.to_string(),
        client_id: "cid".to_string(),
        request_timeout: Duration::from_secs(10),
        batch_size: 100,
    }
}

pub fn response(status: u16, body: &str, headers: &[(&str, &str)]) -> HttpResponse {
    let mut map = HeaderMap::new();
    for (k, v) in headers {
        map.insert(
            HeaderName::from_bytes(k.as_bytes()).unwrap(),
            HeaderValue::from_str(v).unwrap(),
        );
    }
    HttpResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers: map,
        body: body.to_string(),
    }
}

pub fn ok(body: &str) -> HttpResponse {
    response(200, body, &[])
}

pub fn token_response(token: &str, expires_in: u64) -> HttpResponse {
    ok(&format!(
        r#"{{"access_token":"{}","expires_in":{},"token_type":"bearer","scope":[]}}"#,
        token, expires_in
    ))
}

pub enum Scripted {
    Respond(HttpResponse),
    NetworkError(String),
    /// Never completes; exercises the request timeout.
    Hang,
}

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
    pub at: Instant,
}

impl RecordedCall {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Answers requests from a queue, in order, regardless of method.
/// When the queue is empty the fallback (if any) is returned.
#[derive(Default)]
pub struct ScriptedHttpClient {
    script: Mutex<VecDeque<Scripted>>,
    fallback: Mutex<Option<HttpResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
    latency: Mutex<Duration>,
}

impl ScriptedHttpClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, step: Scripted) {
        self.script.lock().push_back(step);
    }

    pub fn respond(&self, resp: HttpResponse) {
        self.push(Scripted::Respond(resp));
    }

    pub fn set_fallback(&self, resp: HttpResponse) {
        *self.fallback.lock() = Some(resp);
    }

    pub fn set_latency(&self, latency: Duration) {
        *self.latency.lock() = latency;
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.lock().iter().filter(|c| c.method == method).count()
    }

    async fn answer(
        &self,
        method: &'static str,
        url: String,
        headers: Vec<(String, String)>,
        body: Option<String>,
    ) -> Result<HttpResponse, Error> {
        self.calls.lock().push(RecordedCall { method, url, headers, body, at: Instant::now() });
        let latency = *self.latency.lock();
        if !latency.is_zero() {
            tokio::time::sleep(latency).await;
        }
        let step = self.script.lock().pop_front();
        match step {
            Some(Scripted::Respond(resp)) => Ok(resp),
            Some(Scripted::NetworkError(msg)) => Err(Error::Network(msg)),
            Some(Scripted::Hang) => std::future::pending().await,
            None => self
                .fallback
                .lock()
                .clone()
                .ok_or_else(|| Error::Network("script exhausted".into())),
        }
    }
}

#[async_trait]
impl HttpClient for ScriptedHttpClient {
    async fn post(
        &self,
        url: String,
        headers: Vec<(String, String)>,
        body: String,
    ) -> Result<HttpResponse, Error> {
        self.answer("POST", url, headers, Some(body)).await
    }

    async fn get(&self, url: String, headers: Vec<(String, String)>) -> Result<HttpResponse, Error> {
        self.answer("GET", url, headers, None).await
    }
}

pub fn live(login: &str, viewers: u32) -> StreamData {
    StreamData {
        id: format!("s-{}", login),
        user_id: format!("u-{}", login),
        user_login: login.to_string(),
        user_name: login.to_uppercase(),
        game_name: "Just Chatting".to_string(),
        type_field: "live".to_string(),
        title: format!("{} live", login),
        viewer_count: viewers,
        started_at: "2026-10-19T12:00:00Z".to_string(),
        thumbnail_url: String::new(),
    }
}

/// Metadata API double. Optionally blocks each call until released so a
/// test can mutate the session while a poll is in flight.
#[derive(Default)]
pub struct FakeMetadataApi {
    responses: Mutex<VecDeque<Result<Vec<StreamData>, Error>>>,
    pub requests: Mutex<Vec<Vec<String>>>,
    gate: Mutex<Option<(Arc<Notify>, Arc<Notify>)>>,
}

impl FakeMetadataApi {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push(&self, result: Result<Vec<StreamData>, Error>) {
        self.responses.lock().push_back(result);
    }

    /// Returns `(started, release)`: `started` is notified when a call
    /// begins, and the call waits for `release`.
    pub fn gated(&self) -> (Arc<Notify>, Arc<Notify>) {
        let started = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        *self.gate.lock() = Some((started.clone(), release.clone()));
        (started, release)
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl StreamMetadataApi for FakeMetadataApi {
    async fn get_live_streams(&self, logins: &[String]) -> Result<Vec<StreamData>, Error> {
        self.requests.lock().push(logins.to_vec());
        let gate = self.gate.lock().clone();
        if let Some((started, release)) = gate {
            started.notify_one();
            release.notified().await;
        }
        let next = self.responses.lock().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }

    async fn get_users(&self, _logins: &[String]) -> Result<Vec<UserData>, Error> {
        Ok(Vec::new())
    }

    async fn search_channels(
        &self,
        _query: &str,
        _live_only: bool,
        _first: u32,
    ) -> Result<Vec<ChannelSearchData>, Error> {
        Ok(Vec::new())
    }

    async fn get_top_streams(&self, _first: u32) -> Result<Vec<StreamData>, Error> {
        Ok(Vec::new())
    }
}

/// Embed adapter that records what it was asked to do.
pub struct RecordingAdapter {
    platform: Platform,
    ready: AtomicBool,
    commands: Mutex<Vec<&'static str>>,
    mounts: Mutex<Vec<Slot>>,
    ready_callbacks: Mutex<Vec<EmbedCallback>>,
    offline_callbacks: Mutex<Vec<EmbedCallback>>,
}

impl RecordingAdapter {
    pub fn ready() -> Arc<Self> {
        Arc::new(Self::with_state(true))
    }

    pub fn not_ready() -> Arc<Self> {
        Arc::new(Self::with_state(false))
    }

    fn with_state(ready: bool) -> Self {
        Self {
            platform: Platform::Twitch,
            ready: AtomicBool::new(ready),
            commands: Mutex::new(Vec::new()),
            mounts: Mutex::new(Vec::new()),
            ready_callbacks: Mutex::new(Vec::new()),
            offline_callbacks: Mutex::new(Vec::new()),
        }
    }

    pub fn become_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
        for cb in self.ready_callbacks.lock().iter() {
            cb();
        }
    }

    pub fn go_offline(&self) {
        for cb in self.offline_callbacks.lock().iter() {
            cb();
        }
    }

    pub fn commands(&self) -> Vec<&'static str> {
        self.commands.lock().clone()
    }

    /// Audible from the player's point of view: the last applied command
    /// was an unmute.
    pub fn is_audible(&self) -> bool {
        self.commands
            .lock()
            .iter()
            .rev()
            .find(|c| **c == "mute" || **c == "unmute")
            .map(|c| *c == "unmute")
            .unwrap_or(false)
    }

    pub fn last_mount(&self) -> Option<Slot> {
        self.mounts.lock().last().copied()
    }

    fn command(&self, name: &'static str) -> Result<(), Error> {
        if !self.ready.load(Ordering::SeqCst) {
            return Err(Error::AdapterUnavailable("recording adapter not ready".into()));
        }
        self.commands.lock().push(name);
        Ok(())
    }
}

impl EmbedAdapter for RecordingAdapter {
    fn platform(&self) -> Platform {
        self.platform
    }

    fn mount(&self, container: &Slot) -> Result<(), Error> {
        self.mounts.lock().push(*container);
        Ok(())
    }

    fn unmount(&self) {
        self.commands.lock().push("unmount");
    }

    fn mute(&self) -> Result<(), Error> {
        self.command("mute")
    }

    fn unmute(&self) -> Result<(), Error> {
        self.command("unmute")
    }

    fn on_ready(&self, callback: EmbedCallback) {
        self.ready_callbacks.lock().push(callback);
    }

    fn on_offline(&self, callback: EmbedCallback) {
        self.offline_callbacks.lock().push(callback);
    }
}
