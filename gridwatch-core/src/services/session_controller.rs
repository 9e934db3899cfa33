// File: gridwatch-core/src/services/session_controller.rs

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use gridwatch_common::models::{
    LayoutMode, LayoutPlan, Platform, SavedLayout, StreamData, StreamEntry, StreamId, Viewport,
};
use gridwatch_common::models::stream::normalize_channel;
use gridwatch_common::traits::api::StreamMetadataApi;
use gridwatch_common::traits::embed_traits::EmbedAdapter;
use gridwatch_common::traits::repository_traits::LayoutStore;
use crate::config::{PollerConfig, SessionConfig};
use crate::platforms::embed::{forward_signals, EmbedSignal};
use crate::services::layout_engine::GridLayoutEngine;
use crate::services::mute_coordinator::MuteCoordinator;
use crate::tasks::live_poller::spawn_live_poller;
use crate::Error;

/// Outcome of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollReport {
    /// Entries whose channel was included in the request.
    pub requested: usize,
    /// Entries updated by the merge.
    pub updated: usize,
    /// Entries removed while the request was in flight; their data was dropped.
    pub discarded: usize,
    pub went_live: Vec<StreamId>,
    pub went_offline: Vec<StreamId>,
}

struct SessionState {
    streams: Vec<StreamEntry>,
    mute: MuteCoordinator,
    viewport: Viewport,
    mode: LayoutMode,
    focused: Option<StreamId>,
}

/// Owns the canonical stream list for one viewing session.
///
/// Every mutation goes through here: the layout engine and mute
/// coordinator are driven from these methods and their results are copied
/// back into the entries. The state lock is never held across an await.
pub struct SessionController {
    state: Mutex<SessionState>,
    api: Arc<dyn StreamMetadataApi>,
    store: Option<Arc<dyn LayoutStore>>,
    engine: GridLayoutEngine,
    config: SessionConfig,
    layout_tx: watch::Sender<Arc<LayoutPlan>>,
    signal_tx: mpsc::UnboundedSender<EmbedSignal>,
    signal_rx: Mutex<Option<mpsc::UnboundedReceiver<EmbedSignal>>>,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl SessionController {
    pub fn new(api: Arc<dyn StreamMetadataApi>, config: SessionConfig) -> Self {
        let (layout_tx, _) = watch::channel(Arc::new(LayoutPlan::default()));
        let (signal_tx, signal_rx) = mpsc::unbounded_channel();
        Self {
            state: Mutex::new(SessionState {
                streams: Vec::new(),
                mute: MuteCoordinator::new(),
                viewport: Viewport::default(),
                mode: LayoutMode::default(),
                focused: None,
            }),
            api,
            store: None,
            engine: GridLayoutEngine::default(),
            config,
            layout_tx,
            signal_tx,
            signal_rx: Mutex::new(Some(signal_rx)),
            cancel: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
        }
    }

    pub fn with_layout_store(mut self, store: Arc<dyn LayoutStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_engine(mut self, engine: GridLayoutEngine) -> Self {
        self.engine = engine;
        self
    }

    /// Restores the last saved layout mode. Any failure falls back to the
    /// default policy.
    pub async fn restore_layout(&self) {
        let Some(store) = &self.store else {
            return;
        };
        match store.load().await {
            Ok(Some(saved)) => {
                info!("Restoring saved layout mode '{}'", saved.mode);
                let mut state = self.state.lock();
                state.mode = saved.mode;
                if let Some(viewport) = saved.viewport {
                    state.viewport = viewport;
                }
                self.relayout(&mut state);
            }
            Ok(None) => debug!("No saved layout; using defaults"),
            Err(e) => warn!("Could not load saved layout, using defaults: {}", e),
        }
    }

    /// Spawns the live poller and the embed-signal pump. Both stop on
    /// [`SessionController::shutdown`].
    pub fn start(self: &Arc<Self>, poller: PollerConfig) {
        let mut tasks = self.tasks.lock();

        if let Some(mut rx) = self.signal_rx.lock().take() {
            let session = Arc::clone(self);
            let cancel = self.cancel.clone();
            tasks.push(tokio::spawn(async move {
                loop {
                    tokio::select! {
                        _ = cancel.cancelled() => break,
                        signal = rx.recv() => match signal {
                            Some(signal) => session.handle_embed_signal(signal),
                            None => break,
                        },
                    }
                }
            }));
        }

        tasks.push(spawn_live_poller(Arc::clone(self), poller, self.cancel.child_token()));
        info!("Session started (poll interval {:?})", poller.interval);
    }

    /// Cancels background tasks, waits for them, saves the layout mode and
    /// unmounts every embed.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        let tasks: Vec<JoinHandle<()>> = self.tasks.lock().drain(..).collect();
        for task in tasks {
            if let Err(e) = task.await {
                warn!("Session task ended abnormally: {}", e);
            }
        }

        if let Some(store) = &self.store {
            let saved = {
                let state = self.state.lock();
                SavedLayout { mode: state.mode, viewport: Some(state.viewport) }
            };
            if let Err(e) = store.save(&saved).await {
                warn!("Could not save layout: {}", e);
            }
        }

        let adapters: Vec<Arc<dyn EmbedAdapter>> = {
            let mut state = self.state.lock();
            let ids: Vec<StreamId> = state.streams.iter().map(|s| s.id).collect();
            ids.into_iter().filter_map(|id| state.mute.unregister(id)).collect()
        };
        for adapter in adapters {
            adapter.unmount();
        }
        info!("Session shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn add_stream(
        &self,
        platform: Platform,
        channel_ref: &str,
        adapter: Arc<dyn EmbedAdapter>,
    ) -> Result<StreamId, Error> {
        let channel = normalize_channel(platform, channel_ref);
        if channel.is_empty() {
            return Err(Error::Validation("channel must not be empty".into()));
        }

        let mut state = self.state.lock();
        if state
            .streams
            .iter()
            .any(|s| s.platform == platform && s.channel_ref == channel)
        {
            return Err(Error::Validation(format!("{} channel '{}' is already in the session", platform, channel)));
        }
        if state.streams.len() >= self.config.max_streams {
            return Err(Error::Validation(format!(
                "session already holds the maximum of {} streams",
                self.config.max_streams
            )));
        }

        let entry = StreamEntry::new(platform, &channel);
        let id = entry.id;
        forward_signals(adapter.as_ref(), id, self.signal_tx.clone());
        state.streams.push(entry);
        state.mute.register(id, adapter);
        sync_mute_flags(&mut state);
        self.relayout(&mut state);

        info!("Added {} stream '{}' ({})", platform, channel, id);
        Ok(id)
    }

    pub fn remove_stream(&self, stream_id: StreamId) -> Result<StreamEntry, Error> {
        let mut state = self.state.lock();
        let pos = state
            .streams
            .iter()
            .position(|s| s.id == stream_id)
            .ok_or_else(|| Error::NotFound(format!("stream {}", stream_id)))?;

        let entry = state.streams.remove(pos);
        if let Some(adapter) = state.mute.unregister(stream_id) {
            adapter.unmount();
        }
        if state.focused == Some(stream_id) {
            state.focused = None;
        }
        sync_mute_flags(&mut state);
        self.relayout(&mut state);

        info!("Removed {} stream '{}'", entry.platform, entry.channel_ref);
        Ok(entry)
    }

    /// Removes every stream.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        let ids: Vec<StreamId> = state.streams.iter().map(|s| s.id).collect();
        for id in ids {
            if let Some(adapter) = state.mute.unregister(id) {
                adapter.unmount();
            }
        }
        state.streams.clear();
        state.focused = None;
        self.relayout(&mut state);
        info!("Session cleared");
    }

    /// Moves a stream to `new_index` (clamped), shifting the others.
    pub fn move_stream(&self, stream_id: StreamId, new_index: usize) -> Result<(), Error> {
        let mut state = self.state.lock();
        let pos = state
            .streams
            .iter()
            .position(|s| s.id == stream_id)
            .ok_or_else(|| Error::NotFound(format!("stream {}", stream_id)))?;
        let entry = state.streams.remove(pos);
        let target = new_index.min(state.streams.len());
        state.streams.insert(target, entry);
        self.relayout(&mut state);
        Ok(())
    }

    pub fn set_viewport(&self, viewport: Viewport) {
        let mut state = self.state.lock();
        if state.viewport != viewport {
            state.viewport = viewport;
            self.relayout(&mut state);
        }
    }

    pub fn set_mode(&self, mode: LayoutMode) {
        let mut state = self.state.lock();
        if state.mode != mode {
            info!("Layout mode -> {}", mode);
            state.mode = mode;
            self.relayout(&mut state);
        }
    }

    /// Features a stream in focus and picture-in-picture modes.
    pub fn focus(&self, stream_id: StreamId) -> Result<(), Error> {
        let mut state = self.state.lock();
        if !state.streams.iter().any(|s| s.id == stream_id) {
            return Err(Error::NotFound(format!("stream {}", stream_id)));
        }
        state.focused = Some(stream_id);
        self.relayout(&mut state);
        Ok(())
    }

    /// Returns the stream's new muted state.
    pub fn toggle_mute(&self, stream_id: StreamId) -> Result<bool, Error> {
        let mut state = self.state.lock();
        let muted = state
            .mute
            .toggle(stream_id)
            .ok_or_else(|| Error::NotFound(format!("stream {}", stream_id)))?;
        sync_mute_flags(&mut state);
        Ok(muted)
    }

    pub fn active_audible(&self) -> Option<StreamId> {
        self.state.lock().mute.active()
    }

    pub fn streams(&self) -> Vec<StreamEntry> {
        self.state.lock().streams.clone()
    }

    pub fn stream(&self, stream_id: StreamId) -> Option<StreamEntry> {
        self.state.lock().streams.iter().find(|s| s.id == stream_id).cloned()
    }

    pub fn mode(&self) -> LayoutMode {
        self.state.lock().mode
    }

    pub fn viewport(&self) -> Viewport {
        self.state.lock().viewport
    }

    pub fn layout(&self) -> Arc<LayoutPlan> {
        self.layout_tx.borrow().clone()
    }

    /// Receives every new plan as a whole.
    pub fn subscribe_layout(&self) -> watch::Receiver<Arc<LayoutPlan>> {
        self.layout_tx.subscribe()
    }

    /// Sender adapters' callbacks report into; exposed for hosts that
    /// forward player events themselves.
    pub fn signal_sender(&self) -> mpsc::UnboundedSender<EmbedSignal> {
        self.signal_tx.clone()
    }

    pub fn handle_embed_signal(&self, signal: EmbedSignal) {
        let mut state = self.state.lock();
        match signal {
            EmbedSignal::Ready(id) => {
                debug!("Embed for {} ready", id);
                state.mute.on_adapter_ready(id);
            }
            EmbedSignal::Offline(id) => {
                let Some(entry) = state.streams.iter_mut().find(|s| s.id == id) else {
                    return;
                };
                if entry.is_live {
                    info!("{} stream '{}' went offline (player)", entry.platform, entry.channel_ref);
                }
                entry.is_live = false;
                entry.viewer_count = 0;
                if self.config.offline_last {
                    self.relayout(&mut state);
                }
            }
        }
    }

    /// One metadata refresh for every stream whose platform has metadata.
    ///
    /// The merge is applied in one step against the stream list as it is
    /// *now*: entries removed while the request was in flight are skipped,
    /// and entries added meanwhile are left for the next cycle. On failure
    /// the requested entries keep their last-known data and are marked stale.
    pub async fn poll_once(&self) -> Result<PollReport, Error> {
        let snapshot: Vec<(StreamId, String)> = {
            let state = self.state.lock();
            state
                .streams
                .iter()
                .filter(|s| s.platform.has_metadata())
                .map(|s| (s.id, s.channel_ref.clone()))
                .collect()
        };
        if snapshot.is_empty() {
            return Ok(PollReport::default());
        }

        let logins: Vec<String> = snapshot
            .iter()
            .map(|(_, login)| login.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let requested: HashSet<StreamId> = snapshot.iter().map(|(id, _)| *id).collect();

        let result = self.api.get_live_streams(&logins).await;

        let mut state = self.state.lock();
        let present = state.streams.iter().filter(|s| requested.contains(&s.id)).count();
        let mut report = PollReport {
            requested: requested.len(),
            discarded: requested.len() - present,
            ..PollReport::default()
        };

        let live = match result {
            Ok(live) => live,
            Err(e) => {
                for entry in state.streams.iter_mut().filter(|s| requested.contains(&s.id)) {
                    entry.stale = true;
                }
                warn!("Poll cycle failed for {} channel(s); keeping last-known data: {}", logins.len(), e);
                return Err(e);
            }
        };

        let by_login: HashMap<String, &StreamData> = live
            .iter()
            .map(|s| (s.user_login.to_lowercase(), s))
            .collect();
        let now = Utc::now();

        for entry in state.streams.iter_mut().filter(|s| requested.contains(&s.id)) {
            let was_live = entry.is_live;
            match by_login.get(&entry.channel_ref) {
                Some(data) => {
                    entry.is_live = true;
                    entry.viewer_count = data.viewer_count;
                    if !data.title.is_empty() {
                        entry.title = Some(data.title.clone());
                    }
                }
                None => {
                    entry.is_live = false;
                    entry.viewer_count = 0;
                }
            }
            entry.stale = false;
            entry.last_refreshed = Some(now);
            report.updated += 1;

            if entry.is_live && !was_live {
                report.went_live.push(entry.id);
            } else if !entry.is_live && was_live {
                report.went_offline.push(entry.id);
            }
        }

        if report.discarded > 0 {
            debug!("Dropped poll data for {} stream(s) removed mid-cycle", report.discarded);
        }
        if self.config.offline_last && !(report.went_live.is_empty() && report.went_offline.is_empty()) {
            self.relayout(&mut state);
        }
        Ok(report)
    }

    /// Recomputes the plan, mounts every adapter into its slot, copies slot
    /// indices back to the entries and publishes the plan.
    fn relayout(&self, state: &mut SessionState) {
        let order = self.layout_order(state);
        let plan = self.engine.compute(&order, state.viewport, state.mode);

        let mut slot_of: HashMap<StreamId, usize> = HashMap::with_capacity(plan.slots.len());
        for (index, slot) in plan.slots.iter().enumerate() {
            slot_of.insert(slot.stream_id, index);
            if let Some(adapter) = state.mute.adapter(slot.stream_id) {
                if let Err(e) = adapter.mount(slot) {
                    warn!("Could not mount embed for {}: {}", slot.stream_id, e);
                }
            }
        }
        for entry in state.streams.iter_mut() {
            entry.slot_index = slot_of.get(&entry.id).copied();
        }

        debug!("Layout {}: {}x{} with {} slot(s)", plan.mode, plan.columns, plan.rows, plan.slots.len());
        self.layout_tx.send_replace(Arc::new(plan));
    }

    /// Order handed to the engine. Reordering is decided here, never in
    /// the engine: optional live-first, then the focused stream up front for
    /// the featured-stream modes.
    fn layout_order(&self, state: &SessionState) -> Vec<StreamId> {
        let mut order: Vec<&StreamEntry> = state.streams.iter().collect();
        if self.config.offline_last {
            order.sort_by_key(|s| !s.is_live);
        }
        let mut ids: Vec<StreamId> = order.into_iter().map(|s| s.id).collect();
        if state.mode != LayoutMode::Grid {
            if let Some(focused) = state.focused {
                if let Some(pos) = ids.iter().position(|id| *id == focused) {
                    let id = ids.remove(pos);
                    ids.insert(0, id);
                }
            }
        }
        ids
    }
}

fn sync_mute_flags(state: &mut SessionState) {
    let SessionState { streams, mute, .. } = state;
    for entry in streams.iter_mut() {
        entry.muted = mute.is_muted(entry.id);
    }
}
