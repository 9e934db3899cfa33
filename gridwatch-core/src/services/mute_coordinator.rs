// File: gridwatch-core/src/services/mute_coordinator.rs

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use gridwatch_common::models::StreamId;
use gridwatch_common::traits::embed_traits::EmbedAdapter;

/// Keeps at most one registered stream audible.
///
/// Toggling a muted stream on silences every other stream; toggling the
/// audible stream off leaves everything muted and never picks a
/// replacement. Adapter failures are swallowed: the intended state is kept
/// and re-applied when the adapter reports ready.
#[derive(Default)]
pub struct MuteCoordinator {
    adapters: HashMap<StreamId, Arc<dyn EmbedAdapter>>,
    muted: HashMap<StreamId, bool>,
    active: Option<StreamId>,
    pending: HashSet<StreamId>,
}

impl MuteCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// New streams start muted.
    pub fn register(&mut self, stream_id: StreamId, adapter: Arc<dyn EmbedAdapter>) {
        self.adapters.insert(stream_id, adapter);
        self.muted.insert(stream_id, true);
        self.apply(stream_id);
    }

    /// Returns the adapter so the caller can tear it down.
    pub fn unregister(&mut self, stream_id: StreamId) -> Option<Arc<dyn EmbedAdapter>> {
        self.muted.remove(&stream_id);
        self.pending.remove(&stream_id);
        if self.active == Some(stream_id) {
            debug!("Audible stream {} removed; session is now silent", stream_id);
            self.active = None;
        }
        self.adapters.remove(&stream_id)
    }

    /// Returns the stream's new muted state, or `None` if it is unknown.
    pub fn toggle(&mut self, stream_id: StreamId) -> Option<bool> {
        let currently_muted = match self.muted.get(&stream_id) {
            Some(m) => *m,
            None => {
                warn!("Mute toggle for unregistered stream {}", stream_id);
                return None;
            }
        };

        if currently_muted {
            let others: Vec<StreamId> = self
                .muted
                .iter()
                .filter(|(id, muted)| **id != stream_id && !**muted)
                .map(|(id, _)| *id)
                .collect();
            for other in others {
                self.muted.insert(other, true);
                self.apply(other);
            }
            self.muted.insert(stream_id, false);
            self.active = Some(stream_id);
            self.apply(stream_id);
            info!("Stream {} is now the audible stream", stream_id);
            Some(false)
        } else {
            self.muted.insert(stream_id, true);
            self.active = None;
            self.apply(stream_id);
            info!("Stream {} muted; no stream audible", stream_id);
            Some(true)
        }
    }

    /// Unknown streams read as muted.
    pub fn is_muted(&self, stream_id: StreamId) -> bool {
        self.muted.get(&stream_id).copied().unwrap_or(true)
    }

    pub fn active(&self) -> Option<StreamId> {
        self.active
    }

    pub fn adapter(&self, stream_id: StreamId) -> Option<Arc<dyn EmbedAdapter>> {
        self.adapters.get(&stream_id).cloned()
    }

    /// Streams whose last adapter call failed and still await a ready signal.
    pub fn pending(&self) -> Vec<StreamId> {
        self.pending.iter().copied().collect()
    }

    /// Re-applies the intended state once the adapter's player is ready.
    pub fn on_adapter_ready(&mut self, stream_id: StreamId) {
        if self.adapters.contains_key(&stream_id) {
            self.apply(stream_id);
        }
    }

    fn apply(&mut self, stream_id: StreamId) {
        let Some(adapter) = self.adapters.get(&stream_id) else {
            return;
        };
        let muted = self.is_muted(stream_id);
        let result = if muted { adapter.mute() } else { adapter.unmute() };
        match result {
            Ok(()) => {
                self.pending.remove(&stream_id);
            }
            Err(e) => {
                debug!(
                    "Deferring {} for stream {} until ready: {}",
                    if muted { "mute" } else { "unmute" },
                    stream_id,
                    e
                );
                self.pending.insert(stream_id);
            }
        }
    }
}
