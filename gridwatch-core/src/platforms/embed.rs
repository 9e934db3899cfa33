// File: gridwatch-core/src/platforms/embed.rs

use std::sync::atomic::{AtomicBool, Ordering};
use parking_lot::Mutex;

use gridwatch_common::models::StreamId;
use gridwatch_common::traits::embed_traits::{EmbedAdapter, EmbedCallback};
use crate::Error;

/// Ready flag plus the callbacks registered through `on_ready`/`on_offline`.
/// Shared by every concrete adapter.
#[derive(Default)]
pub struct EmbedHooks {
    ready: AtomicBool,
    ready_callbacks: Mutex<Vec<EmbedCallback>>,
    offline_callbacks: Mutex<Vec<EmbedCallback>>,
}

impl EmbedHooks {
    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    pub fn ensure_ready(&self, what: &str) -> Result<(), Error> {
        if self.is_ready() {
            Ok(())
        } else {
            Err(Error::AdapterUnavailable(format!("{} player not ready", what)))
        }
    }

    pub fn add_ready(&self, callback: EmbedCallback) {
        self.ready_callbacks.lock().push(callback);
    }

    pub fn add_offline(&self, callback: EmbedCallback) {
        self.offline_callbacks.lock().push(callback);
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::SeqCst);
        for cb in self.ready_callbacks.lock().iter() {
            cb();
        }
    }

    /// Player torn down or reloading; commands fail until the next ready.
    pub fn mark_unready(&self) {
        self.ready.store(false, Ordering::SeqCst);
    }

    pub fn mark_offline(&self) {
        for cb in self.offline_callbacks.lock().iter() {
            cb();
        }
    }
}

/// Lifecycle notifications forwarded from adapters into the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbedSignal {
    Ready(StreamId),
    Offline(StreamId),
}

impl EmbedSignal {
    pub fn stream_id(&self) -> StreamId {
        match self {
            EmbedSignal::Ready(id) | EmbedSignal::Offline(id) => *id,
        }
    }
}

/// Convenience used by the session when an adapter is registered.
pub fn forward_signals(
    adapter: &dyn EmbedAdapter,
    stream_id: StreamId,
    tx: tokio::sync::mpsc::UnboundedSender<EmbedSignal>,
) {
    let ready_tx = tx.clone();
    adapter.on_ready(Box::new(move || {
        let _ = ready_tx.send(EmbedSignal::Ready(stream_id));
    }));
    adapter.on_offline(Box::new(move || {
        let _ = tx.send(EmbedSignal::Offline(stream_id));
    }));
}
