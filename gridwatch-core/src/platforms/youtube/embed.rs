// File: gridwatch-core/src/platforms/youtube/embed.rs
//
// Adapter over a YouTube iframe player driven through posted messages.

use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

use gridwatch_common::models::{Platform, Slot};
use gridwatch_common::traits::embed_traits::{EmbedAdapter, EmbedCallback};
use crate::platforms::embed::EmbedHooks;
use crate::Error;

/// `onStateChange` value for "ended".
const STATE_ENDED: i64 = 0;

/// One message posted to (or placed around) the iframe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameMessage {
    /// Create or resize the iframe element.
    Place { frame_id: String, src: String, x: u32, y: u32, width: u32, height: u32 },
    /// JSON text delivered with `postMessage`.
    Post { frame_id: String, payload: String },
    Remove { frame_id: String },
}

/// Inbound messages we care about; everything else is ignored.
#[derive(Debug, Deserialize)]
struct InboundFrame {
    event: String,
    #[serde(default)]
    info: serde_json::Value,
}

pub struct YouTubeEmbed {
    video_id: String,
    frame_id: String,
    outbox: mpsc::UnboundedSender<FrameMessage>,
    hooks: EmbedHooks,
}

impl YouTubeEmbed {
    pub fn new(video_id: &str, frame_id: &str, outbox: mpsc::UnboundedSender<FrameMessage>) -> Self {
        Self {
            video_id: video_id.trim().to_string(),
            frame_id: frame_id.to_string(),
            outbox,
            hooks: EmbedHooks::default(),
        }
    }

    pub fn frame_id(&self) -> &str {
        &self.frame_id
    }

    pub fn is_ready(&self) -> bool {
        self.hooks.is_ready()
    }

    /// Handle a raw message received from the iframe.
    pub fn handle_message(&self, raw: &str) -> Result<(), Error> {
        let frame: InboundFrame = serde_json::from_str(raw)?;
        trace!("YouTube frame '{}' event {}", self.frame_id, frame.event);
        match frame.event.as_str() {
            "onReady" => self.hooks.mark_ready(),
            "onStateChange" if frame.info.as_i64() == Some(STATE_ENDED) => self.hooks.mark_offline(),
            "onError" => {
                warn!("YouTube frame '{}' reported error {}", self.frame_id, frame.info);
                self.hooks.mark_offline();
            }
            _ => {}
        }
        Ok(())
    }

    fn command(&self, func: &str) -> Result<(), Error> {
        let payload = json!({ "event": "command", "func": func, "args": [] }).to_string();
        self.post(payload)
    }

    fn post(&self, payload: String) -> Result<(), Error> {
        self.outbox
            .send(FrameMessage::Post { frame_id: self.frame_id.clone(), payload })
            .map_err(|_| Error::AdapterUnavailable(format!("iframe host for '{}' is gone", self.frame_id)))
    }

    fn embed_src(&self) -> String {
        format!(
            "https://www.youtube.com/embed/{}?enablejsapi=1&autoplay=1&mute=1",
            urlencoding::encode(&self.video_id)
        )
    }
}

impl EmbedAdapter for YouTubeEmbed {
    fn platform(&self) -> Platform {
        Platform::YouTube
    }

    fn mount(&self, container: &Slot) -> Result<(), Error> {
        self.outbox
            .send(FrameMessage::Place {
                frame_id: self.frame_id.clone(),
                src: self.embed_src(),
                x: container.x,
                y: container.y,
                width: container.w,
                height: container.h,
            })
            .map_err(|_| Error::AdapterUnavailable(format!("iframe host for '{}' is gone", self.frame_id)))?;
        // The player only emits events after this handshake.
        self.post(json!({ "event": "listening", "id": self.frame_id }).to_string())
    }

    fn unmount(&self) {
        self.hooks.mark_unready();
        let _ = self.outbox.send(FrameMessage::Remove { frame_id: self.frame_id.clone() });
    }

    fn mute(&self) -> Result<(), Error> {
        self.hooks.ensure_ready("youtube")?;
        debug!("Muting youtube frame '{}'", self.frame_id);
        self.command("mute")
    }

    fn unmute(&self) -> Result<(), Error> {
        self.hooks.ensure_ready("youtube")?;
        debug!("Unmuting youtube frame '{}'", self.frame_id);
        self.command("unMute")
    }

    fn on_ready(&self, callback: EmbedCallback) {
        self.hooks.add_ready(callback);
    }

    fn on_offline(&self, callback: EmbedCallback) {
        self.hooks.add_offline(callback);
    }
}
