//! Headless embed host.
//!
//! Without a renderer there is no real player, so this host acknowledges
//! each mount as "ready" and logs every command the adapters send.

use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use gridwatch_common::models::Platform;
use gridwatch_common::traits::embed_traits::EmbedAdapter;
use gridwatch_core::platforms::twitch::{PlayerCommand, PlayerEvent, TwitchEmbed};
use gridwatch_core::platforms::youtube::{FrameMessage, YouTubeEmbed};

pub fn spawn_adapter(platform: Platform, channel: &str, index: usize) -> Arc<dyn EmbedAdapter> {
    match platform {
        Platform::Twitch => {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let embed = Arc::new(TwitchEmbed::new(channel, tx));
            let player = embed.clone();
            tokio::spawn(async move {
                while let Some(cmd) = rx.recv().await {
                    debug!("[twitch player] {:?}", cmd);
                    match cmd {
                        PlayerCommand::Mount { .. } if !player.is_ready() => {
                            player.handle_event(PlayerEvent::Ready)
                        }
                        PlayerCommand::Destroy => break,
                        _ => {}
                    }
                }
            });
            embed
        }
        Platform::YouTube => {
            let (tx, mut rx) = mpsc::unbounded_channel();
            let embed = Arc::new(YouTubeEmbed::new(channel, &format!("yt-frame-{}", index), tx));
            let frame = embed.clone();
            tokio::spawn(async move {
                while let Some(msg) = rx.recv().await {
                    debug!("[youtube frame] {:?}", msg);
                    match msg {
                        FrameMessage::Place { .. } if !frame.is_ready() => {
                            if let Err(e) = frame.handle_message(r#"{"event":"onReady"}"#) {
                                warn!("Headless frame could not signal ready: {}", e);
                            }
                        }
                        FrameMessage::Remove { .. } => break,
                        _ => {}
                    }
                }
            });
            embed
        }
    }
}
