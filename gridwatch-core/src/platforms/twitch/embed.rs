// File: gridwatch-core/src/platforms/twitch/embed.rs
//
// Adapter over the Twitch embed player SDK. The SDK lives on the rendering
// side; this adapter sends it commands and is fed its events.

use tokio::sync::mpsc;
use tracing::{debug, trace};

use gridwatch_common::models::{Platform, Slot};
use gridwatch_common::traits::embed_traits::{EmbedAdapter, EmbedCallback};
use crate::platforms::embed::EmbedHooks;
use crate::Error;

/// Calls made on the SDK player object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCommand {
    Mount { channel: String, x: u32, y: u32, width: u32, height: u32 },
    SetMuted(bool),
    Destroy,
}

/// Events raised by the SDK player (`Twitch.Player.READY` and friends).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerEvent {
    Ready,
    Online,
    Offline,
    Playing,
    Pause,
}

pub struct TwitchEmbed {
    channel: String,
    commands: mpsc::UnboundedSender<PlayerCommand>,
    hooks: EmbedHooks,
}

impl TwitchEmbed {
    pub fn new(channel: &str, commands: mpsc::UnboundedSender<PlayerCommand>) -> Self {
        Self {
            channel: channel.to_lowercase(),
            commands,
            hooks: EmbedHooks::default(),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.hooks.is_ready()
    }

    /// Feed one SDK event into the adapter.
    pub fn handle_event(&self, event: PlayerEvent) {
        trace!("Twitch player '{}' event {:?}", self.channel, event);
        match event {
            PlayerEvent::Ready => self.hooks.mark_ready(),
            PlayerEvent::Offline => self.hooks.mark_offline(),
            PlayerEvent::Online | PlayerEvent::Playing | PlayerEvent::Pause => {}
        }
    }

    fn send(&self, command: PlayerCommand) -> Result<(), Error> {
        self.commands
            .send(command)
            .map_err(|_| Error::AdapterUnavailable(format!("twitch player host for '{}' is gone", self.channel)))
    }
}

impl EmbedAdapter for TwitchEmbed {
    fn platform(&self) -> Platform {
        Platform::Twitch
    }

    fn mount(&self, container: &Slot) -> Result<(), Error> {
        self.send(PlayerCommand::Mount {
            channel: self.channel.clone(),
            x: container.x,
            y: container.y,
            width: container.w,
            height: container.h,
        })
    }

    fn unmount(&self) {
        self.hooks.mark_unready();
        let _ = self.send(PlayerCommand::Destroy);
    }

    fn mute(&self) -> Result<(), Error> {
        self.hooks.ensure_ready("twitch")?;
        debug!("Muting twitch player '{}'", self.channel);
        self.send(PlayerCommand::SetMuted(true))
    }

    fn unmute(&self) -> Result<(), Error> {
        self.hooks.ensure_ready("twitch")?;
        debug!("Unmuting twitch player '{}'", self.channel);
        self.send(PlayerCommand::SetMuted(false))
    }

    fn on_ready(&self, callback: EmbedCallback) {
        self.hooks.add_ready(callback);
    }

    fn on_offline(&self, callback: EmbedCallback) {
        self.hooks.add_offline(callback);
    }
}
