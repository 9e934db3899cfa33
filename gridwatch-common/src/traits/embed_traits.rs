use crate::error::Error;
use crate::models::layout::Slot;
use crate::models::stream::Platform;

/// Invoked by an adapter when its player becomes ready or goes offline.
pub type EmbedCallback = Box<dyn Fn() + Send + Sync>;

/// Uniform control surface over one platform's embed runtime.
///
/// Implementations may talk to an iframe via posted messages or to a player
/// SDK; callers only rely on this shape. `mute`/`unmute` return
/// `Error::AdapterUnavailable` while the player is not ready.
pub trait EmbedAdapter: Send + Sync {
    fn platform(&self) -> Platform;
    fn mount(&self, container: &Slot) -> Result<(), Error>;
    fn unmount(&self) {}
    fn mute(&self) -> Result<(), Error>;
    fn unmute(&self) -> Result<(), Error>;
    fn on_ready(&self, callback: EmbedCallback);
    fn on_offline(&self, callback: EmbedCallback);
}
