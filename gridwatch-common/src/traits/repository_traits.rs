use async_trait::async_trait;
use crate::error::Error;
use crate::models::layout::SavedLayout;

/// Best-effort key-value persistence for the user's last layout choice.
#[async_trait]
pub trait LayoutStore: Send + Sync {
    async fn save(&self, layout: &SavedLayout) -> Result<(), Error>;
    async fn load(&self) -> Result<Option<SavedLayout>, Error>;
}
