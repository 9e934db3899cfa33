use async_trait::async_trait;
use crate::error::Error;
use crate::models::upstream::{ChannelSearchData, StreamData, UserData};

/// Read-only metadata operations the session polls through.
///
/// All operations are idempotent; identifiers are batched by the
/// implementation, so callers may pass any number of them.
#[async_trait]
pub trait StreamMetadataApi: Send + Sync {
    /// Live streams among `logins`. Offline channels are simply absent.
    async fn get_live_streams(&self, logins: &[String]) -> Result<Vec<StreamData>, Error>;
    async fn get_users(&self, logins: &[String]) -> Result<Vec<UserData>, Error>;
    async fn search_channels(
        &self,
        query: &str,
        live_only: bool,
        first: u32,
    ) -> Result<Vec<ChannelSearchData>, Error>;
    async fn get_top_streams(&self, first: u32) -> Result<Vec<StreamData>, Error>;
}
