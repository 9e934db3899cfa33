//! Helix ⟶ GET /search/channels

use gridwatch_common::models::ChannelSearchData;
use gridwatch_common::models::upstream::DataResponse;
use crate::Error;
use crate::platforms::twitch::client::{TwitchHelixClient, MAX_BATCH};

impl TwitchHelixClient {
    /// Channels matching `query`; `first` is clamped to 1..=100.
    pub async fn fetch_channel_search(
        &self,
        query: &str,
        live_only: bool,
        first: u32,
    ) -> Result<Vec<ChannelSearchData>, Error> {
        let query = query.trim();
        if query.is_empty() {
            return Err(Error::Validation("search query must not be empty".into()));
        }
        let first = (first as usize).clamp(1, MAX_BATCH);
        let params = vec![
            ("query", query.to_string()),
            ("live_only", live_only.to_string()),
            ("first", first.to_string()),
        ];
        let page: DataResponse<ChannelSearchData> = self.get_json("search/channels", &params).await?;
        Ok(page.data)
    }
}
