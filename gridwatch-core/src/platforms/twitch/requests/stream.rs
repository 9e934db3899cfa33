// ========================================================
// File: gridwatch-core/src/platforms/twitch/requests/stream.rs
// ========================================================
use tracing::debug;

use gridwatch_common::models::StreamData;
use gridwatch_common::models::upstream::DataResponse;
use crate::Error;
use crate::platforms::twitch::client::{TwitchHelixClient, MAX_BATCH};

impl TwitchHelixClient {
    /// "Get Streams" filtered by login. Offline channels are absent from the
    /// result. Batches are requested one after another in input order.
    pub async fn fetch_live_streams(&self, logins: &[String]) -> Result<Vec<StreamData>, Error> {
        let mut live = Vec::new();
        for batch in logins.chunks(self.batch_size()) {
            let mut query: Vec<(&str, String)> = batch
                .iter()
                .map(|login| ("user_login", login.to_lowercase()))
                .collect();
            query.push(("first", batch.len().to_string()));

            let page: DataResponse<StreamData> = self.get_json("streams", &query).await?;
            debug!("Get Streams: {} of {} requested channels live", page.data.len(), batch.len());
            live.extend(page.data);
        }
        Ok(live)
    }

    /// Most-watched live streams, following the pagination cursor until
    /// `first` records have been collected or the listing ends.
    pub async fn fetch_top_streams(&self, first: u32) -> Result<Vec<StreamData>, Error> {
        let wanted = first as usize;
        let mut streams = Vec::with_capacity(wanted.min(MAX_BATCH));
        let mut cursor: Option<String> = None;

        while streams.len() < wanted {
            let page_size = (wanted - streams.len()).min(MAX_BATCH);
            let mut query = vec![("first", page_size.to_string())];
            if let Some(after) = cursor.take() {
                query.push(("after", after));
            }

            let page: DataResponse<StreamData> = self.get_json("streams", &query).await?;
            let fetched = page.data.len();
            streams.extend(page.data);

            cursor = page.pagination.and_then(|p| p.cursor).filter(|c| !c.is_empty());
            if fetched == 0 || cursor.is_none() {
                break;
            }
        }

        streams.truncate(wanted);
        Ok(streams)
    }
}
