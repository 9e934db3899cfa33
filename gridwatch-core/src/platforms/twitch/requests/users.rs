use gridwatch_common::models::UserData;
use gridwatch_common::models::upstream::DataResponse;
use crate::Error;
use crate::platforms::twitch::client::TwitchHelixClient;

impl TwitchHelixClient {
    /// Resolve logins to user records, batched. Unknown logins are skipped
    /// by the API rather than reported.
    pub async fn fetch_users(&self, logins: &[String]) -> Result<Vec<UserData>, Error> {
        let mut users = Vec::with_capacity(logins.len());
        for batch in logins.chunks(self.batch_size()) {
            let query: Vec<(&str, String)> = batch
                .iter()
                .map(|login| ("login", login.to_lowercase()))
                .collect();
            let page: DataResponse<UserData> = self.get_json("users", &query).await?;
            users.extend(page.data);
        }
        Ok(users)
    }
}
