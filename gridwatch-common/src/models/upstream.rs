// ========================================================
// File: gridwatch-common/src/models/upstream.rs
// ========================================================
//! Wire records returned by the metadata API. Unknown fields are ignored.

use serde::{Deserialize, Serialize};

/// Envelope used by every list endpoint.
#[derive(Debug, Deserialize)]
pub struct DataResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Pagination {
    pub cursor: Option<String>,
}

/// Single record from "Get Streams". Only live channels are returned.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamData {
    pub id: String,
    pub user_id: String,
    pub user_login: String,
    pub user_name: String,
    #[serde(default)]
    pub game_name: String,
    #[serde(rename = "type", default)]
    pub type_field: String,
    #[serde(default)]
    pub title: String,
    pub viewer_count: u32,
    #[serde(default)]
    pub started_at: String,
    #[serde(default)]
    pub thumbnail_url: String,
}

/// Single record from "Get Users".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserData {
    pub id: String,
    pub login: String,
    pub display_name: String,
    #[serde(default)]
    pub profile_image_url: String,
}

/// Single record from "Search Channels".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelSearchData {
    pub id: String,
    pub broadcaster_login: String,
    pub display_name: String,
    #[serde(default)]
    pub is_live: bool,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub game_name: String,
}
