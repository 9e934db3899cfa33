pub mod api;
pub mod embed_traits;
pub mod repository_traits;
