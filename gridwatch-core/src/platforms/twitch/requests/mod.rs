pub mod search;
pub mod stream;
pub mod users;
