// File: gridwatch-common/src/models/mod.rs
pub mod credential;
pub mod rate;
pub mod stream;
pub mod layout;
pub mod upstream;

pub use credential::Credential;
pub use rate::RateBudget;
pub use stream::{Platform, StreamEntry, StreamId};
pub use layout::{LayoutMode, LayoutPlan, SavedLayout, Slot, Viewport};
pub use upstream::{ChannelSearchData, StreamData, UserData};
