pub mod layout_engine;
pub mod mute_coordinator;
pub mod session_controller;

pub use layout_engine::{compute_layout, GridLayoutEngine};
pub use mute_coordinator::MuteCoordinator;
pub use session_controller::{PollReport, SessionController};
