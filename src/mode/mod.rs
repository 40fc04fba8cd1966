pub mod controller;
pub mod state;

pub use controller::ModeController;
pub use state::{Mode, ModeState};
