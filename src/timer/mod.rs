pub mod controller;
pub mod state;

pub use controller::{TimerCoordinator, TimerEvent};
pub use state::{TickOutcome, TimerState, TimerStatus};
