// Public API for integration tests and potential library usage

pub mod clock;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod state;
pub mod types;
pub mod ws;
