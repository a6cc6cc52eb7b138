mod app;
pub mod config;
mod effects;
pub mod logging;
mod render;
pub mod uploads;

pub use app::{run_session, SessionOutcome};
