//! Orchestrator and its builder

mod builder;
mod orchestrator;

pub use builder::{Abridge, AbridgeBuilder};
pub use orchestrator::{Orchestrator, Stage};
