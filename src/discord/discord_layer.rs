// Discord layer - commands, event handlers, and the offline watchdog.

#[path = "commands/command_catalog.rs"]
pub mod commands;

pub mod watchdog;

// Re-export command types for convenience
pub use commands::planner::{Context, Data, Error};
