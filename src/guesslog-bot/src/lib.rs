//! Application glue for the guesslog Discord bot.
//!
//! The binary in `main.rs` wires configuration, the score store, and the
//! Discord client together; the modules here hold the behavior:
//!
//! - [`handler`] routes Discord events into score extraction, the
//!   leaderboard command, and the guarded reset command.
//! - [`confirm`] tracks destructive actions awaiting a typed `yes`.
//! - [`singleton`] refuses startup when another instance already runs.

pub mod confirm;
pub mod handler;
pub mod singleton;

pub use confirm::ConfirmationGate;
pub use handler::{ScoreHandler, command_specs};
