//! CLI layer - command definitions for the sigmet_raw binary

pub mod commands;

pub use commands::{Cli, Commands, DaemonCommands};
