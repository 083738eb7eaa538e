//! CLI commands

pub mod config;
pub mod estimate;
pub mod simulate;
