//! `stock-dash` library crate.
//!
//! The binary (`stockdash`) is a thin wrapper around this library so that:
//!
//! - the pipeline stages are testable without spawning processes
//! - the dashboard logic is shared by the TUI and the text summary
//! - code stays easy to navigate as the project grows

pub mod aggregate;
pub mod app;
pub mod clean;
pub mod cli;
pub mod dashboard;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod report;
pub mod tui;
