//! Reporting: formatted operator output for every stage and the text dashboard.

pub mod format;

pub use format::*;
