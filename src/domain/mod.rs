//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the typed, column-oriented `Table` every stage reads and writes
//! - the fixed behavior constants and artifact locations (`config`)

pub mod config;
pub mod table;

pub use config::*;
pub use table::*;
