//! Remote data sources.

pub mod source;

pub use source::*;
