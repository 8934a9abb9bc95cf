//! Input/output helpers.
//!
//! - CSV table read/write with missing-value tokens (`ingest`)
//! - typed artifact persistence: cleaned table JSON, aggregate CSVs (`artifact`)

pub mod artifact;
pub mod ingest;

pub use artifact::*;
pub use ingest::*;
