//! Analysis modules.
//!
//! Pure, in-memory transformations: keyed aggregation, date grouping and
//! catalog sync. Nothing in here performs I/O.

pub mod aggregator;
pub mod inventory;

pub use aggregator::*;
pub use inventory::*;
