//! Notebook output validator: capture, scrub, compare

pub mod compare;
pub mod scrub;
pub mod snapshot;

pub use compare::{compare, validate, CellVerdict, Verdict};
pub use scrub::scrub;
pub use snapshot::{capture, capture_cells, CellOutputSnapshot, CellRecord, OutputRecord};
