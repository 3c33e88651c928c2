//! Core data structures for sequence length filtering.

mod length_set;
pub mod synthetic;

pub use length_set::LengthSet;
