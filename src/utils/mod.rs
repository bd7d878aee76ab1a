//! Utility modules

pub mod fuzzy;

pub use fuzzy::{partial_score, score};
