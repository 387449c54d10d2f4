//! Stores of trusted and opportunistically observed certificates

pub mod trust_index;

pub use crate::source::trust_index::*;
