//! Chain resolution along with the URI and file utilities used to locate certificates

pub mod chain_resolver;
pub mod uri_utils;

#[cfg(feature = "std")]
pub mod file_utils;

pub use crate::builder::{chain_resolver::*, uri_utils::*};

#[cfg(feature = "std")]
pub use crate::builder::file_utils::*;
