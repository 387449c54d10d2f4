//! Callback and trait object switchboard to support chain resolution and revocation processing

pub mod ltv_environment;
pub mod ltv_environment_traits;

pub use crate::{environment::ltv_environment::*, environment::ltv_environment_traits::*};
