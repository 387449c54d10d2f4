//! Basic utility functionality supporting chain resolution and revocation evidence processing

pub mod crypto;
pub mod error;
pub mod ltv_alg_oids;
pub mod ltv_utilities;
pub mod time_of_interest;

pub use crate::{
    util::crypto::*, util::error::*, util::ltv_alg_oids::*, util::ltv_utilities::*,
    util::time_of_interest::*,
};
