//! Revocation evidence collection per signature and merging of collected evidence into a
//! document security store

pub mod dss;
pub mod evidence_collector;
pub mod ltv_settings;
pub mod validation_bundle;

pub use crate::ltv::{dss::*, evidence_collector::*, ltv_settings::*, validation_bundle::*};
