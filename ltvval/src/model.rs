//! Wrappers around X.509 certificates, CRLs and OCSP responses along with the outcome types produced
//! when verifying revocation status

pub mod crl_evidence;
pub mod ltv_certificate;
pub mod ltv_extension;
pub mod ocsp_evidence;
pub mod verification_outcome;

pub use crate::{
    model::crl_evidence::*, model::ltv_certificate::*, model::ltv_extension::*,
    model::ocsp_evidence::*, model::verification_outcome::*,
};
