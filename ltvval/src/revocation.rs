//! Revocation verification chain comprising OCSP, CRL and trust anchor links along with the online
//! OCSP and CRL clients

pub mod crl_verifier;
pub mod ocsp_verifier;
pub mod root_store_verifier;
pub mod verification_chain;

#[cfg(feature = "remote")]
pub mod crl_client;
#[cfg(feature = "remote")]
pub mod ocsp_client;

pub use crate::revocation::{
    crl_verifier::*, ocsp_verifier::*, root_store_verifier::*, verification_chain::*,
};

#[cfg(feature = "remote")]
pub use crate::revocation::{crl_client::*, ocsp_client::*};
