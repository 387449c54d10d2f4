//! LtvEnvironment aggregates a set of function pointers and trait objects that supply functionality
//! used when resolving certificate chains, collecting revocation evidence and verifying that
//! evidence.
//!
//! The sample below illustrates preparation of an LtvEnvironment object.
//! ```
//! use ltvval::*;
//!
//! let mut env = LtvEnvironment::default();
//!
//! // add hashing and signature verification capabilities
//! populate_ltv_environment(&mut env);
//! ```
//!
//! With the `remote` feature, `populate_remote_clients` adds HTTP-based OCSP, CRL and AIA clients, and
//! `populate_remote_clients_from_settings` does the same using the configured timeout.
//! These serve as the default online fetch mechanisms for the revocation verification chain.

use alloc::boxed::Box;
use alloc::{vec, vec::Vec};

use log::debug;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::{
    environment::ltv_environment_traits::*, util::crypto::*, util::error::*, LtvCertificate,
};

/// [`LtvEnvironment`] provides a switchboard of callback functions and collaborator objects that allow
/// support to vary on different platforms or to allow support to be tailored for specific use cases.
pub struct LtvEnvironment {
    //--------------------------------------------------------------------------
    //Crypto interfaces
    //--------------------------------------------------------------------------
    /// List of functions that provide a message digest functionality
    calculate_hash_callbacks: Vec<CalculateHash>,

    /// List of functions that provide a signature verification functionality given a message
    verify_signature_message_callbacks: Vec<VerifySignatureMessage>,

    //--------------------------------------------------------------------------
    //Retrieval interfaces
    //--------------------------------------------------------------------------
    /// List of trait objects that fetch OCSP responses
    ocsp_clients: Vec<Box<dyn OcspClient>>,

    /// List of trait objects that fetch CRLs
    crl_clients: Vec<Box<dyn CrlClient>>,

    /// List of trait objects that fetch certificates from AIA URIs
    aia_fetchers: Vec<Box<dyn AiaFetcher>>,
}

impl Default for LtvEnvironment {
    /// LtvEnvironment::default returns a new [`LtvEnvironment`] with empty callback vectors for each
    /// type of callback.
    fn default() -> Self {
        LtvEnvironment::new()
    }
}

impl LtvEnvironment {
    /// LtvEnvironment::new returns a new [`LtvEnvironment`] with empty callback vectors for each type of callback
    pub fn new() -> LtvEnvironment {
        LtvEnvironment {
            calculate_hash_callbacks: vec![],
            verify_signature_message_callbacks: vec![],
            ocsp_clients: vec![],
            crl_clients: vec![],
            aia_fetchers: vec![],
        }
    }

    /// clear_all_callbacks clears the contents of all function pointer and trait object vectors
    /// associated with an instance of [`LtvEnvironment`].
    pub fn clear_all_callbacks(&mut self) {
        self.clear_calculate_hash_callbacks();
        self.clear_verify_signature_message_callbacks();
        self.clear_ocsp_clients();
        self.clear_crl_clients();
        self.clear_aia_fetchers();
    }

    /// add_calculate_hash_callback adds a [`CalculateHash`] callback to the list used by calculate_hash.
    pub fn add_calculate_hash_callback(&mut self, c: CalculateHash) {
        self.calculate_hash_callbacks.push(c);
    }

    /// clear_calculate_hash_callbacks clears the list of [`CalculateHash`] callbacks used by calculate_hash.
    pub fn clear_calculate_hash_callbacks(&mut self) {
        self.calculate_hash_callbacks.clear();
    }

    /// calculate_hash iterates over calculate_hash_callbacks until an authoritative answer is found
    /// or all options have been exhausted
    pub fn calculate_hash(
        &self,
        hash_alg: &AlgorithmIdentifierOwned,
        buffer_to_hash: &[u8],
    ) -> Result<Vec<u8>> {
        for f in &self.calculate_hash_callbacks {
            if let Ok(r) = f(self, hash_alg, buffer_to_hash) {
                return Ok(r);
            }
        }
        Err(Error::Unrecognized)
    }

    /// add_verify_signature_message_callback adds a [`VerifySignatureMessage`] callback to the list used by verify_signature_message.
    pub fn add_verify_signature_message_callback(&mut self, c: VerifySignatureMessage) {
        self.verify_signature_message_callbacks.push(c);
    }

    /// clear_verify_signature_message_callbacks clears the list of [`VerifySignatureMessage`] callbacks used by verify_signature_message.
    pub fn clear_verify_signature_message_callbacks(&mut self) {
        self.verify_signature_message_callbacks.clear();
    }

    /// verify_signature_message iterates over verify_signature_message_callbacks until an authoritative answer is found
    /// or all options have been exhausted, in which case the last error observed is returned
    pub fn verify_signature_message(
        &self,
        message_to_verify: &[u8],                 // buffer to verify
        signature: &[u8],                         // signature
        signature_alg: &AlgorithmIdentifierOwned, // signature algorithm
        spki: &SubjectPublicKeyInfoOwned,         // public key
    ) -> Result<()> {
        let mut err = Error::Unrecognized;
        for f in &self.verify_signature_message_callbacks {
            match f(self, message_to_verify, signature, signature_alg, spki) {
                Ok(r) => return Ok(r),
                Err(e) => err = e,
            }
        }
        Err(err)
    }

    /// add_ocsp_client adds an [`OcspClient`] object to the list used by fetch_ocsp.
    pub fn add_ocsp_client(&mut self, c: Box<dyn OcspClient>) {
        self.ocsp_clients.push(c);
    }

    /// clear_ocsp_clients clears the list of [`OcspClient`] objects used by fetch_ocsp.
    pub fn clear_ocsp_clients(&mut self) {
        self.ocsp_clients.clear();
    }

    /// has_ocsp_clients returns true if at least one [`OcspClient`] has been added
    pub fn has_ocsp_clients(&self) -> bool {
        !self.ocsp_clients.is_empty()
    }

    /// fetch_ocsp iterates over ocsp_clients until one returns a response or all options have been
    /// exhausted. Failures are logged and treated as unavailable.
    pub fn fetch_ocsp(&self, cert: &LtvCertificate, issuer: &LtvCertificate) -> Option<Vec<u8>> {
        for c in &self.ocsp_clients {
            match c.fetch(cert, issuer) {
                Ok(Some(r)) => return Some(r),
                Ok(None) => {}
                Err(e) => debug!(
                    "OCSP client failed for {} with {}",
                    cert.subject_name(),
                    e
                ),
            }
        }
        None
    }

    /// add_crl_client adds a [`CrlClient`] object to the list used by fetch_crls.
    pub fn add_crl_client(&mut self, c: Box<dyn CrlClient>) {
        self.crl_clients.push(c);
    }

    /// clear_crl_clients clears the list of [`CrlClient`] objects used by fetch_crls.
    pub fn clear_crl_clients(&mut self) {
        self.crl_clients.clear();
    }

    /// has_crl_clients returns true if at least one [`CrlClient`] has been added
    pub fn has_crl_clients(&self) -> bool {
        !self.crl_clients.is_empty()
    }

    /// fetch_crls iterates over crl_clients until one returns at least one CRL or all options have
    /// been exhausted.
    pub fn fetch_crls(&self, cert: &LtvCertificate) -> Vec<Vec<u8>> {
        for c in &self.crl_clients {
            match c.fetch(cert) {
                Ok(crls) if !crls.is_empty() => return crls,
                Ok(_) => {}
                Err(e) => debug!("CRL client failed for {} with {}", cert.subject_name(), e),
            }
        }
        vec![]
    }

    /// add_aia_fetcher adds an [`AiaFetcher`] object to the list used by fetch_by_url.
    pub fn add_aia_fetcher(&mut self, c: Box<dyn AiaFetcher>) {
        self.aia_fetchers.push(c);
    }

    /// clear_aia_fetchers clears the list of [`AiaFetcher`] objects used by fetch_by_url.
    pub fn clear_aia_fetchers(&mut self) {
        self.aia_fetchers.clear();
    }

    /// fetch_by_url iterates over aia_fetchers until one returns a value or all options have been
    /// exhausted, in which case the last error observed (if any) is returned.
    pub fn fetch_by_url(&self, uri: &str) -> Result<Option<Vec<u8>>> {
        let mut err = None;
        for f in &self.aia_fetchers {
            match f.fetch_by_url(uri) {
                Ok(Some(r)) => return Ok(Some(r)),
                Ok(None) => {}
                Err(e) => err = Some(e),
            }
        }
        match err {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }
}

/// `populate_ltv_environment` populates an [`LtvEnvironment`] instance with the hashing and signature
/// verification callbacks implemented using the Rust Crypto libraries.
pub fn populate_ltv_environment(env: &mut LtvEnvironment) {
    env.add_calculate_hash_callback(calculate_hash_rust_crypto);
    env.add_verify_signature_message_callback(verify_signature_message_rust_crypto);
}

/// `populate_remote_clients` adds the blocking HTTP implementations of the OCSP, CRL and AIA fetch
/// clients to an [`LtvEnvironment`] instance, each using the given per-request timeout.
#[cfg(feature = "remote")]
pub fn populate_remote_clients(env: &mut LtvEnvironment, timeout: core::time::Duration) {
    env.add_ocsp_client(Box::new(crate::HttpOcspClient::new(timeout)));
    env.add_crl_client(Box::new(crate::HttpCrlClient::new(timeout)));
    env.add_aia_fetcher(Box::new(crate::HttpAiaFetcher::new(timeout)));
}

/// `populate_remote_clients_from_settings` adds the blocking HTTP clients using the per-request timeout
/// from `PS_HTTP_TIMEOUT_SECS`.
#[cfg(feature = "remote")]
pub fn populate_remote_clients_from_settings(
    env: &mut LtvEnvironment,
    settings: &crate::LtvSettings,
) {
    let timeout = core::time::Duration::from_secs(crate::get_http_timeout_secs(settings));
    populate_remote_clients(env, timeout);
}

/// The environment acts as an [`OcspClient`] by consulting each of its OCSP clients in turn, which allows
/// the default online clients to be passed where a single client is expected.
impl OcspClient for LtvEnvironment {
    fn fetch(&self, cert: &LtvCertificate, issuer: &LtvCertificate) -> Result<Option<Vec<u8>>> {
        Ok(self.fetch_ocsp(cert, issuer))
    }
}

/// The environment acts as a [`CrlClient`] by consulting each of its CRL clients in turn.
impl CrlClient for LtvEnvironment {
    fn fetch(&self, cert: &LtvCertificate) -> Result<Vec<Vec<u8>>> {
        Ok(self.fetch_crls(cert))
    }
}

#[cfg(feature = "remote")]
#[test]
fn remote_clients_from_settings_test() {
    let mut settings = crate::LtvSettings::default();
    crate::set_http_timeout_secs(&mut settings, 3);
    let mut env = LtvEnvironment::default();
    assert!(!env.has_ocsp_clients());
    populate_remote_clients_from_settings(&mut env, &settings);
    assert!(env.has_ocsp_clients());
    assert!(env.has_crl_clients());
}
