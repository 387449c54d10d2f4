//! The chain_resolver module provides the [`ChainResolver`], which enumerates the plausible issuer chains
//! for a certificate using a [`TrustIndex`], retrieving missing issuers via the AIA extension.
//!
//! Chains returned by [`ChainResolver::resolve_chains`] are ordered from root to leaf. A chain that
//! cannot be completed is returned as is, i.e., an incomplete chain is a valid result.
//!
//! ```
//! use ltvval::*;
//!
//! let mut env = LtvEnvironment::default();
//! populate_ltv_environment(&mut env);
//! let mut trust_index = TrustIndex::new();
//! let mut resolver = ChainResolver::new(&env, &mut trust_index);
//! assert!(resolver.complete_partial_chain(&[]).is_empty());
//! ```

use alloc::collections::BTreeSet;
use alloc::string::String;
use alloc::{vec, vec::Vec};

use log::{debug, info, warn};

use crate::{parse_certificates, CertificateOrigin, LtvCertificate, LtvEnvironment, TrustIndex};

/// State shared across the recursive calls made while resolving the chains for one certificate.
#[derive(Default)]
struct ResolutionState {
    /// Encodings of certificates being expanded on the current path
    visited: BTreeSet<Vec<u8>>,
    /// CA issuers URIs already fetched during this resolution
    visited_aia_urls: BTreeSet<String>,
}

/// [`ChainResolver`] discovers issuer chains using the trusted and known certificates from a
/// [`TrustIndex`]. Certificates retrieved via AIA are added to the index with the
/// [`CertificateOrigin::Aia`] origin.
pub struct ChainResolver<'a> {
    env: &'a LtvEnvironment,
    trust_index: &'a mut TrustIndex,
    retrieve_from_aia: bool,
}

impl<'a> ChainResolver<'a> {
    /// Creates a new [`ChainResolver`] that retrieves certificates via AIA
    pub fn new(env: &'a LtvEnvironment, trust_index: &'a mut TrustIndex) -> Self {
        ChainResolver {
            env,
            trust_index,
            retrieve_from_aia: true,
        }
    }

    /// Enables or disables retrieval of certificates from AIA CA issuers URIs
    pub fn set_retrieve_from_aia(&mut self, retrieve_from_aia: bool) {
        self.retrieve_from_aia = retrieve_from_aia;
    }

    /// Returns the trust index used by this resolver
    pub fn trust_index(&self) -> &TrustIndex {
        self.trust_index
    }

    /// `resolve_chains` returns every plausible chain from a self-signed root (or the furthest issuer
    /// that could be found) to `cert`, with each chain ordered root first. The result is never empty.
    pub fn resolve_chains(&mut self, cert: &LtvCertificate) -> Vec<Vec<LtvCertificate>> {
        let mut state = ResolutionState::default();
        let chains = self.resolve_chains_recursive(cert, &mut state);
        if chains.is_empty() {
            vec![vec![cert.clone()]]
        } else {
            chains
        }
    }

    fn fetch_aia_certificates(&mut self, cert: &LtvCertificate, state: &mut ResolutionState) {
        if !self.retrieve_from_aia {
            return;
        }

        for uri in cert.ca_issuers_uris() {
            if !state.visited_aia_urls.insert(uri.clone()) {
                continue;
            }

            match self.env.fetch_by_url(&uri) {
                Ok(Some(bytes)) => {
                    let certs = parse_certificates(&bytes);
                    debug!("Retrieved {} certificate(s) from {}", certs.len(), uri);
                    self.trust_index.add_known(&certs, CertificateOrigin::Aia);
                }
                Ok(None) => {
                    debug!("No certificates available from {}", uri);
                }
                Err(e) => {
                    warn!("Failed to retrieve certificates from {}: {}", uri, e);
                }
            }
        }
    }

    /// Returns the candidate issuers for `cert`, preferring those whose public key verifies the
    /// signature on `cert` when any do. Certificates whose basic constraints deny the cA flag are never
    /// candidates.
    fn candidate_issuers(&self, cert: &LtvCertificate) -> Vec<LtvCertificate> {
        let by_name: Vec<LtvCertificate> = self
            .trust_index
            .lookup_by_issuer_name(cert.issuer())
            .into_iter()
            .filter(|c| c != cert && !c.is_end_entity())
            .collect();

        let verified: Vec<LtvCertificate> = by_name
            .iter()
            .filter(|c| cert.verified_by(self.env, c.spki()))
            .cloned()
            .collect();

        if verified.is_empty() {
            by_name
        } else {
            verified
        }
    }

    /// `find_issuer` returns a certificate from the trust index (after consulting any CA issuers URIs
    /// in `cert`) whose public key verifies the signature on `cert`. Self-signed certificates have no
    /// issuer.
    pub fn find_issuer(&mut self, cert: &LtvCertificate) -> Option<LtvCertificate> {
        if cert.is_self_signed() {
            return None;
        }
        let mut state = ResolutionState::default();
        self.fetch_aia_certificates(cert, &mut state);
        self.candidate_issuers(cert)
            .into_iter()
            .find(|c| cert.verified_by(self.env, c.spki()))
    }

    fn resolve_chains_recursive(
        &mut self,
        cert: &LtvCertificate,
        state: &mut ResolutionState,
    ) -> Vec<Vec<LtvCertificate>> {
        if state.visited.contains(&cert.encoded_cert) {
            return vec![];
        }

        if cert.is_self_signed() {
            return vec![vec![cert.clone()]];
        }

        self.fetch_aia_certificates(cert, state);

        let issuers = self.candidate_issuers(cert);
        if issuers.is_empty() {
            info!("No issuer found for {}", cert.subject_name());
            return vec![vec![cert.clone()]];
        }

        state.visited.insert(cert.encoded_cert.clone());
        let mut retval = vec![];
        for issuer in &issuers {
            for mut chain in self.resolve_chains_recursive(issuer, state) {
                chain.push(cert.clone());
                retval.push(chain);
            }
        }
        state.visited.remove(&cert.encoded_cert);

        if retval.is_empty() {
            // every candidate was already being expanded
            retval.push(vec![cert.clone()]);
        }
        retval
    }

    /// `complete_partial_chain` takes a chain ordered leaf first, resolves chains for the first
    /// element and returns the longest, ordered leaf first, followed by any supplied certificates
    /// that do not already appear in it. Empty input yields empty output.
    pub fn complete_partial_chain(&mut self, provided: &[LtvCertificate]) -> Vec<LtvCertificate> {
        let leaf = match provided.first() {
            Some(leaf) => leaf,
            None => return vec![],
        };

        let mut retval = self
            .resolve_chains(leaf)
            .into_iter()
            .max_by_key(|c| c.len())
            .unwrap_or_default();
        retval.reverse();

        for c in provided {
            if !retval.contains(c) {
                retval.push(c.clone());
            }
        }
        retval
    }
}
