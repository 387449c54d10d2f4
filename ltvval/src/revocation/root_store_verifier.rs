//! The root_store_verifier module provides the terminal link of the revocation verification chain, which
//! accepts certificates that chain to a trust anchor.

use alloc::collections::BTreeSet;
use alloc::format;
use alloc::vec::Vec;

use log::debug;

use crate::util::error::*;
use crate::{
    LtvCertificate, LtvEnvironment, RevocationVerifier, TimeOfInterest, TrustIndex, TrustUsage,
    VerificationOutcome, VerifierKind,
};

/// [`RootStoreVerifier`] accepts a certificate when a sequence of issuers, each verifying the signature of
/// the certificate below it, leads from the certificate to a trust anchor and every certificate in that
/// sequence is valid at the time of interest.
pub struct RootStoreVerifier<'a> {
    env: &'a LtvEnvironment,
}

impl<'a> RootStoreVerifier<'a> {
    /// Creates a new [`RootStoreVerifier`]
    pub fn new(env: &'a LtvEnvironment) -> Self {
        RootStoreVerifier { env }
    }

    fn is_anchor(trust_index: &TrustIndex, cert: &LtvCertificate) -> bool {
        trust_index.is_trusted_for(cert, TrustUsage::SignatureValidation)
    }

    /// Returns the issuers of `cert` from the trust index whose keys verify its signature, trust
    /// anchors first.
    fn issuers_of(&self, trust_index: &TrustIndex, cert: &LtvCertificate) -> Vec<LtvCertificate> {
        let (mut anchors, others): (Vec<LtvCertificate>, Vec<LtvCertificate>) = trust_index
            .lookup_by_issuer_name(cert.issuer())
            .into_iter()
            .filter(|c| c != cert && cert.verified_by(self.env, c.spki()))
            .partition(|c| Self::is_anchor(trust_index, c));
        anchors.extend(others);
        anchors
    }

    /// Depth-first search for a trust anchor above `current`, backtracking past issuers that are not
    /// valid at `instant` or that lead nowhere. Returns the anchor and the number of hops to it.
    fn find_anchor(
        &self,
        trust_index: &TrustIndex,
        current: &LtvCertificate,
        supplied: Option<&LtvCertificate>,
        instant: TimeOfInterest,
        on_path: &mut BTreeSet<Vec<u8>>,
        hops: usize,
    ) -> Option<(LtvCertificate, usize)> {
        if current.valid_at(instant).is_err() {
            debug!("{} is not valid at {}", current.subject_name(), instant);
            return None;
        }

        if Self::is_anchor(trust_index, current) {
            return Some((current.clone(), hops));
        }

        if current.is_self_signed() || !on_path.insert(current.encoded_cert.clone()) {
            return None;
        }

        let mut candidates = Vec::new();
        if let Some(i) = supplied {
            if current.is_issued_by(self.env, i) {
                candidates.push(i.clone());
            }
        }
        for c in self.issuers_of(trust_index, current) {
            if !candidates.contains(&c) {
                candidates.push(c);
            }
        }

        let found = candidates.iter().find_map(|next| {
            self.find_anchor(trust_index, next, None, instant, on_path, hops + 1)
        });
        on_path.remove(&current.encoded_cert);
        found
    }
}
impl RevocationVerifier for RootStoreVerifier<'_> {
    fn kind(&self) -> VerifierKind {
        VerifierKind::RootStore
    }

    fn verify(
        &self,
        trust_index: &mut TrustIndex,
        cert: &LtvCertificate,
        issuer: Option<&LtvCertificate>,
        instant: TimeOfInterest,
    ) -> Result<Vec<VerificationOutcome>> {
        let mut on_path: BTreeSet<Vec<u8>> = BTreeSet::new();
        let (anchor, hops) =
            match self.find_anchor(trust_index, cert, issuer, instant, &mut on_path, 0) {
                Some(found) => found,
                None => {
                    debug!("No path to a trust anchor for {}", cert.subject_name());
                    return Ok(Vec::new());
                }
            };

        let justification = if hops == 0 {
            format!("{} is a trust anchor", anchor.subject_name())
        } else {
            format!(
                "chains to trust anchor {} in {} hop(s)",
                anchor.subject_name(),
                hops
            )
        };
        Ok(alloc::vec![VerificationOutcome::new(
            cert,
            VerifierKind::RootStore,
            justification
        )])
    }
}
