//! The verification_chain module defines the [`RevocationVerifier`] trait implemented by each link of the
//! revocation verification chain and the [`VerificationChain`] that runs the links in order.
//!
//! Every link is consulted for every certificate. A link succeeding does not prevent later links from
//! running, and a hard failure from one link is recorded in the [`VerificationReport`] while the
//! remaining links still run.

use alloc::boxed::Box;
use alloc::vec::Vec;

use log::{debug, info};

use crate::util::error::*;
use crate::{
    LtvCertificate, LtvEnvironment, LtvSettings, TimeOfInterest, TrustIndex, VerificationOutcome,
    VerificationReport, VerifierKind,
};
use crate::{
    get_online_fetch_allowed, get_time_of_interest, CrlVerifier, OcspVerifier, RootStoreVerifier,
};

/// The [`RevocationVerifier`] trait defines the interface implemented by each link of a
/// [`VerificationChain`].
pub trait RevocationVerifier {
    /// Identifies the link in outcomes and reports
    fn kind(&self) -> VerifierKind;

    /// Returns the outcomes that establish `cert` was not revoked at `instant`. An empty list means the
    /// link could not establish status, which is not an error. When `issuer` is absent the link may use
    /// the trust index to find one.
    fn verify(
        &self,
        trust_index: &mut TrustIndex,
        cert: &LtvCertificate,
        issuer: Option<&LtvCertificate>,
        instant: TimeOfInterest,
    ) -> Result<Vec<VerificationOutcome>>;
}

/// [`VerificationChain`] is an ordered list of [`RevocationVerifier`] links.
#[derive(Default)]
pub struct VerificationChain<'a> {
    links: Vec<Box<dyn RevocationVerifier + 'a>>,
    time_of_interest: TimeOfInterest,
}

impl<'a> VerificationChain<'a> {
    /// Creates an empty [`VerificationChain`]
    pub fn new() -> Self {
        VerificationChain {
            links: Vec::new(),
            time_of_interest: TimeOfInterest::default(),
        }
    }

    /// Creates the standard three link chain, i.e., OCSP then CRL then trust anchor, using the
    /// supplied evidence and the online fetch setting and time of interest from `settings`.
    pub fn with_evidence<T: AsRef<[u8]>>(
        env: &'a LtvEnvironment,
        settings: &LtvSettings,
        ocsp_responses: &[T],
        crls: &[T],
    ) -> Self {
        let online = get_online_fetch_allowed(settings);

        let mut ocsp = OcspVerifier::new(env, ocsp_responses);
        ocsp.set_online_fetch_allowed(online);
        let mut crl = CrlVerifier::new(env, crls);
        crl.set_online_fetch_allowed(online);

        let mut chain = VerificationChain::new();
        chain.set_time_of_interest(get_time_of_interest(settings));
        chain.add_link(Box::new(ocsp));
        chain.add_link(Box::new(crl));
        chain.add_link(Box::new(RootStoreVerifier::new(env)));
        chain
    }

    /// Appends a link to the chain
    pub fn add_link(&mut self, link: Box<dyn RevocationVerifier + 'a>) {
        self.links.push(link);
    }

    /// Sets the instant used by [`VerificationChain::verify_at_time_of_interest`]
    pub fn set_time_of_interest(&mut self, time_of_interest: TimeOfInterest) {
        self.time_of_interest = time_of_interest;
    }

    /// Returns the instant used by [`VerificationChain::verify_at_time_of_interest`]
    pub fn time_of_interest(&self) -> TimeOfInterest {
        self.time_of_interest
    }

    /// Returns the number of links in the chain
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Returns true if the chain has no links
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// `verify` runs every link for `cert` and returns the union of the outcomes along with any hard
    /// failures.
    pub fn verify(
        &self,
        trust_index: &mut TrustIndex,
        cert: &LtvCertificate,
        issuer: Option<&LtvCertificate>,
        instant: TimeOfInterest,
    ) -> VerificationReport {
        let mut report = VerificationReport::default();
        for link in &self.links {
            match link.verify(trust_index, cert, issuer, instant) {
                Ok(outcomes) => {
                    debug!(
                        "{} link produced {} outcome(s) for {}",
                        link.kind(),
                        outcomes.len(),
                        cert.subject_name()
                    );
                    report.outcomes.extend(outcomes);
                }
                Err(e) => {
                    info!(
                        "{} link failed for {} with {}",
                        link.kind(),
                        cert.subject_name(),
                        e
                    );
                    report.failures.push((link.kind(), e));
                }
            }
        }
        report
    }

    /// `verify_at_time_of_interest` runs [`VerificationChain::verify`] at the chain's time of interest.
    pub fn verify_at_time_of_interest(
        &self,
        trust_index: &mut TrustIndex,
        cert: &LtvCertificate,
        issuer: Option<&LtvCertificate>,
    ) -> VerificationReport {
        self.verify(trust_index, cert, issuer, self.time_of_interest)
    }
}
