//! Outcome types produced by the revocation verification chain

use alloc::string::String;
use alloc::vec::Vec;
use core::fmt;

use crate::{Error, LtvCertificate};

/// Identifies the link of the revocation verification chain that produced an outcome
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum VerifierKind {
    /// The OCSP evidence link
    Ocsp,
    /// The CRL evidence link
    Crl,
    /// The trust anchor link
    RootStore,
}

impl fmt::Display for VerifierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifierKind::Ocsp => write!(f, "OcspVerifier"),
            VerifierKind::Crl => write!(f, "CrlVerifier"),
            VerifierKind::RootStore => write!(f, "RootStoreVerifier"),
        }
    }
}

/// A statement that a certificate was shown to be valid (not revoked) by a link of the verification chain
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct VerificationOutcome {
    /// Certificate the outcome relates to
    pub certificate: LtvCertificate,
    /// Link that produced the outcome
    pub verifier: VerifierKind,
    /// Human-readable justification
    pub justification: String,
}

impl VerificationOutcome {
    /// Creates a new [`VerificationOutcome`]
    pub fn new(certificate: &LtvCertificate, verifier: VerifierKind, justification: String) -> Self {
        VerificationOutcome {
            certificate: certificate.clone(),
            verifier,
            justification,
        }
    }
}

impl fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} ({})",
            self.verifier,
            self.certificate.subject_name(),
            self.justification
        )
    }
}

/// Result of running every link of a verification chain for one certificate.
///
/// An empty `outcomes` list means "not verified by any path", which callers must not treat as proof of
/// revocation. Hard failures raised by individual links are collected in `failures` alongside the
/// outcomes produced by the other links.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct VerificationReport {
    /// Outcomes from every link, in link order
    pub outcomes: Vec<VerificationOutcome>,
    /// Hard failures raised by links, with the link that raised each
    pub failures: Vec<(VerifierKind, Error)>,
}

impl VerificationReport {
    /// Returns true if at least one outcome was recorded and no link reported a revocation
    pub fn is_verified(&self) -> bool {
        !self.outcomes.is_empty()
            && !self
                .failures
                .iter()
                .any(|(_, e)| matches!(e, Error::CertificateRevoked(_)))
    }

    /// Returns the outcomes produced by the given link
    pub fn outcomes_from(&self, verifier: VerifierKind) -> Vec<&VerificationOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.verifier == verifier)
            .collect()
    }
}
