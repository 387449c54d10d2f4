//! The crl_verifier module provides the CRL link of the revocation verification chain.

use alloc::boxed::Box;
use alloc::format;
use alloc::vec::Vec;

use log::{debug, error, warn};

use crate::environment::ltv_environment_traits::CrlClient;
use crate::util::error::*;
use crate::{
    compare_names, parse_crls_leniently, ChainResolver, LtvCertificate, LtvCrl, LtvEnvironment,
    RevocationVerifier, TimeOfInterest, TrustIndex, VerificationOutcome, VerifierKind,
};

/// `check_crls` determines the status of `cert` using the presented CRLs. Only CRLs issued under the
/// certificate's issuer name, valid at `instant` and signed by one of `signers` are consulted.
///
/// An outcome is returned for each CRL that covers the certificate without listing it. A CRL that lists
/// the certificate with a revocation date at or before `instant` yields [`Error::CertificateRevoked`].
pub(crate) fn check_crls(
    env: &LtvEnvironment,
    crls: &[LtvCrl],
    signers: &[LtvCertificate],
    cert: &LtvCertificate,
    instant: TimeOfInterest,
) -> Result<Vec<VerificationOutcome>> {
    let mut outcomes = Vec::new();
    for crl in crls {
        if !compare_names(crl.issuer(), cert.issuer()) {
            continue;
        }

        if !crl.valid_at(instant) {
            debug!(
                "Ignoring CRL from {} as not valid at {}",
                cert.issuer_name(),
                instant
            );
            continue;
        }

        let signer = signers
            .iter()
            .find(|s| compare_names(s.subject(), crl.issuer()) && crl.verified_by(env, s.spki()));
        let signer = match signer {
            Some(s) => s,
            None => {
                warn!(
                    "Ignoring CRL from {} as the signature could not be verified",
                    cert.issuer_name()
                );
                continue;
            }
        };

        if crl.is_revoked(cert, instant) {
            error!("{} is revoked per CRL", cert.subject_name());
            return Err(Error::CertificateRevoked(cert.subject_name()));
        }

        outcomes.push(VerificationOutcome::new(
            cert,
            VerifierKind::Crl,
            format!(
                "not listed on CRL issued by {} with thisUpdate {}",
                signer.subject_name(),
                crl.this_update()
            ),
        ));
    }
    Ok(outcomes)
}

/// `crl_signer_candidates` returns the certificates that may have signed CRLs covering `cert`, i.e., the
/// supplied issuer, if any, followed by certificates from the trust index issued under the certificate's
/// issuer name. The chain resolver is used to locate an issuer when none was supplied.
pub(crate) fn crl_signer_candidates(
    env: &LtvEnvironment,
    trust_index: &mut TrustIndex,
    cert: &LtvCertificate,
    issuer: Option<&LtvCertificate>,
) -> Vec<LtvCertificate> {
    let mut retval = Vec::new();
    match issuer {
        Some(issuer) => retval.push(issuer.clone()),
        None => {
            let mut resolver = ChainResolver::new(env, trust_index);
            if let Some(issuer) = resolver.find_issuer(cert) {
                retval.push(issuer);
            }
        }
    }
    for c in trust_index.lookup_by_issuer_name(cert.issuer()) {
        if !retval.contains(&c) {
            retval.push(c);
        }
    }
    retval
}

/// [`CrlVerifier`] determines revocation status using CRLs supplied when the verifier is created and,
/// when online fetching is allowed and the supplied CRLs are not conclusive, CRLs retrieved using the
/// CRL clients from the [`LtvEnvironment`].
pub struct CrlVerifier<'a> {
    env: &'a LtvEnvironment,
    crls: Vec<LtvCrl>,
    online_fetch_allowed: bool,
    crl_client: Option<Box<dyn CrlClient + 'a>>,
}

impl<'a> CrlVerifier<'a> {
    /// Creates a new [`CrlVerifier`] from DER-encoded CRLs. CRLs that cannot be parsed are discarded.
    pub fn new<T: AsRef<[u8]>>(env: &'a LtvEnvironment, crls: &[T]) -> Self {
        CrlVerifier {
            env,
            crls: parse_crls_leniently(crls),
            online_fetch_allowed: false,
            crl_client: None,
        }
    }

    /// Enables or disables use of the [`LtvEnvironment`] CRL clients
    pub fn set_online_fetch_allowed(&mut self, allowed: bool) {
        self.online_fetch_allowed = allowed;
    }

    /// Sets a CRL client consulted ahead of the [`LtvEnvironment`] CRL clients
    pub fn set_crl_client(&mut self, client: Box<dyn CrlClient + 'a>) {
        self.crl_client = Some(client);
    }

    /// Returns the number of supplied CRLs that could be parsed
    pub fn crl_count(&self) -> usize {
        self.crls.len()
    }

    fn fetch_crls(&self, cert: &LtvCertificate) -> Vec<LtvCrl> {
        let mut buffers = match &self.crl_client {
            Some(c) => match c.fetch(cert) {
                Ok(crls) => crls,
                Err(e) => {
                    debug!("CRL client failed for {} with {}", cert.subject_name(), e);
                    Vec::new()
                }
            },
            None => Vec::new(),
        };
        if buffers.is_empty() && self.online_fetch_allowed {
            buffers = self.env.fetch_crls(cert);
        }
        parse_crls_leniently(&buffers)
    }
}

impl RevocationVerifier for CrlVerifier<'_> {
    fn kind(&self) -> VerifierKind {
        VerifierKind::Crl
    }

    fn verify(
        &self,
        trust_index: &mut TrustIndex,
        cert: &LtvCertificate,
        issuer: Option<&LtvCertificate>,
        instant: TimeOfInterest,
    ) -> Result<Vec<VerificationOutcome>> {
        let signers = crl_signer_candidates(self.env, trust_index, cert, issuer);
        if signers.is_empty() {
            debug!("No CRL signer found for {}", cert.subject_name());
            return Ok(Vec::new());
        }

        let outcomes = check_crls(self.env, &self.crls, &signers, cert, instant)?;
        if !outcomes.is_empty() {
            return Ok(outcomes);
        }

        let fetched = self.fetch_crls(cert);
        if fetched.is_empty() {
            return Ok(outcomes);
        }
        check_crls(self.env, &fetched, &signers, cert, instant)
    }
}
