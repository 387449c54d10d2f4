//! The ocsp_verifier module provides the OCSP link of the revocation verification chain.
//!
//! An OCSP response is only relied upon after establishing who signed it. A response signed by the
//! certificate's issuer is accepted directly. A response signed by a delegated responder requires the
//! responder certificate to have been issued by the same issuer, to be valid at the time of interest and
//! either to carry the id-pkix-ocsp-nocheck extension or to have its own status confirmed as good. A
//! response that carries no certificates may be signed by a locally trusted responder.

use alloc::boxed::Box;
use alloc::collections::BTreeSet;
use alloc::format;
use alloc::vec::Vec;
use core::cell::RefCell;

use log::{debug, error, info, warn};
use x509_ocsp::CertStatus;

use crate::environment::ltv_environment_traits::{CrlClient, OcspClient};
use crate::revocation::crl_verifier::check_crls;
use crate::util::error::*;
use crate::{
    check_response_time, parse_crls_leniently, parse_ocsp_responses_leniently, CertificateOrigin,
    ChainResolver, LtvCertificate, LtvEnvironment, OcspEvidence, RevocationVerifier,
    TimeOfInterest, TrustIndex, TrustUsage, VerificationOutcome, VerifierKind,
};

/// Identifies which certificate signed an OCSP response
enum Responder {
    /// The issuer of the certificate of interest signed the response
    Issuer,
    /// A locally trusted responder signed the response
    Trusted,
    /// A delegated responder whose certificate was found in the response signed the response
    Delegated(LtvCertificate),
}

/// [`OcspVerifier`] determines revocation status using OCSP responses supplied when the verifier is
/// created and, when online fetching is allowed and no supplied response is conclusive, a response
/// retrieved using the OCSP clients from the [`LtvEnvironment`].
pub struct OcspVerifier<'a> {
    env: &'a LtvEnvironment,
    responses: Vec<OcspEvidence>,
    online_fetch_allowed: bool,
    responder_ocsp_client: Option<Box<dyn OcspClient + 'a>>,
    responder_crl_client: Option<Box<dyn CrlClient + 'a>>,
    /// Responder certificates whose status is being established, to guard against loops
    responders_in_progress: RefCell<BTreeSet<Vec<u8>>>,
}

impl<'a> OcspVerifier<'a> {
    /// Creates a new [`OcspVerifier`] from DER-encoded OCSPResponse or BasicOCSPResponse objects.
    /// Responses that cannot be parsed are discarded.
    pub fn new<T: AsRef<[u8]>>(env: &'a LtvEnvironment, responses: &[T]) -> Self {
        OcspVerifier {
            env,
            responses: parse_ocsp_responses_leniently(responses),
            online_fetch_allowed: false,
            responder_ocsp_client: None,
            responder_crl_client: None,
            responders_in_progress: RefCell::new(BTreeSet::new()),
        }
    }

    /// Enables or disables use of the [`LtvEnvironment`] OCSP and CRL clients
    pub fn set_online_fetch_allowed(&mut self, allowed: bool) {
        self.online_fetch_allowed = allowed;
    }

    /// Sets the client used first when checking the status of a delegated responder
    pub fn set_responder_ocsp_client(&mut self, client: Box<dyn OcspClient + 'a>) {
        self.responder_ocsp_client = Some(client);
    }

    /// Sets the client used second when checking the status of a delegated responder
    pub fn set_responder_crl_client(&mut self, client: Box<dyn CrlClient + 'a>) {
        self.responder_crl_client = Some(client);
    }

    /// Returns the number of supplied responses that could be parsed
    pub fn response_count(&self) -> usize {
        self.responses.len()
    }

    /// Determines which certificate signed `response`, which covers `cert` as issued by `issuer`.
    fn find_responder(
        &self,
        trust_index: &TrustIndex,
        response: &OcspEvidence,
        cert: &LtvCertificate,
        issuer: &LtvCertificate,
    ) -> Result<Responder> {
        if response.is_signed_by(self.env, issuer) {
            return Ok(Responder::Issuer);
        }

        if let Some(r) = response
            .certs
            .iter()
            .find(|c| c.has_ocsp_signing_eku() && response.is_signed_by(self.env, c))
        {
            return Ok(Responder::Delegated(r.clone()));
        }

        if response.certs.is_empty()
            && trust_index
                .trusted_for_usage(TrustUsage::OcspResponse)
                .iter()
                .any(|c| response.is_signed_by(self.env, c))
        {
            return Ok(Responder::Trusted);
        }

        error!(
            "OCSP response covering {} could not be verified",
            cert.subject_name()
        );
        Err(Error::ResponseNotVerified(cert.subject_name()))
    }

    /// `is_valid_response` returns Ok if the signer of `response` can be relied upon for the status of
    /// certificates issued by `issuer`.
    pub fn is_valid_response(
        &self,
        trust_index: &mut TrustIndex,
        response: &OcspEvidence,
        cert: &LtvCertificate,
        issuer: &LtvCertificate,
        instant: TimeOfInterest,
    ) -> Result<()> {
        trust_index.add_known(&response.certs, CertificateOrigin::OcspResponse);

        let responder = match self.find_responder(trust_index, response, cert, issuer)? {
            Responder::Issuer => return Ok(()),
            Responder::Trusted => {
                debug!("OCSP response signed by a locally trusted responder");
                return Ok(());
            }
            Responder::Delegated(r) => r,
        };

        if !responder.is_issued_by(self.env, issuer) || responder.valid_at(instant).is_err() {
            error!(
                "Delegated OCSP responder {} is not issued by {} or not valid at {}",
                responder.subject_name(),
                issuer.subject_name(),
                instant
            );
            return Err(Error::ResponderCertificateInvalid(responder.subject_name()));
        }

        if responder.has_ocsp_no_check() {
            debug!(
                "Accepting OCSP responder {} due to id-pkix-ocsp-nocheck",
                responder.subject_name()
            );
            return Ok(());
        }

        self.check_responder_status(trust_index, &responder, issuer, instant)
    }

    /// Establishes that the delegated `responder` was not revoked at `instant` by trying, in order, the
    /// configured responder OCSP client, the configured responder CRL client and, when online fetching
    /// is allowed, the OCSP and CRL clients from the environment.
    fn check_responder_status(
        &self,
        trust_index: &mut TrustIndex,
        responder: &LtvCertificate,
        issuer: &LtvCertificate,
        instant: TimeOfInterest,
    ) -> Result<()> {
        if !self
            .responders_in_progress
            .borrow_mut()
            .insert(responder.encoded_cert.clone())
        {
            warn!(
                "Loop detected checking status of OCSP responder {}",
                responder.subject_name()
            );
            return Err(Error::ResponderStatusUnchecked(responder.subject_name()));
        }

        let good = self.responder_status_is_good(trust_index, responder, issuer, instant);
        self.responders_in_progress
            .borrow_mut()
            .remove(&responder.encoded_cert);

        if good {
            Ok(())
        } else {
            error!(
                "Status of OCSP responder {} could not be checked",
                responder.subject_name()
            );
            Err(Error::ResponderStatusUnchecked(responder.subject_name()))
        }
    }

    fn responder_status_is_good(
        &self,
        trust_index: &mut TrustIndex,
        responder: &LtvCertificate,
        issuer: &LtvCertificate,
        instant: TimeOfInterest,
    ) -> bool {
        if let Some(client) = &self.responder_ocsp_client {
            if let Ok(Some(resp)) = client.fetch(responder, issuer) {
                if self.ocsp_bytes_report_good(trust_index, &resp, responder, issuer, instant) {
                    return true;
                }
            }
        }

        if let Some(client) = &self.responder_crl_client {
            if let Ok(crls) = client.fetch(responder) {
                if self.crl_bytes_report_good(&crls, responder, issuer, instant) {
                    return true;
                }
            }
        }

        if !self.online_fetch_allowed {
            return false;
        }

        if let Some(resp) = self.env.fetch_ocsp(responder, issuer) {
            if self.ocsp_bytes_report_good(trust_index, &resp, responder, issuer, instant) {
                return true;
            }
        }

        let crls = self.env.fetch_crls(responder);
        self.crl_bytes_report_good(&crls, responder, issuer, instant)
    }

    fn ocsp_bytes_report_good(
        &self,
        trust_index: &mut TrustIndex,
        resp: &[u8],
        cert: &LtvCertificate,
        issuer: &LtvCertificate,
        instant: TimeOfInterest,
    ) -> bool {
        let evidence = match OcspEvidence::parse(resp) {
            Ok(e) => e,
            Err(e) => {
                warn!("Discarding OCSP response that could not be parsed: {}", e);
                return false;
            }
        };
        matches!(
            self.check_responses(trust_index, core::slice::from_ref(&evidence), cert, issuer, instant),
            Ok(outcomes) if !outcomes.is_empty()
        )
    }

    fn crl_bytes_report_good(
        &self,
        crls: &[Vec<u8>],
        cert: &LtvCertificate,
        issuer: &LtvCertificate,
        instant: TimeOfInterest,
    ) -> bool {
        let crls = parse_crls_leniently(crls);
        matches!(
            check_crls(self.env, &crls, core::slice::from_ref(issuer), cert, instant),
            Ok(outcomes) if !outcomes.is_empty()
        )
    }

    /// Evaluates the single responses covering `cert` as issued by `issuer` from each response,
    /// returning an outcome for each good status from a response whose signer can be relied upon.
    fn check_responses(
        &self,
        trust_index: &mut TrustIndex,
        responses: &[OcspEvidence],
        cert: &LtvCertificate,
        issuer: &LtvCertificate,
        instant: TimeOfInterest,
    ) -> Result<Vec<VerificationOutcome>> {
        let mut outcomes = Vec::new();
        let mut first_err = None;
        for response in responses {
            let matching: Vec<_> = response
                .matching_responses(self.env, cert, issuer)
                .filter(|sr| check_response_time(instant, sr))
                .cloned()
                .collect();
            for sr in matching {
                match &sr.cert_status {
                    CertStatus::Good(_) => {
                        match self.is_valid_response(trust_index, response, cert, issuer, instant) {
                            Ok(()) => outcomes.push(VerificationOutcome::new(
                                cert,
                                VerifierKind::Ocsp,
                                format!(
                                    "good status from OCSP response produced at {}",
                                    response.basic.tbs_response_data.produced_at.0.to_date_time()
                                ),
                            )),
                            Err(e) => {
                                if first_err.is_none() {
                                    first_err = Some(e);
                                }
                            }
                        }
                    }
                    CertStatus::Revoked(ri) => {
                        if instant.is_disabled() || instant >= ri.revocation_time.0 {
                            error!("{} is revoked per OCSP", cert.subject_name());
                            return Err(Error::CertificateRevoked(cert.subject_name()));
                        }
                        debug!(
                            "{} was revoked after {}",
                            cert.subject_name(),
                            instant
                        );
                    }
                    CertStatus::Unknown(_) => {
                        info!("OCSP responder reports unknown status for {}", cert.subject_name());
                    }
                }
            }
        }

        match first_err {
            Some(e) if outcomes.is_empty() => Err(e),
            _ => Ok(outcomes),
        }
    }
}

impl RevocationVerifier for OcspVerifier<'_> {
    fn kind(&self) -> VerifierKind {
        VerifierKind::Ocsp
    }

    fn verify(
        &self,
        trust_index: &mut TrustIndex,
        cert: &LtvCertificate,
        issuer: Option<&LtvCertificate>,
        instant: TimeOfInterest,
    ) -> Result<Vec<VerificationOutcome>> {
        let issuer = match issuer {
            Some(i) => i.clone(),
            None => {
                let mut resolver = ChainResolver::new(self.env, trust_index);
                match resolver.find_issuer(cert) {
                    Some(i) => i,
                    None => {
                        debug!("No issuer found for {}, skipping OCSP", cert.subject_name());
                        return Ok(Vec::new());
                    }
                }
            }
        };

        let outcomes = self.check_responses(trust_index, &self.responses, cert, &issuer, instant)?;
        if !outcomes.is_empty() || !self.online_fetch_allowed {
            return Ok(outcomes);
        }

        match self.env.fetch_ocsp(cert, &issuer) {
            Some(resp) => {
                let fresh = parse_ocsp_responses_leniently(&[resp]);
                self.check_responses(trust_index, &fresh, cert, &issuer, instant)
            }
            None => Ok(outcomes),
        }
    }
}
