//! The evidence_collector module provides [`LtvCollector`], which gathers OCSP responses and CRLs for the
//! certificates associated with one or more signatures and merges the results into a [`Dss`].
//!
//! Collection is recursive. With [`CertificateOption::AllCertificates`], the certificates that produced
//! evidence (OCSP responders and CRL issuers) are processed in turn, along with their chains. A single set
//! of processed certificates is shared across the whole collection so that each certificate is processed
//! at most once even when chains loop back on themselves.

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use log::{debug, error, info, warn};

use crate::environment::ltv_environment_traits::{CrlClient, OcspClient};
use crate::util::error::*;
use crate::{
    compare_names, get_certificate_option, get_retrieve_from_aia, get_revocation_level,
    get_revocation_necessity, parse_certificates_leniently, parse_crls_leniently, signature_key,
    CertificateOption, CertificateOrigin, ChainResolver, Dss, LtvCertificate, LtvEnvironment,
    LtvSettings, OcspEvidence, RevocationLevel, RevocationNecessity, TrustIndex, ValidationBundle,
};

/// Policy applied throughout one collection
#[derive(Copy, Clone, Debug)]
struct CollectionPolicy {
    cert_option: CertificateOption,
    level: RevocationLevel,
    necessity: RevocationNecessity,
}

/// A signature registered with a collector
#[derive(Clone, Debug)]
struct SignatureEntry {
    /// Key derived from the literal signature contents
    key: String,
    /// Certificates supplied with the signature, signing certificate first
    chain: Vec<LtvCertificate>,
}

/// [`LtvCollector`] collects revocation evidence per signature and merges it into a document security
/// store exactly once.
pub struct LtvCollector<'a> {
    env: &'a LtvEnvironment,
    trust_index: &'a mut TrustIndex,
    retrieve_from_aia: bool,
    signatures: BTreeMap<String, SignatureEntry>,
    bundles: BTreeMap<String, ValidationBundle>,
    closed: bool,
}

impl<'a> LtvCollector<'a> {
    /// Creates a new [`LtvCollector`] that learns certificates into `trust_index`
    pub fn new(env: &'a LtvEnvironment, trust_index: &'a mut TrustIndex) -> Self {
        LtvCollector {
            env,
            trust_index,
            retrieve_from_aia: true,
            signatures: BTreeMap::new(),
            bundles: BTreeMap::new(),
            closed: false,
        }
    }

    /// Enables or disables retrieval of certificates from AIA CA issuers URIs during collection
    pub fn set_retrieve_from_aia(&mut self, retrieve_from_aia: bool) {
        self.retrieve_from_aia = retrieve_from_aia;
    }

    /// Returns true once evidence has been merged, after which the collector accepts no further work
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Returns the trust index used by this collector
    pub fn trust_index(&self) -> &TrustIndex {
        self.trust_index
    }

    /// `add_signature` registers a signature by name along with its literal contents and the DER-encoded
    /// certificates supplied with it, signing certificate first. The certificates are added to the trust
    /// index as observed in the signature container.
    ///
    /// Certificates other than the signing certificate that cannot be parsed are discarded. An
    /// unparseable signing certificate is an error.
    pub fn add_signature<T: AsRef<[u8]>>(
        &mut self,
        name: &str,
        contents: &[u8],
        chain: &[T],
    ) -> Result<()> {
        if self.closed {
            return Err(Error::CollectorClosed);
        }

        let signing_cert = match chain.first() {
            Some(enc) => LtvCertificate::from_der(enc.as_ref())?,
            None => {
                error!("No signing certificate was supplied for {}", name);
                return Err(Error::NotFound);
            }
        };

        let mut certs = alloc::vec![signing_cert];
        for c in parse_certificates_leniently(&chain[1..]) {
            if !certs.contains(&c) {
                certs.push(c);
            }
        }
        self.trust_index
            .add_known(&certs, CertificateOrigin::SignatureContainer);

        self.signatures.insert(
            name.to_string(),
            SignatureEntry {
                key: signature_key(contents),
                chain: certs,
            },
        );
        Ok(())
    }

    /// `add_verification` collects evidence for the named signature, replacing any evidence previously
    /// collected for a signature with the same contents.
    pub fn add_verification(
        &mut self,
        signature_name: &str,
        ocsp_client: &dyn OcspClient,
        crl_client: &dyn CrlClient,
        cert_option: CertificateOption,
        level: RevocationLevel,
        necessity: RevocationNecessity,
    ) -> Result<()> {
        if self.closed {
            return Err(Error::CollectorClosed);
        }

        let entry = match self.signatures.get(signature_name) {
            Some(entry) => entry.clone(),
            None => {
                error!("No signature named {} has been added", signature_name);
                return Err(Error::NotFound);
            }
        };

        let signing_cert = match entry.chain.first() {
            Some(c) => c.clone(),
            None => return Err(Error::NotFound),
        };

        let bundle = self.collect(
            &entry.chain,
            &signing_cert,
            ocsp_client,
            crl_client,
            cert_option,
            level,
            necessity,
        )?;
        info!(
            "Collected {} OCSP response(s), {} CRL(s) and {} certificate(s) for {}",
            bundle.ocsps.len(),
            bundle.crls.len(),
            bundle.certs.len(),
            signature_name
        );
        self.bundles.insert(entry.key, bundle);
        Ok(())
    }

    /// `add_verification_with_settings` collects evidence for the named signature using the certificate
    /// option, revocation level and revocation necessity from `settings`. The AIA retrieval setting
    /// applies to this call only.
    pub fn add_verification_with_settings(
        &mut self,
        signature_name: &str,
        ocsp_client: &dyn OcspClient,
        crl_client: &dyn CrlClient,
        settings: &LtvSettings,
    ) -> Result<()> {
        let saved = core::mem::replace(
            &mut self.retrieve_from_aia,
            get_retrieve_from_aia(settings),
        );
        let r = self.add_verification(
            signature_name,
            ocsp_client,
            crl_client,
            get_certificate_option(settings),
            get_revocation_level(settings),
            get_revocation_necessity(settings),
        );
        self.retrieve_from_aia = saved;
        r
    }

    /// Returns true if certificates are retrieved from AIA CA issuers URIs during collection
    pub fn retrieve_from_aia(&self) -> bool {
        self.retrieve_from_aia
    }

    /// Returns the evidence collected for the named signature, if any
    pub fn bundle(&self, signature_name: &str) -> Option<&ValidationBundle> {
        let entry = self.signatures.get(signature_name)?;
        self.bundles.get(&entry.key)
    }

    /// Returns the evidence collected so far, keyed by signature key
    pub fn bundles(&self) -> &BTreeMap<String, ValidationBundle> {
        &self.bundles
    }

    /// `merge` stores the collected evidence in `dss`. The collector is closed afterwards and a second
    /// call fails with [`Error::AlreadyMerged`].
    pub fn merge(&mut self, dss: &mut Dss) -> Result<()> {
        if self.closed {
            return Err(Error::AlreadyMerged);
        }
        for (key, bundle) in &self.bundles {
            dss.store(key, bundle);
        }
        self.closed = true;
        Ok(())
    }

    /// `collect` returns the evidence for `chain` (signing certificate first) per the presented policy.
    #[allow(clippy::too_many_arguments)]
    pub fn collect(
        &mut self,
        chain: &[LtvCertificate],
        signing_cert: &LtvCertificate,
        ocsp_client: &dyn OcspClient,
        crl_client: &dyn CrlClient,
        cert_option: CertificateOption,
        level: RevocationLevel,
        necessity: RevocationNecessity,
    ) -> Result<ValidationBundle> {
        let policy = CollectionPolicy {
            cert_option,
            level,
            necessity,
        };
        let mut processed: BTreeSet<Vec<u8>> = BTreeSet::new();
        let mut bundle = ValidationBundle::new();
        self.collect_recursive(
            chain,
            signing_cert,
            ocsp_client,
            crl_client,
            policy,
            &mut processed,
            &mut bundle,
        )?;
        Ok(bundle)
    }

    fn resolver(&mut self) -> ChainResolver<'_> {
        let mut resolver = ChainResolver::new(self.env, self.trust_index);
        resolver.set_retrieve_from_aia(self.retrieve_from_aia);
        resolver
    }

    /// Returns the issuer of the certificate at `index` in `chain`, i.e., the next certificate in the chain
    /// when its subject matches, else a certificate from the trust index that verifies the certificate.
    fn issuer_of(&mut self, chain: &[LtvCertificate], index: usize) -> Option<LtvCertificate> {
        let cert = &chain[index];
        if cert.is_self_signed() {
            return None;
        }
        if let Some(next) = chain.get(index + 1) {
            if compare_names(cert.issuer(), next.subject()) {
                return Some(next.clone());
            }
        }
        self.resolver().find_issuer(cert)
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_recursive(
        &mut self,
        chain: &[LtvCertificate],
        signing_cert: &LtvCertificate,
        ocsp_client: &dyn OcspClient,
        crl_client: &dyn CrlClient,
        policy: CollectionPolicy,
        processed: &mut BTreeSet<Vec<u8>>,
        bundle: &mut ValidationBundle,
    ) -> Result<()> {
        let chain = if policy.cert_option == CertificateOption::AllCertificates {
            self.resolver().complete_partial_chain(chain)
        } else {
            chain.to_vec()
        };

        for index in 0..chain.len() {
            let c = &chain[index];
            if policy.cert_option == CertificateOption::SigningCertificateOnly && c != signing_cert {
                continue;
            }
            if !processed.insert(c.encoded_cert.clone()) {
                continue;
            }

            if c.is_short_term_validity_assured() {
                info!(
                    "Skipping {} as short-term validity is assured",
                    c.subject_name()
                );
                continue;
            }

            bundle.add_cert(&c.encoded_cert);

            let mut added = false;
            let issuer = self.issuer_of(&chain, index);
            if c.is_self_signed() {
                debug!("No revocation evidence collected for self-signed {}", c.subject_name());
            } else {
                if policy.level.permits_ocsp() {
                    if let Some(issuer) = &issuer {
                        added = self.collect_ocsp(
                            c,
                            issuer,
                            signing_cert,
                            ocsp_client,
                            crl_client,
                            policy,
                            processed,
                            bundle,
                        )?;
                    } else {
                        debug!("No issuer found for {}, skipping OCSP", c.subject_name());
                    }
                }

                if policy.level.requires_crl(added) {
                    let crl_added = self.collect_crls(
                        c,
                        signing_cert,
                        ocsp_client,
                        crl_client,
                        policy,
                        processed,
                        bundle,
                    )?;
                    added = added || crl_added;
                }
            }

            if policy.necessity == RevocationNecessity::RequiredForSigningCertificate
                && c == signing_cert
                && !added
            {
                error!(
                    "No revocation data could be obtained for signing certificate {}",
                    c.subject_name()
                );
                return Err(Error::NoRevocationDataForSigningCertificate(
                    c.subject_name(),
                ));
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_ocsp(
        &mut self,
        c: &LtvCertificate,
        issuer: &LtvCertificate,
        signing_cert: &LtvCertificate,
        ocsp_client: &dyn OcspClient,
        crl_client: &dyn CrlClient,
        policy: CollectionPolicy,
        processed: &mut BTreeSet<Vec<u8>>,
        bundle: &mut ValidationBundle,
    ) -> Result<bool> {
        let resp = match ocsp_client.fetch(c, issuer) {
            Ok(Some(resp)) => resp,
            Ok(None) => return Ok(false),
            Err(e) => {
                warn!("OCSP fetch failed for {}: {}", c.subject_name(), e);
                return Ok(false);
            }
        };

        let evidence = match OcspEvidence::parse(&resp) {
            Ok(evidence) => evidence,
            Err(e) => {
                warn!(
                    "Discarding OCSP response for {} that could not be parsed: {}",
                    c.subject_name(),
                    e
                );
                return Ok(false);
            }
        };

        if !evidence.reports_good(self.env, c, issuer) {
            info!("OCSP response does not report good status for {}", c.subject_name());
            return Ok(false);
        }

        bundle.add_ocsp(&evidence.encoded_response);
        self.trust_index
            .add_known(&evidence.certs, CertificateOrigin::OcspResponse);

        if policy.cert_option == CertificateOption::AllCertificates && !evidence.certs.is_empty() {
            let responder = evidence
                .certs
                .iter()
                .find(|r| evidence.is_signed_by(self.env, r))
                .cloned();

            let mut embedded: Vec<LtvCertificate> = Vec::new();
            if let Some(responder) = responder {
                if responder.has_ocsp_no_check() {
                    debug!(
                        "Skipping OCSP responder {} due to id-pkix-ocsp-nocheck",
                        responder.subject_name()
                    );
                    processed.insert(responder.encoded_cert.clone());
                    bundle.add_cert(&responder.encoded_cert);
                }
                embedded.push(responder);
            }
            for r in &evidence.certs {
                if !embedded.contains(r) {
                    embedded.push(r.clone());
                }
            }

            self.collect_recursive(
                &embedded,
                signing_cert,
                ocsp_client,
                crl_client,
                policy,
                processed,
                bundle,
            )?;
        }
        Ok(true)
    }

    #[allow(clippy::too_many_arguments)]
    fn collect_crls(
        &mut self,
        c: &LtvCertificate,
        signing_cert: &LtvCertificate,
        ocsp_client: &dyn OcspClient,
        crl_client: &dyn CrlClient,
        policy: CollectionPolicy,
        processed: &mut BTreeSet<Vec<u8>>,
        bundle: &mut ValidationBundle,
    ) -> Result<bool> {
        let buffers = match crl_client.fetch(c) {
            Ok(buffers) => buffers,
            Err(e) => {
                warn!("CRL fetch failed for {}: {}", c.subject_name(), e);
                return Ok(false);
            }
        };

        let crls = parse_crls_leniently(&buffers);
        if crls.is_empty() {
            return Ok(false);
        }

        for crl in &crls {
            bundle.add_crl(&crl.encoded_crl);
        }

        if policy.cert_option == CertificateOption::AllCertificates {
            for crl in &crls {
                let signer = self
                    .trust_index
                    .lookup_by_issuer_name(crl.issuer())
                    .into_iter()
                    .find(|s| crl.verified_by(self.env, s.spki()));
                match signer {
                    Some(signer) => {
                        self.trust_index
                            .add_known(core::slice::from_ref(&signer), CertificateOrigin::Crl);
                        let signer_chain = self
                            .resolver()
                            .complete_partial_chain(core::slice::from_ref(&signer));
                        self.collect_recursive(
                            &signer_chain,
                            signing_cert,
                            ocsp_client,
                            crl_client,
                            policy,
                            processed,
                            bundle,
                        )?;
                    }
                    None => {
                        debug!("No certificate found for CRL issuer of {}", c.subject_name());
                    }
                }
            }
        }
        Ok(true)
    }
}
