//! The trust_index module provides the [`TrustIndex`], which combines a store of explicitly trusted
//! certificates with an index of certificates observed while processing signatures and revocation
//! evidence.
//!
//! Both stores are indexed by subject name. Certificates are never removed. A certificate learned from
//! more than one source retains the highest-priority (lowest ordinal) [`CertificateOrigin`].

use alloc::collections::{BTreeMap, BTreeSet};
use alloc::string::String;
use alloc::vec::Vec;

use log::debug;
use serde::{Deserialize, Serialize};
use x509_cert::name::Name;

use crate::{name_to_string, parse_certificates_leniently, LtvCertificate};

/// Provenance of a certificate held by a [`TrustIndex`], ordered by trust preference.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum CertificateOrigin {
    /// Observed in the signature container, i.e., the CMS SignedData certificates field
    SignatureContainer,
    /// Observed in the certs field of an OCSP response
    OcspResponse,
    /// Observed in the context of a CRL, i.e., a CRL issuer's certificate
    Crl,
    /// Fetched via an AIA CA issuers URI
    Aia,
    /// Explicitly configured as trusted
    Trusted,
}

/// Purpose for which a trusted certificate may be relied upon
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub enum TrustUsage {
    /// Trusted for any purpose
    Any,
    /// Trusted as an anchor for signature validation
    SignatureValidation,
    /// Trusted as a locally configured OCSP responder
    OcspResponse,
    /// Trusted as a CRL signer
    CrlSigning,
}

/// Normalizes a name for use as an index key, i.e., string form, lower cased with whitespace runs
/// collapsed.
fn name_key(name: &Name) -> String {
    name_to_string(name)
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

fn add_to_name_map(map: &mut BTreeMap<String, Vec<LtvCertificate>>, cert: &LtvCertificate) -> bool {
    let entry = map.entry(name_key(cert.subject())).or_default();
    if entry.contains(cert) {
        false
    } else {
        entry.push(cert.clone());
        true
    }
}

/// [`TrustIndex`] is the explicit context object shared by chain resolution, evidence collection and
/// revocation verification within a session.
#[derive(Clone, Debug, Default)]
pub struct TrustIndex {
    /// Trusted certificates indexed by normalized subject name
    trusted: BTreeMap<String, Vec<LtvCertificate>>,
    /// Usages for which each trusted certificate (by encoding) is trusted
    trusted_usages: BTreeMap<Vec<u8>, BTreeSet<TrustUsage>>,
    /// Known certificates indexed by normalized subject name
    known: BTreeMap<String, Vec<LtvCertificate>>,
    /// Origin of each certificate (by encoding)
    origins: BTreeMap<Vec<u8>, CertificateOrigin>,
}

impl TrustIndex {
    /// Creates a new empty [`TrustIndex`]
    pub fn new() -> Self {
        Self::default()
    }

    fn record_origin(&mut self, cert: &LtvCertificate, origin: CertificateOrigin) {
        self.origins
            .entry(cert.encoded_cert.clone())
            .and_modify(|o| {
                if origin < *o {
                    *o = origin;
                }
            })
            .or_insert(origin);
    }

    /// Adds certificates that are trusted for any purpose
    pub fn add_trusted(&mut self, certs: &[LtvCertificate]) {
        self.add_trusted_for_usage(certs, TrustUsage::Any);
    }

    /// Adds certificates that are trusted for the given purpose
    pub fn add_trusted_for_usage(&mut self, certs: &[LtvCertificate], usage: TrustUsage) {
        for cert in certs {
            add_to_name_map(&mut self.trusted, cert);
            self.trusted_usages
                .entry(cert.encoded_cert.clone())
                .or_default()
                .insert(usage);
            self.record_origin(cert, CertificateOrigin::Trusted);
        }
    }

    /// Adds certificates observed during processing, tagged with where they were observed. Re-adding
    /// a certificate may upgrade its origin but never removes it.
    pub fn add_known(&mut self, certs: &[LtvCertificate], origin: CertificateOrigin) {
        for cert in certs {
            if add_to_name_map(&mut self.known, cert) {
                debug!(
                    "Learned certificate for {} from {:?}",
                    cert.subject_name(),
                    origin
                );
            }
            self.record_origin(cert, origin);
        }
    }

    /// Parses and adds certificates observed during processing, returning the number of buffers that
    /// could be parsed. Buffers that cannot be parsed are logged and skipped.
    pub fn add_known_from_der<T: AsRef<[u8]>>(
        &mut self,
        buffers: &[T],
        origin: CertificateOrigin,
    ) -> usize {
        let certs = parse_certificates_leniently(buffers);
        self.add_known(&certs, origin);
        certs.len()
    }

    /// Returns true if the certificate is present in the trusted store
    pub fn is_trusted(&self, cert: &LtvCertificate) -> bool {
        self.trusted_usages.contains_key(&cert.encoded_cert)
    }

    /// Returns true if the certificate is trusted for the given usage or for any usage
    pub fn is_trusted_for(&self, cert: &LtvCertificate, usage: TrustUsage) -> bool {
        match self.trusted_usages.get(&cert.encoded_cert) {
            Some(usages) => usages.contains(&TrustUsage::Any) || usages.contains(&usage),
            None => false,
        }
    }

    /// Returns the trusted and known certificates whose subject name matches the presented name, i.e.,
    /// candidate issuers for certificates issued under that name.
    pub fn lookup_by_issuer_name(&self, name: &Name) -> BTreeSet<LtvCertificate> {
        let key = name_key(name);
        let mut retval = BTreeSet::new();
        for map in [&self.trusted, &self.known] {
            if let Some(certs) = map.get(&key) {
                retval.extend(certs.iter().cloned());
            }
        }
        retval
    }

    /// Returns the recorded origin of a certificate, if the index holds it.
    pub fn origin_of(&self, cert: &LtvCertificate) -> Option<CertificateOrigin> {
        self.origins.get(&cert.encoded_cert).copied()
    }

    /// Returns all trusted certificates
    pub fn trusted_certificates(&self) -> Vec<&LtvCertificate> {
        self.trusted.values().flatten().collect()
    }

    /// Returns trusted certificates that may be used for the given purpose
    pub fn trusted_for_usage(&self, usage: TrustUsage) -> Vec<&LtvCertificate> {
        self.trusted_certificates()
            .into_iter()
            .filter(|c| self.is_trusted_for(c, usage))
            .collect()
    }

    /// Returns the number of distinct certificates held by the index
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    /// Returns true if the index holds no certificates
    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }
}

#[test]
fn name_key_test() {
    use core::str::FromStr;
    let n1 = Name::from_str("CN=Test  Root,O=Example").unwrap();
    let n2 = Name::from_str("CN=test root,O=EXAMPLE").unwrap();
    assert_eq!(name_key(&n1), name_key(&n2));
    assert!(TrustIndex::new().lookup_by_issuer_name(&n1).is_empty());
}

#[test]
fn origin_order_test() {
    assert!(CertificateOrigin::SignatureContainer < CertificateOrigin::OcspResponse);
    assert!(CertificateOrigin::OcspResponse < CertificateOrigin::Crl);
    assert!(CertificateOrigin::Crl < CertificateOrigin::Aia);
    assert!(CertificateOrigin::Aia < CertificateOrigin::Trusted);
}
