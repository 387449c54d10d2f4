//! Synthesizes certificates, CRLs and OCSP responses for tests.
//!
//! Signatures are not real. Each entity has a key, which is used verbatim as the subject public key bits,
//! and objects are "signed" by setting the signature bits to the signer's key. The environment returned
//! by `test_env` verifies signatures by comparing the signature bits to the public key bits, while hashing
//! (used for OCSP CertID matching) is real.
#![allow(dead_code)]

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::str::FromStr;
use std::time::Duration;

use const_oid::db::rfc5912::{
    ID_AD_CA_ISSUERS, ID_AD_OCSP, ID_CE_BASIC_CONSTRAINTS, ID_CE_CRL_DISTRIBUTION_POINTS,
    ID_CE_EXT_KEY_USAGE, ID_PE_AUTHORITY_INFO_ACCESS,
};
use const_oid::db::rfc6960::ID_PKIX_OCSP_NOCHECK;
use der::asn1::{BitString, GeneralizedTime, Ia5String, Null, OctetString};
use der::Encode;
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::crl::{CertificateList, RevokedCert, TbsCertList};
use x509_cert::ext::pkix::crl::dp::DistributionPoint;
use x509_cert::ext::pkix::crl::CrlDistributionPoints;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::ext::pkix::{
    AccessDescription, AuthorityInfoAccessSyntax, BasicConstraints, ExtendedKeyUsage,
};
use x509_cert::ext::Extension;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::{Time, Validity};
use x509_cert::{Certificate, TbsCertificate, Version};
use x509_ocsp::{
    BasicOcspResponse, CertId, CertStatus, OcspGeneralizedTime, ResponderId, ResponseData,
    RevokedInfo, SingleResponse,
};

use ltvval::*;

/// Time of interest used throughout the tests (Nov 2023)
pub const NOW: u64 = 1_700_000_000;
const DAY: u64 = 86_400;

pub fn now() -> TimeOfInterest {
    TimeOfInterest::from_unix_secs(NOW).unwrap()
}

fn gen_time(secs: u64) -> GeneralizedTime {
    GeneralizedTime::from_unix_duration(Duration::from_secs(secs)).unwrap()
}

fn time(secs: u64) -> Time {
    Time::GeneralTime(gen_time(secs))
}

fn sig_alg() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: PKIXALG_SHA256_WITH_RSA_ENCRYPTION,
        parameters: None,
    }
}

/// Signature verification that accepts a signature equal to the public key bits
fn fake_verify(
    _env: &LtvEnvironment,
    _message: &[u8],
    signature: &[u8],
    _alg: &AlgorithmIdentifierOwned,
    spki: &SubjectPublicKeyInfoOwned,
) -> Result<()> {
    if signature == spki.subject_public_key.raw_bytes() {
        Ok(())
    } else {
        Err(Error::SignatureVerificationFailure)
    }
}

/// Returns an environment with real hashing and fake signature verification
pub fn test_env() -> LtvEnvironment {
    let mut env = LtvEnvironment::new();
    env.add_calculate_hash_callback(calculate_hash_rust_crypto);
    env.add_verify_signature_message_callback(fake_verify);
    env
}

fn ext(oid: der::asn1::ObjectIdentifier, value: Vec<u8>) -> Extension {
    Extension {
        extn_id: oid,
        critical: false,
        extn_value: OctetString::new(value).unwrap(),
    }
}

pub fn ca_ext() -> Extension {
    let bc = BasicConstraints {
        ca: true,
        path_len_constraint: None,
    };
    ext(ID_CE_BASIC_CONSTRAINTS, bc.to_der().unwrap())
}

/// Basic constraints that explicitly deny the cA flag
pub fn end_entity_ext() -> Extension {
    let bc = BasicConstraints {
        ca: false,
        path_len_constraint: None,
    };
    ext(ID_CE_BASIC_CONSTRAINTS, bc.to_der().unwrap())
}

/// AIA extension with one access description per URI, all using the same access method
fn aia_ext(method: der::asn1::ObjectIdentifier, uris: &[&str]) -> Extension {
    let aia = AuthorityInfoAccessSyntax(
        uris.iter()
            .map(|uri| AccessDescription {
                access_method: method,
                access_location: GeneralName::UniformResourceIdentifier(
                    Ia5String::new(uri).unwrap(),
                ),
            })
            .collect(),
    );
    ext(ID_PE_AUTHORITY_INFO_ACCESS, aia.to_der().unwrap())
}

pub fn ca_issuers_ext(uris: &[&str]) -> Extension {
    aia_ext(ID_AD_CA_ISSUERS, uris)
}

pub fn ocsp_uri_ext(uri: &str) -> Extension {
    aia_ext(ID_AD_OCSP, &[uri])
}

pub fn crl_dp_ext(uri: &str) -> Extension {
    let dps = CrlDistributionPoints(vec![DistributionPoint {
        distribution_point: Some(DistributionPointName::FullName(vec![
            GeneralName::UniformResourceIdentifier(Ia5String::new(uri).unwrap()),
        ])),
        reasons: None,
        crl_issuer: None,
    }]);
    ext(ID_CE_CRL_DISTRIBUTION_POINTS, dps.to_der().unwrap())
}

pub fn ocsp_signing_ext() -> Extension {
    let eku = ExtendedKeyUsage(vec![PKIX_KP_OCSP_SIGNING]);
    ext(ID_CE_EXT_KEY_USAGE, eku.to_der().unwrap())
}

pub fn ocsp_no_check_ext() -> Extension {
    ext(ID_PKIX_OCSP_NOCHECK, Null.to_der().unwrap())
}

pub fn short_term_ext() -> Extension {
    ext(ETSI_EXT_VAL_ASSURED_ST_CERTS, Null.to_der().unwrap())
}

/// Returns a certificate for `subject` containing `key`, issued by `issuer` and signed with `issuer_key`
pub fn make_cert(
    subject: &str,
    key: &[u8],
    issuer: &str,
    issuer_key: &[u8],
    serial: u8,
    extensions: Vec<Extension>,
) -> LtvCertificate {
    make_cert_with_validity(
        subject,
        key,
        issuer,
        issuer_key,
        serial,
        extensions,
        NOW - 365 * DAY,
        NOW + 365 * DAY,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn make_cert_with_validity(
    subject: &str,
    key: &[u8],
    issuer: &str,
    issuer_key: &[u8],
    serial: u8,
    extensions: Vec<Extension>,
    not_before: u64,
    not_after: u64,
) -> LtvCertificate {
    let cert = Certificate {
        tbs_certificate: TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&[serial]).unwrap(),
            signature: sig_alg(),
            issuer: Name::from_str(issuer).unwrap(),
            validity: Validity {
                not_before: time(not_before),
                not_after: time(not_after),
            },
            subject: Name::from_str(subject).unwrap(),
            subject_public_key_info: SubjectPublicKeyInfoOwned {
                algorithm: AlgorithmIdentifierOwned {
                    oid: PKIXALG_RSA_ENCRYPTION,
                    parameters: None,
                },
                subject_public_key: BitString::from_bytes(key).unwrap(),
            },
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: if extensions.is_empty() {
                None
            } else {
                Some(extensions)
            },
        },
        signature_algorithm: sig_alg(),
        signature: BitString::from_bytes(issuer_key).unwrap(),
    };
    LtvCertificate::try_from(cert).unwrap()
}

/// Returns a DER-encoded CRL from `issuer` signed with `issuer_key` listing `revoked` serial numbers
pub fn make_crl(issuer: &str, issuer_key: &[u8], revoked: &[u8]) -> Vec<u8> {
    make_crl_with_validity(issuer, issuer_key, revoked, NOW - DAY, NOW + 7 * DAY)
}

pub fn make_crl_with_validity(
    issuer: &str,
    issuer_key: &[u8],
    revoked: &[u8],
    this_update: u64,
    next_update: u64,
) -> Vec<u8> {
    let revoked_certificates: Vec<RevokedCert> = revoked
        .iter()
        .map(|s| RevokedCert {
            serial_number: SerialNumber::new(&[*s]).unwrap(),
            revocation_date: time(NOW - 2 * DAY),
            crl_entry_extensions: None,
        })
        .collect();
    let crl = CertificateList {
        tbs_cert_list: TbsCertList {
            version: Version::V2,
            signature: sig_alg(),
            issuer: Name::from_str(issuer).unwrap(),
            this_update: time(this_update),
            next_update: Some(time(next_update)),
            revoked_certificates: if revoked_certificates.is_empty() {
                None
            } else {
                Some(revoked_certificates)
            },
            crl_extensions: None,
        },
        signature_algorithm: sig_alg(),
        signature: BitString::from_bytes(issuer_key).unwrap(),
    };
    crl.to_der().unwrap()
}

/// Returns a SHA-1 CertID identifying `cert` as issued by `issuer`
pub fn cert_id(cert: &LtvCertificate, issuer: &LtvCertificate) -> CertId {
    CertId {
        hash_algorithm: AlgorithmIdentifierOwned {
            oid: PKIXALG_SHA1,
            parameters: None,
        },
        issuer_name_hash: OctetString::new(get_subject_name_hash(issuer).unwrap()).unwrap(),
        issuer_key_hash: OctetString::new(get_key_hash(issuer)).unwrap(),
        serial_number: cert.serial_number().clone(),
    }
}

pub fn good() -> CertStatus {
    CertStatus::Good(Null)
}

pub fn revoked() -> CertStatus {
    CertStatus::Revoked(RevokedInfo {
        revocation_time: OcspGeneralizedTime(gen_time(NOW - 2 * DAY)),
        revocation_reason: None,
    })
}

/// Returns a DER-encoded BasicOCSPResponse covering `cert` as issued by `issuer`, signed with
/// `signer_key` by the responder named `responder` and carrying `certs`.
pub fn make_ocsp(
    cert: &LtvCertificate,
    issuer: &LtvCertificate,
    status: CertStatus,
    responder: &str,
    signer_key: &[u8],
    certs: &[&LtvCertificate],
) -> Vec<u8> {
    let basic = BasicOcspResponse {
        tbs_response_data: ResponseData {
            version: x509_ocsp::Version::V1,
            responder_id: ResponderId::ByName(Name::from_str(responder).unwrap()),
            produced_at: OcspGeneralizedTime(gen_time(NOW - 3600)),
            responses: vec![SingleResponse {
                cert_id: cert_id(cert, issuer),
                cert_status: status,
                this_update: OcspGeneralizedTime(gen_time(NOW - 3600)),
                next_update: Some(OcspGeneralizedTime(gen_time(NOW + 7 * DAY))),
                single_extensions: None,
            }],
            response_extensions: None,
        },
        signature_algorithm: sig_alg(),
        signature: BitString::from_bytes(signer_key).unwrap(),
        certs: if certs.is_empty() {
            None
        } else {
            Some(certs.iter().map(|c| c.decoded_cert.clone()).collect())
        },
    };
    basic.to_der().unwrap()
}

//-----------------------------------------------------------------------------------------------
// A small PKI: Root -> Intermediate -> Leaf
//-----------------------------------------------------------------------------------------------
pub const ROOT: &str = "CN=Test Root,O=Example";
pub const INTERMEDIATE: &str = "CN=Test Intermediate,O=Example";
pub const LEAF: &str = "CN=Test Leaf,O=Example";
pub const ROOT_KEY: &[u8] = b"root-key";
pub const INTERMEDIATE_KEY: &[u8] = b"intermediate-key";
pub const LEAF_KEY: &[u8] = b"leaf-key";

pub struct Pki {
    pub root: LtvCertificate,
    pub intermediate: LtvCertificate,
    pub leaf: LtvCertificate,
}

pub fn pki() -> Pki {
    Pki {
        root: make_cert(ROOT, ROOT_KEY, ROOT, ROOT_KEY, 1, vec![ca_ext()]),
        intermediate: make_cert(
            INTERMEDIATE,
            INTERMEDIATE_KEY,
            ROOT,
            ROOT_KEY,
            2,
            vec![ca_ext(), crl_dp_ext("http://example.com/root.crl")],
        ),
        leaf: make_cert(
            LEAF,
            LEAF_KEY,
            INTERMEDIATE,
            INTERMEDIATE_KEY,
            3,
            vec![
                ocsp_uri_ext("http://example.com/ocsp"),
                crl_dp_ext("http://example.com/intermediate.crl"),
            ],
        ),
    }
}

impl Pki {
    /// Chain as supplied with a signature, signing certificate first
    pub fn supplied_chain(&self) -> Vec<Vec<u8>> {
        vec![
            self.leaf.encoded_cert.clone(),
            self.intermediate.encoded_cert.clone(),
            self.root.encoded_cert.clone(),
        ]
    }
}

//-----------------------------------------------------------------------------------------------
// Collaborators that count calls
//-----------------------------------------------------------------------------------------------
#[derive(Default)]
pub struct MockOcspClient {
    /// Responses keyed by the encoding of the certificate of interest
    pub responses: BTreeMap<Vec<u8>, Vec<u8>>,
    pub calls: Rc<Cell<usize>>,
}

impl MockOcspClient {
    pub fn with(mut self, cert: &LtvCertificate, resp: Vec<u8>) -> Self {
        self.responses.insert(cert.encoded_cert.clone(), resp);
        self
    }
}

impl OcspClient for MockOcspClient {
    fn fetch(&self, cert: &LtvCertificate, _issuer: &LtvCertificate) -> Result<Option<Vec<u8>>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.responses.get(&cert.encoded_cert).cloned())
    }
}

#[derive(Default)]
pub struct MockCrlClient {
    /// CRLs keyed by the encoding of the certificate of interest
    pub crls: BTreeMap<Vec<u8>, Vec<Vec<u8>>>,
    pub calls: Rc<Cell<usize>>,
}

impl MockCrlClient {
    pub fn with(mut self, cert: &LtvCertificate, crl: Vec<u8>) -> Self {
        self.crls
            .entry(cert.encoded_cert.clone())
            .or_default()
            .push(crl);
        self
    }
}

impl CrlClient for MockCrlClient {
    fn fetch(&self, cert: &LtvCertificate) -> Result<Vec<Vec<u8>>> {
        self.calls.set(self.calls.get() + 1);
        Ok(self.crls.get(&cert.encoded_cert).cloned().unwrap_or_default())
    }
}

#[derive(Default)]
pub struct MockAiaFetcher {
    pub resources: BTreeMap<String, Vec<u8>>,
    pub calls: Rc<Cell<usize>>,
}

impl AiaFetcher for MockAiaFetcher {
    fn fetch_by_url(&self, uri: &str) -> Result<Option<Vec<u8>>> {
        self.calls.set(self.calls.get() + 1);
        if uri.starts_with("ldap") {
            return Err(Error::InvalidUriScheme);
        }
        Ok(self.resources.get(uri).cloned())
    }
}
