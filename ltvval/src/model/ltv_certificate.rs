//! Wrapper around a DER-encoded certificate and its decoded form along with the parsed extensions used
//! when resolving chains and gathering revocation evidence

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::fmt;

use der::{asn1::ObjectIdentifier, Decode, Encode};
use log::{error, warn};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::ext::pkix::name::{DistributionPointName, GeneralName};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

use const_oid::db::rfc5912::{
    ID_AD_CA_ISSUERS, ID_AD_OCSP, ID_CE_BASIC_CONSTRAINTS, ID_CE_CRL_DISTRIBUTION_POINTS,
    ID_CE_EXT_KEY_USAGE, ID_PE_AUTHORITY_INFO_ACCESS,
};
use const_oid::db::rfc6960::ID_PKIX_OCSP_NOCHECK;

use crate::model::ltv_extension::*;
use crate::util::error::*;
use crate::{
    compare_names, name_to_string, valid_at_time, DeferDecodeSigned, LtvEnvironment,
    TimeOfInterest, ETSI_EXT_VAL_ASSURED_ST_CERTS, PKIX_KP_OCSP_SIGNING,
};
use x509_cert::ext::pkix::{
    crl::CrlDistributionPoints, AuthorityInfoAccessSyntax, BasicConstraints, ExtendedKeyUsage,
};

/// [`LtvCertificate`] is used to aggregate a binary, DER-encoded Certificate, a parsed Certificate and
/// parsed extensions in support of chain resolution and revocation processing.
///
/// Instances are compared and ordered by their DER encoding, never by identity, so that two copies of a
/// certificate obtained from different sources are treated as the same certificate.
#[derive(Clone)]
pub struct LtvCertificate {
    /// Binary, encoded Certificate object
    pub encoded_cert: Vec<u8>,
    /// Decoded Certificate object
    pub decoded_cert: Certificate,
    /// Extensions parsed when the certificate was prepared (see [`EXTS_OF_INTEREST`])
    pub parsed_extensions: ParsedExtensions,
}

impl PartialEq for LtvCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.encoded_cert == other.encoded_cert
    }
}

impl Eq for LtvCertificate {}

impl PartialOrd for LtvCertificate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for LtvCertificate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.encoded_cert.cmp(&other.encoded_cert)
    }
}

impl fmt::Debug for LtvCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LtvCertificate")
            .field("subject", &self.subject_name())
            .field("issuer", &self.issuer_name())
            .finish()
    }
}

impl TryFrom<&[u8]> for LtvCertificate {
    type Error = Error;

    fn try_from(enc_cert: &[u8]) -> Result<Self> {
        let decoded_cert = Certificate::from_der(enc_cert)?;
        let mut cert = LtvCertificate {
            encoded_cert: enc_cert.to_vec(),
            decoded_cert,
            parsed_extensions: ParsedExtensions::new(),
        };
        cert.parse_extensions(EXTS_OF_INTEREST);
        Ok(cert)
    }
}

impl TryFrom<Certificate> for LtvCertificate {
    type Error = Error;

    fn try_from(decoded_cert: Certificate) -> Result<Self> {
        let encoded_cert = decoded_cert.to_der()?;
        let mut cert = LtvCertificate {
            encoded_cert,
            decoded_cert,
            parsed_extensions: ParsedExtensions::new(),
        };
        cert.parse_extensions(EXTS_OF_INTEREST);
        Ok(cert)
    }
}

impl ExtensionProcessing for LtvCertificate {
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ LtvExtension>> {
        Ok(self.parsed_extensions.get(oid))
    }

    fn parse_extensions(&'_ mut self, oids: &[ObjectIdentifier]) {
        for oid in oids {
            let r = self.parse_extension(oid).err();
            if let Some(e) = r {
                warn!(
                    "Failed to parse {} extension from certificate issued to {}: {}",
                    oid,
                    self.subject_name(),
                    e
                );
            }
        }
    }

    fn parse_extension(&mut self, oid: &ObjectIdentifier) -> Result<Option<&LtvExtension>> {
        macro_rules! add_and_return {
            ($pe:ident, $v:ident, $t:ident) => {
                match $t::from_der($v) {
                    Ok(r) => {
                        $pe.insert(*oid, LtvExtension::$t(r));
                        return Ok($pe.get(oid));
                    }
                    Err(e) => {
                        return Err(Error::Asn1Error(e));
                    }
                }
            };
        }

        let pe = &mut self.parsed_extensions;
        if pe.contains_key(oid) {
            return Ok(pe.get(oid));
        }

        if let Some(exts) = self.decoded_cert.tbs_certificate.extensions.as_ref() {
            if let Some(i) = exts.iter().find(|&ext| ext.extn_id == *oid) {
                let v = i.extn_value.as_bytes();
                match *oid {
                    ID_CE_BASIC_CONSTRAINTS => {
                        add_and_return!(pe, v, BasicConstraints);
                    }
                    ID_CE_EXT_KEY_USAGE => {
                        add_and_return!(pe, v, ExtendedKeyUsage);
                    }
                    ID_PE_AUTHORITY_INFO_ACCESS => {
                        add_and_return!(pe, v, AuthorityInfoAccessSyntax);
                    }
                    ID_CE_CRL_DISTRIBUTION_POINTS => {
                        add_and_return!(pe, v, CrlDistributionPoints);
                    }
                    ID_PKIX_OCSP_NOCHECK => {
                        pe.insert(*oid, LtvExtension::OcspNoCheck);
                        return Ok(pe.get(oid));
                    }
                    ETSI_EXT_VAL_ASSURED_ST_CERTS => {
                        pe.insert(*oid, LtvExtension::ValAssuredShortTermCerts);
                        return Ok(pe.get(oid));
                    }
                    _ => {
                        // ignore unrecognized
                    }
                }
            }
        }
        Ok(None)
    }
}

impl LtvCertificate {
    /// Parses a binary DER-encoded certificate, logging failures.
    pub fn from_der(enc_cert: &[u8]) -> Result<Self> {
        match LtvCertificate::try_from(enc_cert) {
            Ok(c) => Ok(c),
            Err(e) => {
                error!("Failed to parse certificate: {}", e);
                Err(e)
            }
        }
    }

    /// Returns the subject name of the certificate
    pub fn subject(&self) -> &Name {
        &self.decoded_cert.tbs_certificate.subject
    }

    /// Returns the issuer name of the certificate
    pub fn issuer(&self) -> &Name {
        &self.decoded_cert.tbs_certificate.issuer
    }

    /// Returns the serial number of the certificate
    pub fn serial_number(&self) -> &SerialNumber {
        &self.decoded_cert.tbs_certificate.serial_number
    }

    /// Returns the subject public key info of the certificate
    pub fn spki(&self) -> &SubjectPublicKeyInfoOwned {
        &self.decoded_cert.tbs_certificate.subject_public_key_info
    }

    /// Returns the subject name as a string for use in log output and error values
    pub fn subject_name(&self) -> String {
        name_to_string(self.subject())
    }

    /// Returns the issuer name as a string for use in log output
    pub fn issuer_name(&self) -> String {
        name_to_string(self.issuer())
    }

    /// Returns true if the issuer and subject names match. Chain resolution treats such certificates
    /// as roots without checking the signature.
    pub fn is_self_signed(&self) -> bool {
        compare_names(self.issuer(), self.subject())
    }

    /// Returns an error if the certificate is not valid at the time of interest
    pub fn valid_at(&self, toi: TimeOfInterest) -> Result<u64> {
        valid_at_time(&self.decoded_cert.tbs_certificate, toi, true)
    }

    /// Returns true if the signature on the certificate verifies using the presented public key.
    pub fn verified_by(&self, env: &LtvEnvironment, spki: &SubjectPublicKeyInfoOwned) -> bool {
        let defer_cert = match DeferDecodeSigned::from_der(&self.encoded_cert) {
            Ok(dc) => dc,
            Err(_e) => return false,
        };
        env.verify_signature_message(
            &defer_cert.tbs_field,
            defer_cert.signature.raw_bytes(),
            &defer_cert.signature_algorithm,
            spki,
        )
        .is_ok()
    }

    /// Returns true if the issuer name of this certificate matches the subject name of `issuer` and the
    /// signature verifies using the public key from `issuer`.
    pub fn is_issued_by(&self, env: &LtvEnvironment, issuer: &LtvCertificate) -> bool {
        compare_names(self.issuer(), issuer.subject()) && self.verified_by(env, issuer.spki())
    }

    fn aia_uris(&self, access_method: ObjectIdentifier) -> Vec<String> {
        let mut retval: Vec<String> = Vec::new();
        if let Ok(Some(LtvExtension::AuthorityInfoAccessSyntax(aia))) =
            self.get_extension(&ID_PE_AUTHORITY_INFO_ACCESS)
        {
            for ad in &aia.0 {
                if ad.access_method == access_method {
                    if let GeneralName::UniformResourceIdentifier(uri) = &ad.access_location {
                        let s = uri.to_string();
                        if !retval.contains(&s) {
                            retval.push(s);
                        }
                    }
                }
            }
        }
        retval
    }

    /// Returns the unique CA issuers URIs from the AIA extension, if any
    pub fn ca_issuers_uris(&self) -> Vec<String> {
        self.aia_uris(ID_AD_CA_ISSUERS)
    }

    /// Returns the unique OCSP URIs from the AIA extension, if any
    pub fn ocsp_uris(&self) -> Vec<String> {
        self.aia_uris(ID_AD_OCSP)
    }

    /// Returns the unique URIs from full names in the CRL distribution points extension, if any
    pub fn crl_distribution_point_uris(&self) -> Vec<String> {
        let mut retval: Vec<String> = Vec::new();
        if let Ok(Some(LtvExtension::CrlDistributionPoints(crl_dps))) =
            self.get_extension(&ID_CE_CRL_DISTRIBUTION_POINTS)
        {
            for dp in &crl_dps.0 {
                if let Some(DistributionPointName::FullName(gns)) = &dp.distribution_point {
                    for gn in gns {
                        if let GeneralName::UniformResourceIdentifier(uri) = gn {
                            let s = uri.to_string();
                            if !retval.contains(&s) {
                                retval.push(s);
                            }
                        }
                    }
                }
            }
        }
        retval
    }

    /// Returns the key purposes from the extended key usage extension, if any
    pub fn extended_key_usages(&self) -> Vec<ObjectIdentifier> {
        match self.get_extension(&ID_CE_EXT_KEY_USAGE) {
            Ok(Some(LtvExtension::ExtendedKeyUsage(eku))) => eku.0.clone(),
            _ => Vec::new(),
        }
    }

    /// Returns true if the certificate asserts id-kp-OCSPSigning
    pub fn has_ocsp_signing_eku(&self) -> bool {
        self.extended_key_usages().contains(&PKIX_KP_OCSP_SIGNING)
    }

    /// Returns true if the certificate carries a basic constraints extension that does not assert cA,
    /// i.e., it cannot issue certificates. Certificates without the extension are not excluded.
    pub fn is_end_entity(&self) -> bool {
        matches!(
            self.get_extension(&ID_CE_BASIC_CONSTRAINTS),
            Ok(Some(LtvExtension::BasicConstraints(bc))) if !bc.ca
        )
    }

    /// Returns true if the certificate carries the id-pkix-ocsp-nocheck extension
    pub fn has_ocsp_no_check(&self) -> bool {
        matches!(
            self.get_extension(&ID_PKIX_OCSP_NOCHECK),
            Ok(Some(LtvExtension::OcspNoCheck))
        )
    }

    /// Returns true if the certificate carries the ETSI extension asserting that validity is assured for
    /// a short-term certificate, in which case revocation evidence is not meaningful.
    pub fn is_short_term_validity_assured(&self) -> bool {
        matches!(
            self.get_extension(&ETSI_EXT_VAL_ASSURED_ST_CERTS),
            Ok(Some(LtvExtension::ValAssuredShortTermCerts))
        )
    }
}

/// `parse_certificates_leniently` parses each buffer, discarding (and logging) those that cannot be
/// parsed.
pub fn parse_certificates_leniently<T: AsRef<[u8]>>(buffers: &[T]) -> Vec<LtvCertificate> {
    buffers
        .iter()
        .filter_map(|b| match LtvCertificate::try_from(b.as_ref()) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Discarding certificate that could not be parsed: {}", e);
                None
            }
        })
        .collect()
}
