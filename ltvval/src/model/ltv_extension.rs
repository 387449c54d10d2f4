//! Wrappers around the certificate extensions consulted when resolving chains and gathering
//! revocation evidence

use alloc::collections::BTreeMap;

use der::asn1::ObjectIdentifier;
use x509_cert::ext::pkix::{
    crl::CrlDistributionPoints, AuthorityInfoAccessSyntax, BasicConstraints, ExtendedKeyUsage,
};

use const_oid::db::rfc5912::{
    ID_CE_BASIC_CONSTRAINTS, ID_CE_CRL_DISTRIBUTION_POINTS, ID_CE_EXT_KEY_USAGE,
    ID_PE_AUTHORITY_INFO_ACCESS,
};
use const_oid::db::rfc6960::ID_PKIX_OCSP_NOCHECK;

use crate::util::error::*;
use crate::ETSI_EXT_VAL_ASSURED_ST_CERTS;

/// `EXTS_OF_INTEREST` lists the extensions parsed when an [`LtvCertificate`](crate::LtvCertificate) is
/// prepared.
pub const EXTS_OF_INTEREST: &[ObjectIdentifier] = &[
    ID_CE_BASIC_CONSTRAINTS,
    ID_CE_EXT_KEY_USAGE,
    ID_PE_AUTHORITY_INFO_ACCESS,
    ID_CE_CRL_DISTRIBUTION_POINTS,
    ID_PKIX_OCSP_NOCHECK,
    ETSI_EXT_VAL_ASSURED_ST_CERTS,
];

/// The [`ExtensionProcessing`] trait provides a common means of extracting extensions from objects that
/// feature extensions and that retain copies of the decoded extension structures.
///
/// Extensions are parsed once, typically when an object is prepared, and cached for subsequent
/// access via `get_extension`.
pub trait ExtensionProcessing {
    /// `get_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// a previously parsed LtvExtension instance containing the decoded extension if the extension was present.
    fn get_extension(&self, oid: &ObjectIdentifier) -> Result<Option<&'_ LtvExtension>>;

    /// `parse_extension` takes an ObjectIdentifier that identifies an extension type and returns
    /// an `LtvExtension` containing the decoded extension if the extension was present.
    fn parse_extension(&'_ mut self, oid: &ObjectIdentifier) -> Result<Option<&'_ LtvExtension>>;

    /// `parse_extensions` parses each extension type identified in `oids`, ignoring failures.
    fn parse_extensions(&'_ mut self, oids: &[ObjectIdentifier]);
}

/// [`ParsedExtensions`] is a typedef of a BTreeMap map that associates [`LtvExtension`] objects with object
/// identifier values.
pub type ParsedExtensions = BTreeMap<ObjectIdentifier, LtvExtension>;

/// [`LtvExtension`] provides a wrapper for supported extension types.
#[derive(PartialEq, Clone, Eq, Debug)]
pub enum LtvExtension {
    /// Parsed BasicConstraints extension
    BasicConstraints(BasicConstraints),
    /// Parsed ExtendedKeyUsage extension
    ExtendedKeyUsage(ExtendedKeyUsage),
    /// Parsed AuthorityInfoAccessSyntax extension
    AuthorityInfoAccessSyntax(AuthorityInfoAccessSyntax),
    /// Parsed CRLDistributionPoints extension
    CrlDistributionPoints(CrlDistributionPoints),
    /// Presence of the id-pkix-ocsp-nocheck extension (the value is always NULL)
    OcspNoCheck,
    /// Presence of the ETSI id-etsi-ext-valassured-ST-certs extension (the value is always NULL)
    ValAssuredShortTermCerts,
}
