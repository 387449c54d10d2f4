//! Object identifiers for algorithms and extensions used when resolving chains and processing
//! revocation evidence that are not available (or not conveniently named) in const-oid's database

use der::asn1::ObjectIdentifier;

// -------------------------------------------------------------------------------------------------
// Public key and curve OIDs
// -------------------------------------------------------------------------------------------------
/// rsaEncryption OBJECT IDENTIFIER ::= { pkcs-1 1 }
pub const PKIXALG_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// id-ecPublicKey OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) ansi-X9-62(10045) keyType(2) 1 }
pub const PKIXALG_EC_PUBLIC_KEY: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// secp256r1 OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) ansi-X9-62(10045) curves(3)
///     prime(1) 7 }
pub const PKIXALG_SECP256R1: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");

/// secp384r1 OBJECT IDENTIFIER ::= {
///     iso(1) identified-organization(3) certicom(132) curve(0) 34 }
pub const PKIXALG_SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");

// -------------------------------------------------------------------------------------------------
// Signature algorithm OIDs
// -------------------------------------------------------------------------------------------------
/// ecdsa-with-SHA224 OBJECT IDENTIFIER ::= {
///     iso(1) member-body(2) us(840) ansi-X9-62(10045) signatures(4)
///     ecdsa-with-SHA2(3) 1 }
pub const PKIXALG_ECDSA_WITH_SHA224: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.1");

/// ecdsa-with-SHA256 OBJECT IDENTIFIER ::= { ... ecdsa-with-SHA2(3) 2 }
pub const PKIXALG_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

/// ecdsa-with-SHA384 OBJECT IDENTIFIER ::= { ... ecdsa-with-SHA2(3) 3 }
pub const PKIXALG_ECDSA_WITH_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.3");

/// ecdsa-with-SHA512 OBJECT IDENTIFIER ::= { ... ecdsa-with-SHA2(3) 4 }
pub const PKIXALG_ECDSA_WITH_SHA512: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.4");

/// sha1WithRSAEncryption  OBJECT IDENTIFIER  ::=  { pkcs-1 5 }
///
/// Still common among OCSP responders and legacy CAs whose evidence is embedded for long-term validation.
pub const PKIXALG_SHA1_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.5");

/// sha224WithRSAEncryption  OBJECT IDENTIFIER  ::=  { pkcs-1 14 }
pub const PKIXALG_SHA224_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.14");

/// sha256WithRSAEncryption  OBJECT IDENTIFIER  ::=  { pkcs-1 11 }
pub const PKIXALG_SHA256_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");

/// sha384WithRSAEncryption  OBJECT IDENTIFIER  ::=  { pkcs-1 12 }
pub const PKIXALG_SHA384_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");

/// sha512WithRSAEncryption  OBJECT IDENTIFIER  ::=  { pkcs-1 13 }
pub const PKIXALG_SHA512_WITH_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");

// -------------------------------------------------------------------------------------------------
// Hash algorithm OIDs
// -------------------------------------------------------------------------------------------------
/// id-sha1 OBJECT IDENTIFIER ::= {
///     iso(1) identified-organization(3) oiw(14) secsig(3) algorithms(2) 26 }
///
/// Used by default when computing OCSP CertID values and signature keys.
pub const PKIXALG_SHA1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.14.3.2.26");

/// id-sha224  OBJECT IDENTIFIER  ::=
///     { joint-iso-itu-t(2) country(16) us(840) organization(1) gov(101)
///     csor(3) algorithms(4) hashalgs(2) 4 }
pub const PKIXALG_SHA224: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.4");

/// id-sha256  OBJECT IDENTIFIER  ::= { ... hashalgs(2) 1 }
pub const PKIXALG_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.1");

/// id-sha384  OBJECT IDENTIFIER  ::= { ... hashalgs(2) 2 }
pub const PKIXALG_SHA384: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.2");

/// id-sha512  OBJECT IDENTIFIER  ::= { ... hashalgs(2) 3 }
pub const PKIXALG_SHA512: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("2.16.840.1.101.3.4.2.3");

// -------------------------------------------------------------------------------------------------
// Extension and key purpose OIDs
// -------------------------------------------------------------------------------------------------
/// id-kp-OCSPSigning OBJECT IDENTIFIER ::= { id-kp 9 }
pub const PKIX_KP_OCSP_SIGNING: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.3.6.1.5.5.7.3.9");

/// id-etsi-ext-valassured-ST-certs OBJECT IDENTIFIER ::= {
///     itu-t(0) identified-organization(4) etsi(0) id-cert-profile(194121) id-etsi-ext(2) 1 }
///
/// Marks a short-term certificate whose validity is assured by the CA for its lifetime (ETSI EN 319 412-1),
/// for which no revocation evidence is meaningful.
pub const ETSI_EXT_VAL_ASSURED_ST_CERTS: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("0.4.0.194121.2.1");
