//! Utility functions that support chain resolution and revocation evidence processing

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use der::asn1::{BitString, Ia5String, PrintableString, Utf8StringRef};
use der::{Encode, Tagged};
use log::error;
use spki::AlgorithmIdentifierOwned;
use subtle_encoding::hex;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::name::Name;
use x509_cert::TbsCertificate;

use crate::util::error::*;
use crate::TimeOfInterest;

/// `buffer_to_hex` takes a byte array and returns a string featuring upper case ASCII hex characters
/// (without commas, spaces, brackets, etc.).
pub fn buffer_to_hex(buffer: &[u8]) -> String {
    let hex = hex::encode_upper(buffer);
    let r = core::str::from_utf8(hex.as_slice());
    if let Ok(s) = r {
        s.to_string()
    } else {
        "".to_string()
    }
}

/// name_to_string returns a string representation of given Name value.
pub fn name_to_string(name: &Name) -> String {
    name.to_string()
}

/// get_value_from_rdn returns the value from AttributeTypeAndValue as a string for use in comparing
/// values where leading whitespace or case may be a factor
pub fn get_value_from_rdn(atav: &AttributeTypeAndValue) -> Result<String> {
    let val = match atav.value.tag() {
        der::Tag::PrintableString => atav
            .value
            .decode_as()
            .ok()
            .map(|s: PrintableString| s.to_string()),
        der::Tag::Utf8String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Utf8StringRef<'_>| s.to_string()),
        der::Tag::Ia5String => atav
            .value
            .decode_as()
            .ok()
            .map(|s: Ia5String| s.to_string()),
        _ => None,
    };

    match val {
        Some(val) => Ok(val),
        None => {
            let enc = atav.value.to_der()?;
            Ok(format!("{}=#{}", atav.oid, buffer_to_hex(&enc)))
        }
    }
}

/// Collapses runs of whitespace into a single space, trims and lower cases the presented value.
fn normalize_rdn_value(val: &str) -> String {
    val.split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// [`compare_names`] compares two Name values returning true if they match and false otherwise.
///
/// Binary comparison is tried first. Attribute values are then compared after trimming, collapsing
/// internal whitespace and lower casing, roughly per the caseIgnoreMatch rule from RFC 4518.
pub fn compare_names(left: &Name, right: &Name) -> bool {
    // no match if not the same number of RDNs
    if left.0.len() != right.0.len() {
        return false;
    }

    for (lrdn, rrdn) in left.0.iter().zip(right.0.iter()) {
        if lrdn.0.len() != rrdn.0.len() {
            return false;
        }

        if lrdn == rrdn {
            continue;
        }

        for (l, r) in lrdn.0.iter().zip(rrdn.0.iter()) {
            if l.oid != r.oid {
                return false;
            }

            let (l_val, r_val) = match (get_value_from_rdn(l), get_value_from_rdn(r)) {
                (Ok(l), Ok(r)) => (l, r),
                _ => return false,
            };

            if normalize_rdn_value(&l_val) != normalize_rdn_value(&r_val) {
                return false;
            }
        }
    }
    true
}

/// `valid_at_time` evaluates the validity period of the presented TbsCertificate against the
/// presented time of interest, returning the number of seconds the certificate remains valid for or
/// [`Error::InvalidValidityPeriod`].
///
/// A disabled time of interest skips the check and returns zero.
pub fn valid_at_time(target: &TbsCertificate, toi: TimeOfInterest, stifle_log: bool) -> Result<u64> {
    if toi.is_disabled() {
        return Ok(0);
    }

    if toi < target.validity.not_before {
        if !stifle_log {
            error!(
                "{}: certificate is not yet valid, i.e., not_before ({}) is after the time of interest ({})",
                name_to_string(&target.subject),
                target.validity.not_before,
                toi
            );
        }
        return Err(Error::InvalidValidityPeriod);
    }

    if toi > target.validity.not_after {
        if !stifle_log {
            error!(
                "{}: certificate is expired relative to the time of interest: {}",
                name_to_string(&target.subject),
                target.validity.not_after
            );
        }
        return Err(Error::InvalidValidityPeriod);
    }

    let na = target.validity.not_after.to_unix_duration().as_secs();
    Ok(na.saturating_sub(toi.as_unix_secs()))
}

/// [`DeferDecodeSigned`] used to parse only the top-level structure of a signed object, i.e., a Certificate
/// or a CertificateList, without parsing the details of the TBSCertificate or TBSCertList, AlgorithmIdentifier
/// or BIT STRING fields.
///
/// Deferred decoding is useful when verifying signatures to avoid re-encoding the to-be-signed field
/// (and potentially encountering problems with structures that were not DER-encoded prior to signing).
pub struct DeferDecodeSigned {
    /// tbsCertificate or tbsCertList
    pub tbs_field: Vec<u8>,
    /// signatureAlgorithm   AlgorithmIdentifier,
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// signature            BIT STRING
    pub signature: BitString,
}

impl ::der::FixedTag for DeferDecodeSigned {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for DeferDecodeSigned {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_field = reader.tlv_bytes()?;
            let signature_algorithm = reader.decode()?;
            let signature = reader.decode()?;
            Ok(Self {
                tbs_field: tbs_field.to_vec(),
                signature_algorithm,
                signature,
            })
        })
    }
}

#[test]
fn compare_names_test() {
    use core::str::FromStr;
    let n1 = Name::from_str("CN=Test  Root,O=Example").unwrap();
    let n2 = Name::from_str("CN=test root,O=EXAMPLE").unwrap();
    let n3 = Name::from_str("CN=Other Root,O=Example").unwrap();
    assert!(compare_names(&n1, &n1));
    assert!(compare_names(&n1, &n2));
    assert!(!compare_names(&n1, &n3));
}

#[test]
fn buffer_to_hex_test() {
    assert_eq!("00A1FF", buffer_to_hex(&[0x00, 0xa1, 0xff]));
    assert_eq!("", buffer_to_hex(&[]));
}
