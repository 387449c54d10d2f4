//! The validation_bundle module provides [`ValidationBundle`], which accumulates the revocation evidence
//! collected for one signature.

use alloc::string::String;
use alloc::vec::Vec;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::buffer_to_hex;

/// `signature_key` returns the key under which evidence for a signature is stored, i.e., the upper case
/// hex SHA-1 hash of the literal signature contents. Byte-identical signatures share a key.
pub fn signature_key(contents: &[u8]) -> String {
    buffer_to_hex(&Sha1::digest(contents))
}

/// [`ValidationBundle`] holds byte-deduplicated lists of DER-encoded CRLs, OCSP responses and
/// certificates in the order they were added.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct ValidationBundle {
    /// DER-encoded CertificateList objects
    pub crls: Vec<Vec<u8>>,
    /// DER-encoded OCSPResponse objects
    pub ocsps: Vec<Vec<u8>>,
    /// DER-encoded Certificate objects
    pub certs: Vec<Vec<u8>>,
}

fn add_unique(list: &mut Vec<Vec<u8>>, item: &[u8]) -> bool {
    if list.iter().any(|i| i.as_slice() == item) {
        false
    } else {
        list.push(item.to_vec());
        true
    }
}

impl ValidationBundle {
    /// Creates a new empty [`ValidationBundle`]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a CRL unless an identical one is present, returning true if it was added
    pub fn add_crl(&mut self, crl: &[u8]) -> bool {
        add_unique(&mut self.crls, crl)
    }

    /// Adds an OCSP response unless an identical one is present, returning true if it was added
    pub fn add_ocsp(&mut self, ocsp: &[u8]) -> bool {
        add_unique(&mut self.ocsps, ocsp)
    }

    /// Adds a certificate unless an identical one is present, returning true if it was added
    pub fn add_cert(&mut self, cert: &[u8]) -> bool {
        add_unique(&mut self.certs, cert)
    }

    /// Returns the total number of objects in the bundle
    pub fn len(&self) -> usize {
        self.crls.len() + self.ocsps.len() + self.certs.len()
    }

    /// Returns true if the bundle holds no evidence
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[test]
fn crl_dedup_test() {
    let mut vb = ValidationBundle::new();
    assert!(vb.add_crl(&[1, 2, 3]));
    assert!(!vb.add_crl(&[1, 2, 3]));
    assert!(vb.add_crl(&[1, 2, 4]));
    assert_eq!(2, vb.crls.len());
    assert_eq!(2, vb.len());
}

#[test]
fn signature_key_test() {
    use hex_literal::hex;
    // SHA-1("abc")
    assert_eq!(
        buffer_to_hex(&hex!("a9993e364706816aba3e25717850c26c9cd0d89d")),
        signature_key(b"abc")
    );
    assert_eq!(signature_key(b"abc"), signature_key(b"abc"));
    assert_ne!(signature_key(b"abc"), signature_key(b"abd"));
}
