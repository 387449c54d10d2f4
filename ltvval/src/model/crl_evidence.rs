//! Wrapper around a DER encoded CRL used as revocation evidence

use alloc::vec::Vec;
use core::fmt;

use der::Decode;
use log::warn;
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::crl::{CertificateList, RevokedCert};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Time;

use crate::util::error::*;
use crate::{name_to_string, DeferDecodeSigned, LtvCertificate, LtvEnvironment, TimeOfInterest};

/// [`LtvCrl`] aggregates a binary, DER-encoded CRL and its decoded form. Instances are compared by their
/// encoding.
#[derive(Clone)]
pub struct LtvCrl {
    /// Binary, encoded CertificateList object
    pub encoded_crl: Vec<u8>,
    /// Decoded CertificateList object
    pub decoded_crl: CertificateList,
}

impl PartialEq for LtvCrl {
    fn eq(&self, other: &Self) -> bool {
        self.encoded_crl == other.encoded_crl
    }
}

impl Eq for LtvCrl {}

impl fmt::Debug for LtvCrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LtvCrl")
            .field("issuer", &name_to_string(self.issuer()))
            .field("this_update", &self.this_update())
            .finish()
    }
}

impl TryFrom<&[u8]> for LtvCrl {
    type Error = Error;

    fn try_from(enc_crl: &[u8]) -> Result<Self> {
        Ok(LtvCrl {
            encoded_crl: enc_crl.to_vec(),
            decoded_crl: CertificateList::from_der(enc_crl)?,
        })
    }
}

impl LtvCrl {
    /// Returns the issuer name of the CRL
    pub fn issuer(&self) -> &Name {
        &self.decoded_crl.tbs_cert_list.issuer
    }

    /// Returns the thisUpdate value of the CRL
    pub fn this_update(&self) -> Time {
        self.decoded_crl.tbs_cert_list.this_update
    }

    /// Returns the nextUpdate value of the CRL, if present
    pub fn next_update(&self) -> Option<Time> {
        self.decoded_crl.tbs_cert_list.next_update
    }

    /// Returns true if the CRL was issued at or before the time of interest and is not stale relative
    /// to the time of interest. A CRL without nextUpdate never goes stale.
    pub fn valid_at(&self, toi: TimeOfInterest) -> bool {
        if toi.is_disabled() {
            return true;
        }
        if toi < self.this_update() {
            return false;
        }
        match self.next_update() {
            Some(nu) => toi <= nu,
            None => true,
        }
    }

    /// Returns the entry for the presented serial number, if the serial number is listed.
    pub fn revocation_entry(&self, serial_number: &SerialNumber) -> Option<&RevokedCert> {
        self.decoded_crl
            .tbs_cert_list
            .revoked_certificates
            .as_ref()
            .and_then(|rcs| {
                rcs.iter()
                    .find(|rc| rc.serial_number.as_bytes() == serial_number.as_bytes())
            })
    }

    /// Returns true if the presented certificate's serial number is listed with a revocation date at
    /// or before the time of interest.
    pub fn is_revoked(&self, cert: &LtvCertificate, toi: TimeOfInterest) -> bool {
        match self.revocation_entry(cert.serial_number()) {
            Some(entry) => toi.is_disabled() || toi >= entry.revocation_date,
            None => false,
        }
    }

    /// Returns true if the signature on the CRL verifies using the presented public key.
    pub fn verified_by(&self, env: &LtvEnvironment, spki: &SubjectPublicKeyInfoOwned) -> bool {
        let defer_crl = match DeferDecodeSigned::from_der(&self.encoded_crl) {
            Ok(dc) => dc,
            Err(_e) => return false,
        };
        env.verify_signature_message(
            &defer_crl.tbs_field,
            defer_crl.signature.raw_bytes(),
            &defer_crl.signature_algorithm,
            spki,
        )
        .is_ok()
    }
}

/// `parse_crls_leniently` parses each buffer, discarding (and logging) those that cannot be parsed.
pub fn parse_crls_leniently<T: AsRef<[u8]>>(buffers: &[T]) -> Vec<LtvCrl> {
    buffers
        .iter()
        .filter_map(|b| match LtvCrl::try_from(b.as_ref()) {
            Ok(c) => Some(c),
            Err(e) => {
                warn!("Discarding CRL that could not be parsed: {}", e);
                None
            }
        })
        .collect()
}
