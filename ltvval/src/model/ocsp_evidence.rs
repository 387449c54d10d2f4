//! Structures and functions for working with OCSP responses used as revocation evidence

use alloc::vec::Vec;

use der::asn1::OctetString;
use der::{asn1::ContextSpecific, Any, Decode, Encode, TagNumber};
use log::{error, warn};
use sha1::{Digest, Sha1};
use spki::SubjectPublicKeyInfoOwned;
use x509_cert::serial_number::SerialNumber;
use x509_ocsp::*;

use const_oid::db::rfc6960::ID_PKIX_OCSP_BASIC;

use crate::util::error::*;
use crate::{compare_names, LtvCertificate, LtvEnvironment, TimeOfInterest};

/// Returns the SHA-1 hash of the subject public key from the presented certificate, i.e., the value
/// used as a ResponderID byKey value and as the issuerKeyHash in a SHA-1 based CertID.
pub fn get_key_hash(cert: &LtvCertificate) -> Vec<u8> {
    Sha1::digest(cert.spki().subject_public_key.raw_bytes()).to_vec()
}

/// Returns the SHA-1 hash of the DER encoded subject name from the presented certificate, i.e., the
/// issuerNameHash in a SHA-1 based CertID.
pub fn get_subject_name_hash(cert: &LtvCertificate) -> Result<Vec<u8>> {
    let enc_subject = cert.subject().to_der()?;
    Ok(Sha1::digest(enc_subject.as_slice()).to_vec())
}

/// cert_id_match returns true if the serial number, issuer name hash and issuer key hash in the cert_id object
/// match the values passed as parameters. Else it returns false.
fn cert_id_match(
    cert_id: &CertId,
    serial_number: &SerialNumber,
    name_hash: &[u8],
    key_hash: &[u8],
) -> bool {
    cert_id.serial_number.as_bytes() == serial_number.as_bytes()
        && cert_id.issuer_name_hash.as_bytes() == name_hash
        && cert_id.issuer_key_hash.as_bytes() == key_hash
}

/// `cert_id_matches` returns true if `cert_id` identifies `cert` as issued by `issuer`. The issuer name
/// and key hashes are recomputed using the hash algorithm stated in the CertID.
pub fn cert_id_matches(
    env: &LtvEnvironment,
    cert_id: &CertId,
    cert: &LtvCertificate,
    issuer: &LtvCertificate,
) -> bool {
    let enc_subject = match issuer.subject().to_der() {
        Ok(enc) => enc,
        Err(_e) => return false,
    };
    let name_hash = match env.calculate_hash(&cert_id.hash_algorithm, &enc_subject) {
        Ok(h) => h,
        Err(_e) => {
            warn!(
                "Unsupported hash algorithm in CertID: {}",
                cert_id.hash_algorithm.oid
            );
            return false;
        }
    };
    let key_hash = match env.calculate_hash(
        &cert_id.hash_algorithm,
        issuer.spki().subject_public_key.raw_bytes(),
    ) {
        Ok(h) => h,
        Err(_e) => return false,
    };
    cert_id_match(cert_id, cert.serial_number(), &name_hash, &key_hash)
}

/// Returns true if the SingleResponse is fresh relative to the time of interest, i.e., thisUpdate is
/// not after the time of interest and nextUpdate, when present, is not before it.
pub fn check_response_time(toi: TimeOfInterest, sr: &SingleResponse) -> bool {
    if toi.is_disabled() {
        return true;
    }

    if toi < sr.this_update.0 {
        //future response
        return false;
    }

    if let Some(next_update) = &sr.next_update {
        if toi > next_update.0 {
            //stale
            return false;
        }
    }
    true
}

/// `wrap_basic_response` wraps a DER encoded BasicOCSPResponse in a successful OCSPResponse, which is
/// the form in which OCSP responses are stored for long-term validation.
pub fn wrap_basic_response(enc_basic: &[u8]) -> Result<Vec<u8>> {
    let or = OcspResponse {
        response_status: OcspResponseStatus::Successful,
        response_bytes: Some(ResponseBytes {
            response_type: ID_PKIX_OCSP_BASIC,
            response: OctetString::new(enc_basic)?,
        }),
    };
    Ok(or.to_der()?)
}

/// Parses only the top-level BasicOCSPResponse structure to retain the exact encoding of the
/// tbsResponseData field and of each certificate in the certs field.
struct DeferDecodeBasicOcspResponse {
    ///   tbsResponseData          ResponseData,
    tbs_response_data: Vec<u8>,

    ///    certs               \[0\] EXPLICIT SEQUENCE OF Certificate OPTIONAL }
    certs: Option<Vec<Any>>,
}

impl ::der::FixedTag for DeferDecodeBasicOcspResponse {
    const TAG: ::der::Tag = ::der::Tag::Sequence;
}

impl<'a> ::der::DecodeValue<'a> for DeferDecodeBasicOcspResponse {
    fn decode_value<R: ::der::Reader<'a>>(
        reader: &mut R,
        header: ::der::Header,
    ) -> ::der::Result<Self> {
        use ::der::Reader as _;
        reader.read_nested(header.length, |reader| {
            let tbs_response_data = reader.tlv_bytes()?;
            let _signature_algorithm = reader.tlv_bytes()?;
            let _signature = reader.tlv_bytes()?;
            let certs = ContextSpecific::<Vec<Any>>::decode_explicit(reader, TagNumber::N0)?
                .map(|cs| cs.value);
            Ok(Self {
                tbs_response_data: tbs_response_data.to_vec(),
                certs,
            })
        })
    }
}

/// [`OcspEvidence`] aggregates an OCSP response in the form stored for long-term validation, i.e., a
/// successful OCSPResponse wrapping a BasicOCSPResponse, the decoded BasicOCSPResponse and the
/// certificates embedded in the response.
#[derive(Clone, Debug)]
pub struct OcspEvidence {
    /// Binary DER encoded OCSPResponse
    pub encoded_response: Vec<u8>,
    /// Binary DER encoded BasicOCSPResponse
    pub encoded_basic: Vec<u8>,
    /// Exact encoding of the tbsResponseData field over which the signature was generated
    pub tbs_response_data: Vec<u8>,
    /// Decoded BasicOCSPResponse
    pub basic: BasicOcspResponse,
    /// Certificates from the certs field that could be parsed
    pub certs: Vec<LtvCertificate>,
}

impl OcspEvidence {
    /// Prepares an [`OcspEvidence`] from a DER encoded BasicOCSPResponse. Embedded certificates that
    /// cannot be parsed are discarded.
    pub fn from_basic_der(enc_basic: &[u8]) -> Result<Self> {
        let basic = BasicOcspResponse::from_der(enc_basic)?;
        let deferred = DeferDecodeBasicOcspResponse::from_der(enc_basic)?;

        let mut certs = Vec::new();
        if let Some(anys) = &deferred.certs {
            for a in anys {
                match a.to_der() {
                    Ok(enc_cert) => match LtvCertificate::try_from(enc_cert.as_slice()) {
                        Ok(c) => certs.push(c),
                        Err(e) => warn!("Discarding unparseable certificate from OCSP response: {}", e),
                    },
                    Err(e) => warn!("Discarding unencodable certificate from OCSP response: {}", e),
                }
            }
        }

        Ok(OcspEvidence {
            encoded_response: wrap_basic_response(enc_basic)?,
            encoded_basic: enc_basic.to_vec(),
            tbs_response_data: deferred.tbs_response_data,
            basic,
            certs,
        })
    }

    /// Prepares an [`OcspEvidence`] from a DER encoded OCSPResponse, which must be successful and must
    /// carry a basic response.
    pub fn from_response_der(enc_resp: &[u8]) -> Result<Self> {
        let or = OcspResponse::from_der(enc_resp)?;
        if or.response_status != OcspResponseStatus::Successful {
            error!("OcspResponse indicates failure ({:?})", or.response_status);
            return Err(Error::OcspResponseError);
        }

        let rb = match &or.response_bytes {
            Some(rb) => rb,
            None => {
                error!("OcspResponse contained no response bytes");
                return Err(Error::OcspResponseError);
            }
        };

        if rb.response_type != ID_PKIX_OCSP_BASIC {
            error!(
                "OcspResponse contained response bytes other than basic type ({})",
                rb.response_type
            );
            return Err(Error::OcspResponseError);
        }
        Self::from_basic_der(rb.response.as_bytes())
    }

    /// Prepares an [`OcspEvidence`] from either a DER encoded OCSPResponse or a DER encoded
    /// BasicOCSPResponse.
    pub fn parse(enc: &[u8]) -> Result<Self> {
        match OcspResponse::from_der(enc) {
            Ok(_) => Self::from_response_der(enc),
            Err(_) => Self::from_basic_der(enc),
        }
    }

    /// Returns the single responses contained in the response
    pub fn responses(&self) -> &[SingleResponse] {
        &self.basic.tbs_response_data.responses
    }

    /// Returns the responder ID from the response
    pub fn responder_id(&self) -> &ResponderId {
        &self.basic.tbs_response_data.responder_id
    }

    /// Returns true if the responder ID identifies the presented certificate, either by name or by
    /// SHA-1 hash of the public key.
    pub fn responder_id_matches(&self, cert: &LtvCertificate) -> bool {
        match self.responder_id() {
            ResponderId::ByName(name) => compare_names(name, cert.subject()),
            ResponderId::ByKey(kh) => kh.as_bytes() == get_key_hash(cert).as_slice(),
        }
    }

    /// Verifies the signature on the response using the presented public key.
    pub fn verify_signature(
        &self,
        env: &LtvEnvironment,
        spki: &SubjectPublicKeyInfoOwned,
    ) -> Result<()> {
        env.verify_signature_message(
            &self.tbs_response_data,
            self.basic.signature.raw_bytes(),
            &self.basic.signature_algorithm,
            spki,
        )
    }

    /// Returns true if the response signature verifies using the public key from the presented certificate
    pub fn is_signed_by(&self, env: &LtvEnvironment, cert: &LtvCertificate) -> bool {
        self.verify_signature(env, cert.spki()).is_ok()
    }

    /// Returns the single responses whose CertID identifies `cert` as issued by `issuer`
    pub fn matching_responses<'a>(
        &'a self,
        env: &'a LtvEnvironment,
        cert: &'a LtvCertificate,
        issuer: &'a LtvCertificate,
    ) -> impl Iterator<Item = &'a SingleResponse> + 'a {
        self.responses()
            .iter()
            .filter(move |sr| cert_id_matches(env, &sr.cert_id, cert, issuer))
    }

    /// Returns true if any single response matching `cert` and `issuer` reports a good status. Freshness
    /// is not considered.
    pub fn reports_good(
        &self,
        env: &LtvEnvironment,
        cert: &LtvCertificate,
        issuer: &LtvCertificate,
    ) -> bool {
        self.matching_responses(env, cert, issuer)
            .any(|sr| matches!(sr.cert_status, CertStatus::Good(_)))
    }
}

/// `parse_ocsp_responses_leniently` parses each buffer, discarding (and logging) those that cannot be parsed.
pub fn parse_ocsp_responses_leniently<T: AsRef<[u8]>>(buffers: &[T]) -> Vec<OcspEvidence> {
    buffers
        .iter()
        .filter_map(|b| match OcspEvidence::parse(b.as_ref()) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!("Discarding OCSP response that could not be parsed: {}", e);
                None
            }
        })
        .collect()
}
