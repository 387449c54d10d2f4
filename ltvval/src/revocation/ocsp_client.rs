//! Blocking HTTP implementation of the [`OcspClient`] trait

use alloc::vec;
use alloc::vec::Vec;
use core::time::Duration;

use der::asn1::OctetString;
use der::Encode;
use log::{debug, error};
use reqwest::header::CONTENT_TYPE;
use spki::AlgorithmIdentifierOwned;
use x509_ocsp::Version::V1;
use x509_ocsp::*;

use crate::environment::ltv_environment_traits::OcspClient;
use crate::util::error::*;
use crate::{get_key_hash, get_subject_name_hash, is_http_uri, LtvCertificate, PKIXALG_SHA1};

/// `post_ocsp` sends the DER-encoded request to the presented URI and returns the body of the response.
fn post_ocsp(uri_to_check: &str, enc_ocsp_req: &[u8], timeout: Duration) -> Result<Vec<u8>> {
    let client = if let Ok(client) = reqwest::blocking::Client::builder()
        .pool_max_idle_per_host(0)
        .timeout(timeout)
        .build()
    {
        client
    } else {
        error!("Failed to prepare OCSP client: {}", uri_to_check);
        return Err(Error::NetworkError);
    };

    let body = match client
        .post(uri_to_check)
        .body(enc_ocsp_req.to_vec())
        .header(CONTENT_TYPE, "application/ocsp-request")
        .send()
    {
        Ok(b) => b,
        Err(e) => {
            debug!("OCSP request send failed with {}: {}", e, uri_to_check);
            return Err(Error::NetworkError);
        }
    };

    match body.bytes() {
        Ok(bb) => Ok(bb.to_vec()),
        Err(e) => {
            error!("Failed to read OCSP response with {}: {}", e, uri_to_check);
            Err(Error::NetworkError)
        }
    }
}

/// `prepare_ocsp_request` returns a DER-encoded OCSPRequest with a single SHA-1 based CertID for
/// `target_cert` as issued by `issuer`. No nonce is included.
pub fn prepare_ocsp_request(target_cert: &LtvCertificate, issuer: &LtvCertificate) -> Result<Vec<u8>> {
    let hash_algorithm = AlgorithmIdentifierOwned {
        oid: PKIXALG_SHA1,
        parameters: None,
    };

    let req_cert = CertId {
        hash_algorithm,
        issuer_name_hash: OctetString::new(get_subject_name_hash(issuer)?)?,
        issuer_key_hash: OctetString::new(get_key_hash(issuer))?,
        serial_number: target_cert.serial_number().clone(),
    };
    let request_list = vec![Request {
        req_cert,
        single_request_extensions: None,
    }];
    let tbs_request = TbsRequest {
        version: V1,
        requestor_name: None,
        request_list,
        request_extensions: None,
    };
    let ocsp_req = OcspRequest {
        tbs_request,
        optional_signature: None,
    };
    Ok(ocsp_req.to_der()?)
}

/// [`HttpOcspClient`] posts OCSP requests to the OCSP URIs from the AIA extension of the certificate of
/// interest, returning the first response obtained.
pub struct HttpOcspClient {
    timeout: Duration,
}

impl HttpOcspClient {
    /// Creates a new [`HttpOcspClient`] that applies the given timeout to each request
    pub fn new(timeout: Duration) -> Self {
        HttpOcspClient { timeout }
    }
}

impl OcspClient for HttpOcspClient {
    fn fetch(&self, cert: &LtvCertificate, issuer: &LtvCertificate) -> Result<Option<Vec<u8>>> {
        let uris = cert.ocsp_uris();
        if uris.is_empty() {
            debug!("No OCSP URIs found for {}", cert.subject_name());
            return Ok(None);
        }

        let enc_ocsp_req = prepare_ocsp_request(cert, issuer)?;
        for uri in uris {
            if !is_http_uri(&uri) {
                debug!("Ignored non-HTTP URI presented to OCSP client: {}", uri);
                continue;
            }
            match post_ocsp(&uri, &enc_ocsp_req, self.timeout) {
                Ok(resp) => return Ok(Some(resp)),
                Err(e) => {
                    error!("Failed sending OCSP request to {} with {:?}", uri, e);
                }
            }
        }
        Ok(None)
    }
}
