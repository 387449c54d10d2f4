//! Contains utility functions related to parsing certificates retrieved from CA issuers URIs and, with
//! the `remote` feature, the blocking HTTP client used to retrieve them.

use alloc::vec::Vec;

use cms::{cert::CertificateChoices, content_info::ContentInfo, signed_data::SignedData};
use der::{Decode, Encode};
use log::{debug, error, warn};

use crate::LtvCertificate;

#[cfg(feature = "remote")]
use crate::{environment::ltv_environment_traits::AiaFetcher, util::error::*};

/// `certs_from_p7` takes a buffer that notionally contains a degenerate certs-only SignedData message
/// and returns the certificates it contains, discarding any that fail to parse.
fn certs_from_p7(bytes: &[u8]) -> Vec<LtvCertificate> {
    let mut retval = Vec::new();
    let ci = match ContentInfo::from_der(bytes) {
        Ok(ci) => ci,
        Err(e) => {
            warn!("Buffer is neither a certificate nor a ContentInfo: {:?}", e);
            return retval;
        }
    };

    let content = match ci.content.to_der() {
        Ok(content) => content,
        Err(e) => {
            error!("Failed to encode content from ContentInfo with {:?}", e);
            return retval;
        }
    };

    match SignedData::from_der(content.as_slice()) {
        Ok(sd) => {
            if let Some(certs) = &sd.certificates {
                for choice in certs.0.iter() {
                    if let CertificateChoices::Certificate(c) = choice {
                        match LtvCertificate::try_from(c.clone()) {
                            Ok(lc) => {
                                if !retval.contains(&lc) {
                                    retval.push(lc);
                                }
                            }
                            Err(e) => {
                                warn!("Discarding certificate from SignedData: {:?}", e);
                            }
                        }
                    }
                }
            }
        }
        Err(e) => {
            error!("Failed to parse SignedData with {:?}", e);
        }
    }
    retval
}

/// `parse_certificates` parses a buffer retrieved from a CA issuers URI, which may contain a single
/// DER-encoded certificate or a certs-only PKCS #7 SignedData message. Failures are logged and yield
/// an empty list.
pub fn parse_certificates(bytes: &[u8]) -> Vec<LtvCertificate> {
    match LtvCertificate::try_from(bytes) {
        Ok(cert) => {
            debug!("Parsed certificate issued to {}", cert.subject_name());
            alloc::vec![cert]
        }
        Err(_) => certs_from_p7(bytes),
    }
}

/// [`HttpAiaFetcher`] retrieves resources from http and https URIs using a blocking client with a
/// per-request timeout.
#[cfg(feature = "remote")]
pub struct HttpAiaFetcher {
    timeout: core::time::Duration,
}

#[cfg(feature = "remote")]
impl HttpAiaFetcher {
    /// Creates a new [`HttpAiaFetcher`] that applies the given timeout to each request
    pub fn new(timeout: core::time::Duration) -> Self {
        HttpAiaFetcher { timeout }
    }
}

/// `is_http_uri` returns true if the presented URI uses the http or https scheme.
pub fn is_http_uri(uri: &str) -> bool {
    let lower = uri.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

/// `http_get` retrieves the resource at `uri`, returning None when the server reports failure or
/// hands back an HTML page.
#[cfg(feature = "remote")]
pub(crate) fn http_get(uri: &str, timeout: core::time::Duration) -> Result<Option<Vec<u8>>> {
    if !is_http_uri(uri) {
        debug!("Skipping non-HTTP URI: {}", uri);
        return Err(Error::InvalidUriScheme);
    }

    let client = match reqwest::blocking::Client::builder()
        .timeout(timeout)
        .build()
    {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to prepare HTTP client with {:?}", e);
            return Err(Error::NetworkError);
        }
    };

    let response = match client.get(uri).send() {
        Ok(response) => response,
        Err(e) => {
            error!("Failed to retrieve {} with {:?}", uri, e);
            return Err(Error::NetworkError);
        }
    };

    if !response.status().is_success() {
        warn!("Request to {} failed with status {}", uri, response.status());
        return Ok(None);
    }

    // some things "succeed" when handing us an HTML page with an error. skip those.
    if let Some(ct) = response.headers().get("Content-Type") {
        if let Ok(s) = ct.to_str() {
            if s.starts_with("text/html") {
                return Ok(None);
            }
        }
    }

    match response.bytes() {
        Ok(bytes) => {
            debug!("Downloaded {} bytes from {}", bytes.len(), uri);
            Ok(Some(bytes.to_vec()))
        }
        Err(e) => {
            error!("Failed to read response body from {} with {:?}", uri, e);
            Err(Error::NetworkError)
        }
    }
}

#[cfg(feature = "remote")]
impl AiaFetcher for HttpAiaFetcher {
    fn fetch_by_url(&self, uri: &str) -> Result<Option<Vec<u8>>> {
        http_get(uri, self.timeout)
    }
}

#[test]
fn parse_certificates_garbage_test() {
    assert!(parse_certificates(&[0x30, 0x03, 0x02, 0x01, 0x01]).is_empty());
    assert!(parse_certificates(&[]).is_empty());
}

#[test]
fn is_http_uri_test() {
    assert!(is_http_uri("http://example.com/ca.p7c"));
    assert!(is_http_uri("HTTPS://example.com/ca.crt"));
    assert!(!is_http_uri("ldap://example.com/cn=ca"));
}
