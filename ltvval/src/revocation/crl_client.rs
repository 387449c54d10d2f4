//! Blocking HTTP implementation of the [`CrlClient`] trait

use alloc::vec::Vec;
use core::time::Duration;

use log::{debug, warn};

use crate::environment::ltv_environment_traits::CrlClient;
use crate::util::error::*;
use crate::builder::uri_utils::http_get;
use crate::{is_http_uri, LtvCertificate};

/// [`HttpCrlClient`] retrieves CRLs from the http and https URIs found in the CRL distribution points
/// extension of the certificate of interest.
pub struct HttpCrlClient {
    timeout: Duration,
}

impl HttpCrlClient {
    /// Creates a new [`HttpCrlClient`] that applies the given timeout to each request
    pub fn new(timeout: Duration) -> Self {
        HttpCrlClient { timeout }
    }
}

impl CrlClient for HttpCrlClient {
    fn fetch(&self, cert: &LtvCertificate) -> Result<Vec<Vec<u8>>> {
        let mut retval: Vec<Vec<u8>> = Vec::new();
        for uri in cert.crl_distribution_point_uris() {
            if !is_http_uri(&uri) {
                debug!("Ignored non-HTTP CRL DP: {}", uri);
                continue;
            }
            match http_get(&uri, self.timeout) {
                Ok(Some(crl)) => {
                    if !retval.contains(&crl) {
                        retval.push(crl);
                    }
                }
                Ok(None) => {}
                Err(e) => warn!("Failed to retrieve CRL from {}: {}", uri, e),
            }
        }
        Ok(retval)
    }
}
