//! The ltv_environment_traits module features trait definitions and type definitions that are used
//! by [`LtvEnvironment`] to provide cryptographic functionality and access to the network-facing
//! collaborators that supply OCSP responses, CRLs and CA certificates.

use alloc::vec::Vec;

use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::util::error::*;
use crate::{LtvCertificate, LtvEnvironment};

/// `CalculateHash` provides a function signature for implementations that perform hashing
pub type CalculateHash = fn(
    &LtvEnvironment,
    &AlgorithmIdentifierOwned, // hash alg
    &[u8],                     // buffer to hash
) -> Result<Vec<u8>>;

/// `VerifySignatureMessage` provides a function signature for implementations that perform signature
/// verification over a message.
pub type VerifySignatureMessage = fn(
    &LtvEnvironment,
    &[u8],                      // message to hash and verify
    &[u8],                      // signature
    &AlgorithmIdentifierOwned,  // signature algorithm
    &SubjectPublicKeyInfoOwned, // public key
) -> Result<()>;

/// The [`OcspClient`] trait defines the interface for obtaining an OCSP response for a certificate.
pub trait OcspClient {
    /// Returns a binary DER-encoded basic OCSP response (or a full OCSPResponse wrapping one) covering
    /// `cert` as issued by `issuer`, or None if no response is available. Errors are treated by callers
    /// as "unavailable".
    fn fetch(&self, cert: &LtvCertificate, issuer: &LtvCertificate) -> Result<Option<Vec<u8>>>;
}

/// The [`CrlClient`] trait defines the interface for obtaining CRLs for a certificate.
pub trait CrlClient {
    /// Returns zero or more binary DER-encoded CRLs that may cover `cert`.
    fn fetch(&self, cert: &LtvCertificate) -> Result<Vec<Vec<u8>>>;
}

/// The [`AiaFetcher`] trait defines the interface for retrieving resources named by URIs found in
/// the CA issuers access descriptions of Authority Information Access extensions.
pub trait AiaFetcher {
    /// Returns the bytes retrieved from `uri`, which are expected to contain one or more certificates,
    /// either as a single DER-encoded certificate or as a certs-only PKCS #7 message.
    fn fetch_by_url(&self, uri: &str) -> Result<Option<Vec<u8>>>;
}
