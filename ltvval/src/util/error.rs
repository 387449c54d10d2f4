//! Error types

use alloc::string::String;
use core::fmt;

/// Result type
pub type Result<T> = core::result::Result<T, Error>;

/// Error type
///
/// Variants that describe a failure attributable to a specific certificate carry that certificate's
/// subject name so the failure can be surfaced verbatim by the surrounding signing workflow.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum Error {
    /// NotFound occurs when an action failed because a necessary artifact was not found.
    NotFound,
    /// Unrecognized occurs when an error conditions does not match anything else here.
    Unrecognized,
    /// A URI scheme was encountered that was no valid in given context, i.e., ldap URI presented to OCSP
    InvalidUriScheme,
    /// An artifact could not be parsed
    ParseError,
    /// Asn1Error is used to propagate error information from the der crate.
    Asn1Error(der::Error),
    /// A networking issue occurred.
    NetworkError,
    /// A signature could not be verified using the presented public key
    SignatureVerificationFailure,
    /// A certificate was not valid at the time of interest
    InvalidValidityPeriod,
    /// An error occurred processing an OCSP response, i.e., unsuccessful status or non-basic response type
    OcspResponseError,
    /// No certificate that verifies the signature on an OCSP response could be found
    ResponseNotVerified(String),
    /// The revocation status of an authorized OCSP responder could not be established
    ResponderStatusUnchecked(String),
    /// A candidate OCSP responder certificate was not issued by the CA or was not valid at the time of interest
    ResponderCertificateInvalid(String),
    /// Revocation evidence shows the named certificate was revoked
    CertificateRevoked(String),
    /// Revocation evidence was required for the named signing certificate but none could be obtained
    NoRevocationDataForSigningCertificate(String),
    /// Evidence collected by an LtvCollector instance has already been merged
    AlreadyMerged,
    /// An LtvCollector instance was used after its evidence was merged
    CollectorClosed,
    /// A configuration error was detected. See textual log output for more details.
    Misconfiguration,
    /// Error encapsulates an error derived from [std::io::ErrorKind]
    #[cfg(feature = "std")]
    StdIoError(std::io::ErrorKind),
}

impl From<der::Error> for Error {
    fn from(err: der::Error) -> Error {
        Error::Asn1Error(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotFound => write!(f, "NotFound"),
            Error::Unrecognized => write!(f, "Unrecognized"),
            Error::InvalidUriScheme => write!(f, "InvalidUriScheme"),
            Error::ParseError => write!(f, "ParseError"),
            Error::Asn1Error(err) => write!(f, "Asn1Error: {}", err),
            Error::NetworkError => write!(f, "NetworkError"),
            Error::SignatureVerificationFailure => write!(f, "Signature verification failure"),
            Error::InvalidValidityPeriod => write!(f, "InvalidValidityPeriod"),
            Error::OcspResponseError => write!(f, "OcspResponseError"),
            Error::ResponseNotVerified(subject) => {
                write!(f, "OCSP response for {} could not be verified", subject)
            }
            Error::ResponderStatusUnchecked(subject) => write!(
                f,
                "Authorized OCSP responder's revocation status cannot be checked: {}",
                subject
            ),
            Error::ResponderCertificateInvalid(subject) => {
                write!(f, "OCSP responder certificate is not valid: {}", subject)
            }
            Error::CertificateRevoked(subject) => write!(f, "Certificate revoked: {}", subject),
            Error::NoRevocationDataForSigningCertificate(subject) => write!(
                f,
                "No revocation data found for signing certificate: {}",
                subject
            ),
            Error::AlreadyMerged => write!(f, "AlreadyMerged"),
            Error::CollectorClosed => write!(f, "CollectorClosed"),
            Error::Misconfiguration => write!(f, "Misconfiguration"),
            #[cfg(feature = "std")]
            Error::StdIoError(err) => write!(f, "StdError: {:?}", err),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[test]
fn error_test() {
    use alloc::format;
    use alloc::string::ToString;

    let _s = format!("{}", Error::NotFound);
    let _s = format!("{}", Error::Unrecognized);
    let _s = format!("{}", Error::InvalidUriScheme);
    let _s = format!("{}", Error::ParseError);
    let _s = format!("{}", Error::NetworkError);
    let _s = format!("{}", Error::SignatureVerificationFailure);
    let _s = format!("{}", Error::InvalidValidityPeriod);
    let _s = format!("{}", Error::OcspResponseError);
    let _s = format!("{}", Error::AlreadyMerged);
    let _s = format!("{}", Error::CollectorClosed);
    let _s = format!("{}", Error::Misconfiguration);

    let s = format!(
        "{}",
        Error::NoRevocationDataForSigningCertificate("CN=Signer".to_string())
    );
    assert!(s.ends_with("CN=Signer"));
    let s = format!("{}", Error::ResponderStatusUnchecked("CN=Responder".to_string()));
    assert!(s.contains("cannot be checked"));
}
