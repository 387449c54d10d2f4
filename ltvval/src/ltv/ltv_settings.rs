//! Structures and functions related to configuring chain resolution, evidence collection and revocation
//! verification

use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};

use serde::{Deserialize, Serialize};

use pkiprocmacros::*;

use crate::TimeOfInterest;

#[cfg(feature = "std")]
use std::path::Path;

#[cfg(feature = "std")]
use serde_json::Result as SerdeResult;

#[cfg(feature = "std")]
use crate::builder::file_utils::get_file_as_byte_vec;
#[cfg(feature = "std")]
use crate::util::error::*;

//-----------------------------------------------------------------------------------------------
// Enums that express evidence collection policy
//-----------------------------------------------------------------------------------------------
/// `CertificateOption` determines which certificates evidence is collected for.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum CertificateOption {
    /// Only the signing certificate
    SigningCertificateOnly,
    /// Each certificate in the chain supplied with the signature
    WholeChain,
    /// The supplied chain completed via chain resolution, plus the certificates that produced the
    /// evidence (OCSP responders and CRL issuers) and their chains
    AllCertificates,
}

/// `RevocationLevel` determines which evidence types are attempted and in what combination.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RevocationLevel {
    /// OCSP only
    Ocsp,
    /// CRL only
    Crl,
    /// OCSP followed by CRL, both always attempted
    OcspThenCrl,
    /// OCSP, with CRL attempted only when no OCSP evidence was obtained
    OcspOptionalCrl,
}

impl RevocationLevel {
    /// Returns true if OCSP evidence is attempted at this level
    pub fn permits_ocsp(&self) -> bool {
        !matches!(self, RevocationLevel::Crl)
    }

    /// Returns true if CRL evidence is attempted at this level given whether OCSP evidence was added
    pub fn requires_crl(&self, ocsp_added: bool) -> bool {
        match self {
            RevocationLevel::Ocsp => false,
            RevocationLevel::Crl | RevocationLevel::OcspThenCrl => true,
            RevocationLevel::OcspOptionalCrl => !ocsp_added,
        }
    }
}

/// `RevocationNecessity` determines whether the absence of evidence is an error.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum RevocationNecessity {
    /// Absence of evidence is tolerated for all certificates
    Optional,
    /// Collection fails when no evidence is found for the signing certificate
    RequiredForSigningCertificate,
}

//-----------------------------------------------------------------------------------------------
// Variant map
//-----------------------------------------------------------------------------------------------
/// `LtvProcessingTypes` is used to define a variant map with types associated with evidence collection
/// and verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LtvProcessingTypes {
    /// Represents bool values
    Bool(bool),
    /// Represents u64 values
    U64(u64),
    /// Represents String values
    String(String),
    /// Represents TimeOfInterest values
    TimeOfInterest(TimeOfInterest),
    /// Represents CertificateOption values
    CertificateOption(CertificateOption),
    /// Represents RevocationLevel values
    RevocationLevel(RevocationLevel),
    /// Represents RevocationNecessity values
    RevocationNecessity(RevocationNecessity),
}

/// `LtvSettings` is a newtype around a `BTreeMap` that maps setting names to a variant map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LtvSettings(pub BTreeMap<String, LtvProcessingTypes>);

impl LtvSettings {
    /// Creates a new empty [`LtvSettings`]
    pub fn new() -> Self {
        Self::default()
    }
}

//-----------------------------------------------------------------------------------------------
// Setting names
//-----------------------------------------------------------------------------------------------
/// `PS_TIME_OF_INTEREST` is used to retrieve a TimeOfInterest value from an [`LtvSettings`] object,
/// i.e., the instant at which certificates and evidence are evaluated. Defaults to the current time
/// when std is available.
pub static PS_TIME_OF_INTEREST: &str = "psTimeOfInterest";

/// `PS_ONLINE_FETCH_ALLOWED` is used to retrieve a bool value that indicates whether verification may
/// fetch OCSP responses and CRLs online. Defaults to true.
pub static PS_ONLINE_FETCH_ALLOWED: &str = "psOnlineFetchAllowed";

/// `PS_RETRIEVE_FROM_AIA` is used to retrieve a bool value that indicates whether chain resolution may
/// fetch certificates from AIA CA issuers URIs. Defaults to true.
pub static PS_RETRIEVE_FROM_AIA: &str = "psRetrieveFromAia";

/// `PS_CERTIFICATE_OPTION` is used to retrieve the [`CertificateOption`] used by evidence collection.
/// Defaults to WholeChain.
pub static PS_CERTIFICATE_OPTION: &str = "psCertificateOption";

/// `PS_REVOCATION_LEVEL` is used to retrieve the [`RevocationLevel`] used by evidence collection.
/// Defaults to OcspOptionalCrl.
pub static PS_REVOCATION_LEVEL: &str = "psRevocationLevel";

/// `PS_REVOCATION_NECESSITY` is used to retrieve the [`RevocationNecessity`] used by evidence
/// collection. Defaults to Optional.
pub static PS_REVOCATION_NECESSITY: &str = "psRevocationNecessity";

/// `PS_HTTP_TIMEOUT_SECS` is used to retrieve the per-request timeout, in seconds, applied by the HTTP
/// clients. Defaults to 10.
pub static PS_HTTP_TIMEOUT_SECS: &str = "psHttpTimeoutSecs";

/// `PS_TRUST_ANCHOR_FOLDER` is used to retrieve the name of a folder containing trust anchors.
pub static PS_TRUST_ANCHOR_FOLDER: &str = "psTrustAnchorFolder";

ltv_gets_and_sets_with_default!(PS_TIME_OF_INTEREST, TimeOfInterest, TimeOfInterest::default());
ltv_gets_and_sets_with_default!(PS_ONLINE_FETCH_ALLOWED, bool, true);
ltv_gets_and_sets_with_default!(PS_RETRIEVE_FROM_AIA, bool, true);
ltv_gets_and_sets_with_default!(
    PS_CERTIFICATE_OPTION,
    CertificateOption,
    CertificateOption::WholeChain
);
ltv_gets_and_sets_with_default!(
    PS_REVOCATION_LEVEL,
    RevocationLevel,
    RevocationLevel::OcspOptionalCrl
);
ltv_gets_and_sets_with_default!(
    PS_REVOCATION_NECESSITY,
    RevocationNecessity,
    RevocationNecessity::Optional
);
ltv_gets_and_sets_with_default!(PS_HTTP_TIMEOUT_SECS, u64, 10);
ltv_gets_and_sets!(PS_TRUST_ANCHOR_FOLDER, String);

/// `read_settings` takes an optional string containing the name of a JSON file that contains
/// serialized [`LtvSettings`]. A missing file name or a file that does not exist yields default
/// settings. A file that cannot be parsed yields [`Error::ParseError`].
#[cfg(feature = "std")]
pub fn read_settings(fname: &Option<String>) -> Result<LtvSettings> {
    if let Some(fname) = fname {
        let p = Path::new(fname.as_str());
        if Path::exists(p) {
            let json = get_file_as_byte_vec(p)?;
            let r: SerdeResult<LtvSettings> = serde_json::from_slice(&json);
            return match r {
                Ok(settings) => Ok(settings),
                Err(_e) => Err(Error::ParseError),
            };
        }
    }
    Ok(LtvSettings::new())
}

#[test]
fn test_default_gets() {
    let settings = LtvSettings::default();
    assert!(get_online_fetch_allowed(&settings));
    assert!(get_retrieve_from_aia(&settings));
    assert_eq!(
        CertificateOption::WholeChain,
        get_certificate_option(&settings)
    );
    assert_eq!(
        RevocationLevel::OcspOptionalCrl,
        get_revocation_level(&settings)
    );
    assert_eq!(
        RevocationNecessity::Optional,
        get_revocation_necessity(&settings)
    );
    assert_eq!(10, get_http_timeout_secs(&settings));
    assert_eq!(None, get_trust_anchor_folder(&settings));
}

#[test]
fn test_sets() {
    let mut settings = LtvSettings::default();
    set_online_fetch_allowed(&mut settings, false);
    set_revocation_level(&mut settings, RevocationLevel::Crl);
    set_trust_anchor_folder(&mut settings, "/tmp/tas".to_string());
    set_time_of_interest(
        &mut settings,
        TimeOfInterest::from_unix_secs(1_700_000_000).unwrap(),
    );
    assert!(!get_online_fetch_allowed(&settings));
    assert_eq!(RevocationLevel::Crl, get_revocation_level(&settings));
    assert_eq!(
        Some("/tmp/tas".to_string()),
        get_trust_anchor_folder(&settings)
    );
    assert_eq!(1_700_000_000, get_time_of_interest(&settings).as_unix_secs());
}

#[test]
fn test_revocation_level() {
    assert!(!RevocationLevel::Crl.permits_ocsp());
    assert!(RevocationLevel::OcspThenCrl.requires_crl(true));
    assert!(!RevocationLevel::OcspOptionalCrl.requires_crl(true));
    assert!(RevocationLevel::OcspOptionalCrl.requires_crl(false));
    assert!(!RevocationLevel::Ocsp.requires_crl(false));
}

#[cfg(feature = "std")]
#[test]
fn test_settings_round_trip() {
    use std::io::Write;

    let mut settings = LtvSettings::default();
    set_certificate_option(&mut settings, CertificateOption::AllCertificates);
    set_http_timeout_secs(&mut settings, 3);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(&serde_json::to_vec(&settings).unwrap())
        .unwrap();
    let fname = file.path().to_str().unwrap().to_string();

    let read = read_settings(&Some(fname)).unwrap();
    assert_eq!(settings, read);
    assert_eq!(
        CertificateOption::AllCertificates,
        get_certificate_option(&read)
    );
    assert_eq!(3, get_http_timeout_secs(&read));

    assert_eq!(
        LtvSettings::default(),
        read_settings(&Some("/no/such/settings.json".to_string())).unwrap()
    );
}
