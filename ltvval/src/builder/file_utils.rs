//! The file_utils module contains utility functions related to interactions with the filesystem.

use std::ffi::OsStr;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use log::{error, info};
use walkdir::WalkDir;

use crate::util::error::*;
use crate::{
    get_time_of_interest, get_trust_anchor_folder, CertificateOrigin, LtvCertificate, LtvSettings,
    TimeOfInterest, TrustIndex,
};

/// `get_file_as_byte_vec` takes a Path containing a file name and returns a vector of bytes containing
/// the contents of that file or an [Error::StdIoError].
pub fn get_file_as_byte_vec(filename: &Path) -> Result<Vec<u8>> {
    match File::open(filename) {
        Ok(mut f) => {
            let mut buffer = Vec::new();
            match f.read_to_end(&mut buffer) {
                Ok(_) => Ok(buffer),
                Err(e) => Err(Error::StdIoError(e.kind())),
            }
        }
        Err(e) => Err(Error::StdIoError(e.kind())),
    }
}

/// `get_file_as_byte_vec_pem` takes a Path containing a file name and returns a vector of bytes containing
/// the contents of that file or an [Error::StdIoError]. If the file is PEM encoded, it is decoded
/// prior to returning the vector of bytes. To read without PEM, use `get_file_as_byte_vec`.
pub fn get_file_as_byte_vec_pem(filename: &Path) -> Result<Vec<u8>> {
    let b = get_file_as_byte_vec(filename)?;
    if b.first() == Some(&0x2D) {
        match pem_rfc7468::decode_vec(b.as_slice()) {
            Ok((_label, der)) => Ok(der),
            Err(e) => {
                error!("Failed to parse PEM from {:?}: {:?}", filename, e);
                Err(Error::Unrecognized)
            }
        }
    } else {
        Ok(b)
    }
}

/// `cert_folder_to_vec` recursively traverses the presented folder and returns the certificates that
/// could be parsed and that are valid at the time of interest. Pass a disabled [`TimeOfInterest`] to
/// skip the validity check.
///
/// Only files with .der, .cer, .crt or .pem extensions are processed.
pub fn cert_folder_to_vec(certs_dir: &str, toi: TimeOfInterest) -> Result<Vec<LtvCertificate>> {
    if !Path::is_dir(Path::new(certs_dir)) {
        error!("{} does not exist or is not a directory", certs_dir);
        return Err(Error::NotFound);
    }

    let file_exts = ["der", "crt", "cer", "pem"];
    let mut retval: Vec<LtvCertificate> = Vec::new();
    for entry in WalkDir::new(certs_dir) {
        let e = match entry {
            Ok(e) => e,
            Err(err) => {
                error!("Failed to read entry in {}: {:?}", certs_dir, err);
                continue;
            }
        };
        if e.file_type().is_dir() {
            continue;
        }

        let path = e.path();
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if file_exts.contains(&ext.to_lowercase().as_str()) => {}
            _ => continue,
        }

        let buffer = match get_file_as_byte_vec_pem(path) {
            Ok(b) => b,
            Err(err) => {
                error!("Failed to read {}: {}", path.display(), err);
                continue;
            }
        };

        let cert = match LtvCertificate::try_from(buffer.as_slice()) {
            Ok(c) => c,
            Err(err) => {
                error!("Failed to parse certificate from {}: {}", path.display(), err);
                continue;
            }
        };

        if cert.valid_at(toi).is_err() {
            info!(
                "Ignored {} as not valid at indicated time of interest",
                path.display()
            );
            continue;
        }

        if !retval.contains(&cert) {
            retval.push(cert);
        }
    }
    Ok(retval)
}

/// `load_trust_anchors_from_folder` adds the certificates found in the presented folder to the trusted
/// store of `trust_index`, returning the number of certificates added.
pub fn load_trust_anchors_from_folder(
    trust_index: &mut TrustIndex,
    tas_dir: &str,
    toi: TimeOfInterest,
) -> Result<usize> {
    let tas = cert_folder_to_vec(tas_dir, toi)?;
    trust_index.add_trusted(&tas);
    info!("Loaded {} trust anchors from {}", tas.len(), tas_dir);
    Ok(tas.len())
}

/// `load_trust_anchors_from_settings` loads trust anchors from the folder named by
/// `PS_TRUST_ANCHOR_FOLDER`, skipping those not valid at `PS_TIME_OF_INTEREST`. Nothing is loaded
/// when no folder is configured.
pub fn load_trust_anchors_from_settings(
    trust_index: &mut TrustIndex,
    settings: &LtvSettings,
) -> Result<usize> {
    match get_trust_anchor_folder(settings) {
        Some(tas_dir) => {
            load_trust_anchors_from_folder(trust_index, &tas_dir, get_time_of_interest(settings))
        }
        None => {
            info!("No trust anchor folder configured");
            Ok(0)
        }
    }
}

/// `load_known_certificates_from_folder` adds the certificates found in the presented folder to the
/// known certificates index of `trust_index` with the given origin, returning the number of
/// certificates added.
pub fn load_known_certificates_from_folder(
    trust_index: &mut TrustIndex,
    certs_dir: &str,
    origin: CertificateOrigin,
    toi: TimeOfInterest,
) -> Result<usize> {
    let certs = cert_folder_to_vec(certs_dir, toi)?;
    trust_index.add_known(&certs, origin);
    Ok(certs.len())
}

#[test]
fn missing_folder_test() {
    let mut ti = TrustIndex::new();
    let r = load_trust_anchors_from_folder(
        &mut ti,
        "/this/folder/does/not/exist",
        TimeOfInterest::disabled(),
    );
    assert_eq!(Err(Error::NotFound), r);
    assert!(ti.is_empty());
}
