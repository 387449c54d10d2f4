//! Provides implementations of crypto-related [`LtvEnvironment`] interfaces using libraries from the
//! [Rust Crypto](https://github.com/RustCrypto) project for support.

use alloc::vec::Vec;

use der::{asn1::ObjectIdentifier, Encode};
use log::error;
use p256::ecdsa::{
    signature::Verifier as Verifier256, Signature as Signature256, VerifyingKey as VerifyingKey256,
};
use p384::ecdsa::{Signature as Signature384, VerifyingKey as VerifyingKey384};
use rsa::pkcs8::DecodePublicKey;
use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::Sha1;
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};
use spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};

use crate::util::error::{Error, Result};
use crate::{environment::ltv_environment::*, util::ltv_alg_oids::*};

/// get_padding_scheme takes an AlgorithmIdentifier containing a signature algorithm and returns
/// a corresponding Pkcs1v15Sign instance.
///
/// At present, only the PKCS1v15Sign passing scheme is supported, relative to the
/// [`PKIXALG_SHA1_WITH_RSA_ENCRYPTION`], [`PKIXALG_SHA224_WITH_RSA_ENCRYPTION`],
/// [`PKIXALG_SHA256_WITH_RSA_ENCRYPTION`], [`PKIXALG_SHA384_WITH_RSA_ENCRYPTION`] and
/// [`PKIXALG_SHA512_WITH_RSA_ENCRYPTION`] algorithm identifiers.
pub fn get_padding_scheme(signature_alg: &AlgorithmIdentifierOwned) -> Result<Pkcs1v15Sign> {
    match signature_alg.oid {
        PKIXALG_SHA1_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha1>()),
        PKIXALG_SHA224_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha224>()),
        PKIXALG_SHA256_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha256>()),
        PKIXALG_SHA384_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha384>()),
        PKIXALG_SHA512_WITH_RSA_ENCRYPTION => Ok(Pkcs1v15Sign::new::<Sha512>()),
        _ => Err(Error::Unrecognized),
    }
}

/// is_rsa returns true is the presented OID is one of the sha*WithRSAEncryption algorithm identifiers
/// supported by [`get_padding_scheme`] and false otherwise.
pub(crate) fn is_rsa(oid: &ObjectIdentifier) -> bool {
    *oid == PKIXALG_SHA256_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA384_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA224_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA512_WITH_RSA_ENCRYPTION
        || *oid == PKIXALG_SHA1_WITH_RSA_ENCRYPTION
}

/// is_ecdsa returns true is the presented OID is one of [`PKIXALG_ECDSA_WITH_SHA224`],
/// [`PKIXALG_ECDSA_WITH_SHA256`], [`PKIXALG_ECDSA_WITH_SHA384`] or [`PKIXALG_ECDSA_WITH_SHA512`] and false otherwise.
pub(crate) fn is_ecdsa(oid: &ObjectIdentifier) -> bool {
    *oid == PKIXALG_ECDSA_WITH_SHA256
        || *oid == PKIXALG_ECDSA_WITH_SHA384
        || *oid == PKIXALG_ECDSA_WITH_SHA224
        || *oid == PKIXALG_ECDSA_WITH_SHA512
}

/// get_hash_alg_from_sig_alg takes an ObjectIdentifier that notionally contains a signature
/// algorithm and returns an AlgorithmIdentifier for the corresponding hash algorithm.
pub fn get_hash_alg_from_sig_alg(sig_alg: &ObjectIdentifier) -> Result<AlgorithmIdentifierOwned> {
    let oid = match *sig_alg {
        PKIXALG_SHA1_WITH_RSA_ENCRYPTION => PKIXALG_SHA1,
        PKIXALG_SHA224_WITH_RSA_ENCRYPTION | PKIXALG_ECDSA_WITH_SHA224 => PKIXALG_SHA224,
        PKIXALG_SHA256_WITH_RSA_ENCRYPTION | PKIXALG_ECDSA_WITH_SHA256 => PKIXALG_SHA256,
        PKIXALG_SHA384_WITH_RSA_ENCRYPTION | PKIXALG_ECDSA_WITH_SHA384 => PKIXALG_SHA384,
        PKIXALG_SHA512_WITH_RSA_ENCRYPTION | PKIXALG_ECDSA_WITH_SHA512 => PKIXALG_SHA512,
        _ => return Err(Error::Unrecognized),
    };
    Ok(AlgorithmIdentifierOwned {
        oid,
        parameters: None,
    })
}

/// calculate_hash_rust_crypto implements the [`CalculateHash`](../ltvval/ltv_environment_traits/type.CalculateHash.html)
/// interface for [`LtvEnvironment`] using implementations from the Rust Crypto project.
///
/// It supports [`PKIXALG_SHA1`], [`PKIXALG_SHA224`], [`PKIXALG_SHA256`], [`PKIXALG_SHA384`] and [`PKIXALG_SHA512`].
/// SHA-1 is needed for OCSP CertID values, which are overwhelmingly computed with SHA-1.
pub fn calculate_hash_rust_crypto(
    _env: &LtvEnvironment,
    hash_alg: &AlgorithmIdentifierOwned,
    buffer_to_hash: &[u8],
) -> Result<Vec<u8>> {
    match hash_alg.oid {
        PKIXALG_SHA1 => Ok(Sha1::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA224 => Ok(Sha224::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA256 => Ok(Sha256::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA384 => Ok(Sha384::digest(buffer_to_hash).to_vec()),
        PKIXALG_SHA512 => Ok(Sha512::digest(buffer_to_hash).to_vec()),
        _ => Err(Error::Unrecognized),
    }
}

fn get_named_curve_parameter(alg_id: &AlgorithmIdentifierOwned) -> Result<ObjectIdentifier> {
    if let Some(params) = &alg_id.parameters {
        if let Ok(oid) = params.decode_as::<ObjectIdentifier>() {
            return Ok(oid);
        }
    }
    Err(Error::ParseError)
}

/// verify_signature_message_rust_crypto implements the [`VerifySignatureMessage`](../ltvval/ltv_environment_traits/type.VerifySignatureMessage.html)
/// interface for [`LtvEnvironment`] using implementations from the [Rust Crypto](https://github.com/RustCrypto) project.
///
/// RSA PKCS #1 v1.5 signatures and ECDSA signatures using P256 or P384 are supported at present.
pub fn verify_signature_message_rust_crypto(
    env: &LtvEnvironment,
    message_to_verify: &[u8],                 // buffer to verify
    signature: &[u8],                         // signature
    signature_alg: &AlgorithmIdentifierOwned, // signature algorithm
    spki: &SubjectPublicKeyInfoOwned,         // public key
) -> Result<()> {
    if is_rsa(&signature_alg.oid) {
        let enc_spki = spki.to_der()?;
        let rsa = match RsaPublicKey::from_public_key_der(&enc_spki) {
            Ok(rsa) => rsa,
            Err(_e) => return Err(Error::ParseError),
        };
        let hash_alg = get_hash_alg_from_sig_alg(&signature_alg.oid)?;
        let hash_to_verify = calculate_hash_rust_crypto(env, &hash_alg, message_to_verify)?;
        let ps = get_padding_scheme(signature_alg)?;
        return rsa
            .verify(ps, hash_to_verify.as_slice(), signature)
            .map_err(|_e| Error::SignatureVerificationFailure);
    } else if is_ecdsa(&signature_alg.oid) {
        let named_curve = get_named_curve_parameter(&spki.algorithm)?;
        let key_bytes = spki.subject_public_key.raw_bytes();
        return match named_curve {
            PKIXALG_SECP256R1 => {
                let ecdsa = VerifyingKey256::from_sec1_bytes(key_bytes)
                    .map_err(|_e| Error::ParseError)?;
                let s = Signature256::from_der(signature).map_err(|_e| Error::ParseError)?;
                ecdsa
                    .verify(message_to_verify, &s)
                    .map_err(|_e| Error::SignatureVerificationFailure)
            }
            PKIXALG_SECP384R1 => {
                let ecdsa = VerifyingKey384::from_sec1_bytes(key_bytes)
                    .map_err(|_e| Error::ParseError)?;
                let s = Signature384::from_der(signature).map_err(|_e| Error::ParseError)?;
                ecdsa
                    .verify(message_to_verify, &s)
                    .map_err(|_e| Error::SignatureVerificationFailure)
            }
            _ => {
                error!("Unrecognized or unsupported named curve: {}", named_curve);
                Err(Error::Unrecognized)
            }
        };
    }
    error!("Unrecognized signature algorithm: {}", signature_alg.oid);
    Err(Error::Unrecognized)
}

#[test]
fn test_calculate_hash() {
    use hex_literal::hex;
    let mut env = LtvEnvironment::default();
    env.clear_all_callbacks();
    env.add_calculate_hash_callback(calculate_hash_rust_crypto);

    let hash_algorithm = AlgorithmIdentifierOwned {
        oid: PKIXALG_SHA256,
        parameters: None,
    };
    let result = env
        .calculate_hash(&hash_algorithm, "abc".as_bytes())
        .unwrap();
    assert_eq!(
        result,
        hex!("BA7816BF8F01CFEA414140DE5DAE2223B00361A396177A9CB410FF61F20015AD")
    );

    let hash_algorithm = AlgorithmIdentifierOwned {
        oid: PKIXALG_SHA1,
        parameters: None,
    };
    let result = env
        .calculate_hash(&hash_algorithm, "abc".as_bytes())
        .unwrap();
    assert_eq!(result, hex!("A9993E364706816ABA3E25717850C26C9CD0D89D"));
}

#[test]
fn test_get_hash_alg_from_sig_alg() {
    assert_eq!(
        get_hash_alg_from_sig_alg(&PKIXALG_ECDSA_WITH_SHA384)
            .unwrap()
            .oid,
        PKIXALG_SHA384
    );
    assert_eq!(
        get_hash_alg_from_sig_alg(&PKIXALG_SHA1_WITH_RSA_ENCRYPTION)
            .unwrap()
            .oid,
        PKIXALG_SHA1
    );
    assert!(get_hash_alg_from_sig_alg(&PKIXALG_SHA1).is_err());
}

#[test]
fn test_unsupported_signature_algorithm() {
    use der::asn1::BitString;
    let env = LtvEnvironment::default();
    let spki = SubjectPublicKeyInfoOwned {
        algorithm: AlgorithmIdentifierOwned {
            oid: PKIXALG_RSA_ENCRYPTION,
            parameters: None,
        },
        subject_public_key: BitString::from_bytes(&[1, 2, 3]).unwrap(),
    };
    let alg = AlgorithmIdentifierOwned {
        oid: PKIXALG_SHA256,
        parameters: None,
    };
    assert_eq!(
        Err(Error::Unrecognized),
        verify_signature_message_rust_crypto(&env, b"abc", b"sig", &alg, &spki)
    );
}
