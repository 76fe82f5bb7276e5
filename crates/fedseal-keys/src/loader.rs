#![forbid(unsafe_code)]

//! Key loading from PEM, DER and raw binary.

use crate::key::Key;
use fedseal_core::{Error, Result};

/// Load an RSA private key from PEM (PKCS#8 or PKCS#1).
pub fn load_rsa_private_pem(pem_data: &[u8]) -> Result<Key> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;
    let pem_str = pem_str(pem_data)?;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_pem(pem_str) {
        return Ok(Key::rsa_private(pk));
    }
    let pk = rsa::RsaPrivateKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key PEM: {e}")))?;
    Ok(Key::rsa_private(pk))
}

/// Load an RSA public key from PEM (SPKI or PKCS#1).
pub fn load_rsa_public_pem(pem_data: &[u8]) -> Result<Key> {
    use pkcs1::DecodeRsaPublicKey;
    use pkcs8::DecodePublicKey;
    let pem_str = pem_str(pem_data)?;

    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_pem(pem_str) {
        return Ok(Key::rsa_public(pk));
    }
    let pk = rsa::RsaPublicKey::from_pkcs1_pem(pem_str)
        .map_err(|e| Error::Key(format!("failed to parse RSA public key PEM: {e}")))?;
    Ok(Key::rsa_public(pk))
}

/// Load an RSA private key from DER (PKCS#8 or PKCS#1).
pub fn load_rsa_private_der(der: &[u8]) -> Result<Key> {
    use pkcs1::DecodeRsaPrivateKey;
    use pkcs8::DecodePrivateKey;

    if let Ok(pk) = rsa::RsaPrivateKey::from_pkcs8_der(der) {
        return Ok(Key::rsa_private(pk));
    }
    let pk = rsa::RsaPrivateKey::from_pkcs1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse RSA private key DER: {e}")))?;
    Ok(Key::rsa_private(pk))
}

/// Load an RSA public key from DER (SPKI or PKCS#1).
pub fn load_rsa_public_der(der: &[u8]) -> Result<Key> {
    use pkcs1::DecodeRsaPublicKey;
    use pkcs8::DecodePublicKey;

    if let Ok(pk) = rsa::RsaPublicKey::from_public_key_der(der) {
        return Ok(Key::rsa_public(pk));
    }
    let pk = rsa::RsaPublicKey::from_pkcs1_der(der)
        .map_err(|e| Error::Key(format!("failed to parse RSA public key DER: {e}")))?;
    Ok(Key::rsa_public(pk))
}

/// Load an AES key from raw binary data.
pub fn load_aes_key(data: &[u8]) -> Result<Key> {
    match data.len() {
        16 | 24 | 32 => Ok(Key::aes(data)),
        n => Err(Error::Key(format!(
            "invalid AES key size: {n} (expected 16, 24, or 32)"
        ))),
    }
}

fn pem_str(pem_data: &[u8]) -> Result<&str> {
    std::str::from_utf8(pem_data).map_err(|e| Error::Key(format!("invalid PEM encoding: {e}")))
}
