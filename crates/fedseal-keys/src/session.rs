#![forbid(unsafe_code)]

//! Session keys: generation, wrapping and recovery.

use crate::credentials::EncryptingCredentials;
use crate::key::Key;
use crate::provider::CryptoProviderFactory;
use fedseal_core::{ContentEncryptionAlgorithm, Error, Result};
use fedseal_crypto::{AesCbc, OaepParams};
use rand::RngCore;
use tracing::debug;
use zeroize::Zeroizing;

/// A one-time symmetric key for the token payload. Wiped on drop.
#[derive(Clone)]
pub struct SessionKey {
    algorithm: ContentEncryptionAlgorithm,
    bytes: Zeroizing<Vec<u8>>,
}

impl SessionKey {
    /// Fresh random key sized for `algorithm`.
    pub fn generate(algorithm: ContentEncryptionAlgorithm) -> Self {
        let mut bytes = Zeroizing::new(vec![0u8; algorithm.key_len()]);
        rand::thread_rng().fill_bytes(&mut bytes);
        Self { algorithm, bytes }
    }

    /// Wrap existing bytes; the length must match the algorithm.
    pub fn from_bytes(algorithm: ContentEncryptionAlgorithm, bytes: Zeroizing<Vec<u8>>) -> Result<Self> {
        if bytes.len() != algorithm.key_len() {
            return Err(Error::Encryption(format!(
                "session key is {} bytes, {} requires {}",
                bytes.len(),
                algorithm.uri(),
                algorithm.key_len()
            )));
        }
        Ok(Self { algorithm, bytes })
    }

    pub fn algorithm(&self) -> ContentEncryptionAlgorithm {
        self.algorithm
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// AES-CBC encrypt, returning `IV || ciphertext`.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        AesCbc::new(self.algorithm)
            .encrypt(&self.bytes, plaintext, None)
            .map(|c| c.to_wire())
    }

    /// AES-CBC decrypt `IV || ciphertext`.
    pub fn decrypt(&self, iv_and_ciphertext: &[u8]) -> Result<Vec<u8>> {
        AesCbc::new(self.algorithm).decrypt(&self.bytes, iv_and_ciphertext)
    }
}

impl std::fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionKey")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

/// Generate a session key for the credential's content algorithm and wrap
/// it with the credential's key.
///
/// Returns the session key and the wrapped bytes destined for the
/// `EncryptedKey`'s `CipherValue`.
pub fn get_security_key(
    credentials: &EncryptingCredentials,
    factory: &dyn CryptoProviderFactory,
) -> Result<(SessionKey, Vec<u8>)> {
    if !factory.is_supported_key_wrap(&credentials.key_wrap_algorithm, &credentials.key) {
        return Err(Error::Encryption(format!(
            "key wrap algorithm '{}' is not supported for {:?}",
            credentials.key_wrap_algorithm, credentials.key.data
        )));
    }
    let algorithm = content_algorithm(&credentials.content_encryption_algorithm)?;

    let session_key = SessionKey::generate(algorithm);
    let provider = factory
        .create_key_wrap_provider(
            &credentials.key,
            &credentials.key_wrap_algorithm,
            &credentials.oaep_params,
        )
        .map_err(as_encryption_failure)?;
    let wrapped = provider
        .wrap_key(session_key.as_bytes())
        .map_err(as_encryption_failure)?;

    debug!(
        key_wrap = %credentials.key_wrap_algorithm,
        content = %algorithm.uri(),
        wrapped_len = wrapped.len(),
        "generated and wrapped session key"
    );
    Ok((session_key, wrapped))
}

/// Recover a session key from its wrapped form.
///
/// An unwrapped value longer than the content algorithm needs is truncated;
/// a shorter one is an error.
pub fn unwrap_session_key(
    key: &Key,
    key_wrap_algorithm: &str,
    oaep_params: &OaepParams,
    wrapped: &[u8],
    content_encryption_algorithm: &str,
    factory: &dyn CryptoProviderFactory,
) -> Result<SessionKey> {
    if !factory.is_supported_key_wrap(key_wrap_algorithm, key) {
        return Err(Error::Encryption(format!(
            "key wrap algorithm '{key_wrap_algorithm}' is not supported for {:?}",
            key.data
        )));
    }
    let algorithm = content_algorithm(content_encryption_algorithm)?;
    let provider = factory
        .create_key_wrap_provider(key, key_wrap_algorithm, oaep_params)
        .map_err(as_encryption_failure)?;
    let mut bytes = provider.unwrap_key(wrapped).map_err(as_encryption_failure)?;

    let needed = algorithm.key_len();
    if bytes.len() < needed {
        return Err(Error::Encryption(format!(
            "unwrapped key is {} bytes, {} requires {needed}",
            bytes.len(),
            algorithm.uri()
        )));
    }
    bytes.truncate(needed);
    SessionKey::from_bytes(algorithm, bytes)
}

fn content_algorithm(uri: &str) -> Result<ContentEncryptionAlgorithm> {
    ContentEncryptionAlgorithm::from_uri(uri).ok_or_else(|| {
        Error::Encryption(format!("unsupported content encryption algorithm '{uri}'"))
    })
}

fn as_encryption_failure(err: Error) -> Error {
    match err {
        Error::Encryption(_) => err,
        other => Error::Encryption(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::DefaultCryptoProviderFactory;
    use fedseal_core::algorithm;

    fn rsa_key() -> Key {
        Key::rsa_private(rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap())
    }

    #[test]
    fn test_session_key_length_follows_content_algorithm() {
        let key = rsa_key();
        for (uri, len) in [
            (algorithm::AES128_CBC, 16),
            (algorithm::AES192_CBC, 24),
            (algorithm::AES256_CBC, 32),
        ] {
            let creds = EncryptingCredentials::new(key.clone(), algorithm::RSA_OAEP, uri);
            let (session, _) = get_security_key(&creds, &DefaultCryptoProviderFactory).unwrap();
            assert_eq!(session.as_bytes().len(), len);
        }
    }

    #[test]
    fn test_wrap_then_unwrap_recovers_session_key() {
        let creds = EncryptingCredentials::new(rsa_key(), algorithm::RSA_OAEP, algorithm::AES256_CBC);
        let (session, wrapped) = get_security_key(&creds, &DefaultCryptoProviderFactory).unwrap();
        let recovered = unwrap_session_key(
            &creds.key,
            algorithm::RSA_OAEP_LEGACY,
            &OaepParams::default(),
            &wrapped,
            algorithm::AES256_CBC,
            &DefaultCryptoProviderFactory,
        )
        .unwrap();
        assert_eq!(recovered.as_bytes(), session.as_bytes());
    }

    #[test]
    fn test_binary_oaep_label_fails_instead_of_colliding() {
        let key = rsa_key();
        let binary = |byte: u8| OaepParams {
            label: Some(vec![byte]),
            ..OaepParams::default()
        };
        let creds = EncryptingCredentials::new(key.clone(), algorithm::RSA_OAEP, algorithm::AES128_CBC)
            .with_oaep_params(binary(0xff));
        let err = get_security_key(&creds, &DefaultCryptoProviderFactory).unwrap_err();
        assert!(matches!(err, Error::Encryption(msg) if msg.contains("UTF-8")));

        let plain = EncryptingCredentials::new(key.clone(), algorithm::RSA_OAEP, algorithm::AES128_CBC);
        let (_, wrapped) = get_security_key(&plain, &DefaultCryptoProviderFactory).unwrap();
        let err = unwrap_session_key(
            &key,
            algorithm::RSA_OAEP,
            &binary(0xfe),
            &wrapped,
            algorithm::AES128_CBC,
            &DefaultCryptoProviderFactory,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Encryption(_)));
    }

    #[test]
    fn test_unknown_content_algorithm_has_no_fallback() {
        let creds = EncryptingCredentials::new(
            rsa_key(),
            algorithm::RSA_OAEP,
            "http://www.w3.org/2001/04/xmlenc#tripledes-cbc",
        );
        let err = get_security_key(&creds, &DefaultCryptoProviderFactory).unwrap_err();
        assert!(matches!(err, Error::Encryption(_)));
    }

    #[test]
    fn test_unsupported_wrap_for_key() {
        let creds = EncryptingCredentials::new(
            Key::aes(vec![0u8; 16]),
            algorithm::RSA_OAEP,
            algorithm::AES128_CBC,
        );
        let err = get_security_key(&creds, &DefaultCryptoProviderFactory).unwrap_err();
        assert!(matches!(err, Error::Encryption(msg) if msg.contains("not supported")));
    }

    #[test]
    fn test_overlong_unwrapped_key_is_truncated() {
        let kek = Key::aes(vec![0x42u8; 16]);
        let provider = DefaultCryptoProviderFactory
            .create_key_wrap_provider(&kek, algorithm::KW_AES128, &OaepParams::default())
            .unwrap();
        let long: Vec<u8> = (0u8..32).collect();
        let wrapped = provider.wrap_key(&long).unwrap();

        let session = unwrap_session_key(
            &kek,
            algorithm::KW_AES128,
            &OaepParams::default(),
            &wrapped,
            algorithm::AES128_CBC,
            &DefaultCryptoProviderFactory,
        )
        .unwrap();
        assert_eq!(session.as_bytes(), &long[..16]);

        let short = provider.wrap_key(&[1u8; 16]).unwrap();
        let err = unwrap_session_key(
            &kek,
            algorithm::KW_AES128,
            &OaepParams::default(),
            &short,
            algorithm::AES256_CBC,
            &DefaultCryptoProviderFactory,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Encryption(_)));
    }

    #[test]
    fn test_session_key_encrypts_with_iv_prefix() {
        let session = SessionKey::generate(ContentEncryptionAlgorithm::Aes128Cbc);
        let wire = session.encrypt(b"<Token>abc</Token>").unwrap();
        assert_eq!(wire.len(), 16 + 32);
        assert_eq!(session.decrypt(&wire).unwrap(), b"<Token>abc</Token>");
        assert!(!format!("{session:?}").contains("bytes"));
    }
}
