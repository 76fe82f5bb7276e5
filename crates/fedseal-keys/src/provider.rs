#![forbid(unsafe_code)]

//! Key-wrap providers.
//!
//! A [`CryptoProviderFactory`] decides whether a key-wrap algorithm can be
//! used with a given key and builds the [`KeyWrapProvider`] that wraps or
//! unwraps session keys with it. [`DefaultCryptoProviderFactory`] covers
//! RSA-OAEP, RSA PKCS#1 v1.5 and AES key wrap.

use crate::key::{Key, KeyData};
use fedseal_core::{Error, KeyWrapAlgorithm, Result};
use fedseal_crypto::{AesKeyWrap, OaepParams, RsaKeyTransport};
use zeroize::Zeroizing;

/// Wraps and unwraps session keys with one key-encryption key.
pub trait KeyWrapProvider: Send + Sync {
    fn wrap_key(&self, key_bytes: &[u8]) -> Result<Vec<u8>>;
    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>>;
}

/// Creates key-wrap providers. Replaceable through
/// `TokenValidationParameters` for hardware-backed keys.
pub trait CryptoProviderFactory: Send + Sync {
    fn is_supported_key_wrap(&self, algorithm: &str, key: &Key) -> bool;

    fn create_key_wrap_provider(
        &self,
        key: &Key,
        algorithm: &str,
        oaep_params: &OaepParams,
    ) -> Result<Box<dyn KeyWrapProvider>>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultCryptoProviderFactory;

impl CryptoProviderFactory for DefaultCryptoProviderFactory {
    fn is_supported_key_wrap(&self, algorithm: &str, key: &Key) -> bool {
        let Some(alg) = KeyWrapAlgorithm::from_uri(algorithm) else {
            return false;
        };
        match &key.data {
            KeyData::Rsa { .. } => alg.is_asymmetric(),
            KeyData::Aes(kek) => alg.kek_len() == Some(kek.len()),
        }
    }

    fn create_key_wrap_provider(
        &self,
        key: &Key,
        algorithm: &str,
        oaep_params: &OaepParams,
    ) -> Result<Box<dyn KeyWrapProvider>> {
        if !self.is_supported_key_wrap(algorithm, key) {
            return Err(Error::UnsupportedAlgorithm(format!(
                "key wrap {algorithm} with {:?}",
                key.data
            )));
        }
        match &key.data {
            KeyData::Rsa { private, public } => Ok(Box::new(RsaKeyWrapProvider {
                transport: RsaKeyTransport::from_uri(algorithm, oaep_params)?,
                public: public.clone(),
                private: private.clone(),
            })),
            KeyData::Aes(kek) => {
                let alg = KeyWrapAlgorithm::from_uri(algorithm)
                    .ok_or_else(|| Error::UnsupportedAlgorithm(algorithm.to_owned()))?;
                Ok(Box::new(AesKeyWrapProvider {
                    wrap: AesKeyWrap::for_algorithm(alg)?,
                    kek: kek.clone(),
                }))
            }
        }
    }
}

struct RsaKeyWrapProvider {
    transport: RsaKeyTransport,
    public: rsa::RsaPublicKey,
    private: Option<rsa::RsaPrivateKey>,
}

impl KeyWrapProvider for RsaKeyWrapProvider {
    fn wrap_key(&self, key_bytes: &[u8]) -> Result<Vec<u8>> {
        self.transport.encrypt(&self.public, key_bytes)
    }

    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let private = self
            .private
            .as_ref()
            .ok_or_else(|| Error::Key("RSA private key required to unwrap".into()))?;
        self.transport.decrypt(private, wrapped)
    }
}

struct AesKeyWrapProvider {
    wrap: AesKeyWrap,
    kek: Zeroizing<Vec<u8>>,
}

impl KeyWrapProvider for AesKeyWrapProvider {
    fn wrap_key(&self, key_bytes: &[u8]) -> Result<Vec<u8>> {
        self.wrap.wrap(&self.kek, key_bytes)
    }

    fn unwrap_key(&self, wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.wrap.unwrap(&self.kek, wrapped)
    }
}
