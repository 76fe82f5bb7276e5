#![forbid(unsafe_code)]

use crate::key::Key;
use fedseal_crypto::OaepParams;

/// The key and algorithms used to encrypt a token.
#[derive(Debug, Clone)]
pub struct EncryptingCredentials {
    /// Recipient key that wraps the session key.
    pub key: Key,
    /// Key-wrap (key transport) algorithm URI.
    pub key_wrap_algorithm: String,
    /// Content-encryption algorithm URI; selects the session key length.
    pub content_encryption_algorithm: String,
    /// RSA-OAEP digest, MGF and label. Ignored by other wrap algorithms.
    pub oaep_params: OaepParams,
}

impl EncryptingCredentials {
    pub fn new(
        key: Key,
        key_wrap_algorithm: impl Into<String>,
        content_encryption_algorithm: impl Into<String>,
    ) -> Self {
        Self {
            key,
            key_wrap_algorithm: key_wrap_algorithm.into(),
            content_encryption_algorithm: content_encryption_algorithm.into(),
            oaep_params: OaepParams::default(),
        }
    }

    pub fn with_oaep_params(mut self, oaep_params: OaepParams) -> Self {
        self.oaep_params = oaep_params;
        self
    }
}
