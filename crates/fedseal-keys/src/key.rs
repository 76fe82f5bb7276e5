#![forbid(unsafe_code)]

//! Key types.

use zeroize::Zeroizing;

/// The underlying key data.
#[derive(Clone)]
pub enum KeyData {
    Rsa {
        private: Option<rsa::RsaPrivateKey>,
        public: rsa::RsaPublicKey,
    },
    /// AES key-encryption key (16, 24 or 32 bytes).
    Aes(Zeroizing<Vec<u8>>),
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rsa { private, .. } => {
                if private.is_some() {
                    write!(f, "RSA private+public key")
                } else {
                    write!(f, "RSA public key")
                }
            }
            Self::Aes(k) => write!(f, "AES key ({} bytes)", k.len()),
        }
    }
}

/// A key with an optional identifier used by key resolvers.
#[derive(Debug, Clone)]
pub struct Key {
    /// Identifier written as `ds:KeyName` and matched on resolution.
    pub key_id: Option<String>,
    pub data: KeyData,
}

impl Key {
    pub fn new(data: KeyData) -> Self {
        Self { key_id: None, data }
    }

    /// An RSA key pair.
    pub fn rsa_private(private: rsa::RsaPrivateKey) -> Self {
        let public = private.to_public_key();
        Self::new(KeyData::Rsa {
            private: Some(private),
            public,
        })
    }

    /// An RSA public key, usable for wrapping only.
    pub fn rsa_public(public: rsa::RsaPublicKey) -> Self {
        Self::new(KeyData::Rsa {
            private: None,
            public,
        })
    }

    pub fn aes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(KeyData::Aes(Zeroizing::new(bytes.into())))
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = Some(key_id.into());
        self
    }

    pub fn symmetric_key_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            KeyData::Aes(k) => Some(k),
            KeyData::Rsa { .. } => None,
        }
    }

    pub fn rsa_public_key(&self) -> Option<&rsa::RsaPublicKey> {
        match &self.data {
            KeyData::Rsa { public, .. } => Some(public),
            KeyData::Aes(_) => None,
        }
    }

    pub fn rsa_private_key(&self) -> Option<&rsa::RsaPrivateKey> {
        match &self.data {
            KeyData::Rsa {
                private: Some(pk), ..
            } => Some(pk),
            _ => None,
        }
    }

    /// Public half only. Symmetric keys are returned unchanged.
    pub fn to_public(&self) -> Self {
        let data = match &self.data {
            KeyData::Rsa { public, .. } => KeyData::Rsa {
                private: None,
                public: public.clone(),
            },
            KeyData::Aes(k) => KeyData::Aes(k.clone()),
        };
        Self {
            key_id: self.key_id.clone(),
            data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_never_prints_key_bytes() {
        let key = Key::aes(vec![0xAB; 16]).with_key_id("kek-1");
        let dbg = format!("{key:?}");
        assert!(dbg.contains("AES key (16 bytes)"));
        assert!(!dbg.contains("171"));
        assert_eq!(key.key_id.as_deref(), Some("kek-1"));
    }

    #[test]
    fn test_public_half_drops_private_key() {
        let sk = rsa::RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let key = Key::rsa_private(sk).with_key_id("rsa");
        assert!(key.rsa_private_key().is_some());
        let public = key.to_public();
        assert!(public.rsa_private_key().is_none());
        assert_eq!(public.rsa_public_key(), key.rsa_public_key());
        assert_eq!(public.key_id.as_deref(), Some("rsa"));
        assert!(public.symmetric_key_bytes().is_none());
    }
}
