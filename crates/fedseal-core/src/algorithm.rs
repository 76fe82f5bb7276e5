#![forbid(unsafe_code)]

//! Algorithm URIs and the mapping between external URIs and the
//! algorithms this library implements.

// ── Digest algorithms ────────────────────────────────────────────────

pub const SHA1: &str = "http://www.w3.org/2000/09/xmldsig#sha1";
pub const SHA224: &str = "http://www.w3.org/2001/04/xmldsig-more#sha224";
pub const SHA256: &str = "http://www.w3.org/2001/04/xmlenc#sha256";
pub const SHA384: &str = "http://www.w3.org/2001/04/xmldsig-more#sha384";
pub const SHA512: &str = "http://www.w3.org/2001/04/xmlenc#sha512";

// ── Block cipher algorithms ──────────────────────────────────────────

pub const AES128_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes128-cbc";
pub const AES192_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes192-cbc";
pub const AES256_CBC: &str = "http://www.w3.org/2001/04/xmlenc#aes256-cbc";

// ── Key wrap algorithms ──────────────────────────────────────────────

pub const KW_AES128: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes128";
pub const KW_AES192: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes192";
pub const KW_AES256: &str = "http://www.w3.org/2001/04/xmlenc#kw-aes256";

// ── Key transport algorithms ─────────────────────────────────────────

pub const RSA_PKCS1: &str = "http://www.w3.org/2001/04/xmlenc#rsa-1_5";
/// Canonical RSA-OAEP spelling; the one emitted on write.
pub const RSA_OAEP: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep-mgf1p";
/// Legacy spelling found in WS-Trust/SAML deployments.
pub const RSA_OAEP_LEGACY: &str = "http://www.w3.org/2001/04/xmlenc#rsa-oaep";
pub const RSA_OAEP_ENC11: &str = "http://www.w3.org/2009/xmlenc11#rsa-oaep";

// ── MGF algorithms ───────────────────────────────────────────────────

pub const MGF1_SHA1: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha1";
pub const MGF1_SHA224: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha224";
pub const MGF1_SHA256: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha256";
pub const MGF1_SHA384: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha384";
pub const MGF1_SHA512: &str = "http://www.w3.org/2009/xmlenc11#mgf1sha512";

/// Returns true for every accepted spelling of RSA-OAEP key transport.
pub fn is_rsa_oaep(uri: &str) -> bool {
    matches!(uri, RSA_OAEP | RSA_OAEP_LEGACY | RSA_OAEP_ENC11)
}

/// Algorithms that can wrap (transport) a session key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyWrapAlgorithm {
    RsaOaep,
    RsaPkcs1,
    AesKw128,
    AesKw192,
    AesKw256,
}

impl KeyWrapAlgorithm {
    /// Map an external URI onto the internal algorithm. All RSA-OAEP
    /// spellings select [`KeyWrapAlgorithm::RsaOaep`].
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            RSA_OAEP | RSA_OAEP_LEGACY | RSA_OAEP_ENC11 => Some(Self::RsaOaep),
            RSA_PKCS1 => Some(Self::RsaPkcs1),
            KW_AES128 => Some(Self::AesKw128),
            KW_AES192 => Some(Self::AesKw192),
            KW_AES256 => Some(Self::AesKw256),
            _ => None,
        }
    }

    /// The canonical URI written on the wire.
    pub fn uri(self) -> &'static str {
        match self {
            Self::RsaOaep => RSA_OAEP,
            Self::RsaPkcs1 => RSA_PKCS1,
            Self::AesKw128 => KW_AES128,
            Self::AesKw192 => KW_AES192,
            Self::AesKw256 => KW_AES256,
        }
    }

    /// Size in bytes of the key-encryption key for the AES wrap family.
    pub fn kek_len(self) -> Option<usize> {
        match self {
            Self::AesKw128 => Some(16),
            Self::AesKw192 => Some(24),
            Self::AesKw256 => Some(32),
            Self::RsaOaep | Self::RsaPkcs1 => None,
        }
    }

    pub fn is_asymmetric(self) -> bool {
        matches!(self, Self::RsaOaep | Self::RsaPkcs1)
    }
}

/// Symmetric algorithms used for the token payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentEncryptionAlgorithm {
    Aes128Cbc,
    Aes192Cbc,
    Aes256Cbc,
}

impl ContentEncryptionAlgorithm {
    pub fn from_uri(uri: &str) -> Option<Self> {
        match uri {
            AES128_CBC => Some(Self::Aes128Cbc),
            AES192_CBC => Some(Self::Aes192Cbc),
            AES256_CBC => Some(Self::Aes256Cbc),
            _ => None,
        }
    }

    pub fn uri(self) -> &'static str {
        match self {
            Self::Aes128Cbc => AES128_CBC,
            Self::Aes192Cbc => AES192_CBC,
            Self::Aes256Cbc => AES256_CBC,
        }
    }

    pub fn key_size_bits(self) -> usize {
        match self {
            Self::Aes128Cbc => 128,
            Self::Aes192Cbc => 192,
            Self::Aes256Cbc => 256,
        }
    }

    pub fn key_len(self) -> usize {
        self.key_size_bits() / 8
    }
}
