#![forbid(unsafe_code)]

//! AES-CBC content encryption.
//!
//! Wire layout is `IV || ciphertext` with a 16-byte IV. Encryption pads
//! with PKCS#7. Decryption accepts any XML Encryption padding whose last
//! byte gives the pad length, which covers PKCS#7 and ISO 10126.

use fedseal_core::{ContentEncryptionAlgorithm, Error, Result};

/// AES block size, and therefore the IV length.
pub const AES_BLOCK_SIZE: usize = 16;

/// Output of an AES-CBC encryption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AesCbcCiphertext {
    /// The IV that was used.
    pub iv: [u8; AES_BLOCK_SIZE],
    /// Ciphertext without the IV prefix.
    pub ciphertext: Vec<u8>,
}

impl AesCbcCiphertext {
    /// `IV || ciphertext`, as carried in `CipherValue`.
    pub fn to_wire(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(AES_BLOCK_SIZE + self.ciphertext.len());
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out
    }
}

/// AES-CBC bound to one key size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesCbc {
    algorithm: ContentEncryptionAlgorithm,
}

impl AesCbc {
    pub fn new(algorithm: ContentEncryptionAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Create from a content-encryption URI.
    pub fn from_uri(uri: &str) -> Result<Self> {
        ContentEncryptionAlgorithm::from_uri(uri)
            .map(Self::new)
            .ok_or_else(|| Error::UnsupportedAlgorithm(format!("content encryption: {uri}")))
    }

    /// Select the variant from a raw key length (16, 24 or 32 bytes).
    pub fn for_key(key: &[u8]) -> Result<Self> {
        let algorithm = match key.len() {
            16 => ContentEncryptionAlgorithm::Aes128Cbc,
            24 => ContentEncryptionAlgorithm::Aes192Cbc,
            32 => ContentEncryptionAlgorithm::Aes256Cbc,
            n => return Err(Error::Crypto(format!("no AES variant for a {n} byte key"))),
        };
        Ok(Self::new(algorithm))
    }

    pub fn algorithm(&self) -> ContentEncryptionAlgorithm {
        self.algorithm
    }

    fn check_key(&self, key: &[u8]) -> Result<()> {
        if key.len() != self.algorithm.key_len() {
            return Err(Error::Crypto(format!(
                "expected {} byte key, got {}",
                self.algorithm.key_len(),
                key.len()
            )));
        }
        Ok(())
    }

    /// Encrypt `plaintext`. A random IV is generated when `iv` is `None`.
    pub fn encrypt(
        &self,
        key: &[u8],
        plaintext: &[u8],
        iv: Option<[u8; AES_BLOCK_SIZE]>,
    ) -> Result<AesCbcCiphertext> {
        use cbc::cipher::{BlockEncryptMut, KeyIvInit};

        self.check_key(key)?;
        let iv = iv.unwrap_or_else(|| {
            use rand::RngCore;
            let mut fresh = [0u8; AES_BLOCK_SIZE];
            rand::thread_rng().fill_bytes(&mut fresh);
            fresh
        });

        let mut buf = pkcs7_pad(plaintext, AES_BLOCK_SIZE);
        let buf_len = buf.len();

        macro_rules! do_encrypt {
            ($aes:ty) => {{
                let enc = cbc::Encryptor::<$aes>::new_from_slices(key, &iv)
                    .map_err(|e| Error::Crypto(format!("AES-CBC init: {e}")))?;
                enc.encrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf, buf_len)
                    .map_err(|e| Error::Crypto(format!("AES-CBC encrypt: {e}")))?;
            }};
        }

        match self.algorithm {
            ContentEncryptionAlgorithm::Aes128Cbc => do_encrypt!(aes::Aes128),
            ContentEncryptionAlgorithm::Aes192Cbc => do_encrypt!(aes::Aes192),
            ContentEncryptionAlgorithm::Aes256Cbc => do_encrypt!(aes::Aes256),
        }

        Ok(AesCbcCiphertext {
            iv,
            ciphertext: buf,
        })
    }

    /// Decrypt `IV || ciphertext`.
    pub fn decrypt(&self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        use cbc::cipher::{BlockDecryptMut, KeyIvInit};

        self.check_key(key)?;
        if data.len() < 2 * AES_BLOCK_SIZE || data.len() % AES_BLOCK_SIZE != 0 {
            return Err(Error::Crypto(format!(
                "AES-CBC input of {} bytes is not an IV followed by whole blocks",
                data.len()
            )));
        }

        let (iv, ciphertext) = data.split_at(AES_BLOCK_SIZE);
        let mut buf = ciphertext.to_vec();

        macro_rules! do_decrypt {
            ($aes:ty) => {{
                let dec = cbc::Decryptor::<$aes>::new_from_slices(key, iv)
                    .map_err(|e| Error::Crypto(format!("AES-CBC init: {e}")))?;
                dec.decrypt_padded_mut::<cbc::cipher::block_padding::NoPadding>(&mut buf)
                    .map_err(|e| Error::Crypto(format!("AES-CBC decrypt: {e}")))?;
            }};
        }

        match self.algorithm {
            ContentEncryptionAlgorithm::Aes128Cbc => do_decrypt!(aes::Aes128),
            ContentEncryptionAlgorithm::Aes192Cbc => do_decrypt!(aes::Aes192),
            ContentEncryptionAlgorithm::Aes256Cbc => do_decrypt!(aes::Aes256),
        }

        xmlenc_unpad(buf, AES_BLOCK_SIZE)
    }
}

/// Encrypt with AES-CBC, picking the AES variant from the key length.
pub fn encrypt_with_aes_cbc(
    key: &[u8],
    plaintext: &[u8],
    iv: Option<[u8; AES_BLOCK_SIZE]>,
) -> Result<AesCbcCiphertext> {
    AesCbc::for_key(key)?.encrypt(key, plaintext, iv)
}

/// Decrypt `IV || ciphertext` with AES-CBC, picking the variant from the key length.
pub fn decrypt_with_aes_cbc(key: &[u8], iv_and_ciphertext: &[u8]) -> Result<Vec<u8>> {
    AesCbc::for_key(key)?.decrypt(key, iv_and_ciphertext)
}

fn pkcs7_pad(data: &[u8], block_size: usize) -> Vec<u8> {
    let pad_len = block_size - (data.len() % block_size);
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

/// Strip XML Encryption block padding. Only the last byte is interpreted.
fn xmlenc_unpad(mut data: Vec<u8>, block_size: usize) -> Result<Vec<u8>> {
    let pad_len = match data.last() {
        Some(&b) => b as usize,
        None => return Err(Error::Crypto("invalid padding: empty plaintext".into())),
    };
    if pad_len == 0 || pad_len > block_size || pad_len > data.len() {
        return Err(Error::Crypto("invalid padding".into()));
    }
    data.truncate(data.len() - pad_len);
    Ok(data)
}
