#![forbid(unsafe_code)]

//! AES key wrap (RFC 3394) for symmetric key-encryption keys.

use aes_kw::Kek;
use fedseal_core::{Error, KeyWrapAlgorithm, Result};
use zeroize::Zeroizing;

/// AES-KW with a fixed key-encryption-key size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AesKeyWrap {
    kek_size: usize,
}

impl AesKeyWrap {
    /// Create for a KEK of 16, 24 or 32 bytes.
    pub fn new(kek_size: usize) -> Result<Self> {
        match kek_size {
            16 | 24 | 32 => Ok(Self { kek_size }),
            n => Err(Error::UnsupportedAlgorithm(format!("AES key wrap with {n} byte KEK"))),
        }
    }

    pub fn for_algorithm(algorithm: KeyWrapAlgorithm) -> Result<Self> {
        let size = algorithm.kek_len().ok_or_else(|| {
            Error::UnsupportedAlgorithm(format!("{} is not an AES key wrap", algorithm.uri()))
        })?;
        Self::new(size)
    }

    pub fn kek_size(&self) -> usize {
        self.kek_size
    }

    fn check_kek(&self, kek: &[u8]) -> Result<()> {
        if kek.len() != self.kek_size {
            return Err(Error::Crypto(format!(
                "expected {} byte KEK, got {}",
                self.kek_size,
                kek.len()
            )));
        }
        Ok(())
    }

    pub fn wrap(&self, kek_bytes: &[u8], key_data: &[u8]) -> Result<Vec<u8>> {
        self.check_kek(kek_bytes)?;
        if key_data.len() < 16 || key_data.len() % 8 != 0 {
            return Err(Error::Crypto(format!(
                "AES-KW input must be a multiple of 8 bytes and at least 16, got {}",
                key_data.len()
            )));
        }
        let mut out = vec![0u8; key_data.len() + 8];
        macro_rules! do_wrap {
            ($aes:ty) => {{
                let kek = Kek::<$aes>::new(kek_bytes.into());
                kek.wrap(key_data, &mut out)
                    .map_err(|e| Error::Crypto(format!("AES-KW wrap: {e}")))?;
            }};
        }
        match self.kek_size {
            16 => do_wrap!(aes::Aes128),
            24 => do_wrap!(aes::Aes192),
            _ => do_wrap!(aes::Aes256),
        }
        Ok(out)
    }

    pub fn unwrap(&self, kek_bytes: &[u8], wrapped: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        self.check_kek(kek_bytes)?;
        if wrapped.len() < 24 || wrapped.len() % 8 != 0 {
            return Err(Error::Crypto(format!(
                "wrapped key of {} bytes is not valid AES-KW output",
                wrapped.len()
            )));
        }
        let mut out = Zeroizing::new(vec![0u8; wrapped.len() - 8]);
        macro_rules! do_unwrap {
            ($aes:ty) => {{
                let kek = Kek::<$aes>::new(kek_bytes.into());
                kek.unwrap(wrapped, out.as_mut_slice())
                    .map_err(|e| Error::Crypto(format!("AES-KW unwrap: {e}")))?;
            }};
        }
        match self.kek_size {
            16 => do_unwrap!(aes::Aes128),
            24 => do_unwrap!(aes::Aes192),
            _ => do_unwrap!(aes::Aes256),
        }
        Ok(out)
    }
}
