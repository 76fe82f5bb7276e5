#![forbid(unsafe_code)]

//! RSA key transport (RSA-OAEP and RSA PKCS#1 v1.5).

use fedseal_core::{algorithm, Error, KeyWrapAlgorithm, Result};
use rsa::{Oaep, Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use sha2::digest::{Digest, DynDigest};
use zeroize::Zeroizing;

/// RSA-OAEP parameters as declared on an `EncryptionMethod`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OaepParams {
    /// `ds:DigestMethod` algorithm URI (default: SHA-1).
    pub digest_uri: Option<String>,
    /// `xenc11:MGF` algorithm URI.
    pub mgf_uri: Option<String>,
    /// `OAEPparams` label bytes.
    pub label: Option<Vec<u8>>,
}

/// Hash functions usable for the OAEP digest and MGF1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OaepHash {
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
}

impl OaepHash {
    /// Map a `DigestMethod` URI. Absent means SHA-1.
    pub fn from_digest_uri(uri: Option<&str>) -> Result<Self> {
        match uri {
            None | Some(algorithm::SHA1) => Ok(Self::Sha1),
            Some(algorithm::SHA224) => Ok(Self::Sha224),
            Some(algorithm::SHA256) => Ok(Self::Sha256),
            Some(algorithm::SHA384) => Ok(Self::Sha384),
            Some(algorithm::SHA512) => Ok(Self::Sha512),
            Some(other) => Err(Error::UnsupportedAlgorithm(format!("OAEP digest: {other}"))),
        }
    }

    /// Map an `MGF` URI.
    pub fn from_mgf_uri(uri: &str) -> Result<Self> {
        match uri {
            algorithm::MGF1_SHA1 => Ok(Self::Sha1),
            algorithm::MGF1_SHA224 => Ok(Self::Sha224),
            algorithm::MGF1_SHA256 => Ok(Self::Sha256),
            algorithm::MGF1_SHA384 => Ok(Self::Sha384),
            algorithm::MGF1_SHA512 => Ok(Self::Sha512),
            other => Err(Error::UnsupportedAlgorithm(format!("OAEP mask generation: {other}"))),
        }
    }

    /// The `MGF` URI naming MGF1 with this hash.
    pub fn mgf_uri(self) -> &'static str {
        match self {
            Self::Sha1 => algorithm::MGF1_SHA1,
            Self::Sha224 => algorithm::MGF1_SHA224,
            Self::Sha256 => algorithm::MGF1_SHA256,
            Self::Sha384 => algorithm::MGF1_SHA384,
            Self::Sha512 => algorithm::MGF1_SHA512,
        }
    }
}

/// An RSA key-transport scheme with its parameters resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RsaKeyTransport {
    Pkcs1v15,
    Oaep {
        digest: OaepHash,
        mgf: OaepHash,
        label: Option<String>,
    },
}

impl RsaKeyTransport {
    /// Resolve the scheme for a key-transport URI.
    ///
    /// For `rsa-oaep-mgf1p` (and its legacy `rsa-oaep` spelling) MGF1 uses
    /// SHA-1 unless an explicit `MGF` says otherwise; the digest only covers
    /// the label. For XML Encryption 1.1 `rsa-oaep` the MGF defaults to the
    /// digest.
    ///
    /// The OAEP backend takes the label as a string, so a label that is not
    /// UTF-8 is rejected.
    pub fn from_uri(uri: &str, params: &OaepParams) -> Result<Self> {
        match KeyWrapAlgorithm::from_uri(uri) {
            Some(KeyWrapAlgorithm::RsaPkcs1) => Ok(Self::Pkcs1v15),
            Some(KeyWrapAlgorithm::RsaOaep) => {
                let digest = OaepHash::from_digest_uri(params.digest_uri.as_deref())?;
                let mgf = match params.mgf_uri.as_deref() {
                    Some(mgf_uri) => OaepHash::from_mgf_uri(mgf_uri)?,
                    None if uri == algorithm::RSA_OAEP_ENC11 => digest,
                    None => OaepHash::Sha1,
                };
                let label = params
                    .label
                    .as_ref()
                    .map(|l| String::from_utf8(l.clone()))
                    .transpose()
                    .map_err(|_| Error::UnsupportedAlgorithm("OAEP label is not UTF-8".into()))?;
                Ok(Self::Oaep { digest, mgf, label })
            }
            _ => Err(Error::UnsupportedAlgorithm(format!("key transport: {uri}"))),
        }
    }

    pub fn encrypt(&self, public_key: &RsaPublicKey, key_data: &[u8]) -> Result<Vec<u8>> {
        let mut rng = rand::thread_rng();
        match self {
            Self::Pkcs1v15 => public_key
                .encrypt(&mut rng, Pkcs1v15Encrypt, key_data)
                .map_err(|e| Error::Crypto(format!("RSA PKCS#1 encrypt: {e}"))),
            Self::Oaep { digest, mgf, label } => public_key
                .encrypt(&mut rng, oaep_padding(*digest, *mgf, label.as_deref()), key_data)
                .map_err(|e| Error::Crypto(format!("RSA-OAEP encrypt: {e}"))),
        }
    }

    pub fn decrypt(
        &self,
        private_key: &RsaPrivateKey,
        encrypted: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let plain = match self {
            Self::Pkcs1v15 => private_key
                .decrypt(Pkcs1v15Encrypt, encrypted)
                .map_err(|e| Error::Crypto(format!("RSA PKCS#1 decrypt: {e}")))?,
            Self::Oaep { digest, mgf, label } => private_key
                .decrypt(oaep_padding(*digest, *mgf, label.as_deref()), encrypted)
                .map_err(|e| Error::Crypto(format!("RSA-OAEP decrypt: {e}")))?,
        };
        Ok(Zeroizing::new(plain))
    }
}

fn oaep_padding(digest: OaepHash, mgf: OaepHash, label: Option<&str>) -> Oaep {
    let mut padding = match digest {
        OaepHash::Sha1 => oaep_with_digest::<sha1::Sha1>(mgf),
        OaepHash::Sha224 => oaep_with_digest::<sha2::Sha224>(mgf),
        OaepHash::Sha256 => oaep_with_digest::<sha2::Sha256>(mgf),
        OaepHash::Sha384 => oaep_with_digest::<sha2::Sha384>(mgf),
        OaepHash::Sha512 => oaep_with_digest::<sha2::Sha512>(mgf),
    };
    padding.label = label.map(str::to_owned);
    padding
}

fn oaep_with_digest<D>(mgf: OaepHash) -> Oaep
where
    D: 'static + Digest + DynDigest + Send + Sync,
{
    match mgf {
        OaepHash::Sha1 => Oaep::new_with_mgf_hash::<D, sha1::Sha1>(),
        OaepHash::Sha224 => Oaep::new_with_mgf_hash::<D, sha2::Sha224>(),
        OaepHash::Sha256 => Oaep::new_with_mgf_hash::<D, sha2::Sha256>(),
        OaepHash::Sha384 => Oaep::new_with_mgf_hash::<D, sha2::Sha384>(),
        OaepHash::Sha512 => Oaep::new_with_mgf_hash::<D, sha2::Sha512>(),
    }
}
