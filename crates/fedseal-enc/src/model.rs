#![forbid(unsafe_code)]

//! The encrypted-type data model.
//!
//! `EncryptedData` and `EncryptedKey` share one shape, [`EncryptedType`];
//! [`EncryptedKind`] tells them apart and carries what only a key has.

use crate::keyinfo::KeyInfo;
use fedseal_core::{Error, Result};

/// Raw ciphertext carried in `CipherData/CipherValue`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CipherData {
    cipher_value: Vec<u8>,
}

impl CipherData {
    pub fn new(cipher_value: Vec<u8>) -> Self {
        Self { cipher_value }
    }

    pub fn cipher_value(&self) -> &[u8] {
        &self.cipher_value
    }

    pub fn into_cipher_value(self) -> Vec<u8> {
        self.cipher_value
    }
}

/// `EncryptionMethod`: the algorithm applied to the cipher data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptionMethod {
    algorithm: String,
    /// `KeySize` in bits.
    pub key_size: Option<u32>,
    /// `OAEPparams` (the OAEP label).
    pub oaep_params: Option<Vec<u8>>,
    /// `xenc11:MGF` algorithm URI. Only meaningful for RSA-OAEP.
    pub mask_generation_function: Option<String>,
    /// `ds:DigestMethod` algorithm URI. Only meaningful for RSA-OAEP.
    pub digest_method: Option<String>,
}

impl EncryptionMethod {
    /// `algorithm` must be an absolute URI.
    pub fn new(algorithm: impl Into<String>) -> Result<Self> {
        let algorithm = algorithm.into();
        fedseal_xml::reader::validate_absolute_uri("EncryptionMethod", "Algorithm", &algorithm)
            .map_err(|e| Error::InvalidArgument(e.to_string()))?;
        Ok(Self {
            algorithm,
            key_size: None,
            oaep_params: None,
            mask_generation_function: None,
            digest_method: None,
        })
    }

    pub fn algorithm(&self) -> &str {
        &self.algorithm
    }
}

/// URIs of the elements an `EncryptedKey` was used to encrypt.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceList {
    pub data_references: Vec<String>,
    pub key_references: Vec<String>,
}

impl ReferenceList {
    pub fn is_empty(&self) -> bool {
        self.data_references.is_empty() && self.key_references.is_empty()
    }
}

/// Fields only an `EncryptedKey` carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyDetails {
    pub recipient: Option<String>,
    pub reference_list: ReferenceList,
    pub carried_key_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncryptedKind {
    Data,
    Key(KeyDetails),
}

/// `EncryptedData` or `EncryptedKey`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedType {
    pub id: Option<String>,
    /// `Type` attribute, an absolute URI.
    pub type_uri: Option<String>,
    pub mime_type: Option<String>,
    /// `Encoding` attribute, an absolute URI.
    pub encoding: Option<String>,
    pub encryption_method: Option<EncryptionMethod>,
    pub key_info: Option<KeyInfo>,
    pub cipher_data: CipherData,
    pub kind: EncryptedKind,
}

impl EncryptedType {
    /// A new `EncryptedData`.
    pub fn encrypted_data(cipher_data: CipherData) -> Self {
        Self::with_kind(cipher_data, EncryptedKind::Data)
    }

    /// A new `EncryptedKey` with an empty reference list.
    pub fn encrypted_key(cipher_data: CipherData) -> Self {
        Self::with_kind(cipher_data, EncryptedKind::Key(KeyDetails::default()))
    }

    fn with_kind(cipher_data: CipherData, kind: EncryptedKind) -> Self {
        Self {
            id: None,
            type_uri: None,
            mime_type: None,
            encoding: None,
            encryption_method: None,
            key_info: None,
            cipher_data,
            kind,
        }
    }

    pub fn is_encrypted_key(&self) -> bool {
        matches!(self.kind, EncryptedKind::Key(_))
    }

    pub fn key_details(&self) -> Option<&KeyDetails> {
        match &self.kind {
            EncryptedKind::Key(details) => Some(details),
            EncryptedKind::Data => None,
        }
    }

    pub fn key_details_mut(&mut self) -> Option<&mut KeyDetails> {
        match &mut self.kind {
            EncryptedKind::Key(details) => Some(details),
            EncryptedKind::Data => None,
        }
    }

    /// The `EncryptedKey` carried in this element's `KeyInfo`, if any.
    pub fn encrypted_key_in_key_info(&self) -> Option<&EncryptedType> {
        match &self.key_info {
            Some(KeyInfo::EncryptedKey(info)) => Some(info.encrypted_key()),
            _ => None,
        }
    }

    /// The element name this value serializes as.
    pub fn element_name(&self) -> &'static str {
        match self.kind {
            EncryptedKind::Data => fedseal_core::ns::node::ENCRYPTED_DATA,
            EncryptedKind::Key(_) => fedseal_core::ns::node::ENCRYPTED_KEY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedseal_core::algorithm;

    #[test]
    fn test_encryption_method_requires_absolute_uri() {
        assert!(EncryptionMethod::new(algorithm::AES256_CBC).is_ok());
        let err = EncryptionMethod::new("aes256-cbc").unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("Algorithm")));
    }

    #[test]
    fn test_kinds() {
        let data = EncryptedType::encrypted_data(CipherData::new(vec![1, 2, 3]));
        assert!(!data.is_encrypted_key());
        assert!(data.key_details().is_none());
        assert_eq!(data.element_name(), "EncryptedData");

        let mut key = EncryptedType::encrypted_key(CipherData::new(vec![4]));
        assert!(key.key_details().is_some_and(|d| d.reference_list.is_empty()));
        if let Some(details) = key.key_details_mut() {
            details.recipient = Some("sp.example.org".into());
        }
        assert_eq!(
            key.key_details().and_then(|d| d.recipient.as_deref()),
            Some("sp.example.org")
        );
        assert_eq!(key.element_name(), "EncryptedKey");
    }

    #[test]
    fn test_cipher_data_is_owned() {
        let cd = CipherData::new(vec![9, 8, 7]);
        assert_eq!(cd.cipher_value(), &[9, 8, 7]);
        assert_eq!(cd.into_cipher_value(), vec![9, 8, 7]);
    }
}
