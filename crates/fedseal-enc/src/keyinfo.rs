#![forbid(unsafe_code)]

//! `ds:KeyInfo` as used by XML Encryption.

use crate::model::EncryptedType;
use crate::serializer::EncryptionSerializer;
use fedseal_core::ns::{self, node, prefix};
use fedseal_core::{Error, Result};
use fedseal_xml::reader::{self, ElementCursor};
use fedseal_xml::XmlWriter;
use roxmltree::Node;
use tracing::debug;

/// Deepest `ds:KeyInfo` nesting (through embedded `xenc:EncryptedKey`s)
/// [`DsigKeyInfoCodec`] will read.
pub const MAXIMUM_KEY_INFO_NESTING: usize = 8;

/// Key information attached to an encrypted element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyInfo {
    /// Identifies the key by name or certificate.
    Identifiers {
        key_name: Option<String>,
        /// DER-encoded certificates from `ds:X509Data`.
        x509_certificates: Vec<Vec<u8>>,
    },
    /// Carries the wrapped key itself.
    EncryptedKey(EncryptedKeyKeyInfo),
}

impl KeyInfo {
    pub fn key_name(name: impl Into<String>) -> Self {
        Self::Identifiers {
            key_name: Some(name.into()),
            x509_certificates: Vec::new(),
        }
    }
}

/// A `KeyInfo` whose content is exactly one `xenc:EncryptedKey`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedKeyKeyInfo {
    encrypted_key: Box<EncryptedType>,
}

impl EncryptedKeyKeyInfo {
    /// Fails unless `encrypted_key` is an `EncryptedKey`.
    pub fn new(encrypted_key: EncryptedType) -> Result<Self> {
        if !encrypted_key.is_encrypted_key() {
            return Err(Error::InvalidArgument(
                "EncryptedKeyKeyInfo requires an EncryptedKey, got EncryptedData".into(),
            ));
        }
        Ok(Self {
            encrypted_key: Box::new(encrypted_key),
        })
    }

    pub fn encrypted_key(&self) -> &EncryptedType {
        &self.encrypted_key
    }

    pub fn into_encrypted_key(self) -> EncryptedType {
        *self.encrypted_key
    }
}

impl From<EncryptedKeyKeyInfo> for KeyInfo {
    fn from(info: EncryptedKeyKeyInfo) -> Self {
        Self::EncryptedKey(info)
    }
}

/// Reads and writes `ds:KeyInfo`.
///
/// The serializer is passed in so an implementation can hand an embedded
/// `xenc:EncryptedKey` back to it.
pub trait KeyInfoCodec: Send + Sync {
    fn read_key_info(
        &self,
        key_info: Node<'_, '_>,
        serializer: &EncryptionSerializer,
    ) -> Result<KeyInfo>;

    fn write_key_info(
        &self,
        writer: &mut XmlWriter,
        key_info: &KeyInfo,
        serializer: &EncryptionSerializer,
    ) -> Result<()>;
}

/// Default codec: `ds:KeyName`, `ds:X509Data/ds:X509Certificate` and an
/// embedded `xenc:EncryptedKey`. Other children are skipped.
#[derive(Debug, Clone, Copy, Default)]
pub struct DsigKeyInfoCodec;

impl KeyInfoCodec for DsigKeyInfoCodec {
    fn read_key_info(
        &self,
        key_info: Node<'_, '_>,
        serializer: &EncryptionSerializer,
    ) -> Result<KeyInfo> {
        reader::expect_element(key_info, ns::DSIG, node::KEY_INFO)?;
        let nesting = key_info
            .ancestors()
            .filter(|n| reader::is_start_element(*n, ns::DSIG, node::KEY_INFO))
            .take(MAXIMUM_KEY_INFO_NESTING + 1)
            .count();
        if nesting > MAXIMUM_KEY_INFO_NESTING {
            return Err(Error::EncryptedDataRead(format!(
                "KeyInfo is nested more than {MAXIMUM_KEY_INFO_NESTING} levels deep"
            )));
        }

        let mut key_name = None;
        let mut x509_certificates = Vec::new();
        let mut cursor = ElementCursor::new(key_info);
        while let Some(child) = cursor.advance() {
            if reader::is_start_element(child, ns::ENC, node::ENCRYPTED_KEY) {
                let encrypted_key = serializer.read_encrypted_key(child)?;
                return Ok(KeyInfo::EncryptedKey(EncryptedKeyKeyInfo::new(encrypted_key)?));
            } else if reader::is_start_element(child, ns::DSIG, node::KEY_NAME) {
                key_name = Some(reader::text_content(child));
            } else if reader::is_start_element(child, ns::DSIG, node::X509_DATA) {
                for cert in child
                    .children()
                    .filter(|n| reader::is_start_element(*n, ns::DSIG, node::X509_CERTIFICATE))
                {
                    x509_certificates.push(reader::read_base64(cert)?);
                }
            } else {
                debug!(element = %reader::describe(child), "skipping KeyInfo child");
            }
        }

        Ok(KeyInfo::Identifiers {
            key_name,
            x509_certificates,
        })
    }

    fn write_key_info(
        &self,
        writer: &mut XmlWriter,
        key_info: &KeyInfo,
        serializer: &EncryptionSerializer,
    ) -> Result<()> {
        writer.write_start_element(prefix::DSIG, node::KEY_INFO, ns::DSIG)?;
        match key_info {
            KeyInfo::Identifiers {
                key_name,
                x509_certificates,
            } => {
                if let Some(name) = key_name {
                    writer.write_element_string(prefix::DSIG, node::KEY_NAME, ns::DSIG, name)?;
                }
                if !x509_certificates.is_empty() {
                    writer.write_start_element(prefix::DSIG, node::X509_DATA, ns::DSIG)?;
                    for cert in x509_certificates {
                        writer.write_start_element(prefix::DSIG, node::X509_CERTIFICATE, ns::DSIG)?;
                        writer.write_base64(cert)?;
                        writer.write_end_element()?;
                    }
                    writer.write_end_element()?;
                }
            }
            KeyInfo::EncryptedKey(info) => {
                serializer.write_encrypted_key(writer, info.encrypted_key())?;
            }
        }
        writer.write_end_element()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::CipherData;

    fn read(xml: &str) -> Result<KeyInfo> {
        let doc = reader::parse_document(xml)?;
        DsigKeyInfoCodec.read_key_info(doc.root_element(), &EncryptionSerializer::default())
    }

    #[test]
    fn test_read_key_name_and_certificates() {
        let info = read(
            r##"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#">
                 <ds:KeyName> sp-encryption </ds:KeyName>
                 <ds:X509Data><ds:X509Certificate>AQID
                 BA==</ds:X509Certificate></ds:X509Data>
                 <ds:RetrievalMethod URI="#k"/>
               </ds:KeyInfo>"##,
        )
        .unwrap();
        assert_eq!(
            info,
            KeyInfo::Identifiers {
                key_name: Some("sp-encryption".into()),
                x509_certificates: vec![vec![1, 2, 3, 4]],
            }
        );
    }

    fn nested_key_info(levels: usize) -> String {
        let mut xml = String::new();
        for _ in 0..levels {
            xml = format!(
                "<ds:KeyInfo xmlns:ds=\"{}\" xmlns:xenc=\"{}\"><xenc:EncryptedKey>{xml}\
                 <xenc:CipherData><xenc:CipherValue>AQ==</xenc:CipherValue></xenc:CipherData>\
                 </xenc:EncryptedKey></ds:KeyInfo>",
                ns::DSIG,
                ns::ENC
            );
        }
        xml
    }

    #[test]
    fn test_key_info_nesting_is_capped() {
        let info = read(&nested_key_info(MAXIMUM_KEY_INFO_NESTING)).unwrap();
        assert!(matches!(info, KeyInfo::EncryptedKey(_)));

        let err = read(&nested_key_info(MAXIMUM_KEY_INFO_NESTING + 1)).unwrap_err();
        assert!(matches!(err, Error::EncryptedDataRead(msg) if msg.contains("nested")));
    }

    #[test]
    fn test_wrong_element_is_read_error() {
        let err = read(r#"<KeyInfo xmlns="urn:other"/>"#).unwrap_err();
        assert!(matches!(err, Error::EncryptedDataRead(msg) if msg.contains("KeyInfo")));
    }

    #[test]
    fn test_encrypted_key_info_rejects_encrypted_data() {
        let data = EncryptedType::encrypted_data(CipherData::new(vec![1]));
        assert!(matches!(
            EncryptedKeyKeyInfo::new(data),
            Err(Error::InvalidArgument(_))
        ));
        let key = EncryptedType::encrypted_key(CipherData::new(vec![1]));
        let info = EncryptedKeyKeyInfo::new(key.clone()).unwrap();
        assert_eq!(info.into_encrypted_key(), key);
    }

    #[test]
    fn test_write_key_name() {
        let mut w = XmlWriter::new();
        DsigKeyInfoCodec
            .write_key_info(&mut w, &KeyInfo::key_name("kek"), &EncryptionSerializer::default())
            .unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            r#"<ds:KeyInfo xmlns:ds="http://www.w3.org/2000/09/xmldsig#"><ds:KeyName>kek</ds:KeyName></ds:KeyInfo>"#
        );
    }
}
