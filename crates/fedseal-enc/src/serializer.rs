#![forbid(unsafe_code)]

//! Reading and writing XML Encryption elements.
//!
//! Every `read_*` function takes the node the reader is positioned on and
//! fails with [`Error::EncryptedDataRead`] unless it is the expected element.
//! Children are read and written in schema order:
//!
//! ```text
//! EncryptedData:  EncryptionMethod? ds:KeyInfo? CipherData EncryptionProperties?
//! EncryptedKey:   EncryptionMethod? ds:KeyInfo? CipherData EncryptionProperties?
//!                 ReferenceList? CarriedKeyName?
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use crate::keyinfo::{DsigKeyInfoCodec, KeyInfo, KeyInfoCodec};
use crate::model::{
    CipherData, EncryptedKind, EncryptedType, EncryptionMethod, KeyDetails, ReferenceList,
};
use fedseal_core::ns::{self, attr, node, prefix};
use fedseal_core::{algorithm, Error, Result};
use fedseal_xml::reader::{self, ElementCursor};
use fedseal_xml::XmlWriter;
use roxmltree::Node;
use tracing::debug;

/// Serializer for the encrypted-type model.
///
/// Cheap to clone; the `KeyInfo` codec is shared.
#[derive(Clone)]
pub struct EncryptionSerializer {
    key_info_codec: Arc<dyn KeyInfoCodec>,
}

impl Default for EncryptionSerializer {
    fn default() -> Self {
        Self::new(Arc::new(DsigKeyInfoCodec))
    }
}

impl std::fmt::Debug for EncryptionSerializer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionSerializer").finish_non_exhaustive()
    }
}

impl EncryptionSerializer {
    pub fn new(key_info_codec: Arc<dyn KeyInfoCodec>) -> Self {
        Self { key_info_codec }
    }

    pub fn key_info_codec(&self) -> &dyn KeyInfoCodec {
        self.key_info_codec.as_ref()
    }

    // ── EncryptedData / EncryptedKey ─────────────────────────────────

    pub fn read_encrypted_data(&self, element: Node<'_, '_>) -> Result<EncryptedType> {
        reader::expect_element(element, ns::ENC, node::ENCRYPTED_DATA)?;
        self.read_encrypted_type(element, EncryptedKind::Data)
    }

    pub fn read_encrypted_key(&self, element: Node<'_, '_>) -> Result<EncryptedType> {
        reader::expect_element(element, ns::ENC, node::ENCRYPTED_KEY)?;
        let details = KeyDetails {
            recipient: element.attribute(attr::RECIPIENT).map(str::to_owned),
            ..KeyDetails::default()
        };
        self.read_encrypted_type(element, EncryptedKind::Key(details))
    }

    /// Read whichever of `EncryptedData` or `EncryptedKey` `element` is.
    pub fn read_encrypted(&self, element: Node<'_, '_>) -> Result<EncryptedType> {
        if reader::is_start_element(element, ns::ENC, node::ENCRYPTED_KEY) {
            self.read_encrypted_key(element)
        } else {
            self.read_encrypted_data(element)
        }
    }

    fn read_encrypted_type(
        &self,
        element: Node<'_, '_>,
        mut kind: EncryptedKind,
    ) -> Result<EncryptedType> {
        let id = element.attribute(attr::ID).map(str::to_owned);
        let type_uri = reader::optional_absolute_uri(element, attr::TYPE)?;
        let mime_type = element.attribute(attr::MIME_TYPE).map(str::to_owned);
        let encoding = reader::optional_absolute_uri(element, attr::ENCODING)?;

        let mut cursor = ElementCursor::new(element);
        let encryption_method = match cursor.take_if(ns::ENC, node::ENCRYPTION_METHOD) {
            Some(method) => Some(self.read_encryption_method(method)?),
            None => None,
        };
        let key_info = match cursor.take_if(ns::DSIG, node::KEY_INFO) {
            Some(info) => Some(self.key_info_codec.read_key_info(info, self)?),
            None => None,
        };
        let cipher_data = self.read_cipher_data(cursor.take_required(ns::ENC, node::CIPHER_DATA)?)?;
        if cursor.take_if(ns::ENC, node::ENCRYPTION_PROPERTIES).is_some() {
            debug!("skipping EncryptionProperties");
        }

        if let EncryptedKind::Key(details) = &mut kind {
            if let Some(list) = cursor.take_if(ns::ENC, node::REFERENCE_LIST) {
                details.reference_list = self.read_reference_list(list)?;
            }
            if let Some(name) = cursor.take_if(ns::ENC, node::CARRIED_KEY_NAME) {
                details.carried_key_name = Some(reader::text_content(name));
            }
        }

        Ok(EncryptedType {
            id,
            type_uri,
            mime_type,
            encoding,
            encryption_method,
            key_info,
            cipher_data,
            kind,
        })
    }

    /// Write `value` as `xenc:EncryptedData`. Fails for an `EncryptedKey`.
    pub fn write_encrypted_data(&self, writer: &mut XmlWriter, value: &EncryptedType) -> Result<()> {
        if value.is_encrypted_key() {
            return Err(Error::InvalidArgument(
                "write_encrypted_data called with an EncryptedKey".into(),
            ));
        }
        self.write_encrypted_type(writer, value)
    }

    /// Write `value` as `xenc:EncryptedKey`. Fails for an `EncryptedData`.
    pub fn write_encrypted_key(&self, writer: &mut XmlWriter, value: &EncryptedType) -> Result<()> {
        if !value.is_encrypted_key() {
            return Err(Error::InvalidArgument(
                "write_encrypted_key called with an EncryptedData".into(),
            ));
        }
        self.write_encrypted_type(writer, value)
    }

    /// Write `value` under the element name its kind selects.
    pub fn write_encrypted(&self, writer: &mut XmlWriter, value: &EncryptedType) -> Result<()> {
        self.write_encrypted_type(writer, value)
    }

    fn write_encrypted_type(&self, writer: &mut XmlWriter, value: &EncryptedType) -> Result<()> {
        writer.write_start_element(prefix::ENC, value.element_name(), ns::ENC)?;
        writer.write_optional_attribute(attr::ID, value.id.as_deref())?;
        writer.write_optional_attribute(attr::TYPE, value.type_uri.as_deref())?;
        writer.write_optional_attribute(attr::MIME_TYPE, value.mime_type.as_deref())?;
        writer.write_optional_attribute(attr::ENCODING, value.encoding.as_deref())?;
        if let EncryptedKind::Key(details) = &value.kind {
            writer.write_optional_attribute(attr::RECIPIENT, details.recipient.as_deref())?;
        }

        if let Some(method) = &value.encryption_method {
            self.write_encryption_method(writer, method)?;
        }
        if let Some(info) = &value.key_info {
            self.write_key_info(writer, info)?;
        }
        self.write_cipher_data(writer, &value.cipher_data)?;

        if let EncryptedKind::Key(details) = &value.kind {
            if !details.reference_list.is_empty() {
                self.write_reference_list(writer, &details.reference_list)?;
            }
            if let Some(name) = &details.carried_key_name {
                writer.write_element_string(prefix::ENC, node::CARRIED_KEY_NAME, ns::ENC, name)?;
            }
        }
        writer.write_end_element()
    }

    fn write_key_info(&self, writer: &mut XmlWriter, key_info: &KeyInfo) -> Result<()> {
        self.key_info_codec.write_key_info(writer, key_info, self)
    }

    // ── EncryptionMethod ─────────────────────────────────────────────

    /// `DigestMethod` and `MGF` are only read when the algorithm is RSA-OAEP.
    pub fn read_encryption_method(&self, element: Node<'_, '_>) -> Result<EncryptionMethod> {
        reader::expect_element(element, ns::ENC, node::ENCRYPTION_METHOD)?;
        let algorithm_uri = reader::required_absolute_uri(element, attr::ALGORITHM)?;
        let is_oaep = algorithm::is_rsa_oaep(&algorithm_uri);
        let mut method = EncryptionMethod::new(algorithm_uri)?;

        for child in element.children().filter(|n| n.is_element()) {
            if reader::is_start_element(child, ns::ENC, node::KEY_SIZE) {
                let text = reader::text_content(child);
                let size = text
                    .parse::<u32>()
                    .map_err(|e| Error::invalid_content(node::KEY_SIZE, format!("'{text}': {e}")))?;
                method.key_size = Some(size);
            } else if reader::is_start_element(child, ns::ENC, node::OAEP_PARAMS) {
                method.oaep_params = Some(reader::read_base64(child)?);
            } else if is_oaep && reader::is_start_element(child, ns::DSIG, node::DIGEST_METHOD) {
                method.digest_method = Some(reader::required_absolute_uri(child, attr::ALGORITHM)?);
            } else if is_oaep && reader::is_start_element(child, ns::ENC11, node::MGF) {
                method.mask_generation_function =
                    Some(reader::required_absolute_uri(child, attr::ALGORITHM)?);
            } else {
                debug!(element = %reader::describe(child), "skipping EncryptionMethod child");
            }
        }
        Ok(method)
    }

    /// For RSA-OAEP, `ds:DigestMethod` is always written (SHA-1 when unset)
    /// and `xenc11:MGF` when set. Neither is written for other algorithms.
    pub fn write_encryption_method(
        &self,
        writer: &mut XmlWriter,
        method: &EncryptionMethod,
    ) -> Result<()> {
        writer.write_start_element(prefix::ENC, node::ENCRYPTION_METHOD, ns::ENC)?;
        writer.write_attribute(attr::ALGORITHM, method.algorithm())?;
        if let Some(size) = method.key_size {
            writer.write_element_string(prefix::ENC, node::KEY_SIZE, ns::ENC, &size.to_string())?;
        }
        if let Some(params) = &method.oaep_params {
            writer.write_start_element(prefix::ENC, node::OAEP_PARAMS, ns::ENC)?;
            writer.write_base64(params)?;
            writer.write_end_element()?;
        }
        if algorithm::is_rsa_oaep(method.algorithm()) {
            let digest = method.digest_method.as_deref().unwrap_or(algorithm::SHA1);
            writer.write_start_element(prefix::DSIG, node::DIGEST_METHOD, ns::DSIG)?;
            writer.write_attribute(attr::ALGORITHM, digest)?;
            writer.write_end_element()?;
            if let Some(mgf) = &method.mask_generation_function {
                writer.write_start_element(prefix::ENC11, node::MGF, ns::ENC11)?;
                writer.write_attribute(attr::ALGORITHM, mgf)?;
                writer.write_end_element()?;
            }
        }
        writer.write_end_element()
    }

    // ── ReferenceList ────────────────────────────────────────────────

    /// Unrecognised children are skipped. Duplicate URIs are kept.
    pub fn read_reference_list(&self, element: Node<'_, '_>) -> Result<ReferenceList> {
        reader::expect_element(element, ns::ENC, node::REFERENCE_LIST)?;
        let mut list = ReferenceList::default();
        let mut seen = HashSet::new();
        for child in element.children().filter(|n| n.is_element()) {
            let target = if reader::is_start_element(child, ns::ENC, node::DATA_REFERENCE) {
                &mut list.data_references
            } else if reader::is_start_element(child, ns::ENC, node::KEY_REFERENCE) {
                &mut list.key_references
            } else {
                debug!(element = %reader::describe(child), "skipping ReferenceList child");
                continue;
            };
            let uri = reader::required_attribute(child, attr::URI)?;
            if !seen.insert(uri) {
                debug!(uri, "duplicate reference in ReferenceList");
            }
            target.push(uri.to_owned());
        }
        Ok(list)
    }

    /// Data references are written before key references.
    pub fn write_reference_list(&self, writer: &mut XmlWriter, list: &ReferenceList) -> Result<()> {
        writer.write_start_element(prefix::ENC, node::REFERENCE_LIST, ns::ENC)?;
        for (name, uris) in [
            (node::DATA_REFERENCE, &list.data_references),
            (node::KEY_REFERENCE, &list.key_references),
        ] {
            for uri in uris {
                writer.write_start_element(prefix::ENC, name, ns::ENC)?;
                writer.write_attribute(attr::URI, uri)?;
                writer.write_end_element()?;
            }
        }
        writer.write_end_element()
    }

    // ── CipherData ───────────────────────────────────────────────────

    /// `CipherReference` is not resolved; `CipherValue` is required.
    pub fn read_cipher_data(&self, element: Node<'_, '_>) -> Result<CipherData> {
        reader::expect_element(element, ns::ENC, node::CIPHER_DATA)?;
        let mut cursor = ElementCursor::new(element);
        while let Some(child) = cursor.advance() {
            if reader::is_start_element(child, ns::ENC, node::CIPHER_VALUE) {
                return Ok(CipherData::new(reader::read_base64(child)?));
            }
            if reader::is_start_element(child, ns::ENC, node::CIPHER_REFERENCE) {
                debug!(uri = child.attribute(attr::URI), "skipping unsupported CipherReference");
            }
        }
        Err(Error::missing_element(node::CIPHER_DATA, node::CIPHER_VALUE))
    }

    pub fn write_cipher_data(&self, writer: &mut XmlWriter, cipher_data: &CipherData) -> Result<()> {
        writer.write_start_element(prefix::ENC, node::CIPHER_DATA, ns::ENC)?;
        writer.write_start_element(prefix::ENC, node::CIPHER_VALUE, ns::ENC)?;
        writer.write_base64(cipher_data.cipher_value())?;
        writer.write_end_element()?;
        writer.write_end_element()
    }
}
