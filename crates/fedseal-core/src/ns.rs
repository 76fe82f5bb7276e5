#![forbid(unsafe_code)]

//! XML namespace constants and the element/attribute names of
//! XML Encryption and the parts of XML Signature it borrows.

/// XML Digital Signature namespace
pub const DSIG: &str = "http://www.w3.org/2000/09/xmldsig#";

/// XML Encryption namespace
pub const ENC: &str = "http://www.w3.org/2001/04/xmlenc#";

/// XML Encryption 1.1 namespace
pub const ENC11: &str = "http://www.w3.org/2009/xmlenc11#";

// ── Conventional prefixes ────────────────────────────────────────────

pub mod prefix {
    pub const DSIG: &str = "ds";
    pub const ENC: &str = "xenc";
    pub const ENC11: &str = "xenc11";
}

// ── Element names ────────────────────────────────────────────────────

pub mod node {
    // Encryption elements
    pub const ENCRYPTED_DATA: &str = "EncryptedData";
    pub const ENCRYPTED_KEY: &str = "EncryptedKey";
    pub const ENCRYPTION_METHOD: &str = "EncryptionMethod";
    pub const ENCRYPTION_PROPERTIES: &str = "EncryptionProperties";
    pub const KEY_SIZE: &str = "KeySize";
    pub const OAEP_PARAMS: &str = "OAEPparams";
    pub const MGF: &str = "MGF";
    pub const CIPHER_DATA: &str = "CipherData";
    pub const CIPHER_VALUE: &str = "CipherValue";
    pub const CIPHER_REFERENCE: &str = "CipherReference";
    pub const REFERENCE_LIST: &str = "ReferenceList";
    pub const DATA_REFERENCE: &str = "DataReference";
    pub const KEY_REFERENCE: &str = "KeyReference";
    pub const CARRIED_KEY_NAME: &str = "CarriedKeyName";

    // DSig elements
    pub const KEY_INFO: &str = "KeyInfo";
    pub const KEY_NAME: &str = "KeyName";
    pub const DIGEST_METHOD: &str = "DigestMethod";
    pub const X509_DATA: &str = "X509Data";
    pub const X509_CERTIFICATE: &str = "X509Certificate";
}

// ── Attribute names ──────────────────────────────────────────────────

pub mod attr {
    pub const ID: &str = "Id";
    pub const URI: &str = "URI";
    pub const TYPE: &str = "Type";
    pub const MIME_TYPE: &str = "MimeType";
    pub const ENCODING: &str = "Encoding";
    pub const ALGORITHM: &str = "Algorithm";
    pub const RECIPIENT: &str = "Recipient";
}

// ── Encryption type URIs ─────────────────────────────────────────────

pub const ENC_TYPE_CONTENT: &str = "http://www.w3.org/2001/04/xmlenc#Content";
pub const ENC_TYPE_ELEMENT: &str = "http://www.w3.org/2001/04/xmlenc#Element";
