#![forbid(unsafe_code)]

/// Errors produced by the fedseal XML-Encryption and token libraries.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The XML at the reader's position is not a well-formed encrypted
    /// structure: wrong element or namespace, missing or malformed attribute,
    /// relative URI where an absolute one is required.
    #[error("unable to read encrypted data: {0}")]
    EncryptedDataRead(String),

    /// Encrypting or decrypting a token failed: unsupported algorithm,
    /// missing key material, or a failed unwrap/decrypt.
    #[error("encryption failure: {0}")]
    Encryption(String),

    /// The caller passed an argument of the wrong kind or size.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("XML parsing error: {0}")]
    XmlParse(String),

    #[error("XML writing error: {0}")]
    XmlWrite(String),

    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("cryptographic error: {0}")]
    Crypto(String),

    #[error("key error: {0}")]
    Key(String),
}

impl Error {
    /// The reader is positioned on an element other than the one expected.
    pub fn unexpected_element(expected: &str, namespace: &str, found: &str) -> Self {
        Self::EncryptedDataRead(format!(
            "expected element '{expected}' in namespace '{namespace}', found '{found}'"
        ))
    }

    /// A required child element is absent.
    pub fn missing_element(parent: &str, child: &str) -> Self {
        Self::EncryptedDataRead(format!("element '{parent}' is missing required child '{child}'"))
    }

    /// A required attribute is absent.
    pub fn missing_attribute(element: &str, attribute: &str) -> Self {
        Self::EncryptedDataRead(format!(
            "element '{element}' is missing required attribute '{attribute}'"
        ))
    }

    /// An attribute or element value is not an absolute URI.
    pub fn invalid_uri(element: &str, attribute: &str, value: &str) -> Self {
        Self::EncryptedDataRead(format!(
            "'{attribute}' on element '{element}' must be an absolute URI, found '{value}'"
        ))
    }

    /// An element's text content could not be interpreted.
    pub fn invalid_content(element: &str, detail: impl std::fmt::Display) -> Self {
        Self::EncryptedDataRead(format!("invalid content in element '{element}': {detail}"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
