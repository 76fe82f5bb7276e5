#![forbid(unsafe_code)]

//! XML Encryption (`xenc`) for security tokens.
//!
//! [`model`] holds the in-memory form of `EncryptedData` and `EncryptedKey`;
//! [`EncryptionSerializer`] maps it to and from the wire format, delegating
//! `ds:KeyInfo` to a pluggable [`KeyInfoCodec`].

pub mod keyinfo;
pub mod model;
pub mod serializer;

pub use keyinfo::{
    DsigKeyInfoCodec, EncryptedKeyKeyInfo, KeyInfo, KeyInfoCodec, MAXIMUM_KEY_INFO_NESTING,
};
pub use model::{
    CipherData, EncryptedKind, EncryptedType, EncryptionMethod, KeyDetails, ReferenceList,
};
pub use serializer::EncryptionSerializer;
