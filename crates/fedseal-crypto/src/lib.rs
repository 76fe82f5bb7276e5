#![forbid(unsafe_code)]

//! Cryptographic primitives behind XML Encryption of security tokens:
//! the AES-CBC content cipher, AES key wrap, and RSA key transport.
//!
//! Everything here works on bytes; XML shape lives in `fedseal-enc`.

pub mod cipher;
pub mod keytransport;
pub mod keywrap;

pub use cipher::{decrypt_with_aes_cbc, encrypt_with_aes_cbc, AesCbc, AesCbcCiphertext};
pub use keytransport::{OaepHash, OaepParams, RsaKeyTransport};
pub use keywrap::AesKeyWrap;
