#![forbid(unsafe_code)]

//! Key material for encrypting and decrypting security tokens.
//!
//! Loads RSA and AES keys, bundles them into [`EncryptingCredentials`], and
//! resolves key-wrap providers through a pluggable [`CryptoProviderFactory`].

pub mod credentials;
pub mod key;
pub mod loader;
pub mod provider;
pub mod session;

pub use credentials::EncryptingCredentials;
pub use key::{Key, KeyData};
pub use provider::{CryptoProviderFactory, DefaultCryptoProviderFactory, KeyWrapProvider};
pub use session::{get_security_key, unwrap_session_key, SessionKey};
