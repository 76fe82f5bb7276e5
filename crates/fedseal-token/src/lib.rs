#![forbid(unsafe_code)]

//! Security token handlers.
//!
//! [`EncryptedSecurityTokenHandler`] adds one layer of XML Encryption around
//! tokens produced and consumed by another [`SecurityTokenHandler`].

pub mod encrypted;
pub mod handler;
pub mod params;
pub mod raw;
pub mod token;

pub use encrypted::{EncryptedSecurityToken, EncryptedSecurityTokenHandler, EncryptedTokenConfig};
pub use handler::SecurityTokenHandler;
pub use params::{KeyResolver, TokenValidationParameters};
pub use raw::{RawXmlToken, RawXmlTokenHandler};
pub use token::{Claim, ClaimsPrincipal, SecurityToken, ValidatedToken};
