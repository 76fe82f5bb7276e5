#![forbid(unsafe_code)]

use crate::params::TokenValidationParameters;
use crate::token::{SecurityToken, ValidatedToken};
use fedseal_core::Result;
use fedseal_xml::XmlWriter;
use roxmltree::Node;

/// Reads, validates and writes one token format.
pub trait SecurityTokenHandler: Send + Sync {
    /// True if `element` looks like a token this handler understands.
    fn can_read_token(&self, element: Node<'_, '_>) -> bool;

    fn read_token(
        &self,
        element: Node<'_, '_>,
        params: &TokenValidationParameters,
    ) -> Result<Box<dyn SecurityToken>>;

    fn validate_token(
        &self,
        element: Node<'_, '_>,
        params: &TokenValidationParameters,
    ) -> Result<ValidatedToken>;

    fn write_token(&self, writer: &mut XmlWriter, token: &dyn SecurityToken) -> Result<()>;
}
