#![forbid(unsafe_code)]

//! A pass-through handler that treats any XML element as an opaque token.

use std::any::Any;

use crate::handler::SecurityTokenHandler;
use crate::params::TokenValidationParameters;
use crate::token::{Claim, ClaimsPrincipal, SecurityToken, ValidatedToken};
use fedseal_core::{Error, Result};
use fedseal_xml::reader;
use fedseal_xml::XmlWriter;
use roxmltree::Node;

/// An XML element kept as its exact source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawXmlToken {
    id: Option<String>,
    xml: String,
}

impl RawXmlToken {
    /// `xml` must be a single well-formed element.
    pub fn parse(xml: impl Into<String>) -> Result<Self> {
        let xml = xml.into();
        let id = {
            let doc = reader::parse_document(&xml)?;
            token_id(doc.root_element())
        };
        Ok(Self { id, xml })
    }

    fn from_node(element: Node<'_, '_>) -> Self {
        let xml = element.document().input_text()[element.range()].to_owned();
        Self {
            id: token_id(element),
            xml,
        }
    }

    pub fn xml(&self) -> &str {
        &self.xml
    }

    /// One claim per child element holding text, named by its local name.
    /// A leaf root element yields a single claim named after itself.
    pub fn claims(&self) -> Result<Vec<Claim>> {
        let doc = reader::parse_document(&self.xml)?;
        let root = doc.root_element();
        let mut claims: Vec<Claim> = root
            .children()
            .filter(|n| n.is_element())
            .filter_map(|n| {
                let text = reader::text_content(n);
                (!text.is_empty()).then(|| Claim::new(n.tag_name().name(), text))
            })
            .collect();
        if claims.is_empty() && !root.children().any(|n| n.is_element()) {
            let text = reader::text_content(root);
            if !text.is_empty() {
                claims.push(Claim::new(root.tag_name().name(), text));
            }
        }
        Ok(claims)
    }
}

impl SecurityToken for RawXmlToken {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn token_id(element: Node<'_, '_>) -> Option<String> {
    element
        .attribute("Id")
        .or_else(|| element.attribute("ID"))
        .map(str::to_owned)
}

/// Handler for [`RawXmlToken`].
///
/// Namespace declarations inherited from ancestors of the token element are
/// not copied into the token text.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawXmlTokenHandler;

impl SecurityTokenHandler for RawXmlTokenHandler {
    fn can_read_token(&self, element: Node<'_, '_>) -> bool {
        element.is_element()
    }

    fn read_token(
        &self,
        element: Node<'_, '_>,
        _params: &TokenValidationParameters,
    ) -> Result<Box<dyn SecurityToken>> {
        if !element.is_element() {
            return Err(Error::InvalidArgument(format!(
                "expected an element, found {}",
                reader::describe(element)
            )));
        }
        Ok(Box::new(RawXmlToken::from_node(element)))
    }

    fn validate_token(
        &self,
        element: Node<'_, '_>,
        params: &TokenValidationParameters,
    ) -> Result<ValidatedToken> {
        let token = self.read_token(element, params)?;
        let claims = match token.as_any().downcast_ref::<RawXmlToken>() {
            Some(raw) => raw.claims()?,
            None => Vec::new(),
        };
        Ok(ValidatedToken {
            principal: ClaimsPrincipal { claims },
            token,
        })
    }

    fn write_token(&self, writer: &mut XmlWriter, token: &dyn SecurityToken) -> Result<()> {
        let raw = token.as_any().downcast_ref::<RawXmlToken>().ok_or_else(|| {
            Error::InvalidArgument(format!("RawXmlTokenHandler cannot write {token:?}"))
        })?;
        writer.write_raw(raw.xml())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_is_preserved_exactly() {
        let xml = r#"<Assertion ID="_a1"  Version="2.0"><Subject>alice</Subject><Role>admin</Role></Assertion>"#;
        let wrapped = format!("<Envelope>{xml}</Envelope>");
        let doc = reader::parse_document(&wrapped).unwrap();
        let element = doc.root_element().first_element_child().unwrap();

        let handler = RawXmlTokenHandler;
        let validated = handler
            .validate_token(element, &TokenValidationParameters::default())
            .unwrap();
        assert_eq!(validated.token.id(), Some("_a1"));
        assert_eq!(
            validated.principal.find_first("Role").map(|c| c.value.as_str()),
            Some("admin")
        );

        let mut w = XmlWriter::new();
        handler.write_token(&mut w, validated.token.as_ref()).unwrap();
        assert_eq!(w.into_string().unwrap(), xml);
    }

    #[test]
    fn test_leaf_token_claim() {
        let token = RawXmlToken::parse("<Token>abc</Token>").unwrap();
        assert_eq!(token.claims().unwrap(), vec![Claim::new("Token", "abc")]);
        assert_eq!(token.id(), None);
    }

    #[derive(Debug)]
    struct Other;

    impl SecurityToken for Other {
        fn id(&self) -> Option<&str> {
            None
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    #[test]
    fn test_write_rejects_foreign_token() {
        let mut w = XmlWriter::new();
        assert!(matches!(
            RawXmlTokenHandler.write_token(&mut w, &Other),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_parse_rejects_malformed_xml() {
        assert!(matches!(RawXmlToken::parse("<Token>"), Err(Error::XmlParse(_))));
    }
}
