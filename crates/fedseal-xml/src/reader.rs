#![forbid(unsafe_code)]

//! Read helpers over `roxmltree` nodes.

use base64::Engine;
use fedseal_core::{Error, Result};
use quick_xml::events::Event;
use roxmltree::Node;

/// Parse `text` into a document using [`crate::parsing_options`].
pub fn parse_document(text: &str) -> Result<roxmltree::Document<'_>> {
    roxmltree::Document::parse_with_options(text, crate::parsing_options())
        .map_err(|e| Error::XmlParse(e.to_string()))
}

/// [`parse_document`] after [`check_depth`].
pub fn parse_document_with_depth(
    text: &str,
    maximum_depth: usize,
) -> Result<roxmltree::Document<'_>> {
    check_depth(text, maximum_depth)?;
    parse_document(text)
}

/// Fail if elements in `text` nest more than `maximum_depth` levels deep.
///
/// A streaming pass with no tree; it stops at the first element past the
/// limit.
pub fn check_depth(text: &str, maximum_depth: usize) -> Result<()> {
    let mut reader = quick_xml::Reader::from_str(text);
    let mut depth = 0usize;
    loop {
        let opened = match reader.read_event() {
            Ok(Event::Start(_)) => {
                depth += 1;
                depth
            }
            Ok(Event::Empty(_)) => depth + 1,
            Ok(Event::End(_)) => {
                depth = depth.saturating_sub(1);
                continue;
            }
            Ok(Event::Eof) => return Ok(()),
            Ok(_) => continue,
            Err(e) => return Err(Error::XmlParse(e.to_string())),
        };
        if opened > maximum_depth {
            return Err(Error::InvalidArgument(format!(
                "XML nests deeper than the maximum depth of {maximum_depth}"
            )));
        }
    }
}

/// True if `node` is an element named `local_name` in namespace `ns`.
pub fn is_start_element(node: Node<'_, '_>, ns: &str, local_name: &str) -> bool {
    node.is_element()
        && node.tag_name().name() == local_name
        && node.tag_name().namespace().unwrap_or("") == ns
}

/// Human-readable name of a node for error messages, e.g. `{urn:x}Foo`.
pub fn describe(node: Node<'_, '_>) -> String {
    if !node.is_element() {
        return format!("{:?} node", node.node_type());
    }
    match node.tag_name().namespace() {
        Some(ns) => format!("{{{ns}}}{}", node.tag_name().name()),
        None => node.tag_name().name().to_owned(),
    }
}

/// Fail with a read error unless `node` is the expected element.
pub fn expect_element(node: Node<'_, '_>, ns: &str, local_name: &str) -> Result<()> {
    if is_start_element(node, ns, local_name) {
        Ok(())
    } else {
        Err(Error::unexpected_element(local_name, ns, &describe(node)))
    }
}

/// Get a required attribute or fail naming the element and attribute.
pub fn required_attribute<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str> {
    node.attribute(name)
        .ok_or_else(|| Error::missing_attribute(node.tag_name().name(), name))
}

/// Check that `value` is an absolute URI.
pub fn validate_absolute_uri(element: &str, attribute: &str, value: &str) -> Result<()> {
    match url::Url::parse(value) {
        Ok(_) => Ok(()),
        Err(_) => Err(Error::invalid_uri(element, attribute, value)),
    }
}

/// Read a required attribute that must hold an absolute URI.
pub fn required_absolute_uri(node: Node<'_, '_>, name: &str) -> Result<String> {
    let value = required_attribute(node, name)?;
    validate_absolute_uri(node.tag_name().name(), name, value)?;
    Ok(value.to_owned())
}

/// Read an optional attribute that, when present, must hold an absolute URI.
pub fn optional_absolute_uri(node: Node<'_, '_>, name: &str) -> Result<Option<String>> {
    match node.attribute(name) {
        Some(value) => {
            validate_absolute_uri(node.tag_name().name(), name, value)?;
            Ok(Some(value.to_owned()))
        }
        None => Ok(None),
    }
}

/// Concatenated text of all descendant text nodes, trimmed.
pub fn text_content(node: Node<'_, '_>) -> String {
    let text: String = node
        .descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect();
    text.trim().to_owned()
}

/// Decode the base64 text content of an element. Embedded whitespace
/// (line wrapping) is ignored.
pub fn read_base64(node: Node<'_, '_>) -> Result<Vec<u8>> {
    let clean: String = text_content(node)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();
    base64::engine::general_purpose::STANDARD
        .decode(clean)
        .map_err(|e| Error::invalid_content(node.tag_name().name(), format!("base64: {e}")))
}

/// Base64-encode bytes for element content.
pub fn encode_base64(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Forward-only cursor over the element children of a node.
///
/// Mirrors a pull reader: callers peek at the current child, consume it when
/// it matches, and stop at the first child they do not recognise.
pub struct ElementCursor<'a, 'input> {
    parent: Node<'a, 'input>,
    children: Vec<Node<'a, 'input>>,
    pos: usize,
}

impl<'a, 'input> ElementCursor<'a, 'input> {
    pub fn new(parent: Node<'a, 'input>) -> Self {
        Self {
            parent,
            children: parent.children().filter(|n| n.is_element()).collect(),
            pos: 0,
        }
    }

    /// The element whose children are being walked.
    pub fn parent(&self) -> Node<'a, 'input> {
        self.parent
    }

    pub fn peek(&self) -> Option<Node<'a, 'input>> {
        self.children.get(self.pos).copied()
    }

    pub fn peek_is(&self, ns: &str, local_name: &str) -> bool {
        self.peek()
            .map(|n| is_start_element(n, ns, local_name))
            .unwrap_or(false)
    }

    /// Consume and return the current child if it is the named element.
    pub fn take_if(&mut self, ns: &str, local_name: &str) -> Option<Node<'a, 'input>> {
        if self.peek_is(ns, local_name) {
            self.advance()
        } else {
            None
        }
    }

    /// Consume the current child, which must be the named element.
    pub fn take_required(&mut self, ns: &str, local_name: &str) -> Result<Node<'a, 'input>> {
        match self.peek() {
            Some(node) if is_start_element(node, ns, local_name) => {
                self.pos += 1;
                Ok(node)
            }
            Some(node) => Err(Error::unexpected_element(local_name, ns, &describe(node))),
            None => Err(Error::missing_element(self.parent.tag_name().name(), local_name)),
        }
    }

    pub fn advance(&mut self) -> Option<Node<'a, 'input>> {
        let node = self.peek()?;
        self.pos += 1;
        Some(node)
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.children.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    #[test]
    fn test_cursor_walks_elements_in_order() {
        let xml = r#"<r xmlns="urn:test"> <a/> text <b/><c/></r>"#;
        let doc = parse_document(xml).unwrap();
        let mut cursor = ElementCursor::new(doc.root_element());
        assert!(cursor.take_if(NS, "b").is_none());
        assert!(cursor.take_if(NS, "a").is_some());
        assert!(cursor.take_required(NS, "b").is_ok());
        let err = cursor.take_required(NS, "d").unwrap_err();
        assert!(err.to_string().contains("'d'"));
        assert!(cursor.advance().is_some());
        assert!(cursor.is_exhausted());
        let err = cursor.take_required(NS, "e").unwrap_err();
        assert!(err.to_string().contains("missing required child 'e'"));
    }

    #[test]
    fn test_absolute_uri_validation() {
        assert!(validate_absolute_uri("E", "A", "http://www.w3.org/2001/04/xmlenc#aes256-cbc").is_ok());
        assert!(validate_absolute_uri("E", "A", "urn:oasis:names:tc:SAML:2.0:assertion").is_ok());
        assert!(validate_absolute_uri("E", "A", "#ref").is_err());
        assert!(validate_absolute_uri("E", "A", "relative/path").is_err());
        assert!(validate_absolute_uri("E", "A", "").is_err());
    }

    #[test]
    fn test_read_base64_ignores_line_breaks() {
        let xml = "<v>SGVs\n  bG8g\r\nV29ybGQ=</v>";
        let doc = parse_document(xml).unwrap();
        assert_eq!(read_base64(doc.root_element()).unwrap(), b"Hello World");
    }

    #[test]
    fn test_read_base64_rejects_garbage() {
        let doc = parse_document("<v>***</v>").unwrap();
        let err = read_base64(doc.root_element()).unwrap_err();
        assert!(matches!(err, Error::EncryptedDataRead(_)));
    }

    #[test]
    fn test_check_depth_counts_start_and_empty_elements() {
        assert!(check_depth("<a><b><c/></b></a>", 3).is_ok());
        assert!(matches!(
            check_depth("<a><b><c/></b></a>", 2),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            check_depth("<a><b><c></c></b></a>", 2),
            Err(Error::InvalidArgument(_))
        ));
        assert!(check_depth("<a/>", 1).is_ok());
    }

    #[test]
    fn test_check_depth_rejects_deep_input_without_parsing_it() {
        let deep = format!("{}{}", "<a>".repeat(36_000), "</a>".repeat(36_000));
        let err = parse_document_with_depth(&deep, 64).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument(msg) if msg.contains("64")));
    }

    #[test]
    fn test_check_depth_reports_malformed_input() {
        assert!(matches!(check_depth("<a></b>", 8), Err(Error::XmlParse(_))));
    }

    #[test]
    fn test_dtd_is_rejected() {
        let xml = r#"<!DOCTYPE r [<!ENTITY e "x">]><r>&e;</r>"#;
        assert!(matches!(parse_document(xml), Err(Error::XmlParse(_))));
    }

    #[test]
    fn test_expect_element_reports_found_name() {
        let doc = parse_document(r#"<x:Other xmlns:x="urn:other"/>"#).unwrap();
        let err = expect_element(doc.root_element(), NS, "Wanted").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Wanted"));
        assert!(msg.contains("{urn:other}Other"));
    }
}
