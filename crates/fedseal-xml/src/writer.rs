#![forbid(unsafe_code)]

//! Namespace-aware streaming XML writer over `quick-xml`.

use fedseal_core::{Error, Result};
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};

/// Streaming XML writer.
///
/// Attributes may be written after [`XmlWriter::write_start_element`] until
/// content or an end tag is written. Namespace declarations are emitted the
/// first time a prefix is used within a scope.
pub struct XmlWriter {
    writer: quick_xml::Writer<Vec<u8>>,
    pending: Option<BytesStart<'static>>,
    open: Vec<String>,
    scopes: Vec<Vec<(String, String)>>,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            writer: quick_xml::Writer::new(Vec::new()),
            pending: None,
            open: Vec::new(),
            scopes: Vec::new(),
        }
    }

    /// Open `prefix:local_name`, declaring `prefix` for `namespace` if it is
    /// not already bound to it. An empty prefix uses the default namespace.
    pub fn write_start_element(
        &mut self,
        prefix: &str,
        local_name: &str,
        namespace: &str,
    ) -> Result<()> {
        self.flush_pending()?;

        let qname = if prefix.is_empty() {
            local_name.to_owned()
        } else {
            format!("{prefix}:{local_name}")
        };
        let mut start = BytesStart::new(qname.clone());
        let mut scope = Vec::new();
        if self.lookup_namespace(prefix).unwrap_or("") != namespace {
            let decl = if prefix.is_empty() {
                "xmlns".to_owned()
            } else {
                format!("xmlns:{prefix}")
            };
            start.push_attribute((decl.as_str(), namespace));
            scope.push((prefix.to_owned(), namespace.to_owned()));
        }

        self.scopes.push(scope);
        self.open.push(qname);
        self.pending = Some(start);
        Ok(())
    }

    /// Add an attribute to the element opened last.
    pub fn write_attribute(&mut self, name: &str, value: &str) -> Result<()> {
        let start = self.pending.as_mut().ok_or_else(|| {
            Error::XmlWrite(format!("attribute '{name}' written outside a start tag"))
        })?;
        start.push_attribute((name, value));
        Ok(())
    }

    pub fn write_optional_attribute(&mut self, name: &str, value: Option<&str>) -> Result<()> {
        match value {
            Some(v) => self.write_attribute(name, v),
            None => Ok(()),
        }
    }

    /// Write escaped text content.
    pub fn write_string(&mut self, text: &str) -> Result<()> {
        self.flush_pending()?;
        self.emit(Event::Text(BytesText::new(text)))
    }

    /// Write bytes as base64 text content.
    pub fn write_base64(&mut self, bytes: &[u8]) -> Result<()> {
        let encoded = crate::reader::encode_base64(bytes);
        self.write_string(&encoded)
    }

    /// Write already-serialized XML verbatim.
    pub fn write_raw(&mut self, xml: &str) -> Result<()> {
        self.flush_pending()?;
        self.emit(Event::Text(BytesText::from_escaped(xml)))
    }

    /// Close the element opened last. An element with no content is written
    /// as an empty tag.
    pub fn write_end_element(&mut self) -> Result<()> {
        let qname = self
            .open
            .pop()
            .ok_or_else(|| Error::XmlWrite("end element without matching start".into()))?;
        self.scopes.pop();
        match self.pending.take() {
            Some(start) => self.emit(Event::Empty(start)),
            None => self.emit(Event::End(BytesEnd::new(qname))),
        }
    }

    /// Write `<prefix:local_name>text</prefix:local_name>`.
    pub fn write_element_string(
        &mut self,
        prefix: &str,
        local_name: &str,
        namespace: &str,
        text: &str,
    ) -> Result<()> {
        self.write_start_element(prefix, local_name, namespace)?;
        self.write_string(text)?;
        self.write_end_element()
    }

    /// Number of currently open elements.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Finish writing and return the XML bytes. Fails if elements are
    /// still open.
    pub fn into_bytes(self) -> Result<Vec<u8>> {
        if let Some(name) = self.open.last() {
            return Err(Error::XmlWrite(format!("element '{name}' was never closed")));
        }
        Ok(self.writer.into_inner())
    }

    /// Finish writing and return the XML as a string.
    pub fn into_string(self) -> Result<String> {
        let bytes = self.into_bytes()?;
        String::from_utf8(bytes).map_err(|e| Error::XmlWrite(format!("invalid UTF-8: {e}")))
    }

    fn lookup_namespace(&self, prefix: &str) -> Option<&str> {
        self.scopes
            .iter()
            .rev()
            .flat_map(|scope| scope.iter())
            .find(|(p, _)| p == prefix)
            .map(|(_, ns)| ns.as_str())
    }

    fn flush_pending(&mut self) -> Result<()> {
        match self.pending.take() {
            Some(start) => self.emit(Event::Start(start)),
            None => Ok(()),
        }
    }

    fn emit(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::XmlWrite(e.to_string()))
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NS: &str = "urn:test";

    #[test]
    fn test_namespace_declared_once_per_scope() {
        let mut w = XmlWriter::new();
        w.write_start_element("t", "Outer", NS).unwrap();
        w.write_attribute("Id", "o1").unwrap();
        w.write_start_element("t", "Inner", NS).unwrap();
        w.write_end_element().unwrap();
        w.write_end_element().unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            r#"<t:Outer xmlns:t="urn:test" Id="o1"><t:Inner/></t:Outer>"#
        );
    }

    #[test]
    fn test_sibling_scopes_redeclare() {
        let mut w = XmlWriter::new();
        w.write_start_element("", "root", "urn:root").unwrap();
        w.write_element_string("t", "A", NS, "1").unwrap();
        w.write_element_string("t", "B", NS, "2").unwrap();
        w.write_end_element().unwrap();
        assert_eq!(
            w.into_string().unwrap(),
            r#"<root xmlns="urn:root"><t:A xmlns:t="urn:test">1</t:A><t:B xmlns:t="urn:test">2</t:B></root>"#
        );
    }

    #[test]
    fn test_text_is_escaped_and_raw_is_not() {
        let mut w = XmlWriter::new();
        w.write_start_element("", "a", "").unwrap();
        w.write_string("x < y & z").unwrap();
        w.write_raw("<b>c</b>").unwrap();
        w.write_end_element().unwrap();
        let out = w.into_string().unwrap();
        assert!(out.contains("x &lt; y &amp; z"));
        assert!(out.contains("<b>c</b>"));
        assert!(out.starts_with("<a>"));
    }

    #[test]
    fn test_attribute_after_content_is_rejected() {
        let mut w = XmlWriter::new();
        w.write_start_element("", "a", "").unwrap();
        w.write_string("text").unwrap();
        assert!(matches!(w.write_attribute("x", "y"), Err(Error::XmlWrite(_))));
    }

    #[test]
    fn test_unclosed_element_is_an_error() {
        let mut w = XmlWriter::new();
        w.write_start_element("t", "a", NS).unwrap();
        assert_eq!(w.depth(), 1);
        assert!(w.into_bytes().is_err());
    }

    #[test]
    fn test_unbalanced_end_is_an_error() {
        let mut w = XmlWriter::new();
        assert!(w.write_end_element().is_err());
    }
}
