#![forbid(unsafe_code)]

//! XML plumbing for fedseal.
//!
//! Reading works on `roxmltree` nodes: a [`roxmltree::Node`] handed to a
//! reader function plays the role of an XML reader positioned on a start
//! element. Writing goes through [`XmlWriter`], a namespace-aware streaming
//! writer over `quick-xml`.

pub mod reader;
pub mod writer;

pub use reader::ElementCursor;
pub use writer::XmlWriter;

/// Parsing options for token input. DTDs are rejected.
pub fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: false,
        ..roxmltree::ParsingOptions::default()
    }
}
