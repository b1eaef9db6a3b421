//! A schema-driven element engine for MusicXML 4.0 documents.
//!
//! The element tree has no static Rust type per MusicXML element — attribute
//! and child validity are checked dynamically against a compiled-in schema
//! table (`musicxml-codegen`, generated from `schema/musicxml-4.0.xsd` at
//! build time). See [`ElementNode`] for the core API.
//!
//! ```
//! use musicxml::ElementNode;
//!
//! let pitch = ElementNode::new("pitch").unwrap();
//! let step = ElementNode::new("step").unwrap();
//! step.set_value("G").unwrap();
//! pitch.add_child(step).unwrap();
//! pitch.set_named_child("octave", musicxml::NamedChildValue::Scalar("3".into())).unwrap();
//! assert_eq!(pitch.to_string().unwrap(), "<pitch>\n  <step>G</step>\n  <octave>3</octave>\n</pitch>");
//! ```

mod config;
mod content_model;
mod element;
pub mod elements;
mod error;
mod mxl;
mod parser;
mod schema;
mod serializer;
mod simple_types;

pub use config::Config;
pub use element::{ElementNode, NamedChildValue};
pub use error::{MusicXmlError, MusicXmlResult};
pub use simple_types::Value;

use std::path::Path;

/// Parse a MusicXML document (plain `.xml` or compressed `.mxl`) from a file
/// path, with default [`Config`] (schema-checked).
pub fn parse_musicxml(path: impl AsRef<Path>) -> MusicXmlResult<ElementNode> {
    parse_musicxml_with_config(path, &Config::default())
}

/// Like [`parse_musicxml`], with an explicit [`Config`].
pub fn parse_musicxml_with_config(path: impl AsRef<Path>, config: &Config) -> MusicXmlResult<ElementNode> {
    mxl::parse_musicxml(path.as_ref(), config)
}

/// Parse a MusicXML document from an in-memory string, with default
/// [`Config`]. `.mxl` archives are binary, so string input is always treated
/// as plain XML; use [`parse_musicxml_bytes`] for archive bytes.
pub fn parse_musicxml_str(xml: &str) -> MusicXmlResult<ElementNode> {
    parse_musicxml_str_with_config(xml, &Config::default())
}

/// Like [`parse_musicxml_str`], with an explicit [`Config`].
pub fn parse_musicxml_str_with_config(xml: &str, config: &Config) -> MusicXmlResult<ElementNode> {
    parser::parse_musicxml_str(xml, "<string>", config)
}

/// Parse a MusicXML document from raw bytes, auto-detecting a compressed
/// `.mxl` archive by its zip magic number.
pub fn parse_musicxml_bytes(bytes: &[u8]) -> MusicXmlResult<ElementNode> {
    parse_musicxml_bytes_with_config(bytes, &Config::default())
}

/// Like [`parse_musicxml_bytes`], with an explicit [`Config`].
pub fn parse_musicxml_bytes_with_config(bytes: &[u8], config: &Config) -> MusicXmlResult<ElementNode> {
    mxl::parse_musicxml_bytes(bytes, "<bytes>", config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_api_parses_and_serializes() {
        let pitch = parse_musicxml_str("<pitch><step>G</step><octave>3</octave></pitch>").unwrap();
        assert_eq!(pitch.to_string().unwrap(), "<pitch>\n  <step>G</step>\n  <octave>3</octave>\n</pitch>");
    }

    #[test]
    fn public_api_rejects_malformed_xml() {
        let err = parse_musicxml_str("<pitch><step>G</step>").unwrap_err();
        assert!(matches!(err, MusicXmlError::ParseError { .. }));
    }
}
